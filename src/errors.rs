use thiserror::Error;

/// # FxError
/// Error kinds surfaced by the FX pricing core.
///
/// Over/under-specification and pair-set-mismatch errors are fatal to the
/// call; there are no retries and no partial results. `OnError::Ignore` and
/// `OnError::Warn` never produce an `FxError` — they resolve to `Ok(None)`
/// at the call site instead (see [`crate::errors::OnError`]).
#[derive(Debug, Error)]
pub enum FxError {
    #[error("`fx_rates` is overspecified: {currencies} currencies need {expected} FX pairs, not {actual}")]
    Overspecified {
        currencies: usize,
        expected: usize,
        actual: usize,
    },

    #[error("`fx_rates` is underspecified: {currencies} currencies need {expected} FX pairs, not {actual}")]
    Underspecified {
        currencies: usize,
        expected: usize,
        actual: usize,
    },

    #[error("`fx_curves` is overspecified: {expected} curves are expected but {actual} were provided")]
    CurvesOverspecified { expected: usize, actual: usize },

    #[error("`fx_curves` is underspecified: {expected} curves are expected but {actual} were provided")]
    CurvesUnderspecified { expected: usize, actual: usize },

    #[error("linearly dependent FX pairs: {0}")]
    LinearlyDependent(String),

    #[error("`fx_curves` contains co-dependent rates")]
    CodependentCurves,

    #[error("`fx_curves` contains an unexpected currency: {0}")]
    UnknownCurveCurrency(String),

    #[error("'{0}' not in the FX framework's currencies")]
    UnknownCurrency(String),

    #[error("`settlement` cannot be before the immediate FX rate date")]
    TemporalViolation,

    #[error("`fx_curves` do not have the same initial node date")]
    HeterogeneousImmediateDates,

    #[error("`fx_curves` must be discount-factor curves, not a line curve: {0}")]
    WrongCurveKind(String),

    #[error("`update` must contain exactly the same pairs as the instance: {0}")]
    PairSetMismatch(String),

    #[error("no path found between currencies {from} and {to}")]
    NoPath { from: String, to: String },

    #[error("singular system in dual_solve: {0}")]
    Solve(String),

    #[error("operation not supported: {0}")]
    Unsupported(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FxError>;

/// # OnError
/// Behavior at an unknown-currency site: `Ignore`/`Warn` resolve to `Ok(None)`
/// instead of erroring, `Raise` surfaces `FxError::UnknownCurrency`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnError {
    Ignore,
    Warn,
    #[default]
    Raise,
}

/// Resolve an unknown-currency condition per the [`OnError`] policy.
///
/// Returns `Ok(None)` for `Ignore`/`Warn` (emitting a `log::warn!` for the
/// latter), or `Err` for `Raise`.
pub(crate) fn on_unknown_currency<T>(policy: OnError, ccy: &str) -> Result<Option<T>> {
    match policy {
        OnError::Ignore => Ok(None),
        OnError::Warn => {
            log::warn!("'{ccy}' not in FX framework's currencies: returning None");
            Ok(None)
        }
        OnError::Raise => Err(FxError::UnknownCurrency(ccy.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignore_and_warn_both_resolve_to_none() {
        let _ = env_logger::builder().is_test(true).try_init();
        assert!(on_unknown_currency::<()>(OnError::Ignore, "zzz").unwrap().is_none());
        assert!(on_unknown_currency::<()>(OnError::Warn, "zzz").unwrap().is_none());
    }

    #[test]
    fn raise_surfaces_unknown_currency_error() {
        let err = on_unknown_currency::<()>(OnError::Raise, "zzz").unwrap_err();
        assert!(matches!(err, FxError::UnknownCurrency(c) if c == "zzz"));
    }
}
