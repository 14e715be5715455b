use std::sync::RwLock;

use once_cell::sync::Lazy;

/// # Defaults
/// Process-wide configuration consumed by the FX pricing core.
///
/// This is the only process-wide state the core carries (see module docs):
/// it is read once, at `FXRates` construction, to resolve the default base
/// currency, and is otherwise inert. There is no other global or thread-local
/// state in this crate.
#[derive(Debug, Clone, PartialEq)]
pub struct Defaults {
    /// Base currency assumed by `FXRates`/`FXForwards` when none is supplied
    /// and is present among the instance's currencies.
    pub base_currency: Option<String>,
    /// Absolute threshold below which `FXForwards::convert_positions` treats
    /// a per-date subtotal as a dual-valued zero rather than re-discounting
    /// it back to `immediate` (an implementation-level magic constant in the
    /// original; exposed here as a configurable default).
    pub convert_positions_tolerance: f64,
}

impl Default for Defaults {
    fn default() -> Self {
        Defaults {
            base_currency: Some("usd".to_string()),
            convert_positions_tolerance: 1e-2,
        }
    }
}

static DEFAULTS: Lazy<RwLock<Defaults>> = Lazy::new(|| RwLock::new(Defaults::default()));

/// Read the current process-wide defaults.
pub fn defaults() -> Defaults {
    DEFAULTS.read().expect("defaults lock poisoned").clone()
}

/// Replace the process-wide defaults.
pub fn set_defaults(defaults: Defaults) {
    *DEFAULTS.write().expect("defaults lock poisoned") = defaults;
}
