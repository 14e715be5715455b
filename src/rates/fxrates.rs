use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config;
use crate::currencies::{split_pair, CurrencyCode, CurrencyMap};
use crate::errors::{on_unknown_currency, FxError, OnError, Result};
use crate::math::dual::{dual_solve, fx_var_name, set_order, AdOrder, Dual};

/// An input rate supplied to [`FXRates::new`] or [`FXRates::restate`]: either
/// a plain real (wrapped as a fresh AD variable on construction) or an
/// already-dual value whose existing gradient chain is preserved verbatim.
#[derive(Debug, Clone)]
pub enum RateInput {
    Real(f64),
    Dual(Dual),
}

impl From<f64> for RateInput {
    fn from(v: f64) -> Self {
        RateInput::Real(v)
    }
}

impl From<Dual> for RateInput {
    fn from(v: Dual) -> Self {
        RateInput::Dual(v)
    }
}

/// # FXRates
/// Solves a sparse linear system over *n*−1 independent currency pairs
/// spanning *n* currencies to produce a full cross-rate table, with every
/// cross rate's sensitivity to every input pair falling out of the solve
/// itself.
#[derive(Debug, Clone)]
pub struct FXRates {
    pairs: Vec<String>,
    currencies: CurrencyMap,
    fx_rates: HashMap<String, Dual>,
    fx_vector: Vec<Dual>,
    fx_array: Vec<Vec<Dual>>,
    base: CurrencyCode,
    settlement: Option<NaiveDate>,
    ad_order: AdOrder,
}

#[derive(Serialize, Deserialize)]
struct FxRatesJson {
    fx_rates: BTreeMap<String, f64>,
    settlement: Option<String>,
    base: String,
}

impl FXRates {
    /// Build from an ordered pair→rate list. `pairs` must contain exactly
    /// `q - 1` entries for the `q` currencies they mention, and must be
    /// linearly independent (no pair implied entirely by the others).
    pub fn new(
        pairs: Vec<(String, RateInput)>,
        settlement: Option<NaiveDate>,
        base: Option<String>,
    ) -> Result<Self> {
        let pair_names: Vec<String> = pairs.iter().map(|(p, _)| p.to_ascii_lowercase()).collect();
        let split: Vec<(CurrencyCode, CurrencyCode)> = pair_names
            .iter()
            .map(|p| split_pair(p))
            .collect::<Result<_>>()?;
        let currencies = CurrencyMap::from_pairs(&split);
        let q = currencies.len();

        if pairs.len() != q.saturating_sub(1) {
            let expected = q.saturating_sub(1);
            if pairs.len() > expected {
                return Err(FxError::Overspecified {
                    currencies: q,
                    expected,
                    actual: pairs.len(),
                });
            }
            return Err(FxError::Underspecified {
                currencies: q,
                expected,
                actual: pairs.len(),
            });
        }

        let mut fx_rates = HashMap::with_capacity(pairs.len());
        let mut a = vec![vec![Dual::new(0.0); q]; q];
        let mut b = vec![Dual::new(0.0); q];
        a[0][0] = Dual::new(1.0);
        b[0] = Dual::new(1.0);

        for (row, ((pair, input), (dom, for_))) in pairs.into_iter().zip(split.iter()).enumerate() {
            let dual = match input {
                RateInput::Real(v) => Dual::variable(v, &fx_var_name(&pair)),
                RateInput::Dual(d) => d,
            };
            let dom_idx = currencies.index_of(*dom).expect("dom just inserted");
            let for_idx = currencies.index_of(*for_).expect("for just inserted");
            a[row + 1][dom_idx] = Dual::new(-1.0);
            a[row + 1][for_idx] = dual.recip();
            fx_rates.insert(pair.clone(), dual);
        }

        let fx_vector = dual_solve(&a, &b).map_err(|e| match e {
            FxError::Solve(msg) => FxError::LinearlyDependent(msg),
            other => other,
        })?;

        let fx_array: Vec<Vec<Dual>> = (0..q)
            .map(|i| (0..q).map(|j| &fx_vector[j] / &fx_vector[i]).collect())
            .collect();

        let base_ccy = match base {
            Some(b) => {
                let c = CurrencyCode::parse(&b)?;
                currencies.require_index(c)?;
                c
            }
            None => {
                let configured = config::defaults().base_currency;
                match configured.as_deref().map(CurrencyCode::parse).transpose()? {
                    Some(c) if currencies.index_of(c).is_some() => c,
                    _ => currencies.currency_at(0).expect("q >= 1 when pairs non-empty or q=1"),
                }
            }
        };

        let ad_order = fx_rates
            .values()
            .map(|d| d.order())
            .max()
            .unwrap_or(AdOrder::One);

        Ok(FXRates {
            pairs: pair_names,
            currencies,
            fx_rates,
            fx_vector,
            fx_array,
            base: base_ccy,
            settlement,
            ad_order,
        })
    }

    pub fn pairs(&self) -> &[String] {
        &self.pairs
    }

    pub fn ad_order(&self) -> AdOrder {
        self.ad_order
    }

    /// Cascades an AD order change to every dual value this object holds:
    /// `fx_rates`, `fx_vector`, and `fx_array`. Projecting down to
    /// `AdOrder::Zero` drops sensitivities; extending up allocates (empty)
    /// Hessians per [`set_order`].
    pub fn set_ad_order(&mut self, order: AdOrder) {
        self.ad_order = order;
        for v in self.fx_rates.values_mut() {
            *v = set_order(v, order);
        }
        for v in &mut self.fx_vector {
            *v = set_order(v, order);
        }
        for row in &mut self.fx_array {
            for v in row {
                *v = set_order(v, order);
            }
        }
    }

    pub fn currencies(&self) -> &CurrencyMap {
        &self.currencies
    }

    pub fn base(&self) -> CurrencyCode {
        self.base
    }

    pub fn settlement(&self) -> Option<NaiveDate> {
        self.settlement
    }

    /// An exact clone, named to match the original interface's `copy()`.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    fn pair_indices(&self, domestic: CurrencyCode, foreign: CurrencyCode) -> Result<(usize, usize)> {
        Ok((
            self.currencies.require_index(domestic)?,
            self.currencies.require_index(foreign)?,
        ))
    }

    /// The cross rate `domestic -> foreign` looked up directly from the
    /// solved table.
    pub fn rate_by_currency(&self, domestic: CurrencyCode, foreign: CurrencyCode) -> Result<Dual> {
        let (i, j) = self.pair_indices(domestic, foreign)?;
        Ok(self.fx_array[i][j].clone())
    }

    /// `rate(pair)` where `pair` is a 6-char `<dom><for>` code.
    pub fn rate(&self, pair: &str) -> Result<Dual> {
        let (dom, for_) = split_pair(pair)?;
        self.rate_by_currency(dom, for_)
    }

    /// Dense `q x q` view of real-valued cross rates, indexed by
    /// [`CurrencyMap`] order.
    pub fn rates_table(&self) -> Vec<Vec<f64>> {
        self.fx_array
            .iter()
            .map(|row| row.iter().map(Dual::value).collect())
            .collect()
    }

    /// `value * rate(domestic -> foreign)`, with `foreign` defaulting to
    /// `self.base`. Unknown currencies resolve per `on_error`.
    pub fn convert(
        &self,
        value: &Dual,
        domestic: &str,
        foreign: Option<&str>,
        on_error: OnError,
    ) -> Result<Option<Dual>> {
        let dom = match CurrencyCode::parse(domestic) {
            Ok(c) if self.currencies.index_of(c).is_some() => c,
            _ => return on_unknown_currency(on_error, domestic),
        };
        let for_ = match foreign {
            Some(f) => match CurrencyCode::parse(f) {
                Ok(c) if self.currencies.index_of(c).is_some() => c,
                _ => return on_unknown_currency(on_error, f),
            },
            None => self.base,
        };
        let rate = self.rate_by_currency(dom, for_)?;
        Ok(Some(value * &rate))
    }

    /// Dot `vector_by_currency` (indexed by [`CurrencyMap`] order) against
    /// the base column of `fx_array`.
    pub fn convert_positions(&self, vector_by_currency: &[Dual], base: Option<&str>) -> Result<Dual> {
        let base_ccy = match base {
            Some(b) => CurrencyCode::parse(b)?,
            None => self.base,
        };
        let base_idx = self.currencies.require_index(base_ccy)?;
        let mut total = Dual::new(0.0);
        for (i, v) in vector_by_currency.iter().enumerate() {
            total = &total + &(v * &self.fx_array[i][base_idx]);
        }
        Ok(total)
    }

    /// Inverse of [`FXRates::convert_positions`]: decompose `value_in_base`
    /// into a per-currency cash vector (indexed by [`CurrencyMap`] order)
    /// that revalues to exactly `value_in_base`, gradients included.
    pub fn positions(&self, value_in_base: &Dual, base: Option<&str>) -> Result<Vec<Dual>> {
        let base_ccy = match base {
            Some(b) => CurrencyCode::parse(b)?,
            None => self.base,
        };
        let base_idx = self.currencies.require_index(base_ccy)?;
        let q = self.currencies.len();
        let mut pos = vec![Dual::new(0.0); q];
        pos[base_idx] = &pos[base_idx] + &Dual::new(value_in_base.value());

        for var in value_in_base.vars() {
            let Some(pair) = var.strip_prefix("fx_") else {
                continue;
            };
            let Ok((dom, for_)) = split_pair(pair) else {
                continue;
            };
            let (Some(dom_idx), Some(for_idx)) =
                (self.currencies.index_of(dom), self.currencies.index_of(for_))
            else {
                continue;
            };
            let delta = value_in_base.gradient(&var);
            if delta == 0.0 {
                continue;
            }
            let rate_base_for = self.fx_array[base_idx][for_idx].value();
            let rate_for_dom = self.fx_array[for_idx][dom_idx].value();
            pos[dom_idx] = &pos[dom_idx] + &Dual::new(rate_base_for * delta);
            pos[for_idx] = &pos[for_idx] - &Dual::new(rate_base_for * delta / rate_for_dom);
        }
        Ok(pos)
    }

    /// Replace the rate set in place. `new_rates` must name exactly the same
    /// pairs as the pairs this object was constructed with.
    pub fn update(&mut self, new_rates: Vec<(String, RateInput)>) -> Result<()> {
        let incoming: Vec<String> = new_rates.iter().map(|(p, _)| p.to_ascii_lowercase()).collect();
        let mut existing = self.pairs.clone();
        let mut incoming_sorted = incoming.clone();
        existing.sort();
        incoming_sorted.sort();
        if existing != incoming_sorted {
            return Err(FxError::PairSetMismatch(
                "update() rates must name exactly the pairs the object was constructed with".to_string(),
            ));
        }
        let rebuilt = FXRates::new(new_rates, self.settlement, Some(self.base.as_str().to_string()))?;
        *self = rebuilt;
        Ok(())
    }

    /// Rebuild the solver on a different independent basis of pairs spanning
    /// the same currency set. If `keep_ad`, pairs retained from the original
    /// basis keep their original dual (preserving variable identity); new
    /// pairs and every pair when `keep_ad` is false are (re)derived from the
    /// current table, real-valued and freshly wrapped.
    pub fn restate(&self, new_pairs: &[String], keep_ad: bool) -> Result<Self> {
        let mut requested: Vec<String> = new_pairs.iter().map(|p| p.to_ascii_lowercase()).collect();
        let mut current = self.pairs.clone();
        requested.sort();
        current.sort();
        if keep_ad && requested == current {
            return Ok(self.copy());
        }

        let mut inputs = Vec::with_capacity(new_pairs.len());
        for pair in new_pairs {
            let lower = pair.to_ascii_lowercase();
            if keep_ad {
                if let Some(existing) = self.fx_rates.get(&lower) {
                    inputs.push((lower, RateInput::Dual(existing.clone())));
                    continue;
                }
                let derived = self.rate(&lower)?;
                inputs.push((lower, RateInput::Dual(derived)));
            } else {
                let value = self.rate(&lower)?.value();
                inputs.push((lower, RateInput::Real(value)));
            }
        }
        FXRates::new(inputs, self.settlement, Some(self.base.as_str().to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        let fx_rates = self
            .pairs
            .iter()
            .map(|p| (p.clone(), self.fx_rates[p].value()))
            .collect();
        let doc = FxRatesJson {
            fx_rates,
            settlement: self.settlement.map(|d| d.format("%Y-%m-%d").to_string()),
            base: self.base.as_str().to_string(),
        };
        serde_json::to_string(&doc).map_err(FxError::from)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let doc: FxRatesJson = serde_json::from_str(json)?;
        let settlement = doc
            .settlement
            .map(|s| {
                NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                    .map_err(|e| FxError::InvalidValue(format!("invalid settlement date {s:?}: {e}")))
            })
            .transpose()?;
        let pairs: Vec<(String, RateInput)> = doc
            .fx_rates
            .into_iter()
            .map(|(p, v)| (p, RateInput::Real(v)))
            .collect();
        FXRates::new(pairs, settlement, Some(doc.base))
    }
}

impl PartialEq for FXRates {
    fn eq(&self, other: &Self) -> bool {
        let mut a = self.pairs.clone();
        let mut b = other.pairs.clone();
        a.sort();
        b.sort();
        a == b
            && self.settlement == other.settlement
            && self.currencies.currencies() == other.currencies.currencies()
            && self.base == other.base
            && rates_tables_close(&self.rates_table(), &other.rates_table())
    }
}

fn rates_tables_close(a: &[Vec<f64>], b: &[Vec<f64>]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b.iter()).all(|(ra, rb)| {
            ra.len() == rb.len() && ra.iter().zip(rb.iter()).all(|(x, y)| (x - y).abs() < 1e-10)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fxr(pairs: &[(&str, f64)]) -> FXRates {
        FXRates::new(
            pairs.iter().map(|(p, r)| (p.to_string(), RateInput::Real(*r))).collect(),
            None,
            None,
        )
        .unwrap()
    }

    #[test]
    fn triangulation_matches_product_of_legs() {
        let fxr = fxr(&[("eurusd", 1.1), ("gbpusd", 1.25), ("usdjpy", 100.0)]);
        let gbpjpy = fxr.rate("gbpjpy").unwrap().value();
        assert!((gbpjpy - 125.0).abs() < 1e-12);
        let jpygbp = fxr.rate("jpygbp").unwrap().value();
        assert!((jpygbp - 1.0 / 125.0).abs() < 1e-12);
    }

    #[test]
    fn overspecified_pair_set_errors() {
        let result = FXRates::new(
            vec![
                ("eurusd".into(), 1.1.into()),
                ("gbpusd".into(), 1.25.into()),
                ("usdjpy".into(), 100.0.into()),
                ("gbpjpy".into(), 125.0.into()),
            ],
            None,
            None,
        );
        assert!(matches!(result, Err(FxError::Overspecified { .. })));
    }

    #[test]
    fn underspecified_disjoint_pairs_error() {
        let result = FXRates::new(
            vec![("eurusd".into(), 1.1.into()), ("gbpjpy".into(), 125.0.into())],
            None,
            None,
        );
        assert!(matches!(result, Err(FxError::Underspecified { .. })));
    }

    #[test]
    fn gradient_on_own_pair_is_unity() {
        let fxr = fxr(&[("eurusd", 1.1)]);
        let r = fxr.rate("eurusd").unwrap();
        assert!((r.gradient("fx_eurusd") - 1.0).abs() < 1e-10);
    }

    #[test]
    fn position_round_trip_preserves_value_and_gradients() {
        let fxr = fxr(&[("usdnok", 8.0)]);
        let value = Dual::scaled_variable(125000.0, "fx_usdnok", -15625.0);
        let pos = fxr.positions(&value, Some("usd")).unwrap();
        let back = fxr.convert_positions(&pos, Some("usd")).unwrap();
        assert!((back.value() - value.value()).abs() < 1e-6);
        assert!((back.gradient("fx_usdnok") - value.gradient("fx_usdnok")).abs() < 1e-6);
    }

    #[test]
    fn convert_same_currency_is_identity() {
        let fxr = fxr(&[("eurusd", 1.1)]);
        let v = Dual::new(42.0);
        let out = fxr.convert(&v, "usd", Some("usd"), OnError::Raise).unwrap().unwrap();
        assert!((out.value() - 42.0).abs() < 1e-12);
    }

    #[test]
    fn unknown_currency_respects_on_error_policy() {
        let fxr = fxr(&[("eurusd", 1.1)]);
        let v = Dual::new(1.0);
        assert!(fxr.convert(&v, "zzz", None, OnError::Ignore).unwrap().is_none());
        assert!(fxr.convert(&v, "zzz", None, OnError::Raise).is_err());
    }

    #[test]
    fn set_ad_order_cascades_to_every_dual_value() {
        let mut fxr = fxr(&[("eurusd", 1.1), ("gbpusd", 1.25)]);
        assert_eq!(fxr.ad_order(), AdOrder::One);
        fxr.set_ad_order(AdOrder::Zero);
        assert_eq!(fxr.ad_order(), AdOrder::Zero);
        assert_eq!(fxr.rate("eurusd").unwrap().gradient("fx_eurusd"), 0.0);

        fxr.set_ad_order(AdOrder::Two);
        assert_eq!(fxr.ad_order(), AdOrder::Two);
    }

    #[test]
    fn restate_same_pairs_keep_ad_is_identity() {
        let fxr = fxr(&[("eurusd", 1.1), ("gbpusd", 1.25)]);
        let restated = fxr.restate(&["eurusd".to_string(), "gbpusd".to_string()], true).unwrap();
        assert_eq!(fxr, restated);
    }

    #[test]
    fn json_round_trips() {
        let fxr = fxr(&[("eurusd", 1.1), ("gbpusd", 1.25)]);
        let json = fxr.to_json().unwrap();
        let back = FXRates::from_json(&json).unwrap();
        assert_eq!(fxr, back);
    }
}
