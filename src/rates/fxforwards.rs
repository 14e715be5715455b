use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::currencies::{split_pair, CurrencyCode, CurrencyMap};
use crate::curves::{Curve, ProxyCurve};
use crate::errors::{on_unknown_currency, FxError, OnError, Result};
use crate::math::dual::{AdOrder, Dual};

use super::fxrates::{FXRates, RateInput};
use super::transform::{Axis, PathStep, Transform};

/// # FXForwards
/// Computes arbitrage-free forward FX rates for any settlement date by
/// chaining discount-factor curves along a path discovered through the
/// cash/collateral availability graph ([`Transform`]), anchored to one or
/// more dated spot [`FXRates`] objects.
#[derive(Clone)]
pub struct FXForwards {
    fx_curves: HashMap<String, Arc<dyn Curve>>,
    fx_rates: Vec<FXRates>,
    currencies: CurrencyMap,
    transform: Transform,
    immediate: NaiveDate,
    terminal: NaiveDate,
    fx_rates_immediate: FXRates,
    base: CurrencyCode,
}

fn curve_key(cash: CurrencyCode, coll: CurrencyCode) -> String {
    format!("{cash}{coll}")
}

impl FXForwards {
    /// Construct from a curve set and one or more dated `FXRates`. A single
    /// item is the common case; multiple items (distinct settlement dates)
    /// are folded left, each subsequent item bridged into the accumulated
    /// currency universe via the forwards built from the items before it.
    pub fn new(
        fx_curves: HashMap<String, Arc<dyn Curve>>,
        fx_rates: Vec<FXRates>,
        base: Option<String>,
    ) -> Result<Self> {
        if fx_rates.is_empty() {
            return Err(FxError::InvalidValue(
                "FXForwards requires at least one FXRates object".to_string(),
            ));
        }
        if fx_rates.len() == 1 {
            let only = fx_rates.into_iter().next().expect("checked non-empty");
            return Self::build_single(fx_curves, vec![only], base);
        }

        let mut items = fx_rates.into_iter();
        let mut combined = items.next().expect("len > 1");
        let mut acc = Self::build_single(fx_curves.clone(), vec![combined.clone()], base.clone())?;
        let mut history = vec![combined.clone()];

        for item in items {
            let settlement = item
                .settlement()
                .unwrap_or(acc.immediate);
            let combined_currencies: Vec<CurrencyCode> = combined.currencies().currencies().to_vec();
            let item_currencies: Vec<CurrencyCode> = item.currencies().currencies().to_vec();
            let anchor = item.base();
            if !combined_currencies.contains(&anchor) {
                return Err(FxError::UnknownCurrency(format!(
                    "'{anchor}' (new FXRates object's base) is not shared with the accumulated FXForwards"
                )));
            }

            let mut new_pairs: Vec<(String, RateInput)> = Vec::new();
            for p in item.pairs() {
                new_pairs.push((p.clone(), RateInput::Dual(item.rate(p)?)));
            }
            for &ccy in &combined_currencies {
                if ccy == anchor || item_currencies.contains(&ccy) {
                    continue;
                }
                let bridge = acc.rate_by_currency(ccy, anchor, settlement, None)?;
                new_pairs.push((format!("{ccy}{anchor}"), RateInput::Dual(bridge)));
            }

            combined = FXRates::new(new_pairs, Some(settlement), base.clone())?;
            acc = Self::build_single(fx_curves.clone(), vec![combined.clone()], base.clone())?;
            history.push(item);
        }

        acc.fx_rates = history;
        Ok(acc)
    }

    /// The "single `FXRates` case" path of construction (spec step 3):
    /// install the currency map/order from `rates`, build `transform` over
    /// exactly the currencies `rates` spans, and compute `fx_rates_immediate`.
    fn build_single(
        fx_curves: HashMap<String, Arc<dyn Curve>>,
        fx_rates: Vec<FXRates>,
        base: Option<String>,
    ) -> Result<Self> {
        let rates = fx_rates[0].clone();
        let currencies = rates.currencies().clone();
        let q = currencies.len();

        let mut cells = Vec::new();
        for cash in 0..q {
            for coll in 0..q {
                let key = curve_key(
                    currencies.currency_at(cash).expect("in range"),
                    currencies.currency_at(coll).expect("in range"),
                );
                if fx_curves.contains_key(&key) {
                    cells.push((cash, coll));
                }
            }
        }
        let transform = Transform::build(q, cells)?;

        let mut immediate: Option<NaiveDate> = None;
        let mut terminal: Option<NaiveDate> = None;
        for curve in fx_curves.values() {
            let nodes = curve.node_dates();
            let first = *nodes.first().ok_or_else(|| {
                FxError::InvalidValue("curve has no node dates".to_string())
            })?;
            let last = *nodes.last().expect("non-empty checked above");
            match immediate {
                None => immediate = Some(first),
                Some(existing) if existing != first => {
                    return Err(FxError::HeterogeneousImmediateDates)
                }
                _ => {}
            }
            terminal = Some(match terminal {
                None => last,
                Some(existing) => existing.min(last),
            });
        }
        let immediate = immediate.ok_or_else(|| {
            FxError::InvalidValue("FXForwards requires at least one curve".to_string())
        })?;
        let terminal = terminal.expect("set alongside immediate");

        let settlement = rates.settlement().unwrap_or(immediate);
        let mut imm_pairs: Vec<(String, RateInput)> = Vec::new();
        for cash in 0..q {
            for coll in 0..q {
                if cash == coll || !transform.contains(cash, coll) {
                    continue;
                }
                let cash_ccy = currencies.currency_at(cash).expect("in range");
                let coll_ccy = currencies.currency_at(coll).expect("in range");
                let spot = rates.rate_by_currency(cash_ccy, coll_ccy)?;
                let v_coll = fx_curves[&curve_key(coll_ccy, coll_ccy)].at(settlement)?;
                let w_cashcoll = fx_curves[&curve_key(cash_ccy, coll_ccy)].at(settlement)?;
                let imm_rate = &(&spot * &v_coll) / &w_cashcoll;
                imm_pairs.push((format!("{cash_ccy}{coll_ccy}"), RateInput::Dual(imm_rate)));
            }
        }
        let imm0 = FXRates::new(imm_pairs, Some(immediate), base.clone())?;
        let fx_rates_immediate = imm0.restate(rates.pairs(), true)?;

        let base_ccy = match base {
            Some(b) => CurrencyCode::parse(&b)?,
            None => rates.base(),
        };

        Ok(FXForwards {
            fx_curves,
            fx_rates,
            currencies,
            transform,
            immediate,
            terminal,
            fx_rates_immediate,
            base: base_ccy,
        })
    }

    pub fn immediate(&self) -> NaiveDate {
        self.immediate
    }

    pub fn terminal(&self) -> NaiveDate {
        self.terminal
    }

    pub fn base(&self) -> CurrencyCode {
        self.base
    }

    pub fn fx_rates_immediate(&self) -> &FXRates {
        &self.fx_rates_immediate
    }

    pub fn currencies(&self) -> &CurrencyMap {
        &self.currencies
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// An exact clone with copied (not shared-mutating) internal state,
    /// distinct from `update` which mutates in place. Matches the original
    /// interface's `FXForwards.copy()`.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Cascades an AD order change to `fx_rates_immediate`, every
    /// constituent `FXRates`, and every uniquely-owned curve. A curve
    /// reached through a shared `Arc` with other live holders is left
    /// untouched rather than silently mutated out from under them (spec.md
    /// §9 design note: cascade explicitly, never misreport).
    pub fn set_ad_order(&mut self, order: AdOrder) {
        self.fx_rates_immediate.set_ad_order(order);
        for rates in &mut self.fx_rates {
            rates.set_ad_order(order);
        }
        for curve in self.fx_curves.values_mut() {
            if let Some(curve) = Arc::get_mut(curve) {
                curve.set_ad_order(order);
            }
        }
    }

    /// `rate(pair, settlement)` by currency index pair, used internally and
    /// by the public string-keyed [`FXForwards::rate`].
    fn rate_by_currency(
        &self,
        domestic: CurrencyCode,
        foreign: CurrencyCode,
        settlement: NaiveDate,
        path: Option<&[PathStep]>,
    ) -> Result<Dual> {
        if settlement < self.immediate {
            return Err(FxError::TemporalViolation);
        }
        if settlement == self.immediate {
            return self.fx_rates_immediate.rate_by_currency(domestic, foreign);
        }
        if self.fx_rates.len() == 1 {
            if let Some(s) = self.fx_rates[0].settlement() {
                if s == settlement {
                    return self.fx_rates[0].rate_by_currency(domestic, foreign);
                }
            }
        }

        let dom_idx = self.currencies.require_index(domestic)?;
        let for_idx = self.currencies.require_index(foreign)?;
        let steps = match path {
            Some(p) => p.to_vec(),
            None => self
                .transform
                .recursive_chain(for_idx, dom_idx)
                .ok_or_else(|| FxError::NoPath {
                    from: foreign.as_str().to_string(),
                    to: domestic.as_str().to_string(),
                })?,
        };

        let mut r = Dual::new(1.0);
        let mut current = for_idx;
        for step in steps {
            let idx = step.index;
            match step.axis {
                Axis::Col => {
                    let coll = current;
                    let cash = idx;
                    let coll_ccy = self.currencies.currency_at(coll).expect("in range");
                    let cash_ccy = self.currencies.currency_at(cash).expect("in range");
                    let w = self.fx_curves[&curve_key(cash_ccy, coll_ccy)].at(settlement)?;
                    let v = self.fx_curves[&curve_key(coll_ccy, coll_ccy)].at(settlement)?;
                    let imm = self.fx_rates_immediate.rate_by_currency(
                        self.currencies.currency_at(idx).expect("in range"),
                        self.currencies.currency_at(current).expect("in range"),
                    )?;
                    r = &(&(&r * &imm) * &w) / &v;
                }
                Axis::Row => {
                    let coll = idx;
                    let cash = current;
                    let coll_ccy = self.currencies.currency_at(coll).expect("in range");
                    let cash_ccy = self.currencies.currency_at(cash).expect("in range");
                    let v = self.fx_curves[&curve_key(coll_ccy, coll_ccy)].at(settlement)?;
                    let w = self.fx_curves[&curve_key(cash_ccy, coll_ccy)].at(settlement)?;
                    let imm = self.fx_rates_immediate.rate_by_currency(
                        self.currencies.currency_at(idx).expect("in range"),
                        self.currencies.currency_at(current).expect("in range"),
                    )?;
                    r = &(&(&r * &imm) * &v) / &w;
                }
            }
            current = idx;
        }
        Ok(r)
    }

    /// Forward rate for a 6-char `<dom><for>` pair at `settlement`
    /// (defaulting to [`FXForwards::immediate`]).
    pub fn rate(&self, pair: &str, settlement: Option<NaiveDate>) -> Result<Dual> {
        let (dom, for_) = split_pair(pair)?;
        let settlement = settlement.unwrap_or(self.immediate);
        self.rate_by_currency(dom, for_, settlement, None)
    }

    /// As [`FXForwards::rate`], but using a caller-supplied path instead of
    /// discovering one. The path should run from the foreign to the
    /// domestic currency index, as produced by [`Transform::recursive_chain`].
    pub fn rate_with_path(&self, pair: &str, settlement: NaiveDate, path: &[PathStep]) -> Result<Dual> {
        let (dom, for_) = split_pair(pair)?;
        self.rate_by_currency(dom, for_, settlement, Some(path))
    }

    /// Forward points in basis points: `(rate(t1) - rate(t0)) * 10000`.
    pub fn swap(&self, pair: &str, t0: NaiveDate, t1: NaiveDate) -> Result<Dual> {
        let r0 = self.rate(pair, Some(t0))?;
        let r1 = self.rate(pair, Some(t1))?;
        Ok(&(&r1 - &r0) * 10000.0)
    }

    /// `value * rate(domestic -> foreign, settlement)`, optionally further
    /// discounted from `settlement` to `value_date` via a cash/collateral
    /// curve.
    #[allow(clippy::too_many_arguments)]
    pub fn convert(
        &self,
        value: &Dual,
        domestic: &str,
        foreign: Option<&str>,
        settlement: Option<NaiveDate>,
        value_date: Option<NaiveDate>,
        collateral: Option<&str>,
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
        let settlement = settlement.unwrap_or(self.immediate);
        let value_date = value_date.unwrap_or(settlement);
        let fx_rate = self.rate_by_currency(dom, for_, settlement, None)?;
        if value_date == settlement {
            return Ok(Some(value * &fx_rate));
        }
        let collateral = match collateral {
            Some(c) => CurrencyCode::parse(c)?,
            None => dom,
        };
        let c = self.curve(for_, collateral);
        let at_settlement = c.at(settlement)?;
        let at_value_date = c.at(value_date)?;
        Ok(Some(&(value * &fx_rate) * &(&at_settlement / &at_value_date)))
    }

    /// Dot `positions` (indexed by [`CurrencyMap`] order) against
    /// `rate(_, base, settlement)`, summed; subtotals with absolute value
    /// above the configured tolerance are re-discounted to `immediate`.
    pub fn convert_positions(
        &self,
        positions: &[(NaiveDate, Vec<Dual>)],
        base: Option<&str>,
    ) -> Result<Dual> {
        let base_ccy = match base {
            Some(b) => CurrencyCode::parse(b)?,
            None => self.base,
        };
        let tolerance = crate::config::defaults().convert_positions_tolerance;
        let mut total = Dual::new(0.0);
        for (date, by_currency) in positions {
            let mut subtotal = Dual::new(0.0);
            for (idx, v) in by_currency.iter().enumerate() {
                let ccy = self.currencies.currency_at(idx).expect("in range");
                let rate = self.rate_by_currency(ccy, base_ccy, *date, None)?;
                subtotal = &subtotal + &(v * &rate);
            }
            if subtotal.value().abs() > tolerance {
                let discounted = self
                    .convert(
                        &subtotal,
                        base_ccy.as_str(),
                        Some(base_ccy.as_str()),
                        Some(*date),
                        Some(self.immediate),
                        None,
                        OnError::Raise,
                    )?
                    .expect("same-currency convert never returns None");
                total = &total + &discounted;
            } else {
                total = &total + &subtotal;
            }
        }
        Ok(total)
    }

    /// Per-settlement-date decomposition of `value_in_base` across every
    /// `FXRates` in the framework whose currency set contains the pair named
    /// by each gradient entry.
    pub fn positions(&self, value_in_base: &Dual, base: Option<&str>) -> Result<Vec<(NaiveDate, Vec<Dual>)>> {
        let base_ccy = match base {
            Some(b) => CurrencyCode::parse(b)?,
            None => self.base,
        };
        let mut by_settlement: Vec<(NaiveDate, Vec<Dual>)> = self
            .fx_rates
            .iter()
            .map(|r| (r.settlement().unwrap_or(self.immediate), vec![Dual::new(0.0); self.currencies.len()]))
            .collect();
        if by_settlement.is_empty() {
            by_settlement.push((self.immediate, vec![Dual::new(0.0); self.currencies.len()]));
        }
        let base_idx = self.currencies.require_index(base_ccy)?;
        by_settlement[0].1[base_idx] = &by_settlement[0].1[base_idx] + &Dual::new(value_in_base.value());

        for var in value_in_base.vars() {
            let Some(pair) = var.strip_prefix("fx_") else {
                continue;
            };
            let Ok((dom, for_)) = split_pair(pair) else {
                continue;
            };
            let delta = value_in_base.gradient(&var);
            if delta == 0.0 {
                continue;
            }
            for (i, rates) in self.fx_rates.iter().enumerate() {
                if rates.currencies().index_of(dom).is_none() || rates.currencies().index_of(for_).is_none() {
                    continue;
                }
                let contribution = rates.positions(&Dual::scaled_variable(0.0, &var, delta), Some(base_ccy.as_str()))?;
                for (local_idx, v) in contribution.into_iter().enumerate() {
                    let Some(ccy) = rates.currencies().currency_at(local_idx) else {
                        continue;
                    };
                    let Some(global_idx) = self.currencies.index_of(ccy) else {
                        continue;
                    };
                    by_settlement[i].1[global_idx] = &by_settlement[i].1[global_idx] + &v;
                }
            }
        }
        Ok(by_settlement)
    }

    /// The discount-factor curve for `cash` collateralised in `coll`: the
    /// stored curve if one was supplied, else a lazily synthesized
    /// [`ProxyCurve`] borrowed from `self` (a `ProxyCurve` holds a reference
    /// into its parent, so the returned trait object cannot outlive it).
    pub fn curve(&self, cash: CurrencyCode, coll: CurrencyCode) -> Arc<dyn Curve + '_> {
        let key = curve_key(cash, coll);
        if let Some(curve) = self.fx_curves.get(&key) {
            return curve.clone();
        }
        Arc::new(ProxyCurve::new(self, cash, coll).expect("cash/coll reachable by construction"))
    }

    /// Replace the curve set and/or spot rates in place, preserving object
    /// identity for downstream holders (e.g. a previously constructed
    /// `ProxyCurve`, which must be treated as invalidated by contract).
    pub fn update(
        &mut self,
        fx_curves: Option<HashMap<String, Arc<dyn Curve>>>,
        fx_rates: Option<Vec<FXRates>>,
    ) -> Result<()> {
        let next_curves = fx_curves.unwrap_or_else(|| self.fx_curves.clone());
        let next_rates = fx_rates.unwrap_or_else(|| self.fx_rates.clone());
        let base = Some(self.base.as_str().to_string());
        let rebuilt = FXForwards::new(next_curves, next_rates, base)?;
        *self = rebuilt;
        Ok(())
    }

    /// Serializes `base`, every constituent `FXRates` (via its own
    /// `to_json`), and each curve's own `to_json` keyed by `cash_coll`, per
    /// spec §6.
    pub fn to_json(&self) -> Result<String> {
        let fx_rates_value = if self.fx_rates.len() == 1 {
            serde_json::from_str::<serde_json::Value>(&self.fx_rates[0].to_json()?)?
        } else {
            let arr = self
                .fx_rates
                .iter()
                .map(|r| r.to_json().and_then(|s| Ok(serde_json::from_str(&s)?)))
                .collect::<Result<Vec<serde_json::Value>>>()?;
            serde_json::Value::Array(arr)
        };

        let mut curves = serde_json::Map::new();
        for (key, curve) in &self.fx_curves {
            curves.insert(key.clone(), serde_json::from_str(&curve.to_json()?)?);
        }

        let doc = serde_json::json!({
            "base": self.base.as_str(),
            "fx_rates": fx_rates_value,
            "fx_curves": serde_json::Value::Object(curves),
        });
        Ok(serde_json::to_string(&doc)?)
    }

    /// Rebuilds an `FXForwards` from the `base`/`fx_rates` fields of `json`.
    /// Curves are external collaborators this crate does not own the
    /// deserialization of (spec §1 Out of scope); `fx_curves` is therefore
    /// supplied live by the caller rather than reconstructed from the
    /// opaque `curve-json` values `to_json` emits (see DESIGN.md).
    pub fn from_json(json: &str, fx_curves: HashMap<String, Arc<dyn Curve>>) -> Result<Self> {
        #[derive(serde::Deserialize)]
        struct Doc {
            base: String,
            fx_rates: serde_json::Value,
        }
        let doc: Doc = serde_json::from_str(json)?;
        let fx_rates = match doc.fx_rates {
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(|v| FXRates::from_json(&v.to_string()))
                .collect::<Result<Vec<_>>>()?,
            other => vec![FXRates::from_json(&other.to_string())?],
        };
        FXForwards::new(fx_curves, fx_rates, Some(doc.base))
    }
}

impl PartialEq for FXForwards {
    /// Same base, identical `fx_rates_immediate`, and the same set of curve
    /// keys (spec.md §8 property #10, resolved per SPEC_FULL §3).
    fn eq(&self, other: &Self) -> bool {
        let mut a: Vec<&String> = self.fx_curves.keys().collect();
        let mut b: Vec<&String> = other.fx_curves.keys().collect();
        a.sort();
        b.sort();
        self.base == other.base && self.fx_rates_immediate == other.fx_rates_immediate && a == b
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curves::DiscountCurve;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn flat_curve(level: f64) -> Arc<dyn Curve> {
        Arc::new(
            DiscountCurve::new(
                vec![(d(2022, 1, 1), Dual::new(1.0)), (d(2023, 1, 1), Dual::new(level))],
                "act365",
                "none",
                "all",
            )
            .unwrap(),
        )
    }

    #[test]
    fn no_curve_basis_forward_equals_spot() {
        let mut curves: HashMap<String, Arc<dyn Curve>> = HashMap::new();
        curves.insert("usdusd".to_string(), flat_curve(0.95));
        curves.insert("eureur".to_string(), flat_curve(0.95));
        curves.insert("eurusd".to_string(), flat_curve(0.95));

        let fxr = FXRates::new(
            vec![("eurusd".to_string(), RateInput::Real(1.1))],
            Some(d(2022, 1, 1)),
            None,
        )
        .unwrap();
        let fwd = FXForwards::new(curves, vec![fxr], None).unwrap();

        let future = fwd.rate("eurusd", Some(d(2022, 7, 1))).unwrap();
        assert!((future.value() - 1.1).abs() < 1e-9);
    }

    #[test]
    fn swap_is_zero_under_identical_curves() {
        let mut curves: HashMap<String, Arc<dyn Curve>> = HashMap::new();
        curves.insert("usdusd".to_string(), flat_curve(0.9));
        curves.insert("eureur".to_string(), flat_curve(0.9));
        curves.insert("eurusd".to_string(), flat_curve(0.9));

        let fxr = FXRates::new(
            vec![("eurusd".to_string(), RateInput::Real(1.1))],
            Some(d(2022, 1, 1)),
            None,
        )
        .unwrap();
        let fwd = FXForwards::new(curves, vec![fxr], None).unwrap();
        let swap = fwd.swap("eurusd", d(2022, 1, 1), d(2022, 1, 1)).unwrap();
        assert!(swap.value().abs() < 1e-9);
    }

    #[test]
    fn swap_sign_matches_curve_ratio_under_diverging_curves() {
        let mut curves: HashMap<String, Arc<dyn Curve>> = HashMap::new();
        curves.insert("usdusd".to_string(), flat_curve(0.95));
        curves.insert("eureur".to_string(), flat_curve(0.90));
        curves.insert("eurusd".to_string(), flat_curve(0.90));

        let fxr = FXRates::new(
            vec![("eurusd".to_string(), RateInput::Real(1.1))],
            Some(d(2022, 1, 1)),
            None,
        )
        .unwrap();
        let fwd = FXForwards::new(curves, vec![fxr], None).unwrap();
        let swap = fwd.swap("eurusd", d(2022, 1, 1), d(2022, 7, 1)).unwrap();
        assert!(swap.value() > 0.0);
    }

    #[test]
    fn rate_immediate_matches_fx_rates_immediate() {
        let mut curves: HashMap<String, Arc<dyn Curve>> = HashMap::new();
        curves.insert("usdusd".to_string(), flat_curve(0.95));
        curves.insert("eureur".to_string(), flat_curve(0.9));
        curves.insert("eurusd".to_string(), flat_curve(0.9));

        let fxr = FXRates::new(
            vec![("eurusd".to_string(), RateInput::Real(1.1))],
            Some(d(2022, 1, 1)),
            None,
        )
        .unwrap();
        let fwd = FXForwards::new(curves, vec![fxr], None).unwrap();
        let via_rate = fwd.rate("eurusd", Some(d(2022, 1, 1))).unwrap();
        let via_immediate = fwd.fx_rates_immediate().rate("eurusd").unwrap();
        assert!((via_rate.value() - via_immediate.value()).abs() < 1e-12);
    }

    #[test]
    fn chained_path_through_intermediate_currency() {
        // usd, eur, gbp: usdusd, eureur, gbpgbp, usdeur, eurgbp curves.
        // eurusd spot only; gbpusd must be chained eur->usd->... via gbp-eur.
        let mut curves: HashMap<String, Arc<dyn Curve>> = HashMap::new();
        curves.insert("usdusd".to_string(), flat_curve(0.95));
        curves.insert("eureur".to_string(), flat_curve(0.93));
        curves.insert("gbpgbp".to_string(), flat_curve(0.92));
        curves.insert("usdeur".to_string(), flat_curve(0.94));
        curves.insert("eurgbp".to_string(), flat_curve(0.91));

        let fxr = FXRates::new(
            vec![
                ("eurusd".to_string(), RateInput::Real(1.1)),
                ("gbpusd".to_string(), RateInput::Real(1.25)),
            ],
            Some(d(2022, 1, 1)),
            None,
        )
        .unwrap();
        let fwd = FXForwards::new(curves, vec![fxr], None).unwrap();
        let future = fwd.rate("gbpusd", Some(d(2022, 7, 1))).unwrap();
        assert!(future.value() > 0.0);
        assert!(future.gradient("fx_gbpusd") != 0.0);
    }

    #[test]
    fn json_round_trips_given_the_same_curves() {
        let mut curves: HashMap<String, Arc<dyn Curve>> = HashMap::new();
        curves.insert("usdusd".to_string(), flat_curve(0.95));
        curves.insert("eureur".to_string(), flat_curve(0.9));
        curves.insert("eurusd".to_string(), flat_curve(0.9));

        let fxr = FXRates::new(
            vec![("eurusd".to_string(), RateInput::Real(1.1))],
            Some(d(2022, 1, 1)),
            None,
        )
        .unwrap();
        let fwd = FXForwards::new(curves.clone(), vec![fxr], None).unwrap();
        let json = fwd.to_json().unwrap();
        let back = FXForwards::from_json(&json, curves).unwrap();
        assert_eq!(fwd, back);
    }

    #[test]
    fn convert_same_currency_round_trip_is_identity() {
        let mut curves: HashMap<String, Arc<dyn Curve>> = HashMap::new();
        curves.insert("usdusd".to_string(), flat_curve(0.95));
        curves.insert("eureur".to_string(), flat_curve(0.9));
        curves.insert("eurusd".to_string(), flat_curve(0.9));

        let fxr = FXRates::new(
            vec![("eurusd".to_string(), RateInput::Real(1.1))],
            Some(d(2022, 1, 1)),
            None,
        )
        .unwrap();
        let fwd = FXForwards::new(curves, vec![fxr], Some("usd".to_string())).unwrap();
        let v = Dual::new(100.0);
        let out = fwd
            .convert(&v, "usd", Some("usd"), None, None, None, OnError::Raise)
            .unwrap()
            .unwrap();
        assert!((out.value() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn proxy_curve_derives_df_for_uncovered_collateral_pair() {
        let mut curves: HashMap<String, Arc<dyn Curve>> = HashMap::new();
        curves.insert("usdusd".to_string(), flat_curve(0.95));
        curves.insert("eureur".to_string(), flat_curve(0.9));
        curves.insert("eurusd".to_string(), flat_curve(0.9));

        let fxr = FXRates::new(
            vec![("eurusd".to_string(), RateInput::Real(1.1))],
            Some(d(2022, 1, 1)),
            None,
        )
        .unwrap();
        let fwd = FXForwards::new(curves, vec![fxr], None).unwrap();
        // usdeur isn't in fx_curves; curve() must synthesize a ProxyCurve.
        let proxy = fwd.curve(CurrencyCode::parse("usd").unwrap(), CurrencyCode::parse("eur").unwrap());
        let df = proxy.at(d(2022, 1, 1)).unwrap();
        assert!((df.value() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn multi_settlement_fold_bridges_currencies() {
        // fxr1 @ 2022-01-03: eurusd=1.05; fxr2 @ 2022-01-02: usdcad=1.1.
        let mut curves: HashMap<String, Arc<dyn Curve>> = HashMap::new();
        curves.insert("usdusd".to_string(), flat_curve(0.98));
        curves.insert("eureur".to_string(), flat_curve(0.97));
        curves.insert("cadcad".to_string(), flat_curve(0.96));
        curves.insert("usdeur".to_string(), flat_curve(0.97));
        curves.insert("cadusd".to_string(), flat_curve(0.96));

        let fxr1 = FXRates::new(
            vec![("eurusd".to_string(), RateInput::Real(1.05))],
            Some(d(2022, 1, 3)),
            None,
        )
        .unwrap();
        let fxr2 = FXRates::new(
            vec![("usdcad".to_string(), RateInput::Real(1.1))],
            Some(d(2022, 1, 2)),
            None,
        )
        .unwrap();

        let fwd = FXForwards::new(curves, vec![fxr1, fxr2], None).unwrap();
        let eurcad = fwd.rate("eurcad", Some(d(2022, 1, 3))).unwrap();
        assert!(eurcad.value() > 0.0);
        assert!(eurcad.gradient("fx_eurusd") != 0.0);
        assert!(eurcad.gradient("fx_usdcad") != 0.0);
    }
}
