use chrono::NaiveDate;

use crate::errors::{FxError, Result};
use crate::math::dual::{set_order, AdOrder, Dual};

use super::traits::Curve;

/// # DiscountCurve
/// A log-linear-interpolated discount-factor curve over a fixed set of node
/// dates, each carrying a [`Dual`] value so that sensitivities of calibrated
/// node levels flow through `at()` like any other dual computation.
///
/// This is a concrete, minimal `Curve` implementation: calibration to market
/// instruments is out of scope, so nodes are supplied directly. It exists so
/// the forwards engine has something real to chain through in tests and so
/// library consumers have a usable default.
#[derive(Clone)]
pub struct DiscountCurve {
    node_dates: Vec<NaiveDate>,
    node_values: Vec<Dual>,
    convention: String,
    modifier: String,
    calendar: String,
}

impl DiscountCurve {
    /// `nodes` must be sorted ascending by date, non-empty, and its first
    /// discount factor should be `1.0` at the curve's initial date (not
    /// enforced here; callers construct curves that already satisfy it).
    pub fn new(
        nodes: Vec<(NaiveDate, Dual)>,
        convention: impl Into<String>,
        modifier: impl Into<String>,
        calendar: impl Into<String>,
    ) -> Result<Self> {
        if nodes.is_empty() {
            return Err(FxError::InvalidValue(
                "DiscountCurve requires at least one node".to_string(),
            ));
        }
        for w in nodes.windows(2) {
            if w[0].0 >= w[1].0 {
                return Err(FxError::InvalidValue(
                    "DiscountCurve node dates must be strictly increasing".to_string(),
                ));
            }
        }
        let (node_dates, node_values) = nodes.into_iter().unzip();
        Ok(DiscountCurve {
            node_dates,
            node_values,
            convention: convention.into(),
            modifier: modifier.into(),
            calendar: calendar.into(),
        })
    }

    fn year_fraction(&self, from: NaiveDate, to: NaiveDate) -> f64 {
        (to - from).num_days() as f64 / 365.0
    }
}

impl Curve for DiscountCurve {
    fn at(&self, date: NaiveDate) -> Result<Dual> {
        let first = self.node_dates[0];
        let last = *self.node_dates.last().expect("validated non-empty");
        if date < first || date > last {
            return Err(FxError::InvalidValue(format!(
                "date {date} is outside curve node range [{first}, {last}]"
            )));
        }
        if let Ok(idx) = self.node_dates.binary_search(&date) {
            return Ok(self.node_values[idx].clone());
        }
        let upper = self
            .node_dates
            .iter()
            .position(|&d| d > date)
            .expect("date is within range and not an exact node");
        let lower = upper - 1;

        let x0 = 0.0;
        let x1 = self.year_fraction(self.node_dates[lower], self.node_dates[upper]);
        let x = self.year_fraction(self.node_dates[lower], date);

        let base = &self.node_values[upper] / &self.node_values[lower];
        let exponent = x / x1.max(f64::EPSILON) + x0;
        Ok(&self.node_values[lower] * &base.powf(exponent))
    }

    fn node_dates(&self) -> &[NaiveDate] {
        &self.node_dates
    }

    fn convention(&self) -> &str {
        &self.convention
    }

    fn modifier(&self) -> &str {
        &self.modifier
    }

    fn calendar(&self) -> &str {
        &self.calendar
    }

    fn to_json(&self) -> Result<String> {
        let nodes: Vec<(String, f64)> = self
            .node_dates
            .iter()
            .zip(self.node_values.iter())
            .map(|(d, v)| (d.format("%Y-%m-%d").to_string(), v.value()))
            .collect();
        serde_json::to_string(&nodes).map_err(FxError::from)
    }

    fn set_ad_order(&mut self, order: AdOrder) {
        for v in &mut self.node_values {
            *v = set_order(v, order);
        }
    }
}
