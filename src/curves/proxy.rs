use chrono::NaiveDate;

use crate::currencies::CurrencyCode;
use crate::errors::{FxError, Result};
use crate::math::dual::{AdOrder, Dual};
use crate::rates::FXForwards;

use super::traits::Curve;

/// # ProxyCurve
/// A discount-factor curve synthesized lazily from an [`FXForwards`]: rather
/// than storing its own node values, every lookup re-derives a DF from the
/// forward FX rate between `cash` and `coll` and `coll`'s own local curve.
///
/// Borrows its parent for its lifetime, which is also how this crate avoids
/// the cyclic-ownership problem a `ProxyCurve` would otherwise pose (it is
/// never inserted back into the parent's `fx_curves`, and the borrow checker
/// rejects any attempt to call `FXForwards::update` while a `ProxyCurve`
/// borrowed from it is still alive).
pub struct ProxyCurve<'a> {
    forwards: &'a FXForwards,
    cash: CurrencyCode,
    coll: CurrencyCode,
    path: Vec<crate::rates::PathStep>,
    node_dates: [NaiveDate; 2],
    convention: String,
    modifier: String,
    calendar: String,
}

impl<'a> ProxyCurve<'a> {
    pub fn new(forwards: &'a FXForwards, cash: CurrencyCode, coll: CurrencyCode) -> Result<Self> {
        let cash_idx = forwards.currencies().require_index(cash)?;
        let coll_idx = forwards.currencies().require_index(coll)?;
        let path = forwards
            .transform()
            .recursive_chain(coll_idx, cash_idx)
            .ok_or_else(|| FxError::NoPath {
                from: coll.as_str().to_string(),
                to: cash.as_str().to_string(),
            })?;

        let local = forwards.curve(cash, cash);
        Ok(ProxyCurve {
            forwards,
            cash,
            coll,
            path,
            node_dates: [forwards.immediate(), forwards.terminal()],
            convention: local.convention().to_string(),
            modifier: local.modifier().to_string(),
            calendar: local.calendar().to_string(),
        })
    }
}

impl<'a> Curve for ProxyCurve<'a> {
    fn at(&self, date: NaiveDate) -> Result<Dual> {
        let pair = format!("{}{}", self.cash, self.coll);
        let forward = self.forwards.rate_with_path(&pair, date, &self.path)?;
        let immediate = self
            .forwards
            .fx_rates_immediate()
            .rate_by_currency(self.cash, self.coll)?;
        let local = self.forwards.curve(self.coll, self.coll).at(date)?;
        Ok(&(&forward / &immediate) * &local)
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
        Err(FxError::Unsupported(
            "ProxyCurve has no independent serialized form; serialize its parent FXForwards instead"
                .to_string(),
        ))
    }

    /// ProxyCurve carries no AD state of its own — it defers entirely to its
    /// parent `FXForwards` and the curves that parent owns — so an AD order
    /// change here is a deliberate no-op rather than a silent
    /// misrepresentation of sensitivity order.
    fn set_ad_order(&mut self, _order: AdOrder) {}
}
