use chrono::NaiveDate;

use crate::errors::Result;
use crate::math::dual::{AdOrder, Dual};

/// # Curve
/// The discount-factor curve contract the FX forwards engine consumes. This
/// crate does not implement curve calibration or interpolation itself (out
/// of scope); `Curve` is the seam a caller's own curve implementation plugs
/// into.
///
/// `at(date)` must return `1.0` (as a constant or AD-tagged dual, depending
/// on the implementation) when `date` equals the curve's first node date.
pub trait Curve: Send + Sync {
    /// Discount factor at `date`.
    fn at(&self, date: NaiveDate) -> Result<Dual>;

    /// Node dates; the first is the curve's initial ("immediate") date, the
    /// last is its terminal date.
    fn node_dates(&self) -> &[NaiveDate];

    fn convention(&self) -> &str;
    fn modifier(&self) -> &str;
    fn calendar(&self) -> &str;

    fn to_json(&self) -> Result<String>;

    /// Cascade an AD order change to this curve's own dual-valued state.
    fn set_ad_order(&mut self, order: AdOrder);
}
