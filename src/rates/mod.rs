//! The FX rates solver and the FX forwards engine built on top of it, plus
//! the cash/collateral transformation matrix and path search that chains
//! discount curves between currencies.

mod fxforwards;
mod fxrates;
mod transform;

pub use fxforwards::FXForwards;
pub use fxrates::{FXRates, RateInput};
pub use transform::{Axis, PathStep, Transform};
