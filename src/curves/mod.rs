//! The discount-factor curve contract consumed by the forwards engine, a
//! concrete log-linear fixture implementation, and the lazy proxy curve
//! synthesized from an [`crate::rates::FXForwards`].

mod discount;
mod proxy;
mod traits;

pub use discount::DiscountCurve;
pub use proxy::ProxyCurve;
pub use traits::Curve;
