//! # rustfx
//!
//! A multi-currency FX pricing core: spot FX cross rates, forward FX rates,
//! and FX-derived discount factor curves, all carrying forward-mode
//! automatic-differentiation sensitivities with respect to the market input
//! FX rates through every computation, including matrix inversion.
//!
//! Three subsystems do the work:
//! - [`math::dual`] — dual-number arithmetic and a dual-valued linear solver.
//! - [`rates::FXRates`] — solves a sparse linear system over independent
//!   currency pairs into a full cross-rate table.
//! - [`rates::FXForwards`] — chains per-currency/per-collateral discount
//!   curves along a path discovered through a cash/collateral reachability
//!   graph to price forward FX rates at any future date.
//!
//! Tenor/calendar arithmetic, curve calibration, and curve interpolation
//! implementations are out of scope: only the [`curves::Curve`] evaluation
//! contract is consumed (see module docs).

pub mod config;
pub mod currencies;
pub mod curves;
pub mod errors;
pub mod math;
pub mod rates;

pub mod prelude;
