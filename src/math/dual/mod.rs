//! Forward-mode dual number arithmetic and a dual-valued linear solver.
//!
//! A [`Dual`] carries a real value together with its gradient (and,
//! optionally, its Hessian) with respect to a set of named AD variables.
//! [`dual_solve`] performs the matrix inversion needed by
//! [`crate::rates::fxrates::FXRates`] directly in the dual field, so
//! sensitivities of every cross rate to every input FX pair fall out of the
//! same elimination that produces the rates themselves.

mod number;
mod ops;
mod solve;
mod vars;

pub use number::{set_order, AdOrder, Dual};
pub use solve::dual_solve;
pub use vars::fx_var_name;
