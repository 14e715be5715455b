#[allow(ambiguous_glob_reexports)]
pub use crate::{
    config::*,
    currencies::*,
    curves::*,
    errors::*,
    math::dual::*,
    rates::*,
};
