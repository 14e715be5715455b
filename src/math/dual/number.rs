use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

use super::vars::{intern, VarId};

/// # AdOrder
/// The order of automatic differentiation a [`Dual`] carries: a plain real
/// (`Zero`), a value with a gradient (`One`), or a value with a gradient and
/// a Hessian (`Two`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AdOrder {
    Zero,
    One,
    Two,
}

/// # Dual
/// A scalar carried together with its gradient (and, at `AdOrder::Two`, its
/// Hessian) with respect to a set of named AD variables.
///
/// Gradient and Hessian entries for variables absent from a particular
/// `Dual` are implicitly zero (spec invariant): two duals built from
/// disjoint variable sets combine by taking the union of their variables.
/// `Dual` serializes to its real value only — sensitivities never cross a
/// JSON boundary.
#[derive(Debug, Clone)]
pub struct Dual {
    value: f64,
    grad: BTreeMap<VarId, f64>,
    hess: Option<BTreeMap<(VarId, VarId), f64>>,
}

impl Dual {
    /// A constant dual at AD order zero: no gradient, no Hessian.
    pub fn new(value: f64) -> Self {
        Dual {
            value,
            grad: BTreeMap::new(),
            hess: None,
        }
    }

    /// A first-order AD variable: `value` with unit gradient on its own
    /// name. `fx_<pair>` variables throughout this crate are created this
    /// way so that `gradient(self_name) == 1` holds by construction.
    pub fn variable(value: f64, name: &str) -> Self {
        let id = intern(name);
        let mut grad = BTreeMap::new();
        grad.insert(id, 1.0);
        Dual {
            value,
            grad,
            hess: None,
        }
    }

    /// A first-order AD variable with an explicit (possibly non-unit)
    /// gradient on its own name. Useful for constructing a dual that
    /// represents "a quantity with a known sensitivity to `name`" without
    /// that quantity literally being `name` itself.
    pub fn scaled_variable(value: f64, name: &str, gradient: f64) -> Self {
        let id = intern(name);
        let mut grad = BTreeMap::new();
        if gradient != 0.0 {
            grad.insert(id, gradient);
        }
        Dual {
            value,
            grad,
            hess: None,
        }
    }

    /// A second-order AD variable: as [`Dual::variable`] but with a
    /// (zero, since `d^2 x/dx^2 == 0` for an independent variable) Hessian
    /// allocated so that `order()` reports `AdOrder::Two`.
    pub fn variable2(value: f64, name: &str) -> Self {
        let mut d = Self::variable(value, name);
        d.hess = Some(BTreeMap::new());
        d
    }

    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn order(&self) -> AdOrder {
        if self.hess.is_some() {
            AdOrder::Two
        } else if self.grad.is_empty() {
            AdOrder::Zero
        } else {
            AdOrder::One
        }
    }

    /// Gradient with respect to the named variable (zero if absent).
    pub fn gradient(&self, name: &str) -> f64 {
        let id = intern(name);
        self.grad.get(&id).copied().unwrap_or(0.0)
    }

    /// Second derivative with respect to the (possibly equal) named pair of
    /// variables, or zero if absent or if this dual is not order-2.
    pub fn hessian(&self, a: &str, b: &str) -> f64 {
        let Some(hess) = &self.hess else {
            return 0.0;
        };
        let key = Self::hess_key(intern(a), intern(b));
        hess.get(&key).copied().unwrap_or(0.0)
    }

    /// Names of every variable this dual carries a nonzero gradient entry
    /// for, in ascending interning order (deterministic, not insertion
    /// order of the arithmetic that produced the dual).
    pub fn vars(&self) -> Vec<String> {
        self.grad.keys().map(|id| super::vars::name_of(*id)).collect()
    }

    pub(crate) fn grad_map(&self) -> &BTreeMap<VarId, f64> {
        &self.grad
    }

    pub(crate) fn hess_map(&self) -> Option<&BTreeMap<(VarId, VarId), f64>> {
        self.hess.as_ref()
    }

    pub(crate) fn hess_key(a: VarId, b: VarId) -> (VarId, VarId) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    pub(crate) fn from_parts(
        value: f64,
        grad: BTreeMap<VarId, f64>,
        hess: Option<BTreeMap<(VarId, VarId), f64>>,
    ) -> Self {
        Dual { value, grad, hess }
    }
}

/// Lift a plain `f64` to a `Dual` at the requested AD order, or project/
/// extend an existing `Dual`. Projecting to `AdOrder::Zero` drops all
/// sensitivities; extending `AdOrder::One` to `AdOrder::Two` allocates an
/// empty Hessian (the gradient itself carries no information about second
/// derivatives that were never recorded).
pub fn set_order(x: &Dual, order: AdOrder) -> Dual {
    match order {
        AdOrder::Zero => Dual::new(x.value),
        AdOrder::One => Dual::from_parts(x.value, x.grad.clone(), None),
        AdOrder::Two => Dual::from_parts(
            x.value,
            x.grad.clone(),
            Some(x.hess.clone().unwrap_or_default()),
        ),
    }
}

impl From<f64> for Dual {
    fn from(value: f64) -> Self {
        Dual::new(value)
    }
}

impl PartialEq for Dual {
    /// Duals compare equal on their real part only, matching the original
    /// source's `Dual.__eq__` (and `float(dual) == float(dual)` use sites
    /// throughout `rateslib.fx`).
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl PartialOrd for Dual {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.value.partial_cmp(&other.value)
    }
}

impl fmt::Display for Dual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl Serialize for Dual {
    /// Collapses to the real value only (spec §3 invariant).
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_has_no_gradient() {
        let c = Dual::new(3.0);
        assert_eq!(c.order(), AdOrder::Zero);
        assert_eq!(c.gradient("fx_eurusd"), 0.0);
    }

    #[test]
    fn variable_has_unit_self_gradient() {
        let v = Dual::variable(1.1, "fx_eurusd");
        assert_eq!(v.order(), AdOrder::One);
        assert_eq!(v.gradient("fx_eurusd"), 1.0);
        assert_eq!(v.gradient("fx_gbpusd"), 0.0);
    }

    #[test]
    fn set_order_projects_down_and_extends_up() {
        let v = Dual::variable(1.1, "fx_eurusd");
        let projected = set_order(&v, AdOrder::Zero);
        assert_eq!(projected.order(), AdOrder::Zero);
        assert_eq!(projected.value(), 1.1);

        let extended = set_order(&v, AdOrder::Two);
        assert_eq!(extended.order(), AdOrder::Two);
        assert_eq!(extended.gradient("fx_eurusd"), 1.0);
        assert_eq!(extended.hessian("fx_eurusd", "fx_eurusd"), 0.0);
    }
}
