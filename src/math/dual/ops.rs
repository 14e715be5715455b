use std::collections::{BTreeMap, BTreeSet};
use std::ops::{Add, Div, Mul, Neg, Sub};

use super::number::Dual;
use super::vars::VarId;

/// Combine two duals through a binary primitive `f(a, b)`, given its partial
/// derivatives at the evaluated point. Variables absent from either operand
/// contribute zero (spec invariant); the result's variable set is the union
/// of the operands'. A Hessian is only computed (and only then non-`None`)
/// if at least one operand already carries one, matching the spec's "no
/// second-order cross-partials ... if only first-order AD is requested".
fn combine_binary(a: &Dual, b: &Dual, value: f64, da: f64, db: f64, daa: f64, dbb: f64, dab: f64) -> Dual {
    let mut vars: BTreeSet<VarId> = BTreeSet::new();
    vars.extend(a.grad_map().keys().copied());
    vars.extend(b.grad_map().keys().copied());

    let mut grad = BTreeMap::new();
    for &v in &vars {
        let ga = a.grad_map().get(&v).copied().unwrap_or(0.0);
        let gb = b.grad_map().get(&v).copied().unwrap_or(0.0);
        let g = da * ga + db * gb;
        if g != 0.0 {
            grad.insert(v, g);
        }
    }

    let hess = if a.hess_map().is_some() || b.hess_map().is_some() {
        let var_list: Vec<VarId> = vars.into_iter().collect();
        let mut h = BTreeMap::new();
        for (i, &u) in var_list.iter().enumerate() {
            for &w in &var_list[i..] {
                let hau = a
                    .hess_map()
                    .and_then(|m| m.get(&Dual::hess_key(u, w)))
                    .copied()
                    .unwrap_or(0.0);
                let hbu = b
                    .hess_map()
                    .and_then(|m| m.get(&Dual::hess_key(u, w)))
                    .copied()
                    .unwrap_or(0.0);
                let gau = a.grad_map().get(&u).copied().unwrap_or(0.0);
                let gaw = a.grad_map().get(&w).copied().unwrap_or(0.0);
                let gbu = b.grad_map().get(&u).copied().unwrap_or(0.0);
                let gbw = b.grad_map().get(&w).copied().unwrap_or(0.0);
                let val =
                    da * hau + db * hbu + daa * gau * gaw + dbb * gbu * gbw + dab * (gau * gbw + gaw * gbu);
                if val != 0.0 {
                    h.insert(Dual::hess_key(u, w), val);
                }
            }
        }
        Some(h)
    } else {
        None
    };

    Dual::from_parts(value, grad, hess)
}

/// As [`combine_binary`], but for a unary primitive `f(a)`.
fn combine_unary(a: &Dual, value: f64, da: f64, daa: f64) -> Dual {
    let grad: BTreeMap<VarId, f64> = a
        .grad_map()
        .iter()
        .map(|(&v, &g)| (v, da * g))
        .filter(|(_, g)| *g != 0.0)
        .collect();

    let hess = a.hess_map().map(|hess_a| {
        let vars: Vec<VarId> = a.grad_map().keys().copied().collect();
        let mut h = BTreeMap::new();
        for (i, &u) in vars.iter().enumerate() {
            for &w in &vars[i..] {
                let hau = hess_a.get(&Dual::hess_key(u, w)).copied().unwrap_or(0.0);
                let gau = a.grad_map().get(&u).copied().unwrap_or(0.0);
                let gaw = a.grad_map().get(&w).copied().unwrap_or(0.0);
                let val = da * hau + daa * gau * gaw;
                if val != 0.0 {
                    h.insert(Dual::hess_key(u, w), val);
                }
            }
        }
        h
    });

    Dual::from_parts(value, grad, hess)
}

impl Add for &Dual {
    type Output = Dual;
    fn add(self, rhs: &Dual) -> Dual {
        combine_binary(self, rhs, self.value() + rhs.value(), 1.0, 1.0, 0.0, 0.0, 0.0)
    }
}

impl Sub for &Dual {
    type Output = Dual;
    fn sub(self, rhs: &Dual) -> Dual {
        combine_binary(self, rhs, self.value() - rhs.value(), 1.0, -1.0, 0.0, 0.0, 0.0)
    }
}

impl Mul for &Dual {
    type Output = Dual;
    fn mul(self, rhs: &Dual) -> Dual {
        combine_binary(self, rhs, self.value() * rhs.value(), rhs.value(), self.value(), 0.0, 0.0, 1.0)
    }
}

impl Div for &Dual {
    type Output = Dual;
    fn div(self, rhs: &Dual) -> Dual {
        let b = rhs.value();
        combine_binary(
            self,
            rhs,
            self.value() / b,
            1.0 / b,
            -self.value() / (b * b),
            0.0,
            2.0 * self.value() / (b * b * b),
            -1.0 / (b * b),
        )
    }
}

impl Neg for &Dual {
    type Output = Dual;
    fn neg(self) -> Dual {
        combine_unary(self, -self.value(), -1.0, 0.0)
    }
}

impl Dual {
    /// Raise the dual to a real-valued power, propagating first and (if
    /// present) second derivatives: `d/dx x^k = k x^(k-1)`,
    /// `d^2/dx^2 x^k = k(k-1) x^(k-2)`.
    pub fn powf(&self, k: f64) -> Dual {
        let v = self.value();
        combine_unary(self, v.powf(k), k * v.powf(k - 1.0), k * (k - 1.0) * v.powf(k - 2.0))
    }

    /// Reciprocal, `1/x`, a thin wrapper over [`Dual::powf`].
    pub fn recip(&self) -> Dual {
        self.powf(-1.0)
    }
}

macro_rules! forward_binop {
    ($trait_:ident, $method:ident) => {
        impl $trait_<Dual> for Dual {
            type Output = Dual;
            fn $method(self, rhs: Dual) -> Dual {
                $trait_::$method(&self, &rhs)
            }
        }
        impl $trait_<&Dual> for Dual {
            type Output = Dual;
            fn $method(self, rhs: &Dual) -> Dual {
                $trait_::$method(&self, rhs)
            }
        }
        impl $trait_<Dual> for &Dual {
            type Output = Dual;
            fn $method(self, rhs: Dual) -> Dual {
                $trait_::$method(self, &rhs)
            }
        }
    };
}

forward_binop!(Add, add);
forward_binop!(Sub, sub);
forward_binop!(Mul, mul);
forward_binop!(Div, div);

impl Neg for Dual {
    type Output = Dual;
    fn neg(self) -> Dual {
        Neg::neg(&self)
    }
}

macro_rules! forward_scalar {
    ($trait_:ident, $method:ident) => {
        impl $trait_<f64> for Dual {
            type Output = Dual;
            fn $method(self, rhs: f64) -> Dual {
                $trait_::$method(self, Dual::new(rhs))
            }
        }
        impl $trait_<f64> for &Dual {
            type Output = Dual;
            fn $method(self, rhs: f64) -> Dual {
                $trait_::$method(self, &Dual::new(rhs))
            }
        }
        impl $trait_<Dual> for f64 {
            type Output = Dual;
            fn $method(self, rhs: Dual) -> Dual {
                $trait_::$method(Dual::new(self), rhs)
            }
        }
        impl $trait_<&Dual> for f64 {
            type Output = Dual;
            fn $method(self, rhs: &Dual) -> Dual {
                $trait_::$method(&Dual::new(self), rhs)
            }
        }
    };
}

forward_scalar!(Add, add);
forward_scalar!(Sub, sub);
forward_scalar!(Mul, mul);
forward_scalar!(Div, div);

#[cfg(test)]
mod tests {
    use super::super::number::Dual;

    #[test]
    fn addition_unions_gradients() {
        let a = Dual::variable(1.1, "fx_eurusd");
        let b = Dual::variable(1.25, "fx_gbpusd");
        let y = &a + &b;
        assert!((y.value() - 2.35).abs() < 1e-12);
        assert_eq!(y.gradient("fx_eurusd"), 1.0);
        assert_eq!(y.gradient("fx_gbpusd"), 1.0);
    }

    #[test]
    fn multiplication_applies_product_rule() {
        let a = Dual::variable(2.0, "fx_eurusd");
        let b = Dual::variable(3.0, "fx_gbpusd");
        let y = &a * &b;
        assert!((y.value() - 6.0).abs() < 1e-12);
        assert_eq!(y.gradient("fx_eurusd"), 3.0);
        assert_eq!(y.gradient("fx_gbpusd"), 2.0);
    }

    #[test]
    fn division_matches_quotient_rule() {
        let a = Dual::variable(6.0, "fx_eurusd");
        let b = Dual::variable(3.0, "fx_gbpusd");
        let y = &a / &b;
        assert!((y.value() - 2.0).abs() < 1e-12);
        assert!((y.gradient("fx_eurusd") - 1.0 / 3.0).abs() < 1e-12);
        assert!((y.gradient("fx_gbpusd") - (-6.0 / 9.0)).abs() < 1e-12);
    }

    #[test]
    fn scalar_ops_lift_plain_floats() {
        let a = Dual::variable(1.0, "fx_eurusd");
        let y = (a.clone() + 2.0) * 3.0 - 1.0;
        assert!((y.value() - 8.0).abs() < 1e-12);
        assert_eq!(y.gradient("fx_eurusd"), 3.0);

        let z = 10.0 - &a;
        assert!((z.value() - 9.0).abs() < 1e-12);
        assert_eq!(z.gradient("fx_eurusd"), -1.0);
    }

    #[test]
    fn powf_matches_analytic_derivative() {
        let a = Dual::variable(2.0, "fx_eurusd");
        let y = a.powf(3.0);
        assert!((y.value() - 8.0).abs() < 1e-12);
        assert!((y.gradient("fx_eurusd") - 12.0).abs() < 1e-12);
    }

    #[test]
    fn second_order_product_rule_outer_product() {
        let a = Dual::variable2(2.0, "fx_eurusd");
        let b = Dual::variable2(3.0, "fx_gbpusd");
        let y = &a * &b;
        assert_eq!(y.hessian("fx_eurusd", "fx_gbpusd"), 1.0);
        assert_eq!(y.hessian("fx_eurusd", "fx_eurusd"), 0.0);
    }
}
