use crate::errors::{FxError, Result};

use super::number::Dual;

/// Numerical threshold below which a pivot's real part is treated as zero
/// (singular system).
const PIVOT_TOLERANCE: f64 = 1e-12;

/// # dual_solve
/// Solve `A x = b` for a dense `q x q` system of [`Dual`] entries, returning
/// a dual-valued solution vector whose gradients (and Hessians, if present)
/// are correct by construction.
///
/// This performs Gaussian elimination with partial pivoting *directly* in
/// the dual field: every multiplicative and subtractive step is a `Dual`
/// operation, so gradients propagate through the elimination and
/// back-substitution automatically. There is no separate finite-difference
/// or bolted-on sensitivity pass — this is the entire reason a dual
/// arithmetic layer exists (see module docs).
///
/// Pivoting compares the real (`value()`) part of candidate pivots only.
pub fn dual_solve(a: &[Vec<Dual>], b: &[Dual]) -> Result<Vec<Dual>> {
    let n = b.len();
    if a.len() != n || a.iter().any(|row| row.len() != n) {
        return Err(FxError::InvalidValue(
            "dual_solve requires a square n x n matrix matching the length of b".to_string(),
        ));
    }

    let mut m: Vec<Vec<Dual>> = a.to_vec();
    let mut rhs: Vec<Dual> = b.to_vec();

    for col in 0..n {
        let mut pivot_row = col;
        let mut pivot_val = m[col][col].value().abs();
        for row in (col + 1)..n {
            let v = m[row][col].value().abs();
            if v > pivot_val {
                pivot_val = v;
                pivot_row = row;
            }
        }
        if pivot_val < PIVOT_TOLERANCE {
            return Err(FxError::Solve(format!(
                "no pivot above tolerance in column {col} (max |value| = {pivot_val})"
            )));
        }
        if pivot_row != col {
            m.swap(col, pivot_row);
            rhs.swap(col, pivot_row);
        }

        for row in (col + 1)..n {
            let factor = &m[row][col] / &m[col][col];
            for k in col..n {
                let reduced = &m[row][k] - &(&factor * &m[col][k]);
                m[row][k] = reduced;
            }
            rhs[row] = &rhs[row] - &(&factor * &rhs[col]);
        }
    }

    let mut x = vec![Dual::new(0.0); n];
    for row in (0..n).rev() {
        let mut acc = rhs[row].clone();
        for k in (row + 1)..n {
            acc = &acc - &(&m[row][k] * &x[k]);
        }
        x[row] = &acc / &m[row][row];
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solves_plain_real_system() {
        let a = vec![
            vec![Dual::new(2.0), Dual::new(1.0)],
            vec![Dual::new(1.0), Dual::new(3.0)],
        ];
        let b = vec![Dual::new(5.0), Dual::new(10.0)];
        let x = dual_solve(&a, &b).unwrap();
        assert!((x[0].value() - 1.0).abs() < 1e-10);
        assert!((x[1].value() - 3.0).abs() < 1e-10);
    }

    #[test]
    fn propagates_gradients_through_elimination() {
        // x - y/r = 0 with r a dual variable, plus x = 1: solving yields
        // y = r, so dy/dr should be 1.
        let r = Dual::variable(2.0, "fx_eurusd");
        let a = vec![
            vec![Dual::new(1.0), Dual::new(0.0)],
            vec![Dual::new(-1.0), r.recip()],
        ];
        let b = vec![Dual::new(1.0), Dual::new(0.0)];
        let x = dual_solve(&a, &b).unwrap();
        assert!((x[1].value() - 2.0).abs() < 1e-10);
        assert!((x[1].gradient("fx_eurusd") - 1.0).abs() < 1e-10);
    }

    #[test]
    fn singular_system_errors() {
        let a = vec![
            vec![Dual::new(1.0), Dual::new(1.0)],
            vec![Dual::new(1.0), Dual::new(1.0)],
        ];
        let b = vec![Dual::new(1.0), Dual::new(2.0)];
        assert!(dual_solve(&a, &b).is_err());
    }
}
