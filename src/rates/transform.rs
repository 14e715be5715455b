use crate::errors::{FxError, Result};

/// Which axis a [`PathStep`] was discovered along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Row,
    Col,
}

/// One hop of a [`Transform::recursive_chain`] path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathStep {
    pub axis: Axis,
    pub index: usize,
}

/// # Transform
/// The `q x q` 0/1 cash-vs-collateral availability matrix `T`, where
/// `T[cash][coll] == true` iff a discount curve keyed `<cash><coll>` was
/// supplied. Used both to validate the supplied curve set and to search for
/// a chain of curves linking any two currencies.
#[derive(Debug, Clone)]
pub struct Transform {
    q: usize,
    cells: Vec<Vec<bool>>,
}

impl Transform {
    /// Build and validate `T` from an iterator of `(cash_index, coll_index)`
    /// pairs (diagonal entries, i.e. `cash == coll`, are the per-currency
    /// local curves and must be present for every currency index `0..q`).
    pub fn build(q: usize, cells: impl IntoIterator<Item = (usize, usize)>) -> Result<Self> {
        let mut grid = vec![vec![false; q]; q];
        let mut count = 0usize;
        for (cash, coll) in cells {
            if cash >= q || coll >= q {
                return Err(FxError::UnknownCurveCurrency(format!(
                    "curve references currency index {cash} or {coll} outside range 0..{q}"
                )));
            }
            if !grid[cash][coll] {
                grid[cash][coll] = true;
                count += 1;
            }
        }

        let expected = 2 * q - 1;
        if count > expected {
            return Err(FxError::CurvesOverspecified {
                expected,
                actual: count,
            });
        }
        if count < expected {
            return Err(FxError::CurvesUnderspecified {
                expected,
                actual: count,
            });
        }

        for idx in 0..q {
            let has_row = grid[idx].iter().any(|&v| v);
            let has_col = grid.iter().any(|row| row[idx]);
            if !has_row || !has_col {
                return Err(FxError::UnknownCurveCurrency(format!(
                    "currency index {idx} has no curve in its row or column"
                )));
            }
        }

        if rank(&grid) != q {
            return Err(FxError::CodependentCurves);
        }

        Ok(Transform { q, cells: grid })
    }

    pub fn contains(&self, cash: usize, coll: usize) -> bool {
        self.cells[cash][coll]
    }

    /// Depth-first search for a chain of curve hops from `start` to `search`.
    /// Row hops are tried before column hops, each in ascending candidate
    /// index order, so the result is deterministic for a given `T`.
    pub fn recursive_chain(&self, start: usize, search: usize) -> Option<Vec<PathStep>> {
        if start == search {
            return Some(Vec::new());
        }
        let mut visited = vec![false; self.q];
        visited[start] = true;
        self.dfs(start, search, &mut visited, &mut Vec::new())
    }

    fn dfs(
        &self,
        current: usize,
        search: usize,
        visited: &mut [bool],
        path: &mut Vec<PathStep>,
    ) -> Option<Vec<PathStep>> {
        for coll in 0..self.q {
            if !self.cells[current][coll] || coll == current || visited[coll] {
                continue;
            }
            path.push(PathStep {
                axis: Axis::Row,
                index: coll,
            });
            if coll == search {
                return Some(path.clone());
            }
            visited[coll] = true;
            if let Some(found) = self.dfs(coll, search, visited, path) {
                return Some(found);
            }
            visited[coll] = false;
            path.pop();
        }

        for cash in 0..self.q {
            if !self.cells[cash][current] || cash == current || visited[cash] {
                continue;
            }
            path.push(PathStep {
                axis: Axis::Col,
                index: cash,
            });
            if cash == search {
                return Some(path.clone());
            }
            visited[cash] = true;
            if let Some(found) = self.dfs(cash, search, visited, path) {
                return Some(found);
            }
            visited[cash] = false;
            path.pop();
        }

        None
    }
}

/// Rank of a 0/1 matrix treated as a real matrix, via Gaussian elimination
/// with partial pivoting.
fn rank(grid: &[Vec<bool>]) -> usize {
    let n = grid.len();
    let mut m: Vec<Vec<f64>> = grid
        .iter()
        .map(|row| row.iter().map(|&b| if b { 1.0 } else { 0.0 }).collect())
        .collect();

    let mut rank = 0;
    for col in 0..n {
        let mut pivot_row = None;
        let mut pivot_val = 1e-9;
        for row in rank..n {
            let v = m[row][col].abs();
            if v > pivot_val {
                pivot_val = v;
                pivot_row = Some(row);
            }
        }
        let Some(pivot_row) = pivot_row else {
            continue;
        };
        m.swap(rank, pivot_row);
        for row in (rank + 1)..n {
            let factor = m[row][col] / m[rank][col];
            for k in col..n {
                m[row][k] -= factor * m[rank][k];
            }
        }
        rank += 1;
    }
    rank
}
