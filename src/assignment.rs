//! Optimal detection-to-track assignment.
//!
//! Minimum-cost perfect matching over a square cost matrix via the classic
//! six-step Hungarian/Munkres procedure. Non-square inputs are padded with a
//! constant cost-of-non-assignment so that leaving an entity unmatched
//! competes fairly against bad real matches.

use nalgebra::DMatrix;

use crate::error::Error;

/// Weight of a padding cell. Any pairing against padding is reported as
/// unassigned.
pub const NON_ASSIGNMENT_COST: f64 = 100_000.0;

/// Square, padded cost matrix for one frame's assignment. Recomputed every
/// frame and discarded after use.
#[derive(Debug, Clone)]
pub struct CostMatrix {
    costs: DMatrix<f64>,
    rows: usize,
    cols: usize,
}

impl CostMatrix {
    /// Builds the `max(rows, cols)`-square matrix, filling real cells from
    /// `cost` and padding cells with `pad`.
    pub fn padded<F>(rows: usize, cols: usize, pad: f64, mut cost: F) -> Self
    where
        F: FnMut(usize, usize) -> f64,
    {
        let n = rows.max(cols);
        let costs = DMatrix::from_fn(n, n, |r, c| {
            if r < rows && c < cols {
                cost(r, c)
            } else {
                pad
            }
        });

        Self { costs, rows, cols }
    }

    /// Builds an already-square matrix from row slices. Fails when the row
    /// lengths disagree with the declared row count.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, Error> {
        let n = rows.len();
        if let Some(bad) = rows.iter().find(|row| row.len() != n) {
            return Err(Error::CostMatrix(format!(
                "expected {n} columns per row, found a row of {}",
                bad.len()
            )));
        }

        let costs = DMatrix::from_fn(n, n, |r, c| rows[r][c]);

        Ok(Self {
            costs,
            rows: n,
            cols: n,
        })
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.costs.nrows()
    }

    /// Real (unpadded) shape: (rows, cols).
    #[inline]
    pub fn real_shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.costs[(row, col)]
    }
}

/// Per-row result of one solve: each real row maps to a real column index,
/// or to `None` when it was matched only against padding. Consumed once per
/// frame, never persisted.
#[derive(Debug, Clone)]
pub struct Assignment {
    columns: Vec<Option<usize>>,
    total_cost: f64,
}

impl Assignment {
    /// Column assigned to `row`, if any.
    #[inline]
    pub fn column(&self, row: usize) -> Option<usize> {
        self.columns.get(row).copied().flatten()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Matched (row, col) pairs, padding matches excluded.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.columns
            .iter()
            .enumerate()
            .filter_map(|(r, c)| c.map(|c| (r, c)))
    }

    /// Sum of the matrix entries over the real matched pairs.
    #[inline]
    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    None,
    Star,
    Prime,
}

/// Working state of a single solve. Built, consumed and dropped inside one
/// `solve` call so nothing leaks between invocations.
struct SolverState {
    n: usize,
    costs: DMatrix<f64>,
    marks: Vec<Mark>,
    row_cover: Vec<bool>,
    col_cover: Vec<bool>,
}

/// Minimum-cost perfect matching on `matrix`.
///
/// Fails fast on non-finite or negative entries; never returns a partial
/// assignment. Deterministic: ties are resolved by earliest row-major scan
/// order at every step.
pub fn solve(matrix: &CostMatrix) -> Result<Assignment, Error> {
    let n = matrix.dim();

    for r in 0..n {
        for c in 0..n {
            let v = matrix.costs[(r, c)];
            if !v.is_finite() {
                return Err(Error::CostMatrix(format!("non-finite entry at ({r}, {c})")));
            }
            if v < 0.0 {
                return Err(Error::CostMatrix(format!("negative entry at ({r}, {c})")));
            }
        }
    }

    let (rows, cols) = matrix.real_shape();
    if n == 0 {
        return Ok(Assignment {
            columns: Vec::new(),
            total_cost: 0.0,
        });
    }

    let mut state = SolverState::new(matrix.costs.clone());
    state.reduce_rows();
    state.star_initial_zeros();

    while !state.cover_starred_columns() {
        loop {
            match state.prime_uncovered_zero() {
                Some((r, c)) => {
                    state.augment_from(r, c);
                    break;
                }
                None => state.adjust(),
            }
        }
    }

    let mut columns = vec![None; rows];
    let mut total_cost = 0.0;

    for r in 0..rows {
        let starred = (0..n).find(|&c| state.marks[r * n + c] == Mark::Star);
        if let Some(c) = starred {
            if c < cols {
                columns[r] = Some(c);
                total_cost += matrix.costs[(r, c)];
            }
        }
    }

    Ok(Assignment {
        columns,
        total_cost,
    })
}

impl SolverState {
    fn new(costs: DMatrix<f64>) -> Self {
        let n = costs.nrows();

        Self {
            n,
            costs,
            marks: vec![Mark::None; n * n],
            row_cover: vec![false; n],
            col_cover: vec![false; n],
        }
    }

    #[inline]
    fn mark(&self, r: usize, c: usize) -> Mark {
        self.marks[r * self.n + c]
    }

    #[inline]
    fn set_mark(&mut self, r: usize, c: usize, mark: Mark) {
        self.marks[r * self.n + c] = mark;
    }

    /// Step 1: subtract each row's minimum from all its entries.
    fn reduce_rows(&mut self) {
        for r in 0..self.n {
            let min = (0..self.n)
                .map(|c| self.costs[(r, c)])
                .fold(f64::INFINITY, f64::min);
            for c in 0..self.n {
                self.costs[(r, c)] -= min;
            }
        }
    }

    /// Step 2: greedily star zeros whose row and column are both unstarred,
    /// then clear the temporary covers.
    fn star_initial_zeros(&mut self) {
        for r in 0..self.n {
            for c in 0..self.n {
                if self.costs[(r, c)] == 0.0 && !self.row_cover[r] && !self.col_cover[c] {
                    self.set_mark(r, c, Mark::Star);
                    self.row_cover[r] = true;
                    self.col_cover[c] = true;
                }
            }
        }

        self.row_cover.fill(false);
        self.col_cover.fill(false);
    }

    /// Step 3: cover every column containing a star. Returns true when the
    /// starred set is a complete assignment.
    fn cover_starred_columns(&mut self) -> bool {
        for c in 0..self.n {
            if (0..self.n).any(|r| self.mark(r, c) == Mark::Star) {
                self.col_cover[c] = true;
            }
        }

        self.col_cover.iter().filter(|&&cov| cov).count() == self.n
    }

    /// Step 4: prime uncovered zeros. A primed zero in a star-free row
    /// starts an augmenting path and is returned; a primed zero sharing a
    /// row with a star covers that row and uncovers the star's column.
    /// Returns `None` when no uncovered zero is left (go adjust).
    fn prime_uncovered_zero(&mut self) -> Option<(usize, usize)> {
        loop {
            let Some((r, c)) = self.find_uncovered_zero() else {
                return None;
            };

            self.set_mark(r, c, Mark::Prime);

            match (0..self.n).find(|&sc| self.mark(r, sc) == Mark::Star) {
                Some(sc) => {
                    self.row_cover[r] = true;
                    self.col_cover[sc] = false;
                }
                None => return Some((r, c)),
            }
        }
    }

    fn find_uncovered_zero(&self) -> Option<(usize, usize)> {
        for r in 0..self.n {
            if self.row_cover[r] {
                continue;
            }
            for c in 0..self.n {
                if !self.col_cover[c] && self.costs[(r, c)] == 0.0 {
                    return Some((r, c));
                }
            }
        }

        None
    }

    /// Step 5: walk the alternating prime/star path starting at the primed
    /// zero, flip stars along it, then drop all covers and primes.
    fn augment_from(&mut self, r: usize, c: usize) {
        let mut path = vec![(r, c)];

        loop {
            let col = path.last().unwrap().1;
            let Some(sr) = (0..self.n).find(|&sr| self.mark(sr, col) == Mark::Star) else {
                break;
            };
            path.push((sr, col));

            // a starred row always holds the prime that covered it
            let pc = (0..self.n)
                .find(|&pc| self.mark(sr, pc) == Mark::Prime)
                .expect("starred row on augmenting path has no primed zero");
            path.push((sr, pc));
        }

        for (pr, pc) in path {
            let flipped = if self.mark(pr, pc) == Mark::Star {
                Mark::None
            } else {
                Mark::Star
            };
            self.set_mark(pr, pc, flipped);
        }

        self.row_cover.fill(false);
        self.col_cover.fill(false);
        for mark in &mut self.marks {
            if *mark == Mark::Prime {
                *mark = Mark::None;
            }
        }
    }

    /// Step 6: add the minimum uncovered value to covered rows and subtract
    /// it from uncovered columns, creating at least one new uncovered zero.
    fn adjust(&mut self) {
        let mut min = f64::INFINITY;
        for r in 0..self.n {
            if self.row_cover[r] {
                continue;
            }
            for c in 0..self.n {
                if !self.col_cover[c] {
                    min = min.min(self.costs[(r, c)]);
                }
            }
        }

        for r in 0..self.n {
            for c in 0..self.n {
                if self.row_cover[r] {
                    self.costs[(r, c)] += min;
                }
                if !self.col_cover[c] {
                    self.costs[(r, c)] -= min;
                }
            }
        }
    }
}
