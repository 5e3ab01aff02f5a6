// src/elimination.rs

//! Shared elimination core for the LU and PLU factorizations.
//!
//! Both variants run the same pivot-then-eliminate loop on a private working copy
//! of the input. The pivoting variant additionally searches each column for the
//! largest-magnitude entry and swaps it into place; the non-pivoting variant fails
//! as soon as a diagonal pivot is zero.

use crate::error::{FactorizationError, Result};
use crate::permutation::Permutation;
use log::{debug, trace, warn};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// How the elimination core chooses its pivots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PivotStrategy {
    /// Row-only pivot selection on the largest-magnitude candidate (PLU).
    Partial,
    /// Use the diagonal entry as-is and fail on a zero pivot (plain LU).
    NoPivoting,
}

/// Numeric policy applied to every pivot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EliminationOptions {
    /// Pivots with magnitude `<=` this value are treated as zero.
    /// `0.0` means exact-zero detection.
    pub pivot_tolerance: f64,
    /// Log a warning when an accepted pivot is tiny relative to the largest input entry.
    pub warn_on_small_pivot: bool,
}

impl Default for EliminationOptions {
    fn default() -> Self {
        EliminationOptions {
            pivot_tolerance: 0.0,
            warn_on_small_pivot: true,
        }
    }
}

/// Bookkeeping collected while eliminating.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EliminationStats {
    /// Number of row interchanges performed (always 0 without pivoting).
    pub row_swaps: usize,
    /// Pivot value used at each step, in step order.
    pub pivots: Vec<f64>,
}

/// Factors produced by a successful elimination.
#[derive(Debug, Clone)]
pub struct EliminationOutput {
    pub permutation: Permutation,
    pub lower: Array2<f64>,
    pub upper: Array2<f64>,
    pub stats: EliminationStats,
}

/// Returns `n` for a square, non-empty matrix.
pub(crate) fn validate_square(matrix: ArrayView2<f64>) -> Result<usize> {
    let (rows, cols) = matrix.dim();
    if rows != cols {
        return Err(FactorizationError::NotSquare { rows, cols });
    }
    if rows == 0 {
        return Err(FactorizationError::EmptyMatrix);
    }
    Ok(rows)
}

/// Working state of one elimination run. Owned exclusively by that run.
struct EliminationState {
    n: usize,
    upper: Array2<f64>,
    lower: Array2<f64>,
    permutation: Permutation,
    stats: EliminationStats,
}

impl EliminationState {
    fn new(matrix: ArrayView2<f64>) -> Self {
        let n = matrix.nrows();
        EliminationState {
            n,
            upper: matrix.to_owned(),
            lower: Array2::zeros((n, n)),
            permutation: Permutation::identity(n),
            stats: EliminationStats {
                row_swaps: 0,
                pivots: Vec::with_capacity(n),
            },
        }
    }

    /// Row of the first largest-magnitude entry in column `k`, scanning rows `k..n`.
    fn select_pivot_row(&self, k: usize) -> usize {
        let mut best_row = k;
        let mut best_abs = self.upper[[k, k]].abs();
        for i in (k + 1)..self.n {
            let candidate = self.upper[[i, k]].abs();
            if candidate > best_abs {
                best_abs = candidate;
                best_row = i;
            }
        }
        best_row
    }

    /// Interchanges rows `k` and `r` of the working matrix, the permutation,
    /// and the multipliers already stored in columns `0..k` of L.
    fn swap_rows(&mut self, k: usize, r: usize) {
        for c in 0..self.n {
            self.upper.swap([k, c], [r, c]);
        }
        for c in 0..k {
            self.lower.swap([k, c], [r, c]);
        }
        self.permutation.swap(k, r);
        self.stats.row_swaps += 1;
    }

    /// Zeroes column `k` below the pivot, recording multipliers in L.
    fn eliminate_below(&mut self, k: usize) {
        let pivot = self.upper[[k, k]];
        for i in (k + 1)..self.n {
            let multiplier = self.upper[[i, k]] / pivot;
            self.lower[[i, k]] = multiplier;
            self.upper[[i, k]] = 0.0;
            for c in (k + 1)..self.n {
                let pivot_row_value = self.upper[[k, c]];
                self.upper[[i, c]] -= multiplier * pivot_row_value;
            }
        }
    }

    fn finish(mut self) -> EliminationOutput {
        for k in 0..self.n {
            self.lower[[k, k]] = 1.0;
        }
        EliminationOutput {
            permutation: self.permutation,
            lower: self.lower,
            upper: self.upper,
            stats: self.stats,
        }
    }
}

/// Runs the elimination core on a copy of `matrix`.
///
/// On success the factors satisfy `P·A = L·U` (with `P` the identity when
/// `strategy` is [`PivotStrategy::NoPivoting`]). L has an exact unit diagonal and
/// exact zeros above it; U has exact zeros below its diagonal.
///
/// # Errors
/// * [`FactorizationError::Singular`] when partial pivoting finds no usable pivot.
/// * [`FactorizationError::ZeroPivot`] when a diagonal pivot is zero without pivoting.
/// * [`FactorizationError::NotSquare`] / [`FactorizationError::EmptyMatrix`] for bad shapes.
pub fn eliminate(
    matrix: ArrayView2<f64>,
    strategy: PivotStrategy,
    options: &EliminationOptions,
) -> Result<EliminationOutput> {
    let n = validate_square(matrix)?;
    let small_pivot_threshold = if options.warn_on_small_pivot {
        f64::EPSILON * matrix.iter().fold(0.0f64, |acc, v| acc.max(v.abs()))
    } else {
        0.0
    };

    let mut state = EliminationState::new(matrix);

    for k in 0..n {
        if strategy == PivotStrategy::Partial {
            let pivot_row = state.select_pivot_row(k);
            if state.upper[[pivot_row, k]].abs() <= options.pivot_tolerance {
                debug!("No usable pivot in column {} of {}x{} matrix.", k, n, n);
                return Err(FactorizationError::Singular { step: k });
            }
            if pivot_row != k {
                debug!("Step {}: swapping rows {} and {}.", k, k, pivot_row);
                state.swap_rows(k, pivot_row);
            }
        } else if state.upper[[k, k]].abs() <= options.pivot_tolerance {
            debug!("Zero pivot at step {} without pivoting.", k);
            return Err(FactorizationError::ZeroPivot { step: k });
        }

        let pivot = state.upper[[k, k]];
        trace!("Step {}: pivot = {:e}", k, pivot);
        if pivot.abs() < small_pivot_threshold {
            warn!(
                "Step {}: pivot magnitude {:e} is below machine epsilon relative to the input scale; factors may be inaccurate.",
                k,
                pivot.abs()
            );
        }
        state.stats.pivots.push(pivot);
        state.eliminate_below(k);
    }

    debug!(
        "Elimination of {}x{} matrix finished with {} row swap(s).",
        n, n, state.stats.row_swaps
    );
    Ok(state.finish())
}
