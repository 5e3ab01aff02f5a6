// src/diagnostics.rs

use crate::decomposition::PluDecomposition;
use crate::elimination::EliminationStats;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

/// Numerical health report for a single PLU factorization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactorizationDiagnostics {
    pub n: usize,
    pub row_swaps: usize,
    pub min_abs_pivot: f64,
    pub max_abs_pivot: f64,
    /// min_abs_pivot / max_abs_pivot. Small values hint at ill-conditioning.
    pub pivot_ratio: f64,
    /// max|U| / max|A|. Bounded by 2^(n-1) under partial pivoting.
    pub growth_factor: f64,
    /// ||Π·A - L·U||_F
    pub reconstruction_error_abs: f64,
    /// reconstruction_error_abs / ||A||_F (0 when A is the zero matrix)
    pub reconstruction_error_rel: f64,
}

impl FactorizationDiagnostics {
    /// Builds the report from the input matrix, its factors, and the elimination stats.
    pub fn from_plu(
        matrix: ArrayView2<f64>,
        decomposition: &PluDecomposition,
        stats: &EliminationStats,
    ) -> Self {
        let (min_abs_pivot, max_abs_pivot) = stats
            .pivots
            .iter()
            .map(|p| p.abs())
            .fold((f64::INFINITY, 0.0f64), |(lo, hi), p| (lo.min(p), hi.max(p)));
        let min_abs_pivot = if stats.pivots.is_empty() { 0.0 } else { min_abs_pivot };
        let pivot_ratio = if max_abs_pivot > 0.0 { min_abs_pivot / max_abs_pivot } else { 0.0 };

        let input_max = max_abs(matrix);
        let growth_factor = if input_max > 0.0 {
            max_abs(decomposition.u().view()) / input_max
        } else {
            0.0
        };

        let (reconstruction_error_abs, reconstruction_error_rel) =
            match decomposition.p().apply_rows(matrix) {
                Ok(permuted) => {
                    let residual = &permuted - &decomposition.permuted_product();
                    let abs_err = frobenius_norm(residual.view());
                    let input_norm = frobenius_norm(matrix);
                    let rel_err = if input_norm > 0.0 { abs_err / input_norm } else { 0.0 };
                    (abs_err, rel_err)
                }
                Err(_) => (f64::INFINITY, f64::INFINITY),
            };

        FactorizationDiagnostics {
            n: decomposition.n(),
            row_swaps: stats.row_swaps,
            min_abs_pivot,
            max_abs_pivot,
            pivot_ratio,
            growth_factor,
            reconstruction_error_abs,
            reconstruction_error_rel,
        }
    }
}

/// Computes the Frobenius norm of a matrix.
pub fn frobenius_norm(matrix: ArrayView2<f64>) -> f64 {
    if matrix.is_empty() {
        return 0.0;
    }
    matrix.iter().map(|&x| x * x).sum::<f64>().sqrt()
}

/// Largest absolute entry, or 0 for an empty matrix.
pub fn max_abs(matrix: ArrayView2<f64>) -> f64 {
    matrix.iter().fold(0.0f64, |acc, &x| acc.max(x.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elimination::{eliminate, EliminationOptions, PivotStrategy};
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn norms_of_small_matrix() {
        let m = array![[3.0, -4.0], [0.0, 0.0]];
        assert_abs_diff_eq!(frobenius_norm(m.view()), 5.0, epsilon = 1e-12);
        assert_eq!(max_abs(m.view()), 4.0);
        let empty = ndarray::Array2::<f64>::zeros((0, 0));
        assert_eq!(frobenius_norm(empty.view()), 0.0);
        assert_eq!(max_abs(empty.view()), 0.0);
    }

    #[test]
    fn report_for_reference_matrix() {
        let a = array![[2.0, 3.0, -1.0], [4.0, 1.0, 2.0], [-2.0, 7.0, 2.0]];
        let out = eliminate(a.view(), PivotStrategy::Partial, &EliminationOptions::default()).unwrap();
        let stats = out.stats.clone();
        let plu = PluDecomposition::from(out);
        let report = FactorizationDiagnostics::from_plu(a.view(), &plu, &stats);

        assert_eq!(report.n, 3);
        assert_eq!(report.row_swaps, 2);
        assert_abs_diff_eq!(report.max_abs_pivot, 7.5, epsilon = 1e-12);
        assert_abs_diff_eq!(report.min_abs_pivot, 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(report.pivot_ratio, 0.4, epsilon = 1e-12);
        assert_abs_diff_eq!(report.growth_factor, 7.5 / 7.0, epsilon = 1e-12);
        assert!(report.reconstruction_error_rel < 1e-12);
    }
}
