// src/factorizer.rs

use crate::decomposition::{LuDecomposition, PluDecomposition};
use crate::diagnostics::FactorizationDiagnostics;
use crate::elimination::{eliminate, EliminationOptions, PivotStrategy};
use crate::error::{FactorizationError, Result};
use crate::linalg_backends::{BackendKind, BackendPlu, BackendProvider};
use log::info;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

/// Configuration for a [`Factorizer`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactorizerConfig {
    /// Backend used for PLU. LU without pivoting always runs in-process.
    pub backend: BackendKind,
    /// Pivots with magnitude at or below this value count as zero.
    /// Must be finite and non-negative; `0.0` means exact-zero detection.
    pub pivot_tolerance: f64,
    /// Emit a `warn!` log line for pivots that pass the zero check but are below
    /// machine epsilon relative to the largest input entry.
    pub warn_on_small_pivot: bool,
}

impl Default for FactorizerConfig {
    fn default() -> Self {
        FactorizerConfig {
            backend: BackendKind::InProcess,
            pivot_tolerance: 0.0,
            warn_on_small_pivot: true,
        }
    }
}

impl FactorizerConfig {
    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_pivot_tolerance(mut self, pivot_tolerance: f64) -> Self {
        self.pivot_tolerance = pivot_tolerance;
        self
    }

    fn validate(&self) -> Result<()> {
        if !self.pivot_tolerance.is_finite() || self.pivot_tolerance < 0.0 {
            return Err(FactorizationError::InvalidConfig(format!(
                "pivot_tolerance must be finite and non-negative, got {}",
                self.pivot_tolerance
            )));
        }
        Ok(())
    }

    fn elimination_options(&self) -> EliminationOptions {
        EliminationOptions {
            pivot_tolerance: self.pivot_tolerance,
            warn_on_small_pivot: self.warn_on_small_pivot,
        }
    }
}

/// Computes LU and PLU factorizations according to a [`FactorizerConfig`].
///
/// A `Factorizer` holds no mutable state, so one instance can serve any number of
/// threads at once. Each call works on its own copy of the input matrix.
///
/// # Examples
///
/// ```
/// use dense_plu::{Factorizer, FactorizerConfig};
/// use ndarray::array;
///
/// let a = array![[2.0, 3.0, -1.0], [4.0, 1.0, 2.0], [-2.0, 7.0, 2.0]];
/// let factorizer = Factorizer::new(FactorizerConfig::default());
/// let plu = factorizer.plu(&a).unwrap();
/// assert_eq!(plu.p().as_slice(), &[1, 2, 0]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Factorizer {
    config: FactorizerConfig,
}

impl Factorizer {
    /// Creates a new `Factorizer` with the given configuration.
    pub fn new(config: FactorizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FactorizerConfig {
        &self.config
    }

    /// LU decomposition with partial pivoting, `P·A = L·U`, on the configured backend.
    ///
    /// # Errors
    /// * `Singular` if some column has no nonzero pivot candidate.
    /// * `BackendUnavailable` if a native backend was selected but cannot run.
    /// * `NotSquare`, `EmptyMatrix`, `InvalidConfig` for bad input or configuration.
    pub fn plu<'a, M>(&self, matrix: M) -> Result<PluDecomposition>
    where
        M: Into<ArrayView2<'a, f64>>,
    {
        self.config.validate()?;
        let matrix = matrix.into();
        info!(
            "Computing PLU of {}x{} matrix on '{}' backend.",
            matrix.nrows(),
            matrix.ncols(),
            self.config.backend.name()
        );
        BackendProvider::new(self.config.backend, self.config.elimination_options()).plu(matrix)
    }

    /// LU decomposition without pivoting, `A = L·U`. Always runs in-process.
    ///
    /// # Errors
    /// * `ZeroPivot` if a diagonal pivot is zero, even when pivoting could avoid it.
    /// * `NotSquare`, `EmptyMatrix`, `InvalidConfig` for bad input or configuration.
    pub fn lu<'a, M>(&self, matrix: M) -> Result<LuDecomposition>
    where
        M: Into<ArrayView2<'a, f64>>,
    {
        self.config.validate()?;
        let matrix = matrix.into();
        info!("Computing LU (no pivoting) of {}x{} matrix.", matrix.nrows(), matrix.ncols());
        eliminate(matrix, PivotStrategy::NoPivoting, &self.config.elimination_options())
            .map(LuDecomposition::from)
    }

    /// In-process PLU together with a numerical health report.
    ///
    /// Ignores the configured backend: the report needs the elimination statistics
    /// that only the in-process core records.
    pub fn plu_with_diagnostics<'a, M>(
        &self,
        matrix: M,
    ) -> Result<(PluDecomposition, FactorizationDiagnostics)>
    where
        M: Into<ArrayView2<'a, f64>>,
    {
        self.config.validate()?;
        let matrix = matrix.into();
        let output = eliminate(matrix, PivotStrategy::Partial, &self.config.elimination_options())?;
        let stats = output.stats.clone();
        let decomposition = PluDecomposition::from(output);
        let diagnostics = FactorizationDiagnostics::from_plu(matrix, &decomposition, &stats);
        info!(
            "PLU diagnostics: n={}, swaps={}, growth={:.3e}, rel. error={:.3e}",
            diagnostics.n, diagnostics.row_swaps, diagnostics.growth_factor, diagnostics.reconstruction_error_rel
        );
        Ok((decomposition, diagnostics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn rejects_negative_or_nan_tolerance() {
        let a = array![[1.0]];
        for bad in [-1.0, f64::NAN, f64::INFINITY] {
            let factorizer = Factorizer::new(FactorizerConfig::default().with_pivot_tolerance(bad));
            assert!(matches!(factorizer.plu(&a), Err(FactorizationError::InvalidConfig(_))));
            assert!(matches!(factorizer.lu(&a), Err(FactorizationError::InvalidConfig(_))));
        }
    }

    #[test]
    fn config_deserializes_with_defaults_for_missing_fields() {
        let config: FactorizerConfig = serde_json::from_str(r#"{"pivot_tolerance": 1e-12}"#).unwrap();
        assert_eq!(config.backend, BackendKind::InProcess);
        assert_eq!(config.pivot_tolerance, 1e-12);
        assert!(config.warn_on_small_pivot);

        let config: FactorizerConfig = serde_json::from_str(r#"{"backend": "Faer"}"#).unwrap();
        assert_eq!(config.backend, BackendKind::Faer);
    }

    #[test]
    fn diagnostics_match_returned_factors() {
        let a = array![[0.0, 2.0], [3.0, 1.0]];
        let (plu, report) = Factorizer::default().plu_with_diagnostics(&a).unwrap();
        assert_eq!(report.n, 2);
        assert_eq!(report.row_swaps, 1);
        assert_eq!(plu.p().as_slice(), &[1, 0]);
        assert_eq!(report.reconstruction_error_abs, 0.0);
    }
}
