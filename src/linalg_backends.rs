// src/linalg_backends.rs

// --- Common imports needed by multiple sections ---
use crate::decomposition::PluDecomposition;
use crate::elimination::{eliminate, validate_square, EliminationOptions, PivotStrategy};
use crate::error::{FactorizationError, Result};
use crate::permutation::Permutation;
use log::{debug, warn};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// Selects which implementation computes PLU factorizations.
///
/// `Lapack` and `Faer` only work when the crate is built with the matching
/// `backend_lapack` / `backend_faer` feature; otherwise requesting them fails with
/// [`FactorizationError::BackendUnavailable`].
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// Pure Rust elimination core in this crate.
    #[default]
    InProcess,
    /// LAPACK `getrf` through `ndarray-linalg`.
    Lapack,
    /// `faer`'s partial-pivoting LU.
    Faer,
}

impl BackendKind {
    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::InProcess => "in-process",
            BackendKind::Lapack => "lapack",
            BackendKind::Faer => "faer",
        }
    }

    /// Whether this backend was compiled into the current build.
    pub fn is_available(&self) -> bool {
        match self {
            BackendKind::InProcess => true,
            BackendKind::Lapack => cfg!(feature = "backend_lapack"),
            BackendKind::Faer => cfg!(feature = "backend_faer"),
        }
    }
}

// --- Trait Definitions ---

/// Native calling convention for a packed, in-place PLU routine.
///
/// Given `n`, a row-major buffer `a` of `n * n` doubles and a length-`n` permutation
/// buffer `perm` (identity on entry), the routine overwrites `a` with the packed
/// factors (L strictly below the diagonal, U on and above it) and `perm` with the
/// resulting row permutation.
///
/// A routine that finds an exactly-zero pivot reports [`FactorizationError::Singular`]
/// for that step; any other failure to run is [`FactorizationError::BackendUnavailable`].
pub trait NativePluRoutine: Send + Sync {
    fn name(&self) -> &'static str;

    fn plu_in_place(&self, n: usize, a: &mut [f64], perm: &mut [usize]) -> Result<()>;
}

/// Trait for computing a PLU factorization of a square matrix.
pub trait BackendPlu {
    fn plu(&self, matrix: ArrayView2<f64>) -> Result<PluDecomposition>;
}

// --- In-process backend ---

/// Runs the crate's own elimination core.
#[derive(Debug, Default, Copy, Clone)]
pub struct InProcessBackend {
    options: EliminationOptions,
}

impl InProcessBackend {
    pub fn new(options: EliminationOptions) -> Self {
        Self { options }
    }
}

impl BackendPlu for InProcessBackend {
    fn plu(&self, matrix: ArrayView2<f64>) -> Result<PluDecomposition> {
        eliminate(matrix, PivotStrategy::Partial, &self.options).map(PluDecomposition::from)
    }
}

// --- Adapter from a native routine to the PLU capability ---

/// Wraps a [`NativePluRoutine`], converting between `ndarray` matrices and the
/// routine's flat buffers and validating what comes back.
///
/// The returned U diagonal is held to the same pivot policy as the in-process core:
/// a diagonal entry with magnitude `<= options.pivot_tolerance` is a singular pivot.
#[derive(Debug, Default, Copy, Clone)]
pub struct NativeBackend<R> {
    routine: R,
    options: EliminationOptions,
}

impl<R: NativePluRoutine> NativeBackend<R> {
    /// Uses the default pivot policy (exact-zero detection).
    pub fn new(routine: R) -> Self {
        Self::with_options(routine, EliminationOptions::default())
    }

    pub fn with_options(routine: R, options: EliminationOptions) -> Self {
        Self { routine, options }
    }
}

impl<R: NativePluRoutine> BackendPlu for NativeBackend<R> {
    fn plu(&self, matrix: ArrayView2<f64>) -> Result<PluDecomposition> {
        let n = validate_square(matrix)?;
        let name = self.routine.name();

        // `iter()` walks in logical (row-major) order regardless of memory layout.
        let mut packed_data: Vec<f64> = matrix.iter().copied().collect();
        let mut perm: Vec<usize> = (0..n).collect();

        self.routine
            .plu_in_place(n, &mut packed_data, &mut perm)
            .map_err(|e| {
                warn!("Native backend '{}' failed on {}x{} matrix: {}", name, n, n, e);
                e
            })?;

        let permutation = Permutation::try_from_vec(perm).map_err(|e| {
            FactorizationError::backend_unavailable(name, format!("returned an invalid permutation ({})", e))
        })?;
        let packed = Array2::from_shape_vec((n, n), packed_data).map_err(|e| {
            FactorizationError::backend_unavailable(name, format!("returned a malformed buffer ({})", e))
        })?;

        let tolerance = self.options.pivot_tolerance;
        if let Some(step) = (0..n).find(|&k| packed[[k, k]].abs() <= tolerance) {
            debug!("Native backend '{}' produced a zero pivot at step {}.", name, step);
            return Err(FactorizationError::Singular { step });
        }

        PluDecomposition::from_packed(packed.view(), permutation)
    }
}

// Applies `routine_perm` on top of whatever `perm` already holds.
#[cfg(any(feature = "backend_lapack", feature = "backend_faer"))]
fn compose_into(perm: &mut [usize], routine_perm: &[usize]) {
    let previous = perm.to_vec();
    for (slot, &source) in perm.iter_mut().zip(routine_perm) {
        *slot = previous[source];
    }
}

#[cfg(any(feature = "backend_lapack", feature = "backend_faer"))]
fn check_buffers(name: &str, n: usize, a: &[f64], perm: &[usize]) -> Result<()> {
    if a.len() != n * n || perm.len() != n {
        return Err(FactorizationError::backend_unavailable(
            name,
            format!(
                "expected buffers of length {} and {}, got {} and {}",
                n * n,
                n,
                a.len(),
                perm.len()
            ),
        ));
    }
    Ok(())
}

// --- LAPACK routine via ndarray-linalg ---
#[cfg(feature = "backend_lapack")]
mod lapack_specific_code {
    use super::{check_buffers, compose_into, NativePluRoutine};
    use crate::error::{FactorizationError, Result};
    use crate::permutation::Permutation;
    use ndarray::{Array2, ShapeBuilder};
    use ndarray_linalg::error::LinalgError;
    use ndarray_linalg::solve::FactorizeInto;

    /// `getrf` from the linked LAPACK.
    #[derive(Debug, Default, Copy, Clone)]
    pub struct LapackRoutine;

    impl NativePluRoutine for LapackRoutine {
        fn name(&self) -> &'static str {
            "lapack"
        }

        fn plu_in_place(&self, n: usize, a: &mut [f64], perm: &mut [usize]) -> Result<()> {
            check_buffers(self.name(), n, a, perm)?;

            // getrf on a row-major buffer would factor the transpose, so hand it column-major data.
            let work = Array2::from_shape_fn((n, n).f(), |(i, j)| a[i * n + j]);
            let factorized = work.factorize_into().map_err(|e| match e {
                // info > 0: U(info, info) is exactly zero, the factorization itself completed.
                LinalgError::Lapack(lax::error::Error::LapackComputationalFailure { return_code })
                    if return_code > 0 =>
                {
                    FactorizationError::Singular {
                        step: return_code as usize - 1,
                    }
                }
                other => FactorizationError::backend_unavailable(self.name(), format!("getrf failed: {}", other)),
            })?;

            for i in 0..n {
                for j in 0..n {
                    a[i * n + j] = factorized.a[[i, j]];
                }
            }

            let lapack_perm = Permutation::from_lapack_pivots(&factorized.ipiv)
                .map_err(|e| FactorizationError::backend_unavailable(self.name(), e.to_string()))?;
            compose_into(perm, lapack_perm.as_slice());
            Ok(())
        }
    }
}

#[cfg(feature = "backend_lapack")]
pub use lapack_specific_code::LapackRoutine;

// --- faer routine ---
#[cfg(feature = "backend_faer")]
mod faer_specific_code {
    use super::{check_buffers, compose_into, NativePluRoutine};
    use crate::error::Result;
    use faer::MatRef;

    /// `faer`'s partial-pivoting LU.
    #[derive(Debug, Default, Copy, Clone)]
    pub struct FaerRoutine;

    impl NativePluRoutine for FaerRoutine {
        fn name(&self) -> &'static str {
            "faer"
        }

        fn plu_in_place(&self, n: usize, a: &mut [f64], perm: &mut [usize]) -> Result<()> {
            check_buffers(self.name(), n, a, perm)?;

            // faer factors P·A = L·U with row i of P·A equal to row fwd[i] of A.
            let decomposition = MatRef::from_row_major_slice(&*a, n, n).partial_piv_lu();
            let l = decomposition.L();
            let u = decomposition.U();
            for i in 0..n {
                for j in 0..n {
                    a[i * n + j] = if i > j { *l.get(i, j) } else { *u.get(i, j) };
                }
            }

            let (forward, _inverse) = decomposition.P().arrays();
            compose_into(perm, forward);
            Ok(())
        }
    }
}

#[cfg(feature = "backend_faer")]
pub use faer_specific_code::FaerRoutine;

// --- Provider dispatch ---

/// Dispatches PLU to the backend named by a [`BackendKind`], chosen at runtime.
///
/// There is no fallback: a native backend that is missing from the build or fails
/// surfaces [`FactorizationError::BackendUnavailable`].
#[derive(Debug, Default, Copy, Clone)]
pub struct BackendProvider {
    kind: BackendKind,
    options: EliminationOptions,
}

impl BackendProvider {
    pub fn new(kind: BackendKind, options: EliminationOptions) -> Self {
        Self { kind, options }
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }
}

impl BackendPlu for BackendProvider {
    fn plu(&self, matrix: ArrayView2<f64>) -> Result<PluDecomposition> {
        match self.kind {
            BackendKind::InProcess => InProcessBackend::new(self.options).plu(matrix),
            BackendKind::Lapack => {
                #[cfg(feature = "backend_lapack")]
                {
                    NativeBackend::with_options(LapackRoutine, self.options).plu(matrix)
                }
                #[cfg(not(feature = "backend_lapack"))]
                {
                    Err(FactorizationError::backend_unavailable(
                        self.kind.name(),
                        "not compiled in; rebuild with the `backend_lapack` feature",
                    ))
                }
            }
            BackendKind::Faer => {
                #[cfg(feature = "backend_faer")]
                {
                    NativeBackend::with_options(FaerRoutine, self.options).plu(matrix)
                }
                #[cfg(not(feature = "backend_faer"))]
                {
                    Err(FactorizationError::backend_unavailable(
                        self.kind.name(),
                        "not compiled in; rebuild with the `backend_faer` feature",
                    ))
                }
            }
        }
    }
}
