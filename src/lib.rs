// Dense LU / PLU factorization

#![doc = include_str!("../README.md")]

pub mod decomposition;
pub mod diagnostics;
pub mod elimination;
pub mod error;
pub mod factorizer;
pub mod linalg_backends;
pub mod permutation;


pub use decomposition::{LuDecomposition, PluDecomposition};
pub use diagnostics::FactorizationDiagnostics;
pub use error::{FactorizationError, Result};
pub use factorizer::{Factorizer, FactorizerConfig};
pub use linalg_backends::BackendKind;
pub use permutation::Permutation;

use ndarray::{Array1, ArrayView2};

/// LU decomposition with partial pivoting, `P·A = L·U`, using the in-process backend.
///
/// The input is never modified.
///
/// # Errors
/// Fails with [`FactorizationError::Singular`] when a column has no nonzero pivot
/// candidate, and with `NotSquare` / `EmptyMatrix` for unusable shapes.
///
/// # Examples
///
/// ```
/// use ndarray::array;
///
/// let (p, l, u) = dense_plu::plu(&array![[5.0]]).unwrap().into_parts();
/// assert_eq!(p.as_slice(), &[0]);
/// assert_eq!(l, array![[1.0]]);
/// assert_eq!(u, array![[5.0]]);
/// ```
pub fn plu<'a, M>(matrix: M) -> Result<PluDecomposition>
where
    M: Into<ArrayView2<'a, f64>>,
{
    Factorizer::default().plu(matrix)
}

/// LU decomposition without pivoting, `A = L·U`.
///
/// # Errors
/// Fails with [`FactorizationError::ZeroPivot`] as soon as a diagonal pivot is zero,
/// even if a row swap would have avoided it.
pub fn lu<'a, M>(matrix: M) -> Result<LuDecomposition>
where
    M: Into<ArrayView2<'a, f64>>,
{
    Factorizer::default().lu(matrix)
}

/// Solves `A·x = b` by Gaussian elimination with partial pivoting.
pub fn solve<'a, M>(matrix: M, b: &Array1<f64>) -> Result<Array1<f64>>
where
    M: Into<ArrayView2<'a, f64>>,
{
    plu(matrix)?.solve(b)
}
