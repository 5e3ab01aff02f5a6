// src/decomposition.rs

use crate::diagnostics::max_abs;
use crate::elimination::{validate_square, EliminationOutput};
use crate::error::{FactorizationError, Result};
use crate::permutation::Permutation;
use float_cmp::{ApproxEq, F64Margin};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Result of an LU factorization with partial pivoting: `P·A = L·U`.
///
/// * `p` - row permutation; row `i` of `P·A` is row `p[i]` of `A`.
/// * `l` - unit lower-triangular factor (diagonal exactly 1, zeros above).
/// * `u` - upper-triangular factor (zeros below the diagonal).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PluParts")]
pub struct PluDecomposition {
    p: Permutation,
    l: Array2<f64>,
    u: Array2<f64>,
}

/// Result of an LU factorization without pivoting: `A = L·U`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LuParts")]
pub struct LuDecomposition {
    l: Array2<f64>,
    u: Array2<f64>,
}

// Unchecked wire forms; shapes are validated before a decomposition is built.
#[derive(Deserialize)]
struct PluParts {
    p: Permutation,
    l: Array2<f64>,
    u: Array2<f64>,
}

#[derive(Deserialize)]
struct LuParts {
    l: Array2<f64>,
    u: Array2<f64>,
}

impl TryFrom<PluParts> for PluDecomposition {
    type Error = FactorizationError;

    fn try_from(parts: PluParts) -> Result<Self> {
        let n = check_factor_shapes(&parts.l, &parts.u)?;
        if parts.p.len() != n {
            return Err(FactorizationError::DimensionMismatch {
                expected: n,
                got: parts.p.len(),
            });
        }
        Ok(PluDecomposition {
            p: parts.p,
            l: parts.l,
            u: parts.u,
        })
    }
}

impl TryFrom<LuParts> for LuDecomposition {
    type Error = FactorizationError;

    fn try_from(parts: LuParts) -> Result<Self> {
        check_factor_shapes(&parts.l, &parts.u)?;
        Ok(LuDecomposition { l: parts.l, u: parts.u })
    }
}

/// `u` must be square and non-empty, and `l` must have the same shape.
fn check_factor_shapes(l: &Array2<f64>, u: &Array2<f64>) -> Result<usize> {
    let n = validate_square(u.view())?;
    if l.dim() != (n, n) {
        let got = if l.nrows() != n { l.nrows() } else { l.ncols() };
        return Err(FactorizationError::DimensionMismatch { expected: n, got });
    }
    Ok(n)
}

impl From<EliminationOutput> for PluDecomposition {
    fn from(output: EliminationOutput) -> Self {
        PluDecomposition {
            p: output.permutation,
            l: output.lower,
            u: output.upper,
        }
    }
}

impl From<EliminationOutput> for LuDecomposition {
    fn from(output: EliminationOutput) -> Self {
        LuDecomposition {
            l: output.lower,
            u: output.upper,
        }
    }
}

impl PluDecomposition {
    /// Splits a packed factorization (L strictly below the diagonal, U on and above it)
    /// into separate factors.
    ///
    /// The unit diagonal of L is implicit in the packed form and is filled in here.
    ///
    /// # Errors
    /// Returns an error if `packed` is not square and non-empty, or if `p` has a
    /// different length than `packed`.
    pub fn from_packed(packed: ArrayView2<f64>, p: Permutation) -> Result<Self> {
        let n = validate_square(packed)?;
        if p.len() != n {
            return Err(FactorizationError::DimensionMismatch {
                expected: n,
                got: p.len(),
            });
        }
        let l = Array2::from_shape_fn((n, n), |(i, j)| match i.cmp(&j) {
            std::cmp::Ordering::Greater => packed[[i, j]],
            std::cmp::Ordering::Equal => 1.0,
            std::cmp::Ordering::Less => 0.0,
        });
        let u = Array2::from_shape_fn((n, n), |(i, j)| if i <= j { packed[[i, j]] } else { 0.0 });
        Ok(PluDecomposition { p, l, u })
    }

    /// Packs L (without its diagonal) and U into a single matrix.
    pub fn to_packed(&self) -> Array2<f64> {
        pack_factors(&self.l, &self.u)
    }

    /// Dimension `n` of the factored matrix.
    pub fn n(&self) -> usize {
        self.u.nrows()
    }

    pub fn p(&self) -> &Permutation {
        &self.p
    }

    pub fn l(&self) -> &Array2<f64> {
        &self.l
    }

    pub fn u(&self) -> &Array2<f64> {
        &self.u
    }

    /// Consumes the decomposition, returning `(P, L, U)`.
    pub fn into_parts(self) -> (Permutation, Array2<f64>, Array2<f64>) {
        (self.p, self.l, self.u)
    }

    /// `L·U`, which equals `Π·A` up to rounding.
    pub fn permuted_product(&self) -> Array2<f64> {
        self.l.dot(&self.u)
    }

    /// Recovers `A = Πᵀ·L·U`.
    pub fn reconstruct(&self) -> Array2<f64> {
        let product = self.permuted_product();
        let inverse = self.p.inverse();
        let mut original = Array2::<f64>::zeros(product.dim());
        for (i, &row) in inverse.as_slice().iter().enumerate() {
            original.row_mut(i).assign(&product.row(row));
        }
        original
    }

    /// Checks `Π·A ≈ L·U` elementwise, with `relative_tolerance` scaled by the
    /// largest absolute entry of `a` (and never below an absolute `relative_tolerance`).
    pub fn reconstructs(&self, a: ArrayView2<f64>, relative_tolerance: f64) -> bool {
        if a.dim() != self.u.dim() {
            return false;
        }
        let permuted = match self.p.apply_rows(a) {
            Ok(permuted) => permuted,
            Err(_) => return false,
        };
        matrices_close(permuted.view(), self.permuted_product().view(), relative_tolerance)
    }

    /// Solves `A·x = b` using the factors.
    ///
    /// # Errors
    /// `DimensionMismatch` if `b.len() != n`; `Singular` if U has a zero on its diagonal.
    pub fn solve(&self, b: &Array1<f64>) -> Result<Array1<f64>> {
        let n = self.n();
        if b.len() != n {
            return Err(FactorizationError::DimensionMismatch { expected: n, got: b.len() });
        }
        let mut x = Array1::from_shape_fn(n, |i| b[self.p[i]]);
        forward_substitution(&self.l, &mut x);
        back_substitution(&self.u, &mut x)?;
        Ok(x)
    }

    /// Solves `A·X = B` column by column.
    pub fn solve_matrix(&self, b: &Array2<f64>) -> Result<Array2<f64>> {
        solve_columns(self.n(), b, |column| self.solve(column))
    }

    /// `det(A) = sign(P) · Π U[k][k]`.
    pub fn determinant(&self) -> f64 {
        self.p.sign() * self.u.diag().iter().product::<f64>()
    }

    /// `A⁻¹`, obtained by solving against the identity.
    pub fn inverse(&self) -> Result<Array2<f64>> {
        self.solve_matrix(&Array2::eye(self.n()))
    }
}

impl LuDecomposition {
    pub fn n(&self) -> usize {
        self.u.nrows()
    }

    pub fn l(&self) -> &Array2<f64> {
        &self.l
    }

    pub fn u(&self) -> &Array2<f64> {
        &self.u
    }

    /// Consumes the decomposition, returning `(L, U)`.
    pub fn into_parts(self) -> (Array2<f64>, Array2<f64>) {
        (self.l, self.u)
    }

    pub fn to_packed(&self) -> Array2<f64> {
        pack_factors(&self.l, &self.u)
    }

    /// `L·U`, which equals `A` up to rounding.
    pub fn reconstruct(&self) -> Array2<f64> {
        self.l.dot(&self.u)
    }

    pub fn reconstructs(&self, a: ArrayView2<f64>, relative_tolerance: f64) -> bool {
        a.dim() == self.u.dim() && matrices_close(a, self.reconstruct().view(), relative_tolerance)
    }

    pub fn solve(&self, b: &Array1<f64>) -> Result<Array1<f64>> {
        let n = self.n();
        if b.len() != n {
            return Err(FactorizationError::DimensionMismatch { expected: n, got: b.len() });
        }
        let mut x = b.clone();
        forward_substitution(&self.l, &mut x);
        back_substitution(&self.u, &mut x)?;
        Ok(x)
    }

    pub fn solve_matrix(&self, b: &Array2<f64>) -> Result<Array2<f64>> {
        solve_columns(self.n(), b, |column| self.solve(column))
    }

    pub fn determinant(&self) -> f64 {
        self.u.diag().iter().product()
    }

    pub fn inverse(&self) -> Result<Array2<f64>> {
        self.solve_matrix(&Array2::eye(self.n()))
    }
}

fn pack_factors(l: &Array2<f64>, u: &Array2<f64>) -> Array2<f64> {
    Array2::from_shape_fn(u.dim(), |(i, j)| if i > j { l[[i, j]] } else { u[[i, j]] })
}

// L has a unit diagonal, so no division is needed.
fn forward_substitution(l: &Array2<f64>, x: &mut Array1<f64>) {
    for i in 1..x.len() {
        let mut sum = x[i];
        for j in 0..i {
            sum -= l[[i, j]] * x[j];
        }
        x[i] = sum;
    }
}

fn back_substitution(u: &Array2<f64>, x: &mut Array1<f64>) -> Result<()> {
    let n = x.len();
    for i in (0..n).rev() {
        let mut sum = x[i];
        for j in (i + 1)..n {
            sum -= u[[i, j]] * x[j];
        }
        let diagonal = u[[i, i]];
        if diagonal == 0.0 {
            return Err(FactorizationError::Singular { step: i });
        }
        x[i] = sum / diagonal;
    }
    Ok(())
}

fn solve_columns<F>(n: usize, b: &Array2<f64>, mut solve: F) -> Result<Array2<f64>>
where
    F: FnMut(&Array1<f64>) -> Result<Array1<f64>>,
{
    if b.nrows() != n {
        return Err(FactorizationError::DimensionMismatch { expected: n, got: b.nrows() });
    }
    let mut solution = Array2::<f64>::zeros(b.dim());
    for (j, column) in b.axis_iter(Axis(1)).enumerate() {
        let x = solve(&column.to_owned())?;
        solution.column_mut(j).assign(&x);
    }
    Ok(solution)
}

fn matrices_close(expected: ArrayView2<f64>, actual: ArrayView2<f64>, relative_tolerance: f64) -> bool {
    let margin = F64Margin {
        epsilon: relative_tolerance * max_abs(expected).max(1.0),
        ulps: 4,
    };
    expected
        .iter()
        .zip(actual.iter())
        .all(|(&e, &a)| e.approx_eq(a, margin))
}
