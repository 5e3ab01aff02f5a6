// src/permutation.rs

use crate::error::{FactorizationError, Result};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// Row permutation stored as a vector.
///
/// Entry `i` names the original row that ends up in position `i`, so row `i`
/// of `P·A` is row `perm[i]` of `A`. The matrix form satisfies `Π[i][perm[i]] = 1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct Permutation {
    perm: Vec<usize>,
}

impl Permutation {
    /// The identity permutation `(0, 1, ..., n - 1)`.
    pub fn identity(n: usize) -> Self {
        Self { perm: (0..n).collect() }
    }

    /// Builds a permutation after checking that `perm` holds each of `0..perm.len()` exactly once.
    pub fn try_from_vec(perm: Vec<usize>) -> Result<Self> {
        let n = perm.len();
        let mut seen = vec![false; n];
        for (position, &row) in perm.iter().enumerate() {
            if row >= n {
                return Err(FactorizationError::InvalidPermutation(format!(
                    "entry {} at position {} is out of range for length {}",
                    row, position, n
                )));
            }
            if seen[row] {
                return Err(FactorizationError::InvalidPermutation(format!(
                    "entry {} appears more than once",
                    row
                )));
            }
            seen[row] = true;
        }
        Ok(Self { perm })
    }

    /// Converts LAPACK-style 1-based pivot indices into a permutation.
    ///
    /// `pivots[k]` says row `k` was interchanged with row `pivots[k] - 1` at step `k`;
    /// the swaps are replayed in order starting from the identity.
    pub fn from_lapack_pivots(pivots: &[i32]) -> Result<Self> {
        let n = pivots.len();
        let mut permutation = Self::identity(n);
        for (k, &pivot) in pivots.iter().enumerate() {
            if pivot < 1 || pivot as usize > n {
                return Err(FactorizationError::InvalidPermutation(format!(
                    "LAPACK pivot {} at step {} is outside 1..={}",
                    pivot, k, n
                )));
            }
            permutation.swap(k, pivot as usize - 1);
        }
        Ok(permutation)
    }

    pub fn len(&self) -> usize {
        self.perm.len()
    }

    pub fn is_empty(&self) -> bool {
        self.perm.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.perm
    }

    pub fn into_vec(self) -> Vec<usize> {
        self.perm
    }

    /// Exchanges positions `i` and `j`.
    pub fn swap(&mut self, i: usize, j: usize) {
        self.perm.swap(i, j);
    }

    /// True when every index in `0..n` appears exactly once.
    pub fn is_valid(&self) -> bool {
        let mut sorted = self.perm.clone();
        sorted.sort_unstable();
        sorted.iter().enumerate().all(|(i, &row)| i == row)
    }

    pub fn is_identity(&self) -> bool {
        self.perm.iter().enumerate().all(|(i, &row)| i == row)
    }

    /// Dense permutation matrix `Π` with `Π[i][perm[i]] = 1`.
    pub fn to_matrix(&self) -> Array2<f64> {
        let n = self.perm.len();
        let mut matrix = Array2::<f64>::zeros((n, n));
        for (i, &row) in self.perm.iter().enumerate() {
            matrix[[i, row]] = 1.0;
        }
        matrix
    }

    /// Returns `Π·B`: row `i` of the result is row `perm[i]` of `matrix`.
    pub fn apply_rows(&self, matrix: ArrayView2<f64>) -> Result<Array2<f64>> {
        if matrix.nrows() != self.perm.len() {
            return Err(FactorizationError::DimensionMismatch {
                expected: self.perm.len(),
                got: matrix.nrows(),
            });
        }
        let mut permuted = Array2::<f64>::zeros(matrix.dim());
        for (i, &row) in self.perm.iter().enumerate() {
            permuted.row_mut(i).assign(&matrix.row(row));
        }
        Ok(permuted)
    }

    /// The inverse permutation, so that `inverse()[perm[i]] == i`.
    pub fn inverse(&self) -> Self {
        let mut inverse = vec![0usize; self.perm.len()];
        for (i, &row) in self.perm.iter().enumerate() {
            inverse[row] = i;
        }
        Self { perm: inverse }
    }

    /// Number of transpositions modulo 2, computed from the cycle decomposition.
    pub fn parity(&self) -> usize {
        let n = self.perm.len();
        let mut visited = vec![false; n];
        let mut transpositions = 0;
        for start in 0..n {
            if visited[start] {
                continue;
            }
            let mut cycle_len = 0;
            let mut current = start;
            while !visited[current] {
                visited[current] = true;
                current = self.perm[current];
                cycle_len += 1;
            }
            transpositions += cycle_len - 1;
        }
        transpositions % 2
    }

    /// Determinant of the permutation matrix: `1.0` for even, `-1.0` for odd.
    pub fn sign(&self) -> f64 {
        if self.parity() == 0 {
            1.0
        } else {
            -1.0
        }
    }
}

impl TryFrom<Vec<usize>> for Permutation {
    type Error = FactorizationError;

    fn try_from(perm: Vec<usize>) -> Result<Self> {
        Self::try_from_vec(perm)
    }
}

impl From<Permutation> for Vec<usize> {
    fn from(permutation: Permutation) -> Self {
        permutation.perm
    }
}

impl std::ops::Index<usize> for Permutation {
    type Output = usize;

    fn index(&self, index: usize) -> &usize {
        &self.perm[index]
    }
}
