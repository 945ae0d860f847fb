//! Matrix type for 2D numeric data.

use super::random::{make_rng, standard_normal};
use super::Vector;
use crate::error::{ExplicarError, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A 2D matrix of floating-point values (row-major storage).
///
/// # Examples
///
/// ```
/// use explicar::primitives::Matrix;
///
/// let m = Matrix::from_vec(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
///     .expect("data length matches rows * cols");
/// assert_eq!(m.shape(), (2, 3));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix<T> {
    data: Vec<T>,
    rows: usize,
    cols: usize,
}

/// Settings for the jittered inverse used on singular or ill-conditioned
/// systems.
///
/// The defaults are empirical: they keep `M·M⁺·M ≈ M` on the singular
/// systems the regression solvers meet, nothing stronger is claimed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JitterConfig {
    /// Number of jittered inversions to try.
    pub attempts: usize,
    /// Noise standard deviation, relative to the largest absolute entry.
    pub scale: f64,
    /// Accepted `max|M·X·M − M|`, relative to `max(1, max|M|)`.
    pub tolerance: f64,
    /// Seed for the noise stream (None = entropy).
    pub seed: Option<u64>,
}

impl Default for JitterConfig {
    fn default() -> Self {
        Self {
            attempts: 10,
            scale: 1e-8,
            tolerance: 1e-6,
            seed: Some(0),
        }
    }
}

impl JitterConfig {
    /// Set the number of attempts.
    #[must_use]
    pub fn with_attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts;
        self
    }

    /// Set the relative noise scale.
    #[must_use]
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Set the noise seed.
    #[must_use]
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Check parameter ranges.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHyperparameter` for a zero attempt budget or a
    /// non-positive scale/tolerance.
    pub fn validate(&self) -> Result<()> {
        if self.attempts == 0 {
            return Err(ExplicarError::invalid_hyperparameter(
                "jitter.attempts",
                self.attempts,
                ">0",
            ));
        }
        if !(self.scale > 0.0 && self.scale.is_finite()) {
            return Err(ExplicarError::invalid_hyperparameter(
                "jitter.scale",
                self.scale,
                "finite and >0",
            ));
        }
        if !(self.tolerance > 0.0 && self.tolerance.is_finite()) {
            return Err(ExplicarError::invalid_hyperparameter(
                "jitter.tolerance",
                self.tolerance,
                "finite and >0",
            ));
        }
        Ok(())
    }
}

impl<T: Copy> Matrix<T> {
    /// Creates a new matrix from a vector of data.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if data length doesn't match rows * cols.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(ExplicarError::dimension_mismatch(
                "rows*cols",
                rows * cols,
                data.len(),
            ));
        }
        Ok(Self { data, rows, cols })
    }

    /// Creates a matrix from equally sized rows.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if rows have different lengths.
    pub fn from_rows(rows: &[Vec<T>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            if row.len() != cols {
                return Err(ExplicarError::dimension_mismatch("cols", cols, row.len()));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            data,
            rows: rows.len(),
            cols,
        })
    }

    /// Returns the shape as (rows, cols).
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.cols
    }

    /// Gets element at (row, col).
    ///
    /// # Panics
    ///
    /// Panics if indices are out of bounds.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[row * self.cols + col]
    }

    /// Sets element at (row, col).
    ///
    /// # Panics
    ///
    /// Panics if indices are out of bounds.
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        self.data[row * self.cols + col] = value;
    }

    /// Returns a row as a Vector.
    #[must_use]
    pub fn row(&self, row_idx: usize) -> Vector<T> {
        let start = row_idx * self.cols;
        let end = start + self.cols;
        Vector::from_slice(&self.data[start..end])
    }

    /// Returns a column as a Vector.
    #[must_use]
    pub fn column(&self, col_idx: usize) -> Vector<T> {
        let data: Vec<T> = (0..self.rows)
            .map(|row| self.data[row * self.cols + col_idx])
            .collect();
        Vector::from_vec(data)
    }

    /// Keeps the listed columns, in the listed order.
    ///
    /// # Panics
    ///
    /// Panics if a column index is out of bounds.
    #[must_use]
    pub fn select_columns(&self, indices: &[usize]) -> Self {
        let mut data = Vec::with_capacity(self.rows * indices.len());
        for row in 0..self.rows {
            for &col in indices {
                assert!(col < self.cols, "column {col} out of bounds");
                data.push(self.data[row * self.cols + col]);
            }
        }
        Self {
            data,
            rows: self.rows,
            cols: indices.len(),
        }
    }

    /// Returns the underlying data as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }
}

impl Matrix<f64> {
    /// Creates a matrix of zeros.
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: vec![0.0; rows * cols],
            rows,
            cols,
        }
    }

    /// Creates an identity matrix.
    #[must_use]
    pub fn eye(n: usize) -> Self {
        let mut data = vec![0.0; n * n];
        for i in 0..n {
            data[i * n + i] = 1.0;
        }
        Self {
            data,
            rows: n,
            cols: n,
        }
    }

    /// Transposes the matrix.
    #[must_use]
    pub fn transpose(&self) -> Self {
        let mut data = vec![0.0; self.rows * self.cols];
        for i in 0..self.rows {
            for j in 0..self.cols {
                data[j * self.rows + i] = self.data[i * self.cols + j];
            }
        }
        Self {
            data,
            rows: self.cols,
            cols: self.rows,
        }
    }

    /// Matrix-matrix multiplication.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if inner dimensions differ.
    pub fn matmul(&self, other: &Self) -> Result<Self> {
        if self.cols != other.rows {
            return Err(ExplicarError::dimension_mismatch(
                "lhs.cols",
                self.cols,
                other.rows,
            ));
        }

        let mut result = vec![0.0; self.rows * other.cols];
        for i in 0..self.rows {
            for k in 0..self.cols {
                let a = self.data[i * self.cols + k];
                if a == 0.0 {
                    continue;
                }
                for j in 0..other.cols {
                    result[i * other.cols + j] += a * other.data[k * other.cols + j];
                }
            }
        }

        Ok(Self {
            data: result,
            rows: self.rows,
            cols: other.cols,
        })
    }

    /// Matrix-vector multiplication.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if columns don't match the vector length.
    pub fn matvec(&self, vec: &Vector<f64>) -> Result<Vector<f64>> {
        if self.cols != vec.len() {
            return Err(ExplicarError::dimension_mismatch(
                "matrix.cols",
                self.cols,
                vec.len(),
            ));
        }

        let result: Vec<f64> = (0..self.rows)
            .map(|i| {
                self.data[i * self.cols..(i + 1) * self.cols]
                    .iter()
                    .zip(vec.as_slice())
                    .map(|(a, b)| a * b)
                    .sum()
            })
            .collect();

        Ok(Vector::from_vec(result))
    }

    /// Element-wise sum.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if shapes differ.
    pub fn add(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, |a, b| a + b)
    }

    /// Element-wise difference.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if shapes differ.
    pub fn sub(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, |a, b| a - b)
    }

    fn zip_with(&self, other: &Self, op: impl Fn(f64, f64) -> f64) -> Result<Self> {
        if self.shape() != other.shape() {
            return Err(ExplicarError::DimensionMismatch {
                expected: format!("{}x{}", self.rows, self.cols),
                actual: format!("{}x{}", other.rows, other.cols),
            });
        }
        let data = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&a, &b)| op(a, b))
            .collect();
        Ok(Self {
            data,
            rows: self.rows,
            cols: self.cols,
        })
    }

    /// Multiplies each element by a scalar.
    #[must_use]
    pub fn mul_scalar(&self, scalar: f64) -> Self {
        Self {
            data: self.data.iter().map(|x| x * scalar).collect(),
            rows: self.rows,
            cols: self.cols,
        }
    }

    /// Multiplies row `i` by `factors[i]`.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if there is not one factor per row.
    pub fn scale_rows(&self, factors: &Vector<f64>) -> Result<Self> {
        if factors.len() != self.rows {
            return Err(ExplicarError::dimension_mismatch(
                "factors",
                self.rows,
                factors.len(),
            ));
        }
        let mut data = self.data.clone();
        for (row, chunk) in data.chunks_mut(self.cols.max(1)).enumerate().take(self.rows) {
            let f = factors[row];
            chunk.iter_mut().for_each(|x| *x *= f);
        }
        Ok(Self {
            data,
            rows: self.rows,
            cols: self.cols,
        })
    }

    /// Column means weighted by `weights` (one weight per row).
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if there is not one weight per row, and
    /// `DegenerateInput` if the weights sum to zero.
    pub fn weighted_column_means(&self, weights: &Vector<f64>) -> Result<Vector<f64>> {
        if weights.len() != self.rows {
            return Err(ExplicarError::dimension_mismatch(
                "weights",
                self.rows,
                weights.len(),
            ));
        }
        let total = weights.sum();
        if total == 0.0 {
            return Err(ExplicarError::degenerate("weights sum to zero"));
        }
        let mut means = vec![0.0; self.cols];
        for row in 0..self.rows {
            let w = weights[row];
            for (col, mean) in means.iter_mut().enumerate() {
                *mean += w * self.data[row * self.cols + col];
            }
        }
        Ok(means.into_iter().map(|m| m / total).collect())
    }

    /// Subtracts `offsets[j]` from every entry of column `j`.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if there is not one offset per column.
    pub fn center_columns(&self, offsets: &Vector<f64>) -> Result<Self> {
        if offsets.len() != self.cols {
            return Err(ExplicarError::dimension_mismatch(
                "offsets",
                self.cols,
                offsets.len(),
            ));
        }
        let mut data = self.data.clone();
        for (i, x) in data.iter_mut().enumerate() {
            *x -= offsets[i % self.cols];
        }
        Ok(Self {
            data,
            rows: self.rows,
            cols: self.cols,
        })
    }

    /// Largest absolute entry, 0 for an empty matrix.
    #[must_use]
    pub fn max_abs(&self) -> f64 {
        self.data.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()))
    }

    /// Returns true if every entry is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }

    /// Inverts a square matrix by Gauss-Jordan elimination with partial
    /// pivoting.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` for a non-square matrix and
    /// `DegenerateInput` when a pivot vanishes (singular within
    /// `n·ε·max|M|`) or the matrix holds non-finite values.
    pub fn invert(&self) -> Result<Self> {
        if self.rows != self.cols {
            return Err(ExplicarError::DimensionMismatch {
                expected: "square matrix".to_string(),
                actual: format!("{}x{}", self.rows, self.cols),
            });
        }
        if !self.is_finite() {
            return Err(ExplicarError::degenerate("matrix holds non-finite values"));
        }

        let n = self.rows;
        let tol = n as f64 * f64::EPSILON * self.max_abs().max(f64::MIN_POSITIVE);
        let mut a = self.data.clone();
        let mut inv = Self::eye(n).data;

        for col in 0..n {
            let (pivot_row, pivot_abs) = (col..n)
                .map(|r| (r, a[r * n + col].abs()))
                .fold((col, -1.0), |best, cur| if cur.1 > best.1 { cur } else { best });
            if pivot_abs <= tol {
                return Err(ExplicarError::degenerate(format!(
                    "singular matrix: pivot {pivot_abs:e} in column {col}"
                )));
            }
            if pivot_row != col {
                for j in 0..n {
                    a.swap(col * n + j, pivot_row * n + j);
                    inv.swap(col * n + j, pivot_row * n + j);
                }
            }

            let pivot = a[col * n + col];
            for j in 0..n {
                a[col * n + j] /= pivot;
                inv[col * n + j] /= pivot;
            }

            for r in 0..n {
                if r == col {
                    continue;
                }
                let factor = a[r * n + col];
                if factor == 0.0 {
                    continue;
                }
                for j in 0..n {
                    a[r * n + j] -= factor * a[col * n + j];
                    inv[r * n + j] -= factor * inv[col * n + j];
                }
            }
        }

        Ok(Self {
            data: inv,
            rows: n,
            cols: n,
        })
    }

    /// `max|M·X·M − M|`, the generalized-inverse residual of `X` for `M`.
    ///
    /// Returns infinity when shapes do not line up or the product overflows.
    #[must_use]
    pub fn pseudo_inverse_residual(&self, candidate: &Self) -> f64 {
        let product = self
            .matmul(candidate)
            .and_then(|mx| mx.matmul(self))
            .and_then(|mxm| mxm.sub(self));
        match product {
            Ok(diff) if diff.is_finite() => diff.max_abs(),
            _ => f64::INFINITY,
        }
    }

    /// Inverts a square matrix, falling back to jittered inversion when the
    /// matrix is singular or ill-conditioned.
    ///
    /// A plain inverse is returned when it satisfies the residual check.
    /// Otherwise independent Gaussian noise (standard deviation
    /// `scale · max|M|`) is added to `M` and the perturbed matrix is inverted,
    /// up to `attempts` times; the first inverse whose residual
    /// `max|M·X·M − M|` is within `tolerance · max(1, max|M|)` is returned.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` for a non-square matrix and
    /// `DegenerateInput` once the attempt budget is exhausted.
    ///
    /// # Examples
    ///
    /// ```
    /// use explicar::primitives::{JitterConfig, Matrix};
    ///
    /// let singular = Matrix::from_vec(2, 2, vec![1.0, 2.0, 2.0, 4.0]).unwrap();
    /// let pinv = singular.safe_invert(&JitterConfig::default()).unwrap();
    /// assert!(singular.pseudo_inverse_residual(&pinv) < 1e-4);
    /// ```
    pub fn safe_invert(&self, config: &JitterConfig) -> Result<Self> {
        if self.rows != self.cols {
            return Err(ExplicarError::DimensionMismatch {
                expected: "square matrix".to_string(),
                actual: format!("{}x{}", self.rows, self.cols),
            });
        }
        config.validate()?;

        let magnitude = self.max_abs();
        let accepted = config.tolerance * magnitude.max(1.0);

        let plain_residual = match self.invert() {
            Ok(inv) => {
                let residual = self.pseudo_inverse_residual(&inv);
                if residual <= accepted {
                    return Ok(inv);
                }
                residual
            }
            Err(ExplicarError::DegenerateInput { .. }) => f64::INFINITY,
            Err(e) => return Err(e),
        };
        warn!(
            n = self.rows,
            residual = plain_residual,
            "ill-conditioned system, falling back to jittered inverse"
        );

        let sigma = config.scale * if magnitude > 0.0 { magnitude } else { 1.0 };
        let mut rng = make_rng(config.seed);
        let mut best_residual = f64::INFINITY;

        for _ in 0..config.attempts {
            let mut jittered = self.clone();
            for x in &mut jittered.data {
                *x += sigma * standard_normal(&mut rng);
            }
            let Ok(inv) = jittered.invert() else {
                continue;
            };
            let residual = self.pseudo_inverse_residual(&inv);
            if residual <= accepted {
                return Ok(inv);
            }
            best_residual = best_residual.min(residual);
        }

        Err(ExplicarError::degenerate(format!(
            "jittered inverse did not stabilise after {} attempts \
             (best residual {best_residual:e})",
            config.attempts
        )))
    }
}

#[cfg(test)]
#[path = "matrix_tests.rs"]
mod tests;
