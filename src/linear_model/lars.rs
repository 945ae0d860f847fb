//! Least angle regression, lasso variant.

use crate::error::{ExplicarError, Result};
use crate::primitives::{Matrix, Vector};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

/// Smallest positive normal `f32`; keeps step ratios finite.
const TINY32: f64 = f32::MIN_POSITIVE as f64;
/// `f32` machine epsilon; tolerance for reaching `alpha_min`.
const EQUALITY_TOLERANCE: f64 = f32::EPSILON as f64;
/// Cholesky diagonal below which a new regressor is degenerate.
const DEGENERATE_DIAGONAL: f64 = 1e-7;
/// Decimal places kept in the equiangular correlations.
const COV_PRECISION: i32 = 15;

/// Lasso regularization path by least angle regression.
///
/// At every step the inactive feature most correlated with the residual
/// joins the active set (ties go to the smallest feature index), and the
/// coefficients move along the equiangular direction until another feature
/// reaches the same correlation or an active coefficient would change sign.
/// In the latter case that feature leaves the active set (lasso
/// modification). The path ends when `alpha = max|Xᵀr| / n` reaches
/// `alpha_min` or after `max_iter` steps.
///
/// `X` and `y` are used as given; no centering or scaling is applied.
///
/// # Examples
///
/// ```
/// use explicar::linear_model::LarsPath;
/// use explicar::primitives::{Matrix, Vector};
///
/// let x = Matrix::eye(3);
/// let y = Vector::from_slice(&[1.0, -4.0, 2.0]);
/// let path = LarsPath::new().fit(&x, &y).unwrap();
/// assert_eq!(path.active, vec![1, 2, 0]);
/// assert_eq!(path.alphas.last().copied(), Some(0.0));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LarsPath {
    max_iter: usize,
    alpha_min: f64,
    return_path: bool,
}

/// Output of [`LarsPath::fit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LarsPathResult {
    /// Active features at the end of the path, in selection order
    pub active: Vec<usize>,
    /// Regularization strength per recorded step (non-increasing for a
    /// complete lasso path)
    pub alphas: Vec<f64>,
    /// Coefficient vector per recorded step
    pub coefs: Vec<Vector<f64>>,
    /// Number of steps taken
    pub n_iter: usize,
}

impl LarsPathResult {
    /// Coefficients at the last recorded step.
    #[must_use]
    pub fn final_coefs(&self) -> Option<&Vector<f64>> {
        self.coefs.last()
    }
}

impl Default for LarsPath {
    fn default() -> Self {
        Self::new()
    }
}

impl LarsPath {
    /// Path solver with `max_iter = 500`, `alpha_min = 0` and the full path
    /// recorded.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_iter: 500,
            alpha_min: 0.0,
            return_path: true,
        }
    }

    /// Sets the maximum number of steps.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Sets the regularization floor at which the path stops.
    #[must_use]
    pub fn with_alpha_min(mut self, alpha_min: f64) -> Self {
        self.alpha_min = alpha_min;
        self
    }

    /// Whether to keep every step or only the last one.
    #[must_use]
    pub fn with_return_path(mut self, return_path: bool) -> Self {
        self.return_path = return_path;
        self
    }

    /// Computes the path.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if `y` length differs from the row count,
    /// `DegenerateInput` for zero samples and `InvalidHyperparameter` for a
    /// negative or non-finite `alpha_min`.
    pub fn fit(&self, x: &Matrix<f64>, y: &Vector<f64>) -> Result<LarsPathResult> {
        let (n_samples, n_features) = x.shape();
        if y.len() != n_samples {
            return Err(ExplicarError::dimension_mismatch("y", n_samples, y.len()));
        }
        if n_samples == 0 {
            return Err(ExplicarError::degenerate("lars path needs at least one sample"));
        }
        if !(self.alpha_min >= 0.0 && self.alpha_min.is_finite()) {
            return Err(ExplicarError::invalid_hyperparameter(
                "alpha_min",
                self.alpha_min,
                "finite and >= 0",
            ));
        }

        let columns: Vec<Vector<f64>> = (0..n_features).map(|j| x.column(j)).collect();
        let n = n_samples as f64;

        let mut active: Vec<usize> = Vec::new();
        let mut sign_active: Vec<f64> = Vec::new();
        let mut inactive: Vec<usize> = (0..n_features).collect();
        let mut cov: Vec<f64> = columns.iter().map(|c| c.dot(y)).collect();
        let mut chol = Cholesky::default();

        let mut coef = vec![0.0; n_features];
        let mut prev_coef = vec![0.0; n_features];
        let mut prev_alpha = 0.0;
        let mut alphas: Vec<f64> = Vec::new();
        let mut coefs: Vec<Vector<f64>> = Vec::new();
        let mut n_iter = 0;
        let mut drop = false;

        loop {
            let strongest = argmax_abs(&cov, &inactive);
            let c_signed = strongest.map_or(0.0, |pos| cov[pos]);
            let c = c_signed.abs();
            let mut alpha = c / n;

            if alpha <= self.alpha_min + EQUALITY_TOLERANCE {
                if (alpha - self.alpha_min).abs() > EQUALITY_TOLERANCE {
                    if n_iter > 0 {
                        let ss = (prev_alpha - self.alpha_min) / (prev_alpha - alpha);
                        for (cj, pj) in coef.iter_mut().zip(&prev_coef) {
                            *cj = pj + ss * (*cj - pj);
                        }
                    }
                }
                alpha = self.alpha_min;
                alphas.push(alpha);
                coefs.push(Vector::from_slice(&coef));
                break;
            }

            if n_iter >= self.max_iter || active.len() >= n_features {
                alphas.push(alpha);
                coefs.push(Vector::from_slice(&coef));
                break;
            }

            if !drop {
                let Some(pos) = strongest else {
                    alphas.push(alpha);
                    coefs.push(Vector::from_slice(&coef));
                    break;
                };
                let feature = inactive[pos];
                if !chol.push(&columns, &active, feature) {
                    warn!(
                        feature,
                        step = n_iter,
                        "degenerate regressor in lars path, excluding its correlation"
                    );
                    cov[pos] = 0.0;
                    continue;
                }
                active.push(feature);
                sign_active.push(if c_signed < 0.0 { -1.0 } else { 1.0 });
                inactive.remove(pos);
                cov.remove(pos);
            }

            if n_iter > 0 && prev_alpha < alpha {
                warn!(
                    step = n_iter,
                    alpha, prev_alpha, "lasso alpha increased, stopping the path early"
                );
                alphas.push(alpha);
                coefs.push(Vector::from_slice(&coef));
                break;
            }

            let (least_squares, aa) = equiangular_weights(&chol, &sign_active);

            let mut eq_dir = vec![0.0; n_samples];
            for (&feature, &w) in active.iter().zip(&least_squares) {
                for (e, v) in eq_dir.iter_mut().zip(columns[feature].iter()) {
                    *e += w * v;
                }
            }
            let eq_dir = Vector::from_vec(eq_dir);
            let scale = 10f64.powi(COV_PRECISION);
            let corr_eq_dir: Vec<f64> = inactive
                .iter()
                .map(|&j| (columns[j].dot(&eq_dir) * scale).round() / scale)
                .collect();

            let g1 = min_pos(
                cov.iter()
                    .zip(&corr_eq_dir)
                    .map(|(cv, ce)| (c - cv) / (aa - ce + TINY32)),
            );
            let g2 = min_pos(
                cov.iter()
                    .zip(&corr_eq_dir)
                    .map(|(cv, ce)| (c + cv) / (aa + ce + TINY32)),
            );
            let mut gamma = g1.min(g2).min(c / aa);

            let z: Vec<f64> = active
                .iter()
                .zip(&least_squares)
                .map(|(&j, ls)| -coef[j] / (ls + TINY32))
                .collect();
            let z_pos = min_pos(z.iter().copied());
            let mut dropped_positions: Vec<usize> = Vec::new();
            drop = false;
            if z_pos < gamma {
                dropped_positions = (0..z.len()).filter(|&i| z[i] == z_pos).collect();
                gamma = z_pos;
                drop = true;
            }

            alphas.push(alpha);
            coefs.push(Vector::from_slice(&coef));
            prev_alpha = alpha;
            prev_coef.clone_from(&coef);
            n_iter += 1;

            coef = vec![0.0; n_features];
            for (&j, ls) in active.iter().zip(&least_squares) {
                coef[j] = prev_coef[j] + gamma * ls;
            }
            for (cv, ce) in cov.iter_mut().zip(&corr_eq_dir) {
                *cv -= gamma * ce;
            }
            trace!(step = n_iter, alpha, gamma, active = active.len(), "lars step");

            if drop {
                for &position in dropped_positions.iter().rev() {
                    let feature = active.remove(position);
                    sign_active.remove(position);
                    coef[feature] = 0.0;
                    inactive.insert(0, feature);
                    cov.insert(0, 0.0);
                }
                chol = Cholesky::rebuild(&columns, &active);

                let mut residual = y.clone();
                for &j in &active {
                    for (r, v) in (0..n_samples).zip(columns[j].iter()) {
                        residual[r] -= coef[j] * v;
                    }
                }
                let refreshed = dropped_positions.len();
                for (slot, &feature) in cov.iter_mut().zip(&inactive).take(refreshed) {
                    *slot = columns[feature].dot(&residual);
                }
            }
        }

        if !self.return_path {
            let last = alphas.len().saturating_sub(1);
            alphas.drain(..last);
            coefs.drain(..last);
        }

        Ok(LarsPathResult {
            active,
            alphas,
            coefs,
            n_iter,
        })
    }
}

/// Position in `cov` of the largest `|cov|`, ties broken by smallest
/// feature index.
fn argmax_abs(cov: &[f64], features: &[usize]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (pos, value) in cov.iter().enumerate() {
        best = match best {
            None => Some(pos),
            Some(b) => {
                let (cur, top) = (value.abs(), cov[b].abs());
                if cur > top || (cur == top && features[pos] < features[b]) {
                    Some(pos)
                } else {
                    Some(b)
                }
            }
        };
    }
    best
}

/// Smallest strictly positive value, `f64::MAX` when there is none.
fn min_pos(values: impl Iterator<Item = f64>) -> f64 {
    values
        .filter(|v| *v > 0.0)
        .fold(f64::MAX, f64::min)
}

/// Solves `G w = s` for the active Gram matrix and normalizes so that the
/// equiangular vector has unit correlation scale. Returns `(w·A, A)`.
fn equiangular_weights(chol: &Cholesky, sign_active: &[f64]) -> (Vec<f64>, f64) {
    let mut least_squares = chol.solve(sign_active);
    if least_squares.len() == 1 && least_squares[0] == 0.0 {
        least_squares[0] = 1.0;
        return (least_squares, 1.0);
    }

    let mut aa = 1.0 / dot(&least_squares, sign_active).sqrt();
    if !aa.is_finite() {
        let mut jittered = chol.clone();
        let mut i = 0;
        while !aa.is_finite() {
            jittered.add_to_diagonal(2f64.powi(i) * f64::EPSILON);
            least_squares = jittered.solve(sign_active);
            let tmp = dot(&least_squares, sign_active).max(f64::EPSILON);
            aa = 1.0 / tmp.sqrt();
            i += 1;
        }
    }
    for w in &mut least_squares {
        *w *= aa;
    }
    (least_squares, aa)
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Lower-triangular Cholesky factor of the active Gram matrix, grown one
/// column at a time.
#[derive(Debug, Clone, Default)]
struct Cholesky {
    rows: Vec<Vec<f64>>,
}

impl Cholesky {
    /// Appends `feature` to the factor. Returns false, leaving the factor
    /// untouched, when the new diagonal would be degenerate.
    fn push(&mut self, columns: &[Vector<f64>], active: &[usize], feature: usize) -> bool {
        let column = &columns[feature];
        let c = column.dot(column);
        let b: Vec<f64> = active.iter().map(|&j| columns[j].dot(column)).collect();
        let l = self.forward(&b);
        let v = dot(&l, &l);
        let diag = (c - v).abs().sqrt().max(f64::EPSILON);
        if diag < DEGENERATE_DIAGONAL {
            return false;
        }
        let mut row = l;
        row.push(diag);
        self.rows.push(row);
        true
    }

    fn rebuild(columns: &[Vector<f64>], active: &[usize]) -> Self {
        let mut chol = Self::default();
        for (k, &feature) in active.iter().enumerate() {
            let column = &columns[feature];
            let b: Vec<f64> = active[..k].iter().map(|&j| columns[j].dot(column)).collect();
            let l = chol.forward(&b);
            let diag = (column.dot(column) - dot(&l, &l)).abs().sqrt().max(f64::EPSILON);
            let mut row = l;
            row.push(diag);
            chol.rows.push(row);
        }
        chol
    }

    fn add_to_diagonal(&mut self, delta: f64) {
        for (i, row) in self.rows.iter_mut().enumerate() {
            row[i] += delta;
        }
    }

    /// Solves `L x = b`.
    fn forward(&self, b: &[f64]) -> Vec<f64> {
        let mut x = Vec::with_capacity(b.len());
        for (i, row) in self.rows.iter().enumerate() {
            let s: f64 = (0..i).map(|k| row[k] * x[k]).sum();
            x.push((b[i] - s) / row[i]);
        }
        x
    }

    /// Solves `L Lᵀ x = b`.
    fn solve(&self, b: &[f64]) -> Vec<f64> {
        let mut x = self.forward(b);
        let k = self.rows.len();
        for i in (0..k).rev() {
            let s: f64 = ((i + 1)..k).map(|r| self.rows[r][i] * x[r]).sum();
            x[i] = (x[i] - s) / self.rows[i][i];
        }
        x
    }
}
