//! Lasso model selection by information criterion.

use super::lars::LarsPath;
use crate::error::{ExplicarError, Result};
use crate::primitives::{Matrix, Vector};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Information criterion used to pick a point on the lasso path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Criterion {
    /// Akaike: penalty `2` per non-zero coefficient.
    Aic,
    /// Bayes: penalty `ln(n)` per non-zero coefficient.
    Bic,
}

/// Lasso fit whose regularization is chosen by AIC or BIC over the
/// [`LarsPath`].
///
/// For every step of the path the criterion
///
/// ```text
/// n · mse / (var(y) + ε) + K · df
/// ```
///
/// is computed, where `df` counts coefficients with `|β| > ε` and `K` is
/// `2` (AIC) or `ln n` (BIC). The first minimizing step wins, so ties go to
/// the sparser model.
///
/// # Examples
///
/// ```
/// use explicar::linear_model::{Criterion, LassoLarsIc};
/// use explicar::primitives::{Matrix, Vector};
///
/// let x = Matrix::from_rows(&[
///     vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0], vec![2.0, 0.0], vec![0.0, 2.0],
/// ]).unwrap();
/// let y = Vector::from_slice(&[3.0, 1.0, 4.0, 5.0, 1.0]);
/// let fit = LassoLarsIc::new(Criterion::Bic).fit(&x, &y).unwrap();
/// assert!(fit.coefficients[0] > 1.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LassoLarsIc {
    criterion: Criterion,
    max_iter: usize,
    fit_intercept: bool,
    normalize: bool,
}

/// Output of [`LassoLarsIc::fit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LassoLarsIcResult {
    /// Regularization strength of the chosen step
    pub alpha: f64,
    /// Coefficients on the original feature scale
    pub coefficients: Vector<f64>,
    /// Intercept, 0 when not fitted
    pub intercept: f64,
    /// Index of the chosen step on the path
    pub best_step: usize,
    /// Criterion value per path step
    pub criterion_values: Vec<f64>,
    /// Alphas of the underlying path
    pub alphas: Vec<f64>,
    /// Active set of the underlying path, in selection order
    pub active: Vec<usize>,
}

impl LassoLarsIcResult {
    /// Indices of the non-zero coefficients, ascending.
    #[must_use]
    pub fn selected(&self) -> Vec<usize> {
        self.coefficients
            .iter()
            .enumerate()
            .filter(|(_, c)| c.abs() > f64::EPSILON)
            .map(|(i, _)| i)
            .collect()
    }
}

impl LassoLarsIc {
    /// Creates a selector with intercept, column normalization and
    /// `max_iter = 500`.
    #[must_use]
    pub fn new(criterion: Criterion) -> Self {
        Self {
            criterion,
            max_iter: 500,
            fit_intercept: true,
            normalize: true,
        }
    }

    /// Sets the maximum number of path steps.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Sets whether to center the data and fit an intercept.
    #[must_use]
    pub fn with_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    /// Sets whether columns are scaled to unit L2 norm before the path.
    #[must_use]
    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// Fits the path and selects the best step.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if `y` length differs from the row count
    /// and `DegenerateInput` for zero samples.
    pub fn fit(&self, x: &Matrix<f64>, y: &Vector<f64>) -> Result<LassoLarsIcResult> {
        let (n_samples, n_features) = x.shape();
        if y.len() != n_samples {
            return Err(ExplicarError::dimension_mismatch("y", n_samples, y.len()));
        }
        if n_samples == 0 {
            return Err(ExplicarError::degenerate("no samples to select features from"));
        }

        let ones = Vector::ones(n_samples);
        let (x_work, y_work, x_mean, y_mean) = if self.fit_intercept {
            let x_mean = x.weighted_column_means(&ones)?;
            let y_mean = y.mean();
            (x.center_columns(&x_mean)?, y.add_scalar(-y_mean), x_mean, y_mean)
        } else {
            (x.clone(), y.clone(), Vector::zeros(n_features), 0.0)
        };

        let x_scale: Vector<f64> = if self.normalize {
            (0..n_features)
                .map(|j| {
                    let norm = x_work.column(j).norm();
                    if norm == 0.0 {
                        1.0
                    } else {
                        norm
                    }
                })
                .collect()
        } else {
            Vector::ones(n_features)
        };
        let inv_scale: Vector<f64> = x_scale.iter().map(|s| 1.0 / s).collect();
        let x_work = x_work.transpose().scale_rows(&inv_scale)?.transpose();

        let path = LarsPath::new()
            .with_max_iter(self.max_iter)
            .fit(&x_work, &y_work)?;

        let n = n_samples as f64;
        let penalty = match self.criterion {
            Criterion::Aic => 2.0,
            Criterion::Bic => n.ln(),
        };
        let sigma2 = y_work.variance();

        let mut criterion_values = Vec::with_capacity(path.coefs.len());
        for coef in &path.coefs {
            let residual = y_work.sub(&x_work.matvec(coef)?);
            let mse = residual.dot(&residual) / n;
            let df = coef.iter().filter(|c| c.abs() > f64::EPSILON).count();
            criterion_values.push(n * mse / (sigma2 + f64::EPSILON) + penalty * df as f64);
        }

        let best_step = criterion_values
            .iter()
            .enumerate()
            .fold((0, f64::INFINITY), |(bi, bv), (i, &v)| {
                if v < bv {
                    (i, v)
                } else {
                    (bi, bv)
                }
            })
            .0;

        let coefficients: Vector<f64> = path.coefs[best_step]
            .iter()
            .zip(x_scale.iter())
            .map(|(c, s)| c / s)
            .collect();
        let intercept = if self.fit_intercept {
            y_mean - x_mean.dot(&coefficients)
        } else {
            0.0
        };

        debug!(
            criterion = ?self.criterion,
            best_step,
            steps = path.coefs.len(),
            alpha = path.alphas[best_step],
            "lasso path model selected"
        );

        Ok(LassoLarsIcResult {
            alpha: path.alphas[best_step],
            coefficients,
            intercept,
            best_step,
            criterion_values,
            alphas: path.alphas,
            active: path.active,
        })
    }
}

#[cfg(test)]
#[path = "tests_lars.rs"]
mod tests;
