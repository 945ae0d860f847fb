//! Weighted least squares.

use crate::error::{ExplicarError, Result};
use crate::primitives::{JitterConfig, Matrix, Vector};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Weighted least squares regression.
///
/// Minimizes `Σ wᵢ (yᵢ − b − xᵢ·β)²` by solving the weighted normal
/// equations:
///
/// ```text
/// (XᵀWX) β = XᵀWy
/// ```
///
/// With an intercept, `X` and `y` are first centered by their weighted
/// means and the intercept is recovered as `ȳ − x̄·β`. A singular or
/// ill-conditioned `XᵀWX` is inverted through
/// [`Matrix::safe_invert`](crate::primitives::Matrix::safe_invert).
///
/// # Examples
///
/// ```
/// use explicar::linear_model::WeightedLinearRegression;
/// use explicar::primitives::{Matrix, Vector};
///
/// // y = 1 + 2x
/// let x = Matrix::from_vec(4, 1, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
/// let y = Vector::from_slice(&[3.0, 5.0, 7.0, 9.0]);
/// let w = Vector::from_slice(&[1.0, 2.0, 1.0, 0.5]);
///
/// let fit = WeightedLinearRegression::new().fit(&x, &y, &w).unwrap();
/// assert!((fit.coefficients[0] - 2.0).abs() < 1e-9);
/// assert!((fit.intercept - 1.0).abs() < 1e-9);
/// assert!(fit.mse < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedLinearRegression {
    fit_intercept: bool,
    jitter: JitterConfig,
}

impl Default for WeightedLinearRegression {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a weighted least squares fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedFit {
    /// Coefficients (excluding intercept)
    pub coefficients: Vector<f64>,
    /// Intercept, 0 when not fitted
    pub intercept: f64,
    /// Weighted mean squared residual `Σwr² / Σw`
    pub mse: f64,
    /// Weighted coefficient of determination
    pub r_squared: f64,
    /// Standard error per coefficient; NaN without residual degrees of freedom
    pub std_errors: Vector<f64>,
    /// Two-sided p-value per coefficient; NaN without residual degrees of freedom
    pub p_values: Vector<f64>,
}

impl WeightedFit {
    /// Predicts `b + X·β`.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if `x` has the wrong number of columns.
    pub fn predict(&self, x: &Matrix<f64>) -> Result<Vector<f64>> {
        Ok(x.matvec(&self.coefficients)?.add_scalar(self.intercept))
    }
}

impl WeightedLinearRegression {
    /// Creates a regression that fits an intercept.
    #[must_use]
    pub fn new() -> Self {
        Self {
            fit_intercept: true,
            jitter: JitterConfig::default(),
        }
    }

    /// Sets whether to fit an intercept term.
    #[must_use]
    pub fn with_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    /// Sets the jittered-inverse fallback parameters.
    #[must_use]
    pub fn with_jitter(mut self, jitter: JitterConfig) -> Self {
        self.jitter = jitter;
        self
    }

    /// Fits the model.
    ///
    /// # Errors
    ///
    /// - `DimensionMismatch` if `y` or `weights` length differs from the row
    ///   count of `x`
    /// - `InvalidInput` for negative or non-finite weights
    /// - `DegenerateInput` for fewer than two samples, all-zero weights, or
    ///   a system the jittered inverse cannot stabilise
    pub fn fit(
        &self,
        x: &Matrix<f64>,
        y: &Vector<f64>,
        weights: &Vector<f64>,
    ) -> Result<WeightedFit> {
        let (n_samples, n_features) = x.shape();

        if y.len() != n_samples {
            return Err(ExplicarError::dimension_mismatch("y", n_samples, y.len()));
        }
        if weights.len() != n_samples {
            return Err(ExplicarError::dimension_mismatch(
                "weights",
                n_samples,
                weights.len(),
            ));
        }
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ExplicarError::invalid_input(
                "weights must be finite and non-negative",
            ));
        }
        if n_samples < 2 {
            return Err(ExplicarError::degenerate(format!(
                "{n_samples} sample(s) leave no residual degrees of freedom"
            )));
        }
        let total_weight = weights.sum();
        if total_weight == 0.0 {
            return Err(ExplicarError::degenerate("all weights are zero"));
        }

        let (x_centered, y_centered, x_mean, y_mean) = if self.fit_intercept {
            let x_mean = x.weighted_column_means(weights)?;
            let y_mean = y.weighted_mean(weights);
            (
                x.center_columns(&x_mean)?,
                y.add_scalar(-y_mean),
                x_mean,
                y_mean,
            )
        } else {
            (x.clone(), y.clone(), Vector::zeros(n_features), 0.0)
        };

        // XᵀWX and XᵀWy
        let xw = x_centered.scale_rows(weights)?;
        let xtwx = x_centered.transpose().matmul(&xw)?;
        let xtwy = xw.transpose().matvec(&y_centered)?;

        let inverse = if n_features == 0 {
            Matrix::zeros(0, 0)
        } else {
            xtwx.safe_invert(&self.jitter)?
        };
        let coefficients = inverse.matvec(&xtwy)?;
        let intercept = if self.fit_intercept {
            y_mean - x_mean.dot(&coefficients)
        } else {
            0.0
        };

        let fitted = x.matvec(&coefficients)?.add_scalar(intercept);
        let residuals = y.sub(&fitted);
        let weighted_rss: f64 = residuals
            .iter()
            .zip(weights.iter())
            .map(|(r, w)| w * r * r)
            .sum();
        let mse = weighted_rss / total_weight;

        let y_bar = y.weighted_mean(weights);
        let weighted_tss: f64 = y
            .iter()
            .zip(weights.iter())
            .map(|(v, w)| w * (v - y_bar).powi(2))
            .sum();
        let r_squared = if weighted_tss > 0.0 {
            1.0 - weighted_rss / weighted_tss
        } else if weighted_rss <= f64::EPSILON {
            1.0
        } else {
            0.0
        };

        let dof = n_samples as i64 - n_features as i64 - i64::from(self.fit_intercept);
        let (std_errors, p_values) = if dof > 0 {
            Self::inference(&coefficients, &inverse, weighted_rss / dof as f64, dof)?
        } else {
            (
                Vector::from_vec(vec![f64::NAN; n_features]),
                Vector::from_vec(vec![f64::NAN; n_features]),
            )
        };

        Ok(WeightedFit {
            coefficients,
            intercept,
            mse,
            r_squared,
            std_errors,
            p_values,
        })
    }

    /// Standard errors `sqrt(σ² [(XᵀWX)⁻¹]ⱼⱼ)` and two-sided Student-t
    /// p-values.
    fn inference(
        coefficients: &Vector<f64>,
        inverse: &Matrix<f64>,
        sigma2: f64,
        dof: i64,
    ) -> Result<(Vector<f64>, Vector<f64>)> {
        let t_dist = StudentsT::new(0.0, 1.0, dof as f64).map_err(|e| {
            ExplicarError::RegressionFailure {
                message: format!("t distribution with {dof} dof: {e}"),
            }
        })?;

        let std_errors: Vector<f64> = (0..coefficients.len())
            .map(|j| (sigma2 * inverse.get(j, j)).max(0.0).sqrt())
            .collect();
        let p_values = coefficients
            .iter()
            .zip(std_errors.iter())
            .map(|(&beta, &se)| {
                if se == 0.0 || !se.is_finite() {
                    if beta == 0.0 {
                        1.0
                    } else {
                        0.0
                    }
                } else {
                    2.0 * t_dist.sf((beta / se).abs())
                }
            })
            .collect();

        Ok((std_errors, p_values))
    }
}

#[cfg(test)]
#[path = "tests_weighted.rs"]
mod tests;
