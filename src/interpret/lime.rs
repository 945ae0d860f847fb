//! LIME-style local surrogate explanations.

use super::saliency::{FeatureImportance, Saliency};
use crate::error::{ExplicarError, Result};
use crate::feature::{linearize, Feature, Value};
use crate::linear_model::{Criterion, LassoLarsIc, WeightedLinearRegression};
use crate::perturbation::{perturb, PerturbationContext};
use crate::prediction::{Output, Prediction, PredictionInput, PredictionOutput};
use crate::primitives::{JitterConfig, Matrix, Vector};
use crate::traits::PredictionProvider;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

/// Sparse feature selection run before the surrogate fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSelection {
    /// Criterion choosing the point on the lasso path
    pub criterion: Criterion,
    /// Keep at most this many features (largest lasso coefficients)
    pub max_features: Option<usize>,
}

/// Configuration of [`LimeExplainer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimeConfig {
    /// Number of perturbed neighbors per explanation
    pub samples: usize,
    /// Features replaced in each neighbor
    pub perturbations: usize,
    /// Kernel width, multiplied by `sqrt(n_features)`
    pub kernel_width: f64,
    /// Seed for the neighbor stream (None = entropy)
    pub seed: Option<u64>,
    /// Rescale proximity weights to mean 1
    pub normalize_weights: bool,
    /// Optional lasso feature selection
    pub feature_selection: Option<FeatureSelection>,
    /// Jittered inverse settings for the surrogate fit
    pub jitter: JitterConfig,
}

impl Default for LimeConfig {
    fn default() -> Self {
        Self {
            samples: 300,
            perturbations: 1,
            kernel_width: 0.75,
            seed: None,
            normalize_weights: false,
            feature_selection: None,
            jitter: JitterConfig::default(),
        }
    }
}

impl LimeConfig {
    /// Sets the number of neighbors.
    #[must_use]
    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = samples;
        self
    }

    /// Sets the number of features replaced per neighbor.
    #[must_use]
    pub fn with_perturbations(mut self, perturbations: usize) -> Self {
        self.perturbations = perturbations;
        self
    }

    /// Sets the kernel width.
    #[must_use]
    pub fn with_kernel_width(mut self, kernel_width: f64) -> Self {
        self.kernel_width = kernel_width;
        self
    }

    /// Sets the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Sets weight normalization.
    #[must_use]
    pub fn with_normalize_weights(mut self, normalize: bool) -> Self {
        self.normalize_weights = normalize;
        self
    }

    /// Enables lasso feature selection.
    #[must_use]
    pub fn with_feature_selection(mut self, selection: FeatureSelection) -> Self {
        self.feature_selection = Some(selection);
        self
    }

    /// Sets the jittered inverse settings.
    #[must_use]
    pub fn with_jitter(mut self, jitter: JitterConfig) -> Self {
        self.jitter = jitter;
        self
    }

    /// Checks parameter ranges.
    ///
    /// # Errors
    ///
    /// `InvalidHyperparameter` for fewer than 2 samples, zero
    /// perturbations, a non-positive kernel width, `max_features == 0` or
    /// an invalid jitter configuration.
    pub fn validate(&self) -> Result<()> {
        if self.samples < 2 {
            return Err(ExplicarError::invalid_hyperparameter(
                "samples",
                self.samples,
                ">= 2",
            ));
        }
        if self.perturbations == 0 {
            return Err(ExplicarError::invalid_hyperparameter(
                "perturbations",
                self.perturbations,
                ">= 1",
            ));
        }
        if !(self.kernel_width > 0.0 && self.kernel_width.is_finite()) {
            return Err(ExplicarError::invalid_hyperparameter(
                "kernel_width",
                self.kernel_width,
                "finite and > 0",
            ));
        }
        if let Some(FeatureSelection {
            max_features: Some(0),
            ..
        }) = self.feature_selection
        {
            return Err(ExplicarError::invalid_hyperparameter(
                "feature_selection.max_features",
                0,
                ">= 1",
            ));
        }
        self.jitter.validate()
    }
}

/// Local surrogate explainer.
///
/// For one prediction it samples perturbed neighbors of the (linearized)
/// input, scores them with the model in a single batch, weights them by
/// proximity and fits a weighted linear surrogate per output. The
/// surrogate coefficients are the saliency scores.
///
/// Encoding of a neighbor, per linearized feature:
/// - number-like features: `(x − x₀) / max(|x₀|, 1)`
/// - everything else: `1` if the value differs from the original, else `0`
///
/// The proximity weight of a neighbor with encoded row `e` is
/// `sqrt(exp(−‖e‖² / w²))` with `w = kernel_width · sqrt(n_features)`.
/// Features that never vary across the sample are left out of the fit and
/// get score 0.
#[derive(Debug, Clone, Default)]
pub struct LimeExplainer {
    config: LimeConfig,
}

impl LimeExplainer {
    /// Creates an explainer.
    #[must_use]
    pub fn new(config: LimeConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &LimeConfig {
        &self.config
    }

    /// Explains every output of `prediction`.
    ///
    /// The call is atomic: it returns a saliency for every output or an
    /// error.
    ///
    /// # Errors
    ///
    /// - `InvalidHyperparameter` for an invalid configuration
    /// - `InvalidInput` when there is nothing to explain
    /// - `PredictionFailure` when the model fails or returns malformed output
    /// - `RegressionFailure` when a surrogate cannot be fitted
    pub async fn explain<P>(
        &self,
        prediction: &Prediction,
        model: &P,
    ) -> Result<HashMap<String, Saliency>>
    where
        P: PredictionProvider + ?Sized,
    {
        self.explain_seeded(prediction, model, self.config.seed).await
    }

    pub(crate) async fn explain_seeded<P>(
        &self,
        prediction: &Prediction,
        model: &P,
        seed: Option<u64>,
    ) -> Result<HashMap<String, Saliency>>
    where
        P: PredictionProvider + ?Sized,
    {
        self.config.validate()?;
        let (linear, layout) = linearize(&prediction.input.features);
        if linear.is_empty() {
            return Err(ExplicarError::invalid_input(
                "prediction input has no features to explain",
            ));
        }
        if prediction.output.outputs.is_empty() {
            return Err(ExplicarError::invalid_input(
                "prediction has no outputs to explain",
            ));
        }

        let samples = self.config.samples;
        debug!(samples, features = linear.len(), ?seed, "lime sampling");
        let mut ctx = PerturbationContext::new(seed, self.config.perturbations);
        let mut neighbors = Vec::with_capacity(samples);
        let mut inputs = Vec::with_capacity(samples);
        for _ in 0..samples {
            let neighbor = perturb(&linear, &mut ctx);
            inputs.push(PredictionInput::new(layout.unflatten(&neighbor)?));
            neighbors.push(neighbor);
        }
        let outputs = model
            .predict(inputs)
            .await
            .map_err(ExplicarError::into_prediction_failure)?;
        if outputs.len() != samples {
            return Err(ExplicarError::prediction(format!(
                "model returned {} outputs for {samples} inputs",
                outputs.len()
            )));
        }

        debug!("lime weighting");
        let encoded = encode_neighbors(&linear, &neighbors)?;
        let width = self.config.kernel_width * (linear.len() as f64).sqrt();
        let weights = proximity_weights(&encoded, width, self.config.normalize_weights);
        let varying = varying_columns(&encoded);

        let mut saliencies = HashMap::with_capacity(prediction.output.outputs.len());
        for original in &prediction.output.outputs {
            debug!(output = %original.name, varying = varying.len(), "lime fitting");
            let y = targets(original, &outputs)?;
            let saliency = self
                .fit_output(&linear, &encoded, &varying, &weights, &y, original)
                .map_err(|e| match e {
                    ExplicarError::RegressionFailure { .. } => e,
                    other => ExplicarError::RegressionFailure {
                        message: format!("output '{}': {other}", original.name),
                    },
                })?;
            saliencies.insert(original.name.clone(), saliency);
        }
        Ok(saliencies)
    }

    fn fit_output(
        &self,
        linear: &[Feature],
        encoded: &Matrix<f64>,
        varying: &[usize],
        weights: &Vector<f64>,
        y: &Vector<f64>,
        original: &Output,
    ) -> Result<Saliency> {
        let selected = match &self.config.feature_selection {
            Some(selection) if !varying.is_empty() => {
                select_features(encoded, varying, weights, y, selection)?
            }
            _ => varying.to_vec(),
        };

        let fit = WeightedLinearRegression::new()
            .with_jitter(self.config.jitter.clone())
            .fit(&encoded.select_columns(&selected), y, weights)?;

        let mut importance: Vec<FeatureImportance> = linear
            .iter()
            .cloned()
            .map(FeatureImportance::unexplained)
            .collect();
        for (k, &column) in selected.iter().enumerate() {
            let entry = &mut importance[column];
            entry.score = fit.coefficients[k];
            entry.std_error = fit.std_errors[k];
            entry.p_value = fit.p_values[k];
        }

        Ok(Saliency {
            output: original.clone(),
            per_feature_importance: importance,
            intercept: fit.intercept,
            mse: fit.mse,
            r_squared: fit.r_squared,
        })
    }
}

fn encode_value(original: &Feature, sample: &Feature) -> f64 {
    if original.feature_type().is_numeric() || original.value().is_number() {
        let x0 = original.value().as_number();
        let x = sample.value().as_number();
        if x0.is_finite() && x.is_finite() {
            return (x - x0) / x0.abs().max(1.0);
        }
    }
    if sample.value() == original.value() {
        0.0
    } else {
        1.0
    }
}

/// Encodes neighbors relative to the original linearized input, one row
/// per neighbor.
pub(crate) fn encode_neighbors(
    original: &[Feature],
    neighbors: &[Vec<Feature>],
) -> Result<Matrix<f64>> {
    let mut data = Vec::with_capacity(neighbors.len() * original.len());
    for neighbor in neighbors {
        if neighbor.len() != original.len() {
            return Err(ExplicarError::dimension_mismatch(
                "neighbor features",
                original.len(),
                neighbor.len(),
            ));
        }
        data.extend(
            original
                .iter()
                .zip(neighbor)
                .map(|(o, s)| encode_value(o, s)),
        );
    }
    Matrix::from_vec(neighbors.len(), original.len(), data)
}

/// Exponential kernel over the encoded distance to the original.
pub(crate) fn proximity_weights(encoded: &Matrix<f64>, width: f64, normalize: bool) -> Vector<f64> {
    let weights: Vector<f64> = (0..encoded.n_rows())
        .map(|i| {
            let row = encoded.row(i);
            let d2 = row.dot(&row);
            (-d2 / (width * width)).exp().sqrt()
        })
        .collect();
    let total = weights.sum();
    if normalize && total > 0.0 {
        weights.mul_scalar(weights.len() as f64 / total)
    } else {
        weights
    }
}

fn varying_columns(encoded: &Matrix<f64>) -> Vec<usize> {
    (0..encoded.n_cols())
        .filter(|&j| {
            let column = encoded.column(j);
            let first = column[0];
            column.iter().any(|v| *v != first)
        })
        .collect()
}

/// Regression target for `original` across the sampled outputs: the number
/// itself, `1/0` for booleans, and `1` when equal to the original value
/// for every other type.
fn targets(original: &Output, outputs: &[PredictionOutput]) -> Result<Vector<f64>> {
    outputs
        .iter()
        .map(|prediction| {
            let output = prediction.by_name(&original.name).ok_or_else(|| {
                ExplicarError::prediction(format!("model output lacks '{}'", original.name))
            })?;
            let value = match &original.value {
                Value::Number(_) => output.value.as_number(),
                Value::Boolean(_) => output
                    .value
                    .as_bool()
                    .map_or(f64::NAN, |b| f64::from(u8::from(b))),
                expected => f64::from(u8::from(&output.value == expected)),
            };
            if value.is_finite() {
                Ok(value)
            } else {
                Err(ExplicarError::prediction(format!(
                    "output '{}' is not numeric: {:?}",
                    original.name, output.value
                )))
            }
        })
        .collect()
}

/// Weighted lasso selection: weighted centering followed by `sqrt(w)` row
/// scaling turns it into a plain lasso problem.
fn select_features(
    encoded: &Matrix<f64>,
    candidates: &[usize],
    weights: &Vector<f64>,
    y: &Vector<f64>,
    selection: &FeatureSelection,
) -> Result<Vec<usize>> {
    let x = encoded.select_columns(candidates);
    let x_mean = x.weighted_column_means(weights)?;
    let y_mean = y.weighted_mean(weights);
    let root_w: Vector<f64> = weights.iter().map(|w| w.sqrt()).collect();
    let xs = x.center_columns(&x_mean)?.scale_rows(&root_w)?;
    let ys: Vector<f64> = y
        .iter()
        .zip(root_w.iter())
        .map(|(v, r)| (v - y_mean) * r)
        .collect();

    let fit = LassoLarsIc::new(selection.criterion)
        .with_intercept(false)
        .fit(&xs, &ys)?;

    let mut chosen: Vec<(usize, f64)> = fit
        .coefficients
        .iter()
        .enumerate()
        .filter(|(_, c)| c.abs() > f64::EPSILON)
        .map(|(k, c)| (candidates[k], *c))
        .collect();
    if let Some(max) = selection.max_features {
        chosen.sort_by(|a, b| b.1.abs().partial_cmp(&a.1.abs()).unwrap_or(Ordering::Equal));
        chosen.truncate(max);
        chosen.sort_by_key(|(column, _)| *column);
    }
    debug!(
        criterion = ?selection.criterion,
        candidates = candidates.len(),
        selected = chosen.len(),
        "lime feature selection"
    );
    Ok(chosen.into_iter().map(|(column, _)| column).collect())
}
