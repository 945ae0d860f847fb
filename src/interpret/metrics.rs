//! Explainability metrics.

use super::saliency::FeatureImportance;
use crate::error::{ExplicarError, Result};
use crate::feature::linearize;
use crate::prediction::{Prediction, PredictionInput};
use crate::traits::PredictionProvider;
use tracing::debug;

/// Explainability of a model whose behaviour is described with
/// `input_chunks` and `output_chunks` cognitive chunks and whose inputs
/// interact to the degree `interaction` (0 = none, 1 = full).
///
/// ```text
/// (1/input_chunks + 1/output_chunks + (1 − interaction)) / 3
/// ```
///
/// The score lies in `[0, 1]` and is 0 whenever either chunk count is 0.
/// `interaction` is clamped to `[0, 1]`; NaN counts as full interaction.
///
/// # Examples
///
/// ```
/// use explicar::interpret::quantify_explainability;
///
/// assert_eq!(quantify_explainability(0, 0, 0.3), 0.0);
/// assert!((quantify_explainability(1, 1, 0.0) - 1.0).abs() < 1e-12);
/// ```
#[must_use]
pub fn quantify_explainability(input_chunks: usize, output_chunks: usize, interaction: f64) -> f64 {
    if input_chunks == 0 || output_chunks == 0 {
        return 0.0;
    }
    let interaction = if interaction.is_nan() {
        1.0
    } else {
        interaction.clamp(0.0, 1.0)
    };
    (1.0 / input_chunks as f64 + 1.0 / output_chunks as f64 + (1.0 - interaction)) / 3.0
}

/// Fraction of the prediction's outputs that change when the given
/// features are dropped (set to their type's neutral value).
///
/// Feature names are matched against the linearized input, so nested
/// features are addressed by key path.
///
/// # Errors
///
/// `PredictionFailure` when the model fails or omits an output.
pub async fn impact_score<P>(
    model: &P,
    prediction: &Prediction,
    top_features: &[FeatureImportance],
) -> Result<f64>
where
    P: PredictionProvider + ?Sized,
{
    let expected = &prediction.output.outputs;
    if expected.is_empty() {
        return Ok(0.0);
    }

    let (linear, layout) = linearize(&prediction.input.features);
    let dropped: Vec<_> = linear
        .iter()
        .map(|feature| {
            if top_features.iter().any(|fi| fi.feature.name() == feature.name()) {
                feature.dropped()
            } else {
                feature.clone()
            }
        })
        .collect();
    let input = PredictionInput::new(layout.unflatten(&dropped)?);

    let outputs = model
        .predict(vec![input])
        .await
        .map_err(ExplicarError::into_prediction_failure)?;
    let actual = outputs
        .first()
        .ok_or_else(|| ExplicarError::prediction("model returned no output"))?;

    let mut changed = 0usize;
    for output in expected {
        let after = actual.by_name(&output.name).ok_or_else(|| {
            ExplicarError::prediction(format!("model output lacks '{}'", output.name))
        })?;
        if after.value != output.value {
            changed += 1;
        }
    }
    let score = changed as f64 / expected.len() as f64;
    debug!(dropped = top_features.len(), score, "impact score");
    Ok(score)
}
