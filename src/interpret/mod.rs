//! Local explanations of black-box predictions.
//!
//! [`LimeExplainer`] fits a proximity-weighted linear surrogate around one
//! prediction and reports its coefficients as per-feature [`Saliency`].
//! Stability checks rerun the explainer with fresh seeds and measure how
//! often the feature rankings agree.
//!
//! # Example
//!
//! ```
//! use explicar::feature::Feature;
//! use explicar::interpret::{LimeConfig, LimeExplainer};
//! use explicar::prediction::{Output, Prediction, PredictionInput, PredictionOutput};
//! use explicar::traits::FnPredictionProvider;
//!
//! let model = FnPredictionProvider::new(|inputs: &[PredictionInput]| {
//!     Ok(inputs
//!         .iter()
//!         .map(|input| {
//!             let x = input.features[0].value().as_number();
//!             PredictionOutput::new(vec![Output::number("y", 3.0 * x)])
//!         })
//!         .collect())
//! });
//! let prediction = Prediction::new(
//!     PredictionInput::new(vec![Feature::number("x", 2.0)]),
//!     PredictionOutput::new(vec![Output::number("y", 6.0)]),
//! );
//!
//! let explainer = LimeExplainer::new(LimeConfig::default().with_seed(Some(1)));
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let saliency = runtime.block_on(explainer.explain(&prediction, &model)).unwrap();
//! assert!(saliency["y"].score("x").unwrap() > 0.0);
//! ```
//!
//! # References
//!
//! - Ribeiro, M. T., et al. (2016). "Why Should I Trust You?": Explaining the
//!   Predictions of Any Classifier (LIME). KDD.

mod lime;
mod metrics;
mod saliency;
mod stability;

pub use lime::{FeatureSelection, LimeConfig, LimeExplainer};
pub use metrics::{impact_score, quantify_explainability};
pub use saliency::{FeatureImportance, Saliency};
pub use stability::{SaliencyStability, DEFAULT_STABILITY_RUNS};

#[cfg(test)]
mod tests;
