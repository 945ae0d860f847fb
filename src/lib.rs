//! Explicar: model-agnostic explanations for black-box predictors in pure Rust.
//!
//! Explicar explains single predictions of any model reachable through the
//! async [`PredictionProvider`](traits::PredictionProvider) trait. It never
//! looks inside the model, only at its answers on perturbed inputs.
//!
//! # Quick Start
//!
//! ```
//! use explicar::prelude::*;
//!
//! // Black box: y = 2*x0 - x1
//! let model = FnPredictionProvider::new(|inputs: &[PredictionInput]| {
//!     Ok(inputs
//!         .iter()
//!         .map(|input| {
//!             let x0 = input.features[0].value().as_number();
//!             let x1 = input.features[1].value().as_number();
//!             PredictionOutput::new(vec![Output::number("y", 2.0 * x0 - x1)])
//!         })
//!         .collect())
//! });
//!
//! let prediction = Prediction::new(
//!     PredictionInput::new(vec![Feature::number("x0", 4.0), Feature::number("x1", 3.0)]),
//!     PredictionOutput::new(vec![Output::number("y", 5.0)]),
//! );
//!
//! let explainer = LimeExplainer::new(LimeConfig::default().with_seed(Some(42)));
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let saliency = runtime.block_on(explainer.explain(&prediction, &model)).unwrap();
//!
//! let y = &saliency["y"];
//! assert!(y.score("x0").unwrap() > 0.0);
//! assert!(y.score("x1").unwrap() < 0.0);
//! ```
//!
//! # Modules
//!
//! - [`primitives`]: Core Vector and Matrix types, jittered pseudo-inverse
//! - [`feature`]: Features, values, domains and linearization of nested inputs
//! - [`prediction`]: Model inputs and outputs
//! - [`perturbation`]: Seeded neighbor sampling
//! - [`linear_model`]: Weighted least squares, LARS path and LassoLarsIC
//! - [`interpret`]: LIME saliency, stability checks and explainability metrics
//! - [`metaheuristics`]: Local search solvers for constrained variables
//! - [`counterfactual`]: Counterfactual search
//! - [`traits`]: The black-box model contract and its adapters

pub mod counterfactual;
pub mod error;
pub mod feature;
pub mod interpret;
pub mod linear_model;
pub mod metaheuristics;
pub mod perturbation;
pub mod prediction;
pub mod prelude;
pub mod primitives;
pub mod traits;

pub use error::{ExplicarError, Result};
pub use primitives::{Matrix, Vector};
pub use traits::PredictionProvider;
