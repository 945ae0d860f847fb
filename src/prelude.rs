//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use explicar::prelude::*;
//! ```

pub use crate::counterfactual::{
    CounterfactualConfig, CounterfactualExplainer, CounterfactualRequest, CounterfactualResult,
};
pub use crate::error::{ExplicarError, Result};
pub use crate::feature::{Feature, FeatureDomain, FeatureType, Value};
pub use crate::interpret::{LimeConfig, LimeExplainer, Saliency};
pub use crate::linear_model::{Criterion, LassoLarsIc, WeightedLinearRegression};
pub use crate::prediction::{Output, Prediction, PredictionInput, PredictionOutput};
pub use crate::primitives::{Matrix, Vector};
pub use crate::traits::{FnPredictionProvider, ParallelPredictionProvider, PredictionProvider};
