//! Model inputs, outputs and the prediction pairs being explained.

use crate::feature::{Feature, FeatureType, Value};
use serde::{Deserialize, Serialize};

/// One named model output with a confidence score.
///
/// The score is caller-defined and unconstrained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    /// Output name
    pub name: String,
    /// Declared type of `value`
    #[serde(rename = "type")]
    pub ty: FeatureType,
    /// Predicted value
    pub value: Value,
    /// Confidence score
    pub score: f64,
}

impl Output {
    /// Creates an output.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: FeatureType, value: Value, score: f64) -> Self {
        Self {
            name: name.into(),
            ty,
            value,
            score,
        }
    }

    /// Numeric output with score 1.
    #[must_use]
    pub fn number(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, FeatureType::Number, Value::Number(value), 1.0)
    }

    /// Boolean output.
    #[must_use]
    pub fn boolean(name: impl Into<String>, value: bool, score: f64) -> Self {
        Self::new(name, FeatureType::Boolean, Value::Boolean(value), score)
    }

    /// Categorical output.
    #[must_use]
    pub fn categorical(name: impl Into<String>, value: impl Into<String>, score: f64) -> Self {
        Self::new(name, FeatureType::Categorical, Value::Text(value.into()), score)
    }
}

/// Ordered input features of one model call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PredictionInput {
    /// Input features in model order
    pub features: Vec<Feature>,
}

impl PredictionInput {
    /// Wraps a feature list.
    #[must_use]
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    /// First feature called `name`.
    #[must_use]
    pub fn feature(&self, name: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.name() == name)
    }
}

/// Ordered outputs of one model call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PredictionOutput {
    /// Outputs in model order
    pub outputs: Vec<Output>,
}

impl PredictionOutput {
    /// Wraps an output list.
    #[must_use]
    pub fn new(outputs: Vec<Output>) -> Self {
        Self { outputs }
    }

    /// First output called `name`.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&Output> {
        self.outputs.iter().find(|o| o.name == name)
    }
}

/// An input together with the output the model produced for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Query input
    pub input: PredictionInput,
    /// Model output for `input`
    pub output: PredictionOutput,
}

impl Prediction {
    /// Pairs an input with its output.
    #[must_use]
    pub fn new(input: PredictionInput, output: PredictionOutput) -> Self {
        Self { input, output }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_name() {
        let input =
            PredictionInput::new(vec![Feature::number("a", 1.0), Feature::number("b", 2.0)]);
        assert!(input.feature("b").is_some());
        assert!(input.feature("c").is_none());

        let output = PredictionOutput::new(vec![
            Output::number("score", 0.3),
            Output::boolean("approved", true, 0.9),
        ]);
        assert_eq!(output.by_name("approved").map(|o| o.ty), Some(FeatureType::Boolean));
        assert!(output.by_name("missing").is_none());
    }
}
