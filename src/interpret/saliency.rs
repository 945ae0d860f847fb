//! Per-output feature importance produced by the local surrogate.

use crate::feature::Feature;
use crate::prediction::Output;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Importance of one (linearized) feature for one output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    /// The feature as it entered the surrogate (key-path name)
    pub feature: Feature,
    /// Signed surrogate coefficient; 0 for features left out of the fit
    pub score: f64,
    /// Standard error of `score`; NaN when not estimated
    pub std_error: f64,
    /// Two-sided p-value of `score`; NaN when not estimated
    pub p_value: f64,
}

impl FeatureImportance {
    /// Importance for a feature left out of the surrogate.
    #[must_use]
    pub fn unexplained(feature: Feature) -> Self {
        Self {
            feature,
            score: 0.0,
            std_error: f64::NAN,
            p_value: f64::NAN,
        }
    }
}

/// Saliency of every input feature for one model output.
///
/// Importances are kept in input order. The ranked views sort with a stable
/// sort, so equal scores keep their input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Saliency {
    /// The output being explained, as originally predicted
    pub output: Output,
    /// One entry per linearized input feature, in input order
    pub per_feature_importance: Vec<FeatureImportance>,
    /// Surrogate intercept
    pub intercept: f64,
    /// Weighted mean squared error of the surrogate
    pub mse: f64,
    /// Weighted R² of the surrogate
    pub r_squared: f64,
}

impl Saliency {
    /// Score of the feature called `name`.
    #[must_use]
    pub fn score(&self, name: &str) -> Option<f64> {
        self.per_feature_importance
            .iter()
            .find(|fi| fi.feature.name() == name)
            .map(|fi| fi.score)
    }

    /// `(name, score)` pairs in input order.
    #[must_use]
    pub fn scores(&self) -> Vec<(&str, f64)> {
        self.per_feature_importance
            .iter()
            .map(|fi| (fi.feature.name(), fi.score))
            .collect()
    }

    /// Up to `k` features with the largest absolute score.
    #[must_use]
    pub fn top_features(&self, k: usize) -> Vec<&FeatureImportance> {
        self.ranked(|_| true, |a, b| b.score.abs().partial_cmp(&a.score.abs()), k)
    }

    /// Up to `k` features with positive score, largest first.
    #[must_use]
    pub fn positive_features(&self, k: usize) -> Vec<&FeatureImportance> {
        self.ranked(|fi| fi.score > 0.0, |a, b| b.score.partial_cmp(&a.score), k)
    }

    /// Up to `k` features with negative score, most negative first.
    #[must_use]
    pub fn negative_features(&self, k: usize) -> Vec<&FeatureImportance> {
        self.ranked(|fi| fi.score < 0.0, |a, b| a.score.partial_cmp(&b.score), k)
    }

    fn ranked<F, C>(&self, keep: F, compare: C, k: usize) -> Vec<&FeatureImportance>
    where
        F: Fn(&FeatureImportance) -> bool,
        C: Fn(&FeatureImportance, &FeatureImportance) -> Option<Ordering>,
    {
        let mut ranked: Vec<&FeatureImportance> =
            self.per_feature_importance.iter().filter(|fi| keep(fi)).collect();
        ranked.sort_by(|a, b| compare(a, b).unwrap_or(Ordering::Equal));
        ranked.truncate(k);
        ranked
    }
}
