//! Agreement of saliency rankings across repeated explanations.

use super::lime::LimeExplainer;
use super::saliency::{FeatureImportance, Saliency};
use crate::error::{ExplicarError, Result};
use crate::prediction::Prediction;
use crate::traits::PredictionProvider;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Runs used by [`LimeExplainer::validate_local_saliency_stability`].
pub const DEFAULT_STABILITY_RUNS: usize = 5;

/// How often repeated explanations agree on the top-`k` features of one
/// output.
///
/// A rate is the share of runs producing the most common ranked list of
/// feature names, so `1.0` means every run agreed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaliencyStability {
    /// Output name
    pub output: String,
    /// Ranking depth
    pub k: usize,
    /// Agreement rate of the top-`k` positive features
    pub positive: f64,
    /// Agreement rate of the top-`k` negative features
    pub negative: f64,
}

impl LimeExplainer {
    /// Explains `prediction` `runs` times and measures ranking agreement
    /// for every output and every depth `1..=top_k`.
    ///
    /// Each run uses its own seed derived from the configured one, so a
    /// seeded explainer gives reproducible rates.
    ///
    /// # Errors
    ///
    /// `InvalidHyperparameter` for `top_k == 0` or `runs == 0`, plus any
    /// error of [`LimeExplainer::explain`].
    pub async fn local_saliency_stability<P>(
        &self,
        prediction: &Prediction,
        model: &P,
        top_k: usize,
        runs: usize,
    ) -> Result<Vec<SaliencyStability>>
    where
        P: PredictionProvider + ?Sized,
    {
        if top_k == 0 {
            return Err(ExplicarError::invalid_hyperparameter("top_k", top_k, ">= 1"));
        }
        if runs == 0 {
            return Err(ExplicarError::invalid_hyperparameter("runs", runs, ">= 1"));
        }

        let mut explanations: Vec<HashMap<String, Saliency>> = Vec::with_capacity(runs);
        for run in 0..runs {
            let seed = self.config().seed.map(|s| s.wrapping_add(run as u64 + 1));
            explanations.push(self.explain_seeded(prediction, model, seed).await?);
        }

        let mut rates = Vec::new();
        for output in &prediction.output.outputs {
            for k in 1..=top_k {
                let mut positive = Vec::with_capacity(runs);
                let mut negative = Vec::with_capacity(runs);
                for saliencies in &explanations {
                    let saliency = saliencies.get(&output.name).ok_or_else(|| {
                        ExplicarError::prediction(format!("no saliency for '{}'", output.name))
                    })?;
                    positive.push(names(&saliency.positive_features(k)));
                    negative.push(names(&saliency.negative_features(k)));
                }
                rates.push(SaliencyStability {
                    output: output.name.clone(),
                    k,
                    positive: agreement(&positive),
                    negative: agreement(&negative),
                });
            }
        }
        Ok(rates)
    }

    /// Fails unless every agreement rate reaches its threshold.
    ///
    /// Uses [`DEFAULT_STABILITY_RUNS`] repeated explanations.
    ///
    /// # Errors
    ///
    /// `Validation` naming the first output and depth below threshold,
    /// plus any error of [`LimeExplainer::local_saliency_stability`].
    pub async fn validate_local_saliency_stability<P>(
        &self,
        prediction: &Prediction,
        model: &P,
        top_k: usize,
        positive_threshold: f64,
        negative_threshold: f64,
    ) -> Result<()>
    where
        P: PredictionProvider + ?Sized,
    {
        let rates = self
            .local_saliency_stability(prediction, model, top_k, DEFAULT_STABILITY_RUNS)
            .await?;
        for rate in &rates {
            debug!(
                output = %rate.output,
                k = rate.k,
                positive = rate.positive,
                negative = rate.negative,
                "saliency stability"
            );
            if rate.positive < positive_threshold || rate.negative < negative_threshold {
                return Err(ExplicarError::Validation {
                    message: format!(
                        "unstable saliency for '{}' at top-{}: \
                         positive {:.2} (min {positive_threshold}), \
                         negative {:.2} (min {negative_threshold})",
                        rate.output, rate.k, rate.positive, rate.negative
                    ),
                });
            }
        }
        Ok(())
    }
}

fn names(importances: &[&FeatureImportance]) -> Vec<String> {
    importances
        .iter()
        .map(|fi| fi.feature.name().to_string())
        .collect()
}

/// Share of the most frequent list among `lists`.
fn agreement(lists: &[Vec<String>]) -> f64 {
    let mut counts: Vec<(&Vec<String>, usize)> = Vec::new();
    for list in lists {
        match counts.iter_mut().find(|(seen, _)| *seen == list) {
            Some((_, count)) => *count += 1,
            None => counts.push((list, 1)),
        }
    }
    let best = counts.iter().map(|(_, c)| *c).max().unwrap_or(0);
    best as f64 / lists.len().max(1) as f64
}
