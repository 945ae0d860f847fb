//! Counterfactual objective scored against the black-box model.

use super::entity::CounterfactualEntity;
use crate::error::{ExplicarError, Result};
use crate::feature::{Feature, Value};
use crate::metaheuristics::CandidateEvaluator;
use crate::prediction::{Output, PredictionInput, PredictionOutput};
use crate::traits::PredictionProvider;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// Penalty of a non-numeric goal that is not met.
const MISMATCH_PENALTY: f64 = 2.0;

/// Penalty of one goal: 0 when met, otherwise
/// `1 + tanh(|Δ| / max(|goal|, 1))` for numbers and 2 for anything else.
pub(crate) fn goal_penalty(goal: &Output, actual: &Output, threshold: f64) -> f64 {
    match &goal.value {
        Value::Number(target) => {
            let delta = (actual.value.as_number() - target).abs();
            if delta.is_nan() {
                MISMATCH_PENALTY
            } else if delta <= threshold {
                0.0
            } else {
                1.0 + (delta / target.abs().max(1.0)).tanh()
            }
        }
        expected => {
            if &actual.value == expected {
                0.0
            } else {
                MISMATCH_PENALTY
            }
        }
    }
}

/// Total penalty of `actual` against every goal.
///
/// # Errors
///
/// `PredictionFailure` when `actual` lacks a goal output.
pub(crate) fn total_penalty(
    goals: &[Output],
    actual: &PredictionOutput,
    threshold: f64,
) -> Result<f64> {
    goals.iter().try_fold(0.0, |acc, goal| {
        let output = actual.by_name(&goal.name).ok_or_else(|| {
            ExplicarError::prediction(format!("model output lacks goal '{}'", goal.name))
        })?;
        Ok(acc + goal_penalty(goal, output, threshold))
    })
}

/// Best candidate scored so far.
#[derive(Debug, Clone)]
pub(crate) struct BestCandidate {
    pub(crate) point: Vec<f64>,
    pub(crate) objective: f64,
    pub(crate) output: PredictionOutput,
    pub(crate) is_valid: bool,
}

/// Scores solver candidates with the model and remembers the best one, so
/// it survives a search that is cut off mid-call.
pub(crate) struct ModelObjective<'a, P: ?Sized> {
    model: &'a P,
    entities: &'a [CounterfactualEntity],
    searched: Vec<usize>,
    goals: &'a [Output],
    threshold: f64,
    best: Mutex<Option<BestCandidate>>,
    evaluations: AtomicUsize,
    batches: AtomicUsize,
}

impl<'a, P> ModelObjective<'a, P>
where
    P: PredictionProvider + ?Sized,
{
    pub(crate) fn new(
        model: &'a P,
        entities: &'a [CounterfactualEntity],
        goals: &'a [Output],
        threshold: f64,
    ) -> Self {
        let searched = entities
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_searchable())
            .map(|(i, _)| i)
            .collect();
        Self {
            model,
            entities,
            searched,
            goals,
            threshold,
            best: Mutex::new(None),
            evaluations: AtomicUsize::new(0),
            batches: AtomicUsize::new(0),
        }
    }

    /// Entity index behind each solver coordinate.
    pub(crate) fn searched(&self) -> &[usize] {
        &self.searched
    }

    pub(crate) fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::SeqCst)
    }

    pub(crate) fn batches(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    pub(crate) async fn best(&self) -> Option<BestCandidate> {
        self.best.lock().await.clone()
    }

    fn features(&self, point: &[f64]) -> Vec<Feature> {
        let mut features: Vec<Feature> =
            self.entities.iter().map(|e| e.original().clone()).collect();
        for (&entity, &x) in self.searched.iter().zip(point) {
            features[entity] = self.entities[entity].decode(x);
        }
        features
    }

    fn distance(&self, features: &[Feature]) -> f64 {
        self.searched
            .iter()
            .map(|&i| self.entities[i].distance(&features[i]))
            .sum()
    }
}

#[async_trait]
impl<'a, P> CandidateEvaluator for ModelObjective<'a, P>
where
    P: PredictionProvider + ?Sized,
{
    async fn evaluate(&self, candidates: Vec<Vec<f64>>) -> Result<Vec<f64>> {
        let features: Vec<Vec<Feature>> = candidates.iter().map(|c| self.features(c)).collect();
        let inputs = features
            .iter()
            .map(|f| PredictionInput::new(f.clone()))
            .collect();
        let outputs = self
            .model
            .predict(inputs)
            .await
            .map_err(ExplicarError::into_prediction_failure)?;
        if outputs.len() != candidates.len() {
            return Err(ExplicarError::prediction(format!(
                "model returned {} outputs for {} inputs",
                outputs.len(),
                candidates.len()
            )));
        }
        self.batches.fetch_add(1, Ordering::SeqCst);
        self.evaluations.fetch_add(candidates.len(), Ordering::SeqCst);

        // Any goal-satisfying candidate scores below any other one.
        let weight = self.searched.len() as f64 + 1.0;
        let mut scores = Vec::with_capacity(candidates.len());
        let mut best = self.best.lock().await;
        for ((point, features), output) in candidates.into_iter().zip(&features).zip(outputs) {
            let penalty = total_penalty(self.goals, &output, self.threshold)?;
            let objective = penalty * weight + self.distance(features);
            if best.as_ref().map_or(true, |b| objective < b.objective) {
                *best = Some(BestCandidate {
                    point,
                    objective,
                    output,
                    is_valid: penalty == 0.0,
                });
            }
            scores.push(objective);
        }
        Ok(scores)
    }
}
