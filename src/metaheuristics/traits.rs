//! Solver and objective seams.

use super::search_space::SearchSpace;
use super::termination::{Termination, TerminationReason};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Objective scored in batches; lower is better.
///
/// Scoring may be slow (it usually calls a remote model), so it is async
/// and receives every candidate of a step at once.
#[async_trait]
pub trait CandidateEvaluator: Send + Sync {
    /// Scores each candidate, in order.
    async fn evaluate(&self, candidates: Vec<Vec<f64>>) -> Result<Vec<f64>>;
}

type ObjectiveFn = dyn Fn(&[f64]) -> f64 + Send + Sync;

/// Evaluator over a synchronous objective function.
#[derive(Clone)]
pub struct FnEvaluator {
    objective: Arc<ObjectiveFn>,
}

impl FnEvaluator {
    /// Wraps `objective`.
    pub fn new<F>(objective: F) -> Self
    where
        F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        Self {
            objective: Arc::new(objective),
        }
    }
}

impl fmt::Debug for FnEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnEvaluator").finish_non_exhaustive()
    }
}

#[async_trait]
impl CandidateEvaluator for FnEvaluator {
    async fn evaluate(&self, candidates: Vec<Vec<f64>>) -> Result<Vec<f64>> {
        Ok(candidates.iter().map(|c| (self.objective)(c)).collect())
    }
}

/// Best point found by a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Best solution vector
    pub solution: Vec<f64>,
    /// Objective of `solution`
    pub objective_value: f64,
    /// Completed steps
    pub steps: usize,
    /// Candidates scored
    pub evaluations: usize,
    /// Best objective after each step
    pub history: Vec<f64>,
    /// Why the search stopped
    pub termination: TerminationReason,
}

/// Local search over a [`SearchSpace`] from a given starting point.
#[async_trait]
pub trait LocalSearchSolver: Send + Sync {
    /// Minimizes `evaluator` over `space`, starting from `start` projected
    /// into the space, until `termination` fires.
    ///
    /// # Errors
    ///
    /// Propagates evaluator errors.
    async fn solve(
        &self,
        evaluator: &dyn CandidateEvaluator,
        space: &SearchSpace,
        start: &[f64],
        termination: &Termination,
    ) -> Result<OptimizationResult>;
}
