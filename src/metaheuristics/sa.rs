//! Simulated Annealing (SA) local search.
//!
//! # Algorithm
//!
//! ```text
//! 1. Start from the given point, projected into the space
//! 2. Propose moves_per_step neighbors, each changing one variable
//! 3. Take the best neighbor; accept it if better, otherwise with
//!    probability exp(-Δ / T) (Metropolis criterion)
//! 4. Cool: T ← max(T · cooling_rate, min_temperature)
//! 5. Repeat until the termination fires
//! ```
//!
//! # References
//!
//! - Kirkpatrick et al. (1983): "Optimization by Simulated Annealing"

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::{
    CandidateEvaluator, LocalSearchSolver, OptimizationResult, SearchSpace, Termination,
    TerminationReason,
};
use crate::error::{ExplicarError, Result};
use crate::primitives::random::make_rng;

/// Simulated Annealing solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedAnnealing {
    /// Starting temperature (default: 1.0)
    pub initial_temperature: f64,
    /// Geometric cooling factor per step (default: 0.995)
    pub cooling_rate: f64,
    /// Temperature floor (default: 1e-6)
    pub min_temperature: f64,
    /// Gaussian step as a fraction of a variable's range (default: 0.1)
    pub step_scale: f64,
    /// Chance of a uniform draw instead of a Gaussian step (default: 0.3)
    pub resample_probability: f64,
    /// Neighbors scored per step (default: 8)
    pub moves_per_step: usize,
    /// Stop after this many steps without a new best (default: none)
    pub unimproved_step_limit: Option<usize>,
    /// Random seed
    #[serde(default)]
    seed: Option<u64>,
}

impl Default for SimulatedAnnealing {
    fn default() -> Self {
        Self {
            initial_temperature: 1.0,
            cooling_rate: 0.995,
            min_temperature: 1e-6,
            step_scale: 0.1,
            resample_probability: 0.3,
            moves_per_step: 8,
            unimproved_step_limit: None,
            seed: None,
        }
    }
}

impl SimulatedAnnealing {
    /// Set initial temperature.
    #[must_use]
    pub fn with_initial_temperature(mut self, temperature: f64) -> Self {
        self.initial_temperature = temperature;
        self
    }

    /// Set cooling rate.
    #[must_use]
    pub fn with_cooling_rate(mut self, rate: f64) -> Self {
        self.cooling_rate = rate;
        self
    }

    /// Set neighbors per step.
    #[must_use]
    pub fn with_moves_per_step(mut self, moves: usize) -> Self {
        self.moves_per_step = moves;
        self
    }

    /// Stop after `steps` steps without improvement.
    #[must_use]
    pub fn with_unimproved_step_limit(mut self, steps: usize) -> Self {
        self.unimproved_step_limit = Some(steps);
        self
    }

    /// Set random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Seed, if any.
    #[must_use]
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Checks parameter ranges.
    ///
    /// # Errors
    ///
    /// `InvalidHyperparameter` for a non-positive temperature, a cooling
    /// rate outside `(0, 1]`, a non-positive step scale, a resample
    /// probability outside `[0, 1]` or zero moves per step.
    pub fn validate(&self) -> Result<()> {
        if !(self.initial_temperature > 0.0) {
            return Err(ExplicarError::invalid_hyperparameter(
                "initial_temperature",
                self.initial_temperature,
                "> 0",
            ));
        }
        if !(self.cooling_rate > 0.0 && self.cooling_rate <= 1.0) {
            return Err(ExplicarError::invalid_hyperparameter(
                "cooling_rate",
                self.cooling_rate,
                "in (0, 1]",
            ));
        }
        if !(self.min_temperature > 0.0) {
            return Err(ExplicarError::invalid_hyperparameter(
                "min_temperature",
                self.min_temperature,
                "> 0",
            ));
        }
        if !(self.step_scale > 0.0) {
            return Err(ExplicarError::invalid_hyperparameter(
                "step_scale",
                self.step_scale,
                "> 0",
            ));
        }
        if !(0.0..=1.0).contains(&self.resample_probability) {
            return Err(ExplicarError::invalid_hyperparameter(
                "resample_probability",
                self.resample_probability,
                "in [0, 1]",
            ));
        }
        if self.moves_per_step == 0 {
            return Err(ExplicarError::invalid_hyperparameter(
                "moves_per_step",
                0,
                ">= 1",
            ));
        }
        Ok(())
    }

    fn propose<R: Rng + ?Sized>(
        &self,
        space: &SearchSpace,
        current: &[f64],
        rng: &mut R,
    ) -> Vec<f64> {
        let mut candidate = current.to_vec();
        let i = rng.gen_range(0..space.dimension());
        candidate[i] = space.variables()[i].neighbor(
            current[i],
            self.step_scale,
            self.resample_probability,
            rng,
        );
        candidate
    }
}

#[async_trait]
impl LocalSearchSolver for SimulatedAnnealing {
    async fn solve(
        &self,
        evaluator: &dyn CandidateEvaluator,
        space: &SearchSpace,
        start: &[f64],
        termination: &Termination,
    ) -> Result<OptimizationResult> {
        self.validate()?;
        let mut rng = make_rng(self.seed);

        let mut current = space.project(start);
        let mut current_score = score_one(evaluator, current.clone()).await?;
        let mut best = current.clone();
        let mut best_score = current_score;
        let mut evaluations = 1;
        let mut history = Vec::new();

        if space.is_empty() {
            return Ok(OptimizationResult {
                solution: best,
                objective_value: best_score,
                steps: 0,
                evaluations,
                history,
                termination: TerminationReason::Converged,
            });
        }

        let mut temperature = self.initial_temperature;
        let mut steps = 0;
        let mut unimproved = 0;
        let termination_reason = loop {
            if let Some(reason) = termination.check(steps) {
                break reason;
            }

            let candidates: Vec<Vec<f64>> = (0..self.moves_per_step)
                .map(|_| self.propose(space, &current, &mut rng))
                .collect();
            let scores = evaluator.evaluate(candidates.clone()).await?;
            if scores.len() != candidates.len() {
                return Err(ExplicarError::dimension_mismatch(
                    "candidate scores",
                    candidates.len(),
                    scores.len(),
                ));
            }
            evaluations += candidates.len();

            // First minimum among the proposals.
            let (k, &score) = scores
                .iter()
                .enumerate()
                .fold(None, |acc: Option<(usize, &f64)>, (i, s)| match acc {
                    Some((_, b)) if !(s < b) => acc,
                    _ => Some((i, s)),
                })
                .ok_or_else(|| ExplicarError::degenerate("no candidates proposed"))?;

            let delta = score - current_score;
            if delta < 0.0 || rng.gen::<f64>() < (-delta / temperature).exp() {
                current = candidates[k].clone();
                current_score = score;
            }

            if current_score < best_score {
                best = current.clone();
                best_score = current_score;
                unimproved = 0;
            } else {
                unimproved += 1;
            }

            temperature = (temperature * self.cooling_rate).max(self.min_temperature);
            steps += 1;
            history.push(best_score);
            trace!(
                step = steps,
                best = best_score,
                current = current_score,
                temperature,
                "annealing step"
            );

            if self.unimproved_step_limit.is_some_and(|limit| unimproved >= limit) {
                break TerminationReason::Converged;
            }
        };

        Ok(OptimizationResult {
            solution: best,
            objective_value: best_score,
            steps,
            evaluations,
            history,
            termination: termination_reason,
        })
    }
}

async fn score_one(evaluator: &dyn CandidateEvaluator, point: Vec<f64>) -> Result<f64> {
    evaluator
        .evaluate(vec![point])
        .await?
        .first()
        .copied()
        .ok_or_else(|| ExplicarError::dimension_mismatch("candidate scores", 1, 0))
}
