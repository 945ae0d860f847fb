//! Counterfactual explanations.
//!
//! A counterfactual is an input, as close as possible to the original one,
//! for which the model produces a requested goal output. Every input
//! feature becomes a [`CounterfactualEntity`]; entities that are not fixed
//! and carry a domain are handed to an injected [`LocalSearchSolver`] as
//! decision variables. The objective minimized is
//!
//! ```text
//! goal_penalty · (n_searched + 1) + Σ distance(entity)
//! ```
//!
//! where each distance is normalized to `[0, 1]`, so a candidate that meets
//! every goal always beats one that does not.
//!
//! The search stops at the configured step limit, at the request's running
//! time limit or when the caller cancels it. A cut-off search still returns
//! the best candidate scored so far.
//!
//! # Example
//!
//! ```
//! use explicar::counterfactual::{
//!     CounterfactualConfig, CounterfactualExplainer, CounterfactualRequest,
//! };
//! use explicar::feature::{Feature, FeatureDomain};
//! use explicar::prediction::{Output, PredictionInput, PredictionOutput};
//! use explicar::traits::FnPredictionProvider;
//!
//! let model = FnPredictionProvider::new(|inputs: &[PredictionInput]| {
//!     Ok(inputs
//!         .iter()
//!         .map(|input| {
//!             let income = input.features[0].value().as_number();
//!             PredictionOutput::new(vec![Output::boolean("approved", income >= 50.0, 1.0)])
//!         })
//!         .collect())
//! });
//!
//! let request = CounterfactualRequest::new(
//!     PredictionInput::new(vec![Feature::number("income", 30.0)]),
//!     PredictionOutput::new(vec![Output::boolean("approved", true, 1.0)]),
//! )
//! .with_domains(vec![FeatureDomain::numerical(0.0, 100.0).unwrap()]);
//!
//! let explainer = CounterfactualExplainer::new(
//!     CounterfactualConfig::default().with_seed(Some(7)).with_max_steps(300),
//! );
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let result = runtime.block_on(explainer.explain(&request, &model)).unwrap();
//! assert!(result.is_valid);
//! assert!(result.entities[0].feature().value().as_number() >= 50.0);
//! ```

mod entity;
mod objective;

pub use entity::CounterfactualEntity;

use crate::error::{ExplicarError, Result};
use crate::feature::{Feature, FeatureDomain};
use crate::metaheuristics::{
    CancelHandle, LocalSearchSolver, SearchSpace, SimulatedAnnealing, Termination,
    TerminationReason,
};
use crate::prediction::{PredictionInput, PredictionOutput};
use crate::traits::PredictionProvider;
use objective::ModelObjective;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Configuration of [`CounterfactualExplainer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterfactualConfig {
    /// Largest absolute difference at which a numeric goal counts as met
    pub goal_threshold: f64,
    /// Solver step limit
    pub max_steps: usize,
    /// Candidates scored per solver step (default solver only)
    pub moves_per_step: usize,
    /// Seed of the default solver
    pub seed: Option<u64>,
}

impl Default for CounterfactualConfig {
    fn default() -> Self {
        Self {
            goal_threshold: 0.01,
            max_steps: 5_000,
            moves_per_step: 8,
            seed: None,
        }
    }
}

impl CounterfactualConfig {
    /// Sets the goal threshold.
    #[must_use]
    pub fn with_goal_threshold(mut self, threshold: f64) -> Self {
        self.goal_threshold = threshold;
        self
    }

    /// Sets the step limit.
    #[must_use]
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Sets the candidates scored per step.
    #[must_use]
    pub fn with_moves_per_step(mut self, moves: usize) -> Self {
        self.moves_per_step = moves;
        self
    }

    /// Sets the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Checks parameter ranges.
    ///
    /// # Errors
    ///
    /// `InvalidHyperparameter` for a negative or NaN goal threshold or zero
    /// moves per step.
    pub fn validate(&self) -> Result<()> {
        if !(self.goal_threshold >= 0.0) {
            return Err(ExplicarError::invalid_hyperparameter(
                "goal_threshold",
                self.goal_threshold,
                ">= 0",
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
}

/// What to explain: the original input, the goal outputs and the search
/// constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterfactualRequest {
    /// Original input
    pub input: PredictionInput,
    /// Outputs the counterfactual must produce
    pub goal: PredictionOutput,
    /// One domain per input feature
    pub domains: Vec<FeatureDomain>,
    /// One flag per input feature; fixed features never change
    pub fixed: Vec<bool>,
    /// Wall-clock limit of the search
    pub max_running_time: Option<Duration>,
}

impl CounterfactualRequest {
    /// Request with each feature's own domain, nothing fixed and no time
    /// limit.
    #[must_use]
    pub fn new(input: PredictionInput, goal: PredictionOutput) -> Self {
        let domains = input.features.iter().map(|f| f.domain().clone()).collect();
        let fixed = vec![false; input.features.len()];
        Self {
            input,
            goal,
            domains,
            fixed,
            max_running_time: None,
        }
    }

    /// Replaces the domains.
    #[must_use]
    pub fn with_domains(mut self, domains: Vec<FeatureDomain>) -> Self {
        self.domains = domains;
        self
    }

    /// Replaces the fixed flags.
    #[must_use]
    pub fn with_fixed(mut self, fixed: Vec<bool>) -> Self {
        self.fixed = fixed;
        self
    }

    /// Sets the running time limit.
    #[must_use]
    pub fn with_max_running_time(mut self, limit: Duration) -> Self {
        self.max_running_time = Some(limit);
        self
    }

    fn entities(&self) -> Result<Vec<CounterfactualEntity>> {
        let n = self.input.features.len();
        if self.domains.len() != n {
            return Err(ExplicarError::dimension_mismatch("domains", n, self.domains.len()));
        }
        if self.fixed.len() != n {
            return Err(ExplicarError::dimension_mismatch("fixed flags", n, self.fixed.len()));
        }
        self.input
            .features
            .iter()
            .zip(&self.domains)
            .zip(&self.fixed)
            .map(|((feature, domain), &fixed)| {
                CounterfactualEntity::new(feature.clone(), domain.clone(), fixed)
            })
            .collect()
    }
}

/// Outcome of a counterfactual search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterfactualResult {
    /// True when `output` meets every goal
    pub is_valid: bool,
    /// Entities holding the counterfactual values, in input order
    pub entities: Vec<CounterfactualEntity>,
    /// Model output for the counterfactual; empty if nothing was scored
    pub output: PredictionOutput,
    /// Objective of the counterfactual
    pub objective: f64,
    /// Solver steps completed
    pub steps: usize,
    /// Model evaluations
    pub evaluations: usize,
    /// Why the search stopped
    pub termination: TerminationReason,
}

impl CounterfactualResult {
    /// Counterfactual input features.
    #[must_use]
    pub fn features(&self) -> Vec<Feature> {
        self.entities.iter().map(|e| e.feature().clone()).collect()
    }

    /// Entities whose value differs from the original input.
    #[must_use]
    pub fn changed_entities(&self) -> Vec<&CounterfactualEntity> {
        self.entities.iter().filter(|e| e.is_changed()).collect()
    }
}

enum Finish {
    Solved {
        steps: usize,
        termination: TerminationReason,
    },
    Failed(ExplicarError),
    Stopped(TerminationReason),
}

/// Counterfactual explainer over an injected local search solver.
#[derive(Clone)]
pub struct CounterfactualExplainer {
    config: CounterfactualConfig,
    solver: Arc<dyn LocalSearchSolver>,
}

impl fmt::Debug for CounterfactualExplainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CounterfactualExplainer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for CounterfactualExplainer {
    fn default() -> Self {
        Self::new(CounterfactualConfig::default())
    }
}

impl CounterfactualExplainer {
    /// Explainer using [`SimulatedAnnealing`] seeded from `config`.
    #[must_use]
    pub fn new(config: CounterfactualConfig) -> Self {
        let mut solver = SimulatedAnnealing::default().with_moves_per_step(config.moves_per_step);
        if let Some(seed) = config.seed {
            solver = solver.with_seed(seed);
        }
        Self {
            config,
            solver: Arc::new(solver),
        }
    }

    /// Replaces the solver.
    #[must_use]
    pub fn with_solver<S>(mut self, solver: S) -> Self
    where
        S: LocalSearchSolver + 'static,
    {
        self.solver = Arc::new(solver);
        self
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &CounterfactualConfig {
        &self.config
    }

    /// Searches for a counterfactual of `request`.
    ///
    /// # Errors
    ///
    /// - `InvalidHyperparameter` for an invalid configuration
    /// - `DimensionMismatch` when domains or flags do not match the input
    /// - `InvalidInput` for a domain that does not suit its feature
    /// - `PredictionFailure` when the model fails or omits a goal output
    pub async fn explain<P>(
        &self,
        request: &CounterfactualRequest,
        model: &P,
    ) -> Result<CounterfactualResult>
    where
        P: PredictionProvider + ?Sized,
    {
        self.explain_with_cancel(request, model, CancelHandle::new())
            .await
    }

    /// Like [`explain`](Self::explain), stopping early when `cancel` fires.
    ///
    /// # Errors
    ///
    /// Same as [`explain`](Self::explain).
    pub async fn explain_with_cancel<P>(
        &self,
        request: &CounterfactualRequest,
        model: &P,
        cancel: CancelHandle,
    ) -> Result<CounterfactualResult>
    where
        P: PredictionProvider + ?Sized,
    {
        self.config.validate()?;
        let mut entities = request.entities()?;
        let deadline = request.max_running_time.map(|limit| Instant::now() + limit);

        let objective = ModelObjective::new(
            model,
            &entities,
            &request.goal.outputs,
            self.config.goal_threshold,
        );
        let searched = objective.searched().to_vec();
        let space = searched
            .iter()
            .filter_map(|&i| entities[i].variable())
            .fold(SearchSpace::new(), SearchSpace::with_variable);
        let start: Vec<f64> = searched.iter().map(|&i| entities[i].start()).collect();

        let mut termination = Termination::new()
            .with_max_steps(self.config.max_steps)
            .with_cancel(cancel.clone());
        if let Some(deadline) = deadline {
            termination = termination.with_deadline(deadline);
        }

        debug!(
            entities = entities.len(),
            searched = searched.len(),
            goals = request.goal.outputs.len(),
            "counterfactual search"
        );
        let solve = self.solver.solve(&objective, &space, &start, &termination);
        let finish = tokio::select! {
            biased;
            () = cancel.cancelled() => Finish::Stopped(TerminationReason::Cancelled),
            outcome = until(deadline, solve) => match outcome {
                Some(Ok(result)) => Finish::Solved {
                    steps: result.steps,
                    termination: result.termination,
                },
                Some(Err(err)) => Finish::Failed(err),
                None => Finish::Stopped(TerminationReason::TimeLimit),
            },
        };

        let (steps, termination) = match finish {
            Finish::Solved { steps, termination } => (steps, termination),
            Finish::Failed(err) => return Err(err),
            Finish::Stopped(reason) => {
                if reason == TerminationReason::TimeLimit {
                    warn!(
                        evaluations = objective.evaluations(),
                        "counterfactual deadline expired, returning best candidate"
                    );
                }
                (objective.batches().saturating_sub(1), reason)
            }
        };

        let evaluations = objective.evaluations();
        let best = objective.best().await;
        drop(objective);

        let result = match best {
            Some(best) => {
                for (&i, &x) in searched.iter().zip(&best.point) {
                    entities[i].assign(x);
                }
                CounterfactualResult {
                    is_valid: best.is_valid,
                    entities,
                    output: best.output,
                    objective: best.objective,
                    steps,
                    evaluations,
                    termination,
                }
            }
            None => CounterfactualResult {
                is_valid: false,
                entities,
                output: PredictionOutput::default(),
                objective: f64::INFINITY,
                steps,
                evaluations,
                termination,
            },
        };
        debug!(
            valid = result.is_valid,
            changed = result.changed_entities().len(),
            steps = result.steps,
            evaluations = result.evaluations,
            termination = ?result.termination,
            "counterfactual search finished"
        );
        Ok(result)
    }
}

/// Runs `fut` to completion, or until `deadline` when one is given.
async fn until<F: Future>(deadline: Option<Instant>, fut: F) -> Option<F::Output> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, fut).await.ok(),
        None => Some(fut.await),
    }
}

#[cfg(test)]
mod tests;
