//! Derivative-free local search over domain-constrained variables.
//!
//! The counterfactual search hands its objective to a [`LocalSearchSolver`]
//! through the [`CandidateEvaluator`] seam, so any local search can be
//! plugged in. [`SimulatedAnnealing`] is the bundled solver.
//!
//! # Search Space Abstraction
//!
//! Variables are continuous (optionally integer-valued) ranges or discrete
//! index sets, mixed freely in one [`SearchSpace`]:
//!
//! ```
//! use explicar::metaheuristics::SearchSpace;
//!
//! let space = SearchSpace::continuous(2, -5.0, 5.0).with_discrete(4);
//! assert_eq!(space.dimension(), 3);
//! ```
//!
//! # Example
//!
//! ```
//! use explicar::metaheuristics::{
//!     FnEvaluator, LocalSearchSolver, SearchSpace, SimulatedAnnealing, Termination,
//! };
//!
//! let sphere = FnEvaluator::new(|x: &[f64]| x.iter().map(|xi| xi * xi).sum());
//! let space = SearchSpace::continuous(2, -5.0, 5.0);
//! let sa = SimulatedAnnealing::default().with_seed(42);
//! let termination = Termination::new().with_max_steps(500);
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let result = runtime
//!     .block_on(sa.solve(&sphere, &space, &[4.0, -4.0], &termination))
//!     .unwrap();
//! assert!(result.objective_value < 1.0);
//! ```

mod sa;
mod search_space;
mod termination;
mod traits;

pub use sa::SimulatedAnnealing;
pub use search_space::{SearchSpace, Variable};
pub use termination::{CancelHandle, Termination, TerminationReason};
pub use traits::{CandidateEvaluator, FnEvaluator, LocalSearchSolver, OptimizationResult};

#[cfg(test)]
mod tests;
