//! Domain-constrained decision variables.

use crate::primitives::random::{standard_normal, uniform_between};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One decision variable.
///
/// Every variable is carried as an `f64` in the solution vector; discrete
/// variables hold an index in `0..cardinality`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Variable {
    /// Real value in `[lower, upper]`, rounded when `integer` is set
    Continuous {
        /// Lower bound (inclusive)
        lower: f64,
        /// Upper bound (inclusive)
        upper: f64,
        /// Restrict to integral values
        integer: bool,
    },
    /// Index into a finite set of `cardinality` choices
    Discrete {
        /// Number of choices
        cardinality: usize,
    },
}

impl Variable {
    /// Moves `value` into the variable's domain.
    #[must_use]
    pub fn project(&self, value: f64) -> f64 {
        match *self {
            Self::Continuous {
                lower,
                upper,
                integer,
            } => {
                let value = if value.is_nan() { lower } else { value };
                let clamped = value.clamp(lower, upper);
                if integer {
                    snap_integer(clamped, lower, upper)
                } else {
                    clamped
                }
            }
            Self::Discrete { cardinality } => {
                if cardinality == 0 || value.is_nan() {
                    return 0.0;
                }
                value.round().clamp(0.0, (cardinality - 1) as f64)
            }
        }
    }

    /// Returns true when `value` lies in the domain.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        match *self {
            Self::Continuous {
                lower,
                upper,
                integer,
            } => (lower..=upper).contains(&value) && (!integer || value.fract() == 0.0),
            Self::Discrete { cardinality } => {
                value.fract() == 0.0 && value >= 0.0 && value < cardinality as f64
            }
        }
    }

    /// Draws a neighbor of `value`.
    ///
    /// Continuous variables take a Gaussian step of `step_scale` times the
    /// range, or with probability `resample_probability` a uniform draw over
    /// the whole range. Discrete variables jump to a different index.
    pub fn neighbor<R: Rng + ?Sized>(
        &self,
        value: f64,
        step_scale: f64,
        resample_probability: f64,
        rng: &mut R,
    ) -> f64 {
        match *self {
            Self::Continuous { lower, upper, .. } => {
                if lower >= upper {
                    return lower;
                }
                let bounded = lower.is_finite() && upper.is_finite();
                let range = upper - lower;
                let scale = if range.is_finite() {
                    range
                } else {
                    value.abs().max(1.0)
                };
                let proposal = if bounded && rng.gen::<f64>() < resample_probability {
                    uniform_between(rng, lower, upper)
                } else {
                    value + standard_normal(rng) * step_scale * scale
                };
                self.project(proposal)
            }
            Self::Discrete { cardinality } => {
                if cardinality < 2 {
                    return 0.0;
                }
                let current = self.project(value) as usize;
                let offset = rng.gen_range(1..cardinality);
                ((current + offset) % cardinality) as f64
            }
        }
    }
}

fn snap_integer(value: f64, lower: f64, upper: f64) -> f64 {
    let rounded = value.round();
    if rounded > upper {
        upper.floor()
    } else if rounded < lower {
        lower.ceil()
    } else {
        rounded
    }
}

/// Ordered list of decision variables.
///
/// # Examples
///
/// ```
/// use explicar::metaheuristics::SearchSpace;
///
/// let space = SearchSpace::new()
///     .with_continuous(0.0, 1.0)
///     .with_integer(18.0, 65.0)
///     .with_discrete(3);
/// assert_eq!(space.dimension(), 3);
/// assert!(space.contains(&[0.5, 30.0, 2.0]));
/// assert!(!space.contains(&[0.5, 30.5, 2.0]));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    variables: Vec<Variable>,
}

impl SearchSpace {
    /// Creates an empty space.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `dim` continuous variables sharing the same bounds.
    #[must_use]
    pub fn continuous(dim: usize, lower: f64, upper: f64) -> Self {
        (0..dim).fold(Self::new(), |space, _| space.with_continuous(lower, upper))
    }

    /// Appends a continuous variable.
    #[must_use]
    pub fn with_continuous(self, lower: f64, upper: f64) -> Self {
        self.with_variable(Variable::Continuous {
            lower,
            upper,
            integer: false,
        })
    }

    /// Appends an integer-valued variable.
    #[must_use]
    pub fn with_integer(self, lower: f64, upper: f64) -> Self {
        self.with_variable(Variable::Continuous {
            lower,
            upper,
            integer: true,
        })
    }

    /// Appends a discrete variable with `cardinality` choices.
    #[must_use]
    pub fn with_discrete(self, cardinality: usize) -> Self {
        self.with_variable(Variable::Discrete { cardinality })
    }

    /// Appends any variable.
    #[must_use]
    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.variables.push(variable);
        self
    }

    /// Number of variables.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.variables.len()
    }

    /// Returns true for a space without variables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// The variables, in order.
    #[must_use]
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Projects every coordinate into its domain. Missing coordinates start
    /// at the lower bound (or index 0).
    #[must_use]
    pub fn project(&self, point: &[f64]) -> Vec<f64> {
        self.variables
            .iter()
            .enumerate()
            .map(|(i, v)| v.project(point.get(i).copied().unwrap_or(f64::NAN)))
            .collect()
    }

    /// Returns true when `point` has the right length and every coordinate
    /// is in its domain.
    #[must_use]
    pub fn contains(&self, point: &[f64]) -> bool {
        point.len() == self.variables.len()
            && self
                .variables
                .iter()
                .zip(point)
                .all(|(v, &x)| v.contains(x))
    }
}
