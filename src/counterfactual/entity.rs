//! Search variables of a counterfactual run.

use crate::error::{ExplicarError, Result};
use crate::feature::{Feature, FeatureDomain, FeatureType, Value};
use crate::metaheuristics::Variable;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One input feature tracked through a counterfactual search.
///
/// Searchable entities (not fixed, with a non-empty domain) map to one
/// solver variable: a numeric range becomes a continuous variable, a
/// categorical set becomes an index into the set. Everything else keeps
/// its original value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterfactualEntity {
    feature: Feature,
    original: Feature,
    domain: FeatureDomain,
    fixed: bool,
}

impl CounterfactualEntity {
    /// Creates an entity for `feature`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the domain does not suit the feature type.
    pub fn new(feature: Feature, domain: FeatureDomain, fixed: bool) -> Result<Self> {
        if !domain.is_compatible_with(feature.feature_type()) {
            return Err(ExplicarError::invalid_input(format!(
                "domain {domain:?} does not suit {} feature '{}'",
                feature.feature_type(),
                feature.name()
            )));
        }
        Ok(Self {
            original: feature.clone(),
            feature,
            domain,
            fixed,
        })
    }

    /// Current feature.
    #[must_use]
    pub fn feature(&self) -> &Feature {
        &self.feature
    }

    /// Feature as given in the original input.
    #[must_use]
    pub fn original(&self) -> &Feature {
        &self.original
    }

    /// Search domain.
    #[must_use]
    pub fn domain(&self) -> &FeatureDomain {
        &self.domain
    }

    /// Returns true when the entity is held constant.
    #[must_use]
    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    /// Returns true when the current value differs from the original.
    #[must_use]
    pub fn is_changed(&self) -> bool {
        self.feature.value() != self.original.value()
    }

    /// Returns true when the entity is a solver variable.
    #[must_use]
    pub fn is_searchable(&self) -> bool {
        !self.fixed && !self.domain.is_empty()
    }

    /// Solver variable for a searchable entity.
    pub(crate) fn variable(&self) -> Option<Variable> {
        if !self.is_searchable() {
            return None;
        }
        match &self.domain {
            FeatureDomain::NumericalRange { lower, upper } => {
                let x = self.original.value().as_number();
                let integer = x.fract() == 0.0 && lower.fract() == 0.0 && upper.fract() == 0.0;
                Some(Variable::Continuous {
                    lower: *lower,
                    upper: *upper,
                    integer,
                })
            }
            FeatureDomain::CategoricalSet(values) => Some(Variable::Discrete {
                cardinality: values.len(),
            }),
            FeatureDomain::Empty => None,
        }
    }

    /// Solver coordinate of the original value. Categorical values missing
    /// from the set start at index 0; the solver projects numbers.
    pub(crate) fn start(&self) -> f64 {
        match &self.domain {
            FeatureDomain::CategoricalSet(values) => values
                .iter()
                .position(|v| v == self.original.value())
                .unwrap_or(0) as f64,
            _ => self.original.value().as_number(),
        }
    }

    /// Feature carrying the value of solver coordinate `x`.
    pub(crate) fn decode(&self, x: f64) -> Feature {
        let value = match &self.domain {
            FeatureDomain::CategoricalSet(values) => {
                let i = if x.is_finite() && x >= 0.0 { x as usize } else { 0 };
                values
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| self.original.value().clone())
            }
            FeatureDomain::NumericalRange { .. } => {
                numeric_value(self.original.feature_type(), x, self.original.value())
            }
            FeatureDomain::Empty => self.original.value().clone(),
        };
        self.original.replaced(value)
    }

    /// Moves the entity to solver coordinate `x`.
    pub(crate) fn assign(&mut self, x: f64) {
        self.feature = self.decode(x);
    }

    /// Normalized distance of `candidate` from the original value, in
    /// `[0, 1]`.
    pub(crate) fn distance(&self, candidate: &Feature) -> f64 {
        match &self.domain {
            FeatureDomain::NumericalRange { lower, upper } => {
                let range = upper - lower;
                if range <= 0.0 {
                    return 0.0;
                }
                let d = (candidate.value().as_number() - self.original.value().as_number()).abs();
                if d.is_finite() {
                    (d / range).min(1.0)
                } else {
                    1.0
                }
            }
            _ => f64::from(u8::from(candidate.value() != self.original.value())),
        }
    }
}

fn numeric_value(ty: FeatureType, x: f64, fallback: &Value) -> Value {
    match ty {
        FeatureType::Number => Value::Number(x),
        FeatureType::Duration => {
            Value::Duration(Duration::try_from_secs_f64(x.max(0.0)).unwrap_or(Duration::ZERO))
        }
        FeatureType::Time => {
            let secs = x.round().rem_euclid(86_400.0) as u32;
            NaiveTime::from_num_seconds_from_midnight_opt(secs, 0)
                .map_or_else(|| fallback.clone(), Value::Time)
        }
        _ => fallback.clone(),
    }
}
