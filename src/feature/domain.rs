//! Permissible values for a feature during perturbation and search.

use super::{FeatureType, Value};
use crate::error::{ExplicarError, Result};
use serde::{Deserialize, Serialize};

/// Domain boundary of a feature.
///
/// `Empty` means the feature is unconstrained for perturbation and, in a
/// counterfactual search, held fixed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum FeatureDomain {
    /// No boundary; not a search variable.
    #[default]
    Empty,
    /// Closed numeric interval `[lower, upper]`.
    NumericalRange {
        /// Lower bound (inclusive)
        lower: f64,
        /// Upper bound (inclusive)
        upper: f64,
    },
    /// Finite set of allowed values.
    CategoricalSet(Vec<Value>),
}

impl FeatureDomain {
    /// Numeric interval domain.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for non-finite bounds, `lower > upper` or a
    /// width that overflows `f64`.
    pub fn numerical(lower: f64, upper: f64) -> Result<Self> {
        let width = upper - lower;
        if !lower.is_finite() || !upper.is_finite() || lower > upper || !width.is_finite() {
            return Err(ExplicarError::invalid_input(format!(
                "invalid numerical range [{lower}, {upper}]"
            )));
        }
        Ok(Self::NumericalRange { lower, upper })
    }

    /// Categorical domain over `values`, duplicates removed (first kept).
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an empty set.
    pub fn categorical<I, V>(values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut unique: Vec<Value> = Vec::new();
        for value in values {
            let value = value.into();
            if !unique.contains(&value) {
                unique.push(value);
            }
        }
        if unique.is_empty() {
            return Err(ExplicarError::invalid_input("categorical domain is empty"));
        }
        Ok(Self::CategoricalSet(unique))
    }

    /// `{false, true}`.
    #[must_use]
    pub fn boolean() -> Self {
        Self::CategoricalSet(vec![Value::Boolean(false), Value::Boolean(true)])
    }

    /// Returns true for the unconstrained domain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns true when `value` lies inside the domain. Everything lies
    /// inside `Empty`.
    #[must_use]
    pub fn contains(&self, value: &Value) -> bool {
        match self {
            Self::Empty => true,
            Self::NumericalRange { lower, upper } => {
                let x = value.as_number();
                x >= *lower && x <= *upper
            }
            Self::CategoricalSet(values) => values.contains(value),
        }
    }

    /// Returns true when a feature of type `ty` may carry this domain.
    #[must_use]
    pub fn is_compatible_with(&self, ty: FeatureType) -> bool {
        match self {
            Self::Empty => true,
            Self::NumericalRange { .. } => matches!(
                ty,
                FeatureType::Number | FeatureType::Duration | FeatureType::Time
            ),
            Self::CategoricalSet(values) => {
                !matches!(
                    ty,
                    FeatureType::Composite | FeatureType::Undefined | FeatureType::Object
                ) && values.iter().all(|v| ty.accepts(v))
            }
        }
    }
}
