//! Typed feature model.
//!
//! A [`Feature`] is an immutable named datum with a declared
//! [`FeatureType`], a [`Value`] payload that agrees with that type, and a
//! [`FeatureDomain`] bounding the values it may take. Nested composites are
//! flattened to scalar leaves by [`linearize`] and rebuilt exactly by
//! [`FeatureLayout::unflatten`].

mod domain;
mod linearize;
mod value;

pub use domain::FeatureDomain;
pub use linearize::{linearize, FeatureLayout};
pub(crate) use linearize::{join_with_separators, split_with_separators};
pub use value::Value;

use crate::error::{ExplicarError, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Declared type of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureType {
    /// Real-valued.
    Number,
    /// True/false.
    Boolean,
    /// Label drawn from a finite set.
    Categorical,
    /// Free text, tokenized on whitespace.
    Text,
    /// Length of time.
    Duration,
    /// Time of day.
    Time,
    /// Ordered list of child features.
    Composite,
    /// Opaque structured payload.
    Object,
    /// No value.
    Undefined,
}

impl FeatureType {
    /// Returns true when `value` has the runtime shape this type requires.
    #[must_use]
    pub fn accepts(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Self::Number, Value::Number(_))
                | (Self::Boolean, Value::Boolean(_))
                | (Self::Categorical, Value::Text(_))
                | (Self::Text, Value::Text(_) | Value::Tokens(_))
                | (Self::Duration, Value::Duration(_))
                | (Self::Time, Value::Time(_))
                | (Self::Composite, Value::Composite(_))
                | (Self::Object, Value::Object(_))
                | (Self::Undefined, Value::Undefined)
        )
    }

    /// The neutral value a feature of this type takes when it is dropped
    /// from an input. Types without a neutral value keep `current`.
    #[must_use]
    pub fn drop_value(self, current: &Value) -> Value {
        match self {
            Self::Number => Value::Number(0.0),
            Self::Boolean => Value::Boolean(false),
            Self::Categorical => Value::Text(String::new()),
            Self::Text => match current {
                Value::Tokens(_) => Value::Tokens(Vec::new()),
                _ => Value::Text(String::new()),
            },
            Self::Duration => Value::Duration(Duration::ZERO),
            Self::Time => Value::Time(NaiveTime::default()),
            Self::Composite | Self::Object | Self::Undefined => current.clone(),
        }
    }

    /// Number-like types encode as a real coordinate.
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Number | Self::Duration | Self::Time)
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Categorical => "categorical",
            Self::Text => "text",
            Self::Duration => "duration",
            Self::Time => "time",
            Self::Composite => "composite",
            Self::Object => "object",
            Self::Undefined => "undefined",
        };
        f.write_str(name)
    }
}

/// A named, typed input datum.
///
/// # Examples
///
/// ```
/// use explicar::feature::{Feature, FeatureDomain, FeatureType};
///
/// let age = Feature::number("age", 42.0)
///     .with_domain(FeatureDomain::numerical(18.0, 65.0).unwrap())
///     .unwrap();
/// assert_eq!(age.feature_type(), FeatureType::Number);
/// assert!((age.value().as_number() - 42.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FeatureRecord")]
pub struct Feature {
    name: String,
    #[serde(rename = "type")]
    ty: FeatureType,
    value: Value,
    domain: FeatureDomain,
}

/// Wire form of [`Feature`]; deserialization goes through the same checks
/// as the constructors.
#[derive(Deserialize)]
struct FeatureRecord {
    name: String,
    #[serde(rename = "type")]
    ty: FeatureType,
    value: Value,
    #[serde(default)]
    domain: FeatureDomain,
}

impl TryFrom<FeatureRecord> for Feature {
    type Error = ExplicarError;

    fn try_from(record: FeatureRecord) -> Result<Self> {
        let domain = match record.domain {
            FeatureDomain::NumericalRange { lower, upper } => {
                FeatureDomain::numerical(lower, upper)?
            }
            other => other,
        };
        Self::new(record.name, record.ty, record.value)?.with_domain(domain)
    }
}

impl Feature {
    /// Creates a feature after checking that `value` matches `ty`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` on a type/value mismatch.
    pub fn new(name: impl Into<String>, ty: FeatureType, value: Value) -> Result<Self> {
        let name = name.into();
        if !ty.accepts(&value) {
            return Err(ExplicarError::invalid_input(format!(
                "feature '{name}' declared {ty} but holds {value:?}"
            )));
        }
        Ok(Self {
            name,
            ty,
            value,
            domain: FeatureDomain::Empty,
        })
    }

    /// Numeric feature.
    #[must_use]
    pub fn number(name: impl Into<String>, value: f64) -> Self {
        Self::typed(name, FeatureType::Number, Value::Number(value))
    }

    /// Boolean feature.
    #[must_use]
    pub fn boolean(name: impl Into<String>, value: bool) -> Self {
        Self::typed(name, FeatureType::Boolean, Value::Boolean(value))
    }

    /// Categorical feature.
    #[must_use]
    pub fn categorical(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::typed(name, FeatureType::Categorical, Value::Text(value.into()))
    }

    /// Free-text feature.
    #[must_use]
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::typed(name, FeatureType::Text, Value::Text(value.into()))
    }

    /// Pre-tokenized text feature.
    #[must_use]
    pub fn tokens(name: impl Into<String>, tokens: Vec<String>) -> Self {
        Self::typed(name, FeatureType::Text, Value::Tokens(tokens))
    }

    /// Duration feature.
    #[must_use]
    pub fn duration(name: impl Into<String>, value: Duration) -> Self {
        Self::typed(name, FeatureType::Duration, Value::Duration(value))
    }

    /// Time-of-day feature.
    #[must_use]
    pub fn time(name: impl Into<String>, value: NaiveTime) -> Self {
        Self::typed(name, FeatureType::Time, Value::Time(value))
    }

    /// Composite feature over ordered children.
    #[must_use]
    pub fn composite(name: impl Into<String>, children: Vec<Feature>) -> Self {
        Self::typed(name, FeatureType::Composite, Value::Composite(children))
    }

    /// Object feature over an opaque JSON payload.
    #[must_use]
    pub fn object(name: impl Into<String>, value: serde_json::Value) -> Self {
        Self::typed(name, FeatureType::Object, Value::Object(value))
    }

    /// Feature without a value.
    #[must_use]
    pub fn undefined(name: impl Into<String>) -> Self {
        Self::typed(name, FeatureType::Undefined, Value::Undefined)
    }

    fn typed(name: impl Into<String>, ty: FeatureType, value: Value) -> Self {
        Self {
            name: name.into(),
            ty,
            value,
            domain: FeatureDomain::Empty,
        }
    }

    /// Attaches a domain.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the domain cannot hold values of this
    /// feature's type.
    pub fn with_domain(mut self, domain: FeatureDomain) -> Result<Self> {
        if !domain.is_compatible_with(self.ty) {
            return Err(ExplicarError::invalid_input(format!(
                "domain {domain:?} is not valid for {} feature '{}'",
                self.ty, self.name
            )));
        }
        self.domain = domain;
        Ok(self)
    }

    /// Same feature carrying `value`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when `value` does not match the feature type.
    pub fn with_value(&self, value: Value) -> Result<Self> {
        if !self.ty.accepts(&value) {
            return Err(ExplicarError::invalid_input(format!(
                "feature '{}' declared {} but got {value:?}",
                self.name, self.ty
            )));
        }
        Ok(self.replaced(value))
    }

    /// Copy with a new value; callers guarantee the type agrees.
    pub(crate) fn replaced(&self, value: Value) -> Self {
        Self {
            name: self.name.clone(),
            ty: self.ty,
            value,
            domain: self.domain.clone(),
        }
    }

    /// Copy under another name.
    pub(crate) fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Feature name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type.
    #[must_use]
    pub fn feature_type(&self) -> FeatureType {
        self.ty
    }

    /// Payload.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Domain boundary.
    #[must_use]
    pub fn domain(&self) -> &FeatureDomain {
        &self.domain
    }

    /// Same feature with its type's neutral value.
    #[must_use]
    pub fn dropped(&self) -> Self {
        self.replaced(self.ty.drop_value(&self.value))
    }
}
