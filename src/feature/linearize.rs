//! Flattening of nested features into scalar leaves and back.
//!
//! Composite children are named by key path (`parent.child`) and free text
//! is split into one leaf per whitespace token (`name_0`, `name_1`, ...).
//! The returned [`FeatureLayout`] remembers original names, composite
//! domains and the exact whitespace between tokens, so unflattening a
//! linearized list reproduces the input exactly.

use super::{Feature, FeatureDomain, FeatureType, Value};
use crate::error::{ExplicarError, Result};
use serde::{Deserialize, Serialize};

/// Positional map from a linearized feature list back to the original tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureLayout {
    nodes: Vec<LayoutNode>,
    width: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum LayoutNode {
    Leaf {
        name: String,
    },
    Text {
        name: String,
        shape: TextShape,
    },
    Composite {
        name: String,
        domain: FeatureDomain,
        children: Vec<LayoutNode>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum TextShape {
    /// Whitespace runs around the tokens, one more than the token count.
    Spaced(Vec<String>),
    /// Pre-tokenized text with this many tokens.
    Tokens(usize),
}

/// Flattens `features` into scalar leaves.
///
/// Composite features are replaced by their (recursively flattened)
/// children; unconstrained text features by one text leaf per token. All
/// other features pass through under their key-path name.
///
/// # Examples
///
/// ```
/// use explicar::feature::{linearize, Feature};
///
/// let features = vec![
///     Feature::composite("address", vec![Feature::number("zip", 1010.0)]),
///     Feature::text("note", "hello world"),
/// ];
/// let (linear, layout) = linearize(&features);
/// let names: Vec<&str> = linear.iter().map(|f| f.name()).collect();
/// assert_eq!(names, ["address.zip", "note_0", "note_1"]);
/// assert_eq!(layout.unflatten(&linear).unwrap(), features);
/// ```
#[must_use]
pub fn linearize(features: &[Feature]) -> (Vec<Feature>, FeatureLayout) {
    let mut linear = Vec::new();
    let nodes = features
        .iter()
        .map(|feature| flatten_into(feature, "", &mut linear))
        .collect();
    let width = linear.len();
    (linear, FeatureLayout { nodes, width })
}

fn flatten_into(feature: &Feature, prefix: &str, out: &mut Vec<Feature>) -> LayoutNode {
    let path = if prefix.is_empty() {
        feature.name().to_string()
    } else {
        format!("{prefix}.{}", feature.name())
    };
    let tokenize = feature.feature_type() == FeatureType::Text && feature.domain().is_empty();

    match feature.value() {
        Value::Composite(children) => LayoutNode::Composite {
            name: feature.name().to_string(),
            domain: feature.domain().clone(),
            children: children
                .iter()
                .map(|child| flatten_into(child, &path, out))
                .collect(),
        },
        Value::Text(text) if tokenize => {
            let (tokens, separators) = split_with_separators(text);
            for (i, token) in tokens.into_iter().enumerate() {
                out.push(Feature::text(format!("{path}_{i}"), token));
            }
            LayoutNode::Text {
                name: feature.name().to_string(),
                shape: TextShape::Spaced(separators),
            }
        }
        Value::Tokens(tokens) if tokenize => {
            for (i, token) in tokens.iter().enumerate() {
                out.push(Feature::text(format!("{path}_{i}"), token.clone()));
            }
            LayoutNode::Text {
                name: feature.name().to_string(),
                shape: TextShape::Tokens(tokens.len()),
            }
        }
        _ => {
            out.push(feature.renamed(path));
            LayoutNode::Leaf {
                name: feature.name().to_string(),
            }
        }
    }
}

impl FeatureLayout {
    /// Number of linear leaves this layout consumes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.width
    }

    /// Returns true when the layout has no leaves.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0
    }

    /// Rebuilds the original feature tree from (possibly perturbed) leaves.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if `linear` does not hold exactly
    /// [`len`](Self::len) leaves.
    pub fn unflatten(&self, linear: &[Feature]) -> Result<Vec<Feature>> {
        if linear.len() != self.width {
            return Err(ExplicarError::dimension_mismatch(
                "linear features",
                self.width,
                linear.len(),
            ));
        }
        let mut cursor = linear.iter();
        self.nodes
            .iter()
            .map(|node| node.rebuild(&mut cursor))
            .collect()
    }
}

impl LayoutNode {
    fn rebuild<'a, I>(&self, cursor: &mut I) -> Result<Feature>
    where
        I: Iterator<Item = &'a Feature>,
    {
        let mut next = || {
            cursor
                .next()
                .ok_or_else(|| ExplicarError::invalid_input("layout ran out of linear features"))
        };
        match self {
            Self::Leaf { name } => Ok(next()?.renamed(name.as_str())),
            Self::Text { name, shape } => match shape {
                TextShape::Spaced(separators) => {
                    let count = separators.len().saturating_sub(1);
                    let tokens = (0..count)
                        .map(|_| next().map(|f| f.value().as_string()))
                        .collect::<Result<Vec<_>>>()?;
                    Ok(Feature::text(
                        name.as_str(),
                        join_with_separators(&tokens, separators),
                    ))
                }
                TextShape::Tokens(count) => {
                    let tokens = (0..*count)
                        .map(|_| next().map(|f| f.value().as_string()))
                        .collect::<Result<Vec<_>>>()?;
                    Ok(Feature::tokens(name.as_str(), tokens))
                }
            },
            Self::Composite {
                name,
                domain,
                children,
            } => {
                let children = children
                    .iter()
                    .map(|child| child.rebuild(cursor))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Feature {
                    name: name.clone(),
                    ty: FeatureType::Composite,
                    value: Value::Composite(children),
                    domain: domain.clone(),
                })
            }
        }
    }
}

/// Splits text into whitespace-free tokens and the whitespace runs around
/// them. `separators.len() == tokens.len() + 1`.
pub(crate) fn split_with_separators(text: &str) -> (Vec<String>, Vec<String>) {
    let mut tokens = Vec::new();
    let mut separators = Vec::new();
    let mut token = String::new();
    let mut separator = String::new();

    for ch in text.chars() {
        if ch.is_whitespace() {
            if !token.is_empty() {
                tokens.push(std::mem::take(&mut token));
            }
            separator.push(ch);
        } else {
            if token.is_empty() {
                separators.push(std::mem::take(&mut separator));
            }
            token.push(ch);
        }
    }
    if !token.is_empty() {
        tokens.push(token);
    }
    separators.push(separator);
    (tokens, separators)
}

/// Inverse of [`split_with_separators`]. Falls back to single spaces when
/// the separator count does not fit the tokens.
pub(crate) fn join_with_separators(tokens: &[String], separators: &[String]) -> String {
    if separators.len() != tokens.len() + 1 {
        return tokens.join(" ");
    }
    let mut text = separators[0].clone();
    for (token, separator) in tokens.iter().zip(&separators[1..]) {
        text.push_str(token);
        text.push_str(separator);
    }
    text
}
