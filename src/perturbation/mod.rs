//! Seeded perturbation of feature lists.
//!
//! [`perturb`] replaces a bounded number of features with alternative values
//! of the same type. All randomness flows through the
//! [`PerturbationContext`] owned by the caller, so a seeded context yields
//! bit-identical neighbor streams.

use crate::feature::{join_with_separators, split_with_separators, Feature, FeatureDomain, Value};
use crate::primitives::random::{make_rng, standard_normal, uniform_between};
use chrono::NaiveTime;
use rand::rngs::StdRng;
use rand::seq::{index, SliceRandom};
use rand::Rng;
use std::time::Duration;

/// Words used for text and unconstrained categorical features.
pub const DEFAULT_WORD_POOL: &[&str] = &[
    "a", "the", "of", "and", "to", "in", "is", "it", "not", "with", "for", "on", "as", "at",
    "by", "from", "but", "or", "an", "be",
];

const SECONDS_PER_DAY: i64 = 86_400;
const MAX_REDRAWS: usize = 16;

/// Random stream and intensity shared by every sampling call of one
/// explanation.
#[derive(Debug, Clone)]
pub struct PerturbationContext {
    seed: Option<u64>,
    rng: StdRng,
    perturbation_size: usize,
}

impl PerturbationContext {
    /// Creates a context; `None` seeds from entropy.
    #[must_use]
    pub fn new(seed: Option<u64>, perturbation_size: usize) -> Self {
        Self {
            seed,
            rng: make_rng(seed),
            perturbation_size,
        }
    }

    /// Seed the stream started from.
    #[must_use]
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Number of features replaced per call.
    #[must_use]
    pub fn perturbation_size(&self) -> usize {
        self.perturbation_size
    }
}

/// Returns a copy of `features` with `min(size, len)` distinct positions
/// replaced by new values of the same type.
///
/// A selected composite consumes one unit of the budget and perturbs one
/// of its children recursively. Features that have no alternative value
/// (undefined, opaque objects without a numeric or boolean payload,
/// single-valued domains) stay unchanged.
///
/// # Examples
///
/// ```
/// use explicar::feature::Feature;
/// use explicar::perturbation::{perturb, PerturbationContext};
///
/// let features = vec![Feature::number("x", 1.0), Feature::boolean("b", true)];
/// let mut ctx = PerturbationContext::new(Some(0), 1);
/// let neighbor = perturb(&features, &mut ctx);
/// let changed = neighbor.iter().zip(&features).filter(|(a, b)| a != b).count();
/// assert_eq!(changed, 1);
/// ```
#[must_use]
pub fn perturb(features: &[Feature], ctx: &mut PerturbationContext) -> Vec<Feature> {
    let size = ctx.perturbation_size;
    perturb_with_budget(features, size, &mut ctx.rng)
}

fn perturb_with_budget(features: &[Feature], budget: usize, rng: &mut StdRng) -> Vec<Feature> {
    let mut result = features.to_vec();
    let amount = budget.min(features.len());
    if amount == 0 {
        return result;
    }
    let mut positions = index::sample(rng, features.len(), amount).into_vec();
    positions.sort_unstable();
    for position in positions {
        result[position] = perturb_feature(&features[position], rng);
    }
    result
}

/// Draws a replacement for one feature.
fn perturb_feature(feature: &Feature, rng: &mut StdRng) -> Feature {
    let value = match feature.value() {
        Value::Composite(children) => Value::Composite(perturb_with_budget(children, 1, rng)),
        other => perturb_value(other, feature.domain(), rng),
    };
    feature.replaced(value)
}

fn perturb_value(value: &Value, domain: &FeatureDomain, rng: &mut StdRng) -> Value {
    if let FeatureDomain::CategoricalSet(values) = domain {
        return draw_other(values, value, rng).unwrap_or_else(|| value.clone());
    }
    match value {
        Value::Number(x) => Value::Number(perturb_number(*x, domain, rng)),
        Value::Boolean(b) => Value::Boolean(!b),
        Value::Text(text) => Value::Text(perturb_text(text, rng)),
        Value::Tokens(tokens) => Value::Tokens(perturb_tokens(tokens, rng)),
        Value::Duration(d) => Value::Duration(perturb_duration(*d, domain, rng)),
        Value::Time(t) => Value::Time(perturb_time(*t, domain, rng)),
        Value::Object(json) => Value::Object(perturb_json(json, rng)),
        Value::Composite(_) | Value::Undefined => value.clone(),
    }
}

fn draw_other(pool: &[Value], current: &Value, rng: &mut StdRng) -> Option<Value> {
    let candidates: Vec<&Value> = pool.iter().filter(|v| *v != current).collect();
    candidates.choose(rng).map(|v| (*v).clone())
}

fn is_integral(x: f64) -> bool {
    x.is_finite() && x.fract() == 0.0
}

/// Gaussian step around `x` (σ = half its magnitude, at least 1) without a
/// range; uniform redraw inside a range. Integral inputs stay integral.
fn perturb_number(x: f64, domain: &FeatureDomain, rng: &mut StdRng) -> f64 {
    match domain {
        FeatureDomain::NumericalRange { lower, upper } => uniform_in_range(x, *lower, *upper, rng),
        _ => {
            let sigma = (x.abs() * 0.5).max(1.0);
            let mut candidate = x + sigma * standard_normal(rng);
            if is_integral(x) {
                candidate = candidate.round();
                if candidate == x {
                    candidate = if rng.gen_bool(0.5) { x + 1.0 } else { x - 1.0 };
                }
            }
            candidate
        }
    }
}

/// Unbounded ranges leave `x` unchanged.
fn uniform_in_range(x: f64, lower: f64, upper: f64, rng: &mut StdRng) -> f64 {
    if !(lower.is_finite() && upper.is_finite()) {
        return x;
    }
    if lower >= upper {
        return lower;
    }
    let integral = is_integral(x) && is_integral(lower) && is_integral(upper);
    if integral && upper - lower < 1.0 {
        return x;
    }
    for _ in 0..MAX_REDRAWS {
        let candidate = if integral {
            uniform_between(rng, lower, upper).round()
        } else {
            uniform_between(rng, lower, upper)
        };
        if candidate != x {
            return candidate;
        }
    }
    if x == lower {
        upper
    } else {
        lower
    }
}

fn pool_word_other_than(current: &str, rng: &mut StdRng) -> String {
    let candidates: Vec<&&str> = DEFAULT_WORD_POOL.iter().filter(|w| **w != current).collect();
    candidates
        .choose(rng)
        .map_or_else(|| current.to_string(), |w| (**w).to_string())
}

/// Replaces one whitespace token; empty text becomes a single pool word.
fn perturb_text(text: &str, rng: &mut StdRng) -> String {
    let (mut tokens, separators) = split_with_separators(text);
    if tokens.is_empty() {
        return pool_word_other_than("", rng);
    }
    let i = rng.gen_range(0..tokens.len());
    tokens[i] = pool_word_other_than(&tokens[i], rng);
    join_with_separators(&tokens, &separators)
}

fn perturb_tokens(tokens: &[String], rng: &mut StdRng) -> Vec<String> {
    let mut tokens = tokens.to_vec();
    if tokens.is_empty() {
        tokens.push(pool_word_other_than("", rng));
        return tokens;
    }
    let i = rng.gen_range(0..tokens.len());
    tokens[i] = pool_word_other_than(&tokens[i], rng);
    tokens
}

fn perturb_duration(d: Duration, domain: &FeatureDomain, rng: &mut StdRng) -> Duration {
    let secs = d.as_secs_f64();
    let candidate = match domain {
        FeatureDomain::NumericalRange { lower, upper } => {
            uniform_in_range(secs, lower.max(0.0), upper.max(0.0), rng)
        }
        _ => {
            let sigma = (secs * 0.5).max(1.0);
            let mut next = (secs + sigma * standard_normal(rng)).max(0.0);
            if next == secs {
                next = secs + 1.0;
            }
            next
        }
    };
    Duration::try_from_secs_f64(candidate).unwrap_or(d)
}

/// Shifts by a Gaussian number of seconds (σ = 1 h), wrapping at midnight.
fn perturb_time(t: NaiveTime, domain: &FeatureDomain, rng: &mut StdRng) -> NaiveTime {
    let secs = i64::from(chrono::Timelike::num_seconds_from_midnight(&t));
    let next = match domain {
        FeatureDomain::NumericalRange { lower, upper } => {
            uniform_in_range(secs as f64, *lower, *upper, rng).round() as i64
        }
        _ => {
            let mut shifted = secs + (3600.0 * standard_normal(rng)).round() as i64;
            if shifted == secs {
                shifted += 1;
            }
            shifted
        }
    };
    let wrapped = next.rem_euclid(SECONDS_PER_DAY) as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(wrapped, 0).unwrap_or(t)
}

fn perturb_json(json: &serde_json::Value, rng: &mut StdRng) -> serde_json::Value {
    match json {
        serde_json::Value::Bool(b) => serde_json::Value::Bool(!b),
        serde_json::Value::Number(n) => {
            let Some(x) = n.as_f64() else {
                return json.clone();
            };
            let next = perturb_number(x, &FeatureDomain::Empty, rng);
            if n.is_f64() {
                serde_json::Number::from_f64(next)
                    .map_or_else(|| json.clone(), serde_json::Value::Number)
            } else {
                serde_json::Value::from(next as i64)
            }
        }
        _ => json.clone(),
    }
}
