//! Random draws shared by the perturbation engine and the numeric kernel.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Standard normal draw via the Box-Muller transform.
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = rng.gen_range(f64::MIN_POSITIVE..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Uniform draw in `[lower, upper]`.
///
/// Interpolates between the bounds instead of scaling `upper - lower`, so
/// ranges wider than `f64::MAX` stay finite.
pub fn uniform_between<R: Rng + ?Sized>(rng: &mut R, lower: f64, upper: f64) -> f64 {
    let u: f64 = rng.gen();
    (lower * (1.0 - u) + upper * u).clamp(lower, upper)
}

/// Create RNG from seed or entropy.
#[must_use]
pub fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
