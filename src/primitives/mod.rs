//! Core numeric primitives (Vector, Matrix).
//!
//! Dense `f64` storage with the handful of operations the surrogate
//! regressions need, plus a jittered inverse for rank-deficient systems.

mod matrix;
pub(crate) mod random;
mod vector;

pub use matrix::{JitterConfig, Matrix};
pub use vector::Vector;
