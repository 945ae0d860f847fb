//! Linear surrogate models.
//!
//! - [`WeightedLinearRegression`]: closed-form weighted least squares with
//!   standard errors and p-values, backed by the jittered inverse for
//!   rank-deficient systems.
//! - [`LarsPath`]: the lasso regularization path computed by least angle
//!   regression.
//! - [`LassoLarsIc`]: picks the point on the lasso path minimizing AIC or
//!   BIC.

mod lars;
mod lasso_lars_ic;
mod weighted;

pub use lars::{LarsPath, LarsPathResult};
pub use lasso_lars_ic::{Criterion, LassoLarsIc, LassoLarsIcResult};
pub use weighted::{WeightedFit, WeightedLinearRegression};
