//! Factor combination layer for Cadiz.
//!
//! Sits between the risk and solver crates and portfolio output: the
//! [`FactorWeightOptimizer`] derives factor weights from factor return
//! streams (covariance-driven, IC-driven, or uniform), optionally under
//! group and turnover constraints, and [`build_portfolio`] turns weighted
//! factor exposures into a long/short composite portfolio with
//! transaction-cost accounting.

pub mod constraints;
pub mod optimizer;
pub mod portfolio;

// Re-export main types
pub use constraints::{GroupConstraint, TurnoverConstraint, WeightConstraints};
pub use optimizer::{FactorWeightOptimizer, OptimizerConfig, WeightingMethod};
pub use portfolio::{build_portfolio, PortfolioConfig, PortfolioResult};
