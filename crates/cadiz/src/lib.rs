#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/cadiz/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! # cadiz
//!
//! Portfolio optimization and factor backtesting core.
//!
//! cadiz is an umbrella crate that re-exports all cadiz sub-crates for
//! convenience. The pipeline runs: raw return/factor panels → covariance
//! estimation → constrained weight solving → factor weight optimization
//! → composite portfolio construction → backtesting and metrics.
//!
//! ## Crate Organization
//!
//! - [`traits`] - Core types ([`Panel`], [`ReturnSeries`], [`Weights`]),
//!   errors, and shared statistics
//! - [`risk`] - Shrinkage covariance estimation
//! - [`solve`] - Constrained portfolio weight solvers
//! - [`combine`] - Factor weight optimization and portfolio construction
//! - [`eval`] - Factor backtesting and IC analysis

/// Version information for the cadiz crate.
///
/// This constant contains the current version of cadiz as specified in Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Core Types
// ============================================================================

/// Core types, errors, and shared statistics.
///
/// Defines the data model every other cadiz crate builds on: validated
/// time-indexed [`Panel`]s, [`ReturnSeries`], [`Weights`], the
/// [`CadizError`] taxonomy, and the pure NaN-safe `stats` functions.
pub mod traits {
    pub use cadiz_traits::*;
}

// Re-export core types at top level for convenience
pub use cadiz_traits::{AssetId, Date, Panel, ReturnSeries, Weights};

// Re-export error types
pub use cadiz_traits::{CadizError, Result};

// Re-export shared statistics records
pub use cadiz_traits::{PerformanceSummary, RiskMetrics};

// ============================================================================
// Risk Estimation
// ============================================================================

/// Covariance estimation.
///
/// Provides the [`CovarianceEstimator`] trait and the
/// [`ShrinkageEstimator`], which blends the sample covariance with a
/// scaled-identity target and applies diagonal loading so the output is
/// strictly positive-definite.
pub mod risk {
    pub use cadiz_risk::*;
}

pub use cadiz_risk::{CovarianceEstimator, ShrinkageConfig, ShrinkageEstimator};

// ============================================================================
// Weight Solving
// ============================================================================

/// Constrained portfolio weight solvers.
///
/// The [`Solver`] contract and its projected-gradient implementation,
/// covering mean-variance, minimum-variance, maximum-Sharpe, risk-parity,
/// and maximum-diversification objectives. Non-convergence is surfaced
/// through diagnostics rather than masked.
pub mod solve {
    pub use cadiz_solve::*;
}

pub use cadiz_solve::{Optimized, Solver, SolverConfig, SolverDiagnostics};

// ============================================================================
// Factor Combination
// ============================================================================

/// Factor weight optimization and portfolio construction.
///
/// The [`FactorWeightOptimizer`] derives factor weights from factor
/// return streams under optional group and turnover constraints;
/// `build_portfolio` turns weighted factor exposures into a long/short
/// composite portfolio with transaction-cost accounting.
pub mod combine {
    pub use cadiz_combine::*;
}

pub use cadiz_combine::{FactorWeightOptimizer, WeightConstraints, WeightingMethod};

// ============================================================================
// Backtesting
// ============================================================================

/// Factor backtesting and IC analysis.
///
/// The [`FactorBacktester`] evaluates a factor panel against historical
/// returns under layered, IC-analysis, long-short, and equal-weight
/// top-N methodologies, producing return series, performance summaries,
/// and tail-risk metrics.
pub mod eval {
    pub use cadiz_eval::*;
}

pub use cadiz_eval::{BacktestConfig, FactorBacktester, IcReport};

// ============================================================================
// Prelude
// ============================================================================

/// Prelude module for convenient imports.
///
/// Import it with:
///
/// ```ignore
/// use cadiz::prelude::*;
/// ```
///
/// This brings into scope:
/// - Core types: [`Panel`], [`ReturnSeries`], [`Weights`], [`Date`]
/// - Error types: [`Result`], [`CadizError`]
/// - The main components: [`ShrinkageEstimator`], [`Solver`],
///   [`FactorWeightOptimizer`], [`FactorBacktester`]
pub mod prelude {
    pub use crate::{AssetId, Date, Panel, ReturnSeries, Weights};
    pub use crate::{CadizError, Result};
    pub use crate::{CovarianceEstimator, ShrinkageEstimator};
    pub use crate::{FactorBacktester, FactorWeightOptimizer, Solver};
    pub use crate::{PerformanceSummary, RiskMetrics};
}

// ============================================================================
// Tests
// ============================================================================
