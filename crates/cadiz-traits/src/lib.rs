#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/cadiz/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core type definitions for the Cadiz portfolio optimization framework.
//!
//! This crate provides the foundational data model for covariance
//! estimation, weight optimization, and factor backtesting: validated
//! panels, return series, weight vectors, the shared error taxonomy, and
//! the NaN-safe statistics layer.

/// The version of the cadiz-traits crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Module declarations
pub mod error;
pub mod stats;
pub mod types;

// Re-exports
pub use error::{CadizError, Result};
pub use stats::{PerformanceSummary, RiskMetrics};
pub use types::{AssetId, Date, Panel, ReturnSeries, Weights};
