//! Factor backtesting and IC analysis for Cadiz.
//!
//! This crate evaluates factor predictive power and realized performance:
//! - Information Coefficient calculations (Pearson IC and rank IC)
//! - The [`FactorBacktester`] with layered, IC-analysis, long-short, and
//!   equal-weight top-N methodologies
//! - IC decay across horizons and signal rank autocorrelation
//!
//! # Example
//!
//! ```rust,ignore
//! use cadiz_eval::{BacktestConfig, FactorBacktester};
//!
//! let backtester = FactorBacktester::new(BacktestConfig::default())?;
//! let report = backtester.ic_analysis(&factor_panel, &returns_panel)?;
//! println!("IC mean: {:.3}, IR: {:.2}", report.ic_mean, report.information_ratio);
//! ```

pub mod backtester;
pub mod ic;

// Re-export main types
pub use backtester::{
    BacktestConfig, FactorBacktester, HorizonIc, IcReport, LayeredResult, LongShortResult,
    TopNResult,
};
pub use ic::{compute_ranks, pearson_ic, rank_ic};
