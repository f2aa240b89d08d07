//! Regularized covariance estimation for Cadiz.
//!
//! Provides the [`CovarianceEstimator`] trait and a shrinkage estimator
//! that blends the sample covariance with a scaled-identity target and
//! applies diagonal loading, guaranteeing a strictly positive-definite
//! matrix suitable for quadratic optimization objectives.
//!
//! # Example
//!
//! ```rust,ignore
//! use cadiz_risk::{CovarianceEstimator, ShrinkageConfig, ShrinkageEstimator};
//!
//! let estimator = ShrinkageEstimator::default();
//! let cov = estimator.estimate_panel(&returns_panel)?;
//! ```

pub mod linalg;
pub mod shrinkage;

use cadiz_traits::Result;
use ndarray::Array2;

pub use linalg::{cholesky, is_positive_definite};
pub use shrinkage::{ShrinkageConfig, ShrinkageEstimator};

/// Trait for covariance matrix estimators.
///
/// Implementations consume a matrix of historical returns (rows are time
/// periods, columns are assets or factors) and produce a square,
/// symmetric covariance matrix over the same column set.
pub trait CovarianceEstimator {
    /// Estimate the covariance matrix from a returns matrix.
    ///
    /// # Errors
    ///
    /// Returns [`cadiz_traits::CadizError::InsufficientData`] when too few
    /// observations are available, or
    /// [`cadiz_traits::CadizError::Validation`] when fewer than two
    /// columns are present (no covariance is defined for a single
    /// series).
    fn estimate(&self, returns: &Array2<f64>) -> Result<Array2<f64>>;
}
