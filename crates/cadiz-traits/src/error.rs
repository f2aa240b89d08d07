//! Error types for the Cadiz framework.
//!
//! This module defines the error taxonomy used throughout the Cadiz
//! ecosystem: input validation, insufficient history, solver
//! non-convergence, and post-optimization constraint violations.

use thiserror::Error;

/// The main error type for Cadiz operations.
///
/// This enum encompasses all error cases that can occur when estimating
/// covariance, optimizing weights, and backtesting factors.
#[derive(Debug, Error)]
pub enum CadizError {
    /// Malformed or empty input panels, or mismatched indices.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Too few observations for the requested estimation.
    #[error("Insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData {
        /// Required number of observations.
        required: usize,
        /// Actual number of observations.
        actual: usize,
    },

    /// Dimension mismatch between paired inputs.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension.
        actual: usize,
    },

    /// A solver failed to converge and the caller asked for a strict result.
    #[error("Optimization did not converge: {0}")]
    NonConvergence(String),

    /// A configured weight bound was violated after optimization.
    #[error("Risk constraint violated: {0}")]
    RiskConstraintViolation(String),

    /// Generic error for other cases.
    #[error("Error: {0}")]
    Other(String),
}

impl From<String> for CadizError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl From<&str> for CadizError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

/// A specialized Result type for Cadiz operations.
///
/// This is a convenience type that uses [`CadizError`] as the error type.
pub type Result<T> = std::result::Result<T, CadizError>;
