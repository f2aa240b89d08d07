//! Constrained portfolio weight solvers for Cadiz.
//!
//! This crate provides the [`Solver`] contract and its projected-gradient
//! implementation, covering five objectives: mean-variance,
//! minimum-variance, maximum-Sharpe, risk-parity, and
//! maximum-diversification. All solves share an equality constraint
//! (weights sum to 1) and per-weight bounds.
//!
//! Non-convergence is a recoverable condition: the solver substitutes
//! equal weights, logs a warning, and reports the fallback through
//! [`SolverDiagnostics`] so callers can escalate when best-effort answers
//! are not acceptable.
//!
//! # Example
//!
//! ```rust,ignore
//! use cadiz_solve::{ObjectiveKind, ProjectedGradientSolver, Solver, SolverConfig};
//!
//! let solver = ProjectedGradientSolver::new(SolverConfig::default())?;
//! let result = solver.solve(ObjectiveKind::MinVariance, None, &cov, &names)?;
//! println!("converged: {}", result.converged());
//! ```

pub mod descent;
pub mod objectives;
pub mod solver;

// Re-export main types
pub use solver::{
    ObjectiveKind, Optimized, ProjectedGradientSolver, Solver, SolverConfig, SolverDiagnostics,
};
