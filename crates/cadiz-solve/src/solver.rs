//! The solver contract and its projected-gradient implementation.
//!
//! A [`Solver`] consumes expected returns (where the objective needs
//! them) and a covariance matrix, and produces a constrained weight
//! vector with diagnostics. Non-convergence is recovered locally: the
//! solver logs a warning and substitutes equal weights so that one bad
//! optimization does not abort a larger batch, while the diagnostics let
//! an exhaustive caller escalate instead.

use crate::descent::{self, DescentConfig};
use crate::objectives;
use cadiz_traits::{AssetId, CadizError, Result, Weights};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Objective selection for a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveKind {
    /// Minimize `-w·μ + λ w'Σw`.
    MeanVariance,
    /// Minimize portfolio variance only.
    MinVariance,
    /// Maximize `(w·μ - rf) / vol`.
    MaxSharpe,
    /// Equalize fractional risk contributions.
    RiskParity,
    /// Maximize the diversification ratio.
    MaxDiversification,
}

/// Solver configuration, validated at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Iteration cap for the minimizer.
    pub max_iterations: usize,
    /// Stopping tolerance.
    pub tolerance: f64,
    /// Lower bound per weight.
    pub min_weight: f64,
    /// Upper bound per weight.
    pub max_weight: f64,
    /// Annual risk-free rate used by the Sharpe objective.
    pub risk_free_rate: f64,
    /// Risk-aversion coefficient for the mean-variance objective.
    pub risk_aversion: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-6,
            min_weight: 0.0,
            max_weight: 1.0,
            risk_free_rate: 0.03,
            risk_aversion: 1.0,
        }
    }
}

impl SolverConfig {
    fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(CadizError::Validation(
                "max_iterations must be positive".to_string(),
            ));
        }
        if !(self.tolerance > 0.0) {
            return Err(CadizError::Validation(
                "tolerance must be positive".to_string(),
            ));
        }
        if self.min_weight >= self.max_weight {
            return Err(CadizError::Validation(format!(
                "min_weight {} must be below max_weight {}",
                self.min_weight, self.max_weight
            )));
        }
        Ok(())
    }
}

/// Diagnostics from a single solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverDiagnostics {
    /// Whether the minimizer met a stopping criterion.
    pub converged: bool,
    /// Final objective value.
    pub objective: f64,
    /// Iterations performed.
    pub iterations: usize,
    /// Whether the equal-weight fallback replaced the solver output.
    pub fell_back: bool,
}

/// A weight vector together with solver diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Optimized {
    /// The resulting weights.
    pub weights: Weights,
    /// Solver diagnostics.
    pub diagnostics: SolverDiagnostics,
}

impl Optimized {
    /// Whether the underlying minimizer converged.
    pub const fn converged(&self) -> bool {
        self.diagnostics.converged
    }

    /// Extracts the weights, failing if the equal-weight fallback was
    /// applied.
    ///
    /// Callers that prefer a hard stop over a best-effort answer use this
    /// instead of reading `weights` directly.
    ///
    /// # Errors
    ///
    /// Returns [`CadizError::NonConvergence`] when the solve fell back.
    pub fn into_strict(self) -> Result<Weights> {
        if self.diagnostics.fell_back {
            return Err(CadizError::NonConvergence(format!(
                "solver fell back to equal weights after {} iterations",
                self.diagnostics.iterations
            )));
        }
        Ok(self.weights)
    }
}

/// Common contract for constrained weight solvers.
///
/// Backends are selected at configuration time by choosing an
/// implementation; there are no runtime availability flags.
pub trait Solver: Send + Sync {
    /// Solve for constrained weights under the given objective.
    ///
    /// `expected_returns` is required by return-aware objectives
    /// (mean-variance, max-Sharpe) and ignored by variance-only ones.
    ///
    /// # Errors
    ///
    /// Returns [`CadizError::Validation`] for malformed inputs (missing
    /// expected returns, non-square covariance, mismatched lengths).
    fn solve(
        &self,
        objective: ObjectiveKind,
        expected_returns: Option<&Array1<f64>>,
        covariance: &Array2<f64>,
        names: &[AssetId],
    ) -> Result<Optimized>;
}

/// Projected-gradient solver over the bounded simplex.
#[derive(Debug, Clone)]
pub struct ProjectedGradientSolver {
    config: SolverConfig,
}

impl Default for ProjectedGradientSolver {
    fn default() -> Self {
        Self {
            config: SolverConfig::default(),
        }
    }
}

impl ProjectedGradientSolver {
    /// Create a solver from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CadizError::Validation`] for inconsistent bounds or
    /// non-positive tolerances.
    pub fn new(config: SolverConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the solver configuration.
    pub const fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solve with an additional penalty term added to the objective.
    ///
    /// Used by the factor weight optimizer to inject group and turnover
    /// constraints without changing the solver contract.
    pub fn solve_with_penalty<P>(
        &self,
        objective: ObjectiveKind,
        expected_returns: Option<&Array1<f64>>,
        covariance: &Array2<f64>,
        names: &[AssetId],
        penalty: P,
    ) -> Result<Optimized>
    where
        P: Fn(&Array1<f64>) -> f64,
    {
        let n = names.len();
        validate_inputs(objective, expected_returns, covariance, n)?;

        let base = build_objective(objective, expected_returns, covariance, &self.config);
        let f = |w: &Array1<f64>| base(w) + penalty(w);

        let x0 = match objective {
            ObjectiveKind::RiskParity => objectives::inverse_variance_weights(covariance),
            _ => Array1::from_elem(n, 1.0 / n as f64),
        };

        let outcome = descent::minimize(
            &f,
            &x0,
            self.config.min_weight,
            self.config.max_weight,
            &DescentConfig {
                max_iterations: self.config.max_iterations,
                tolerance: self.config.tolerance,
            },
        );

        if outcome.converged {
            let weights = Weights::new(names.to_vec(), outcome.x.to_vec())?;
            Ok(Optimized {
                weights,
                diagnostics: SolverDiagnostics {
                    converged: true,
                    objective: outcome.objective,
                    iterations: outcome.iterations,
                    fell_back: false,
                },
            })
        } else {
            tracing::warn!(
                objective = ?objective,
                iterations = outcome.iterations,
                "solver did not converge, falling back to equal weights"
            );
            let weights = Weights::equal(names.to_vec());
            Ok(Optimized {
                weights,
                diagnostics: SolverDiagnostics {
                    converged: false,
                    objective: outcome.objective,
                    iterations: outcome.iterations,
                    fell_back: true,
                },
            })
        }
    }
}

impl Solver for ProjectedGradientSolver {
    fn solve(
        &self,
        objective: ObjectiveKind,
        expected_returns: Option<&Array1<f64>>,
        covariance: &Array2<f64>,
        names: &[AssetId],
    ) -> Result<Optimized> {
        self.solve_with_penalty(objective, expected_returns, covariance, names, |_| 0.0)
    }
}

fn validate_inputs(
    objective: ObjectiveKind,
    expected_returns: Option<&Array1<f64>>,
    covariance: &Array2<f64>,
    n: usize,
) -> Result<()> {
    if n == 0 {
        return Err(CadizError::Validation(
            "cannot optimize over zero assets".to_string(),
        ));
    }
    if covariance.nrows() != covariance.ncols() {
        return Err(CadizError::Validation(format!(
            "covariance matrix must be square, got {}x{}",
            covariance.nrows(),
            covariance.ncols()
        )));
    }
    if covariance.nrows() != n {
        return Err(CadizError::DimensionMismatch {
            expected: n,
            actual: covariance.nrows(),
        });
    }
    let needs_returns = matches!(
        objective,
        ObjectiveKind::MeanVariance | ObjectiveKind::MaxSharpe
    );
    match expected_returns {
        Some(mu) if mu.len() != n => Err(CadizError::DimensionMismatch {
            expected: n,
            actual: mu.len(),
        }),
        None if needs_returns => Err(CadizError::Validation(format!(
            "{objective:?} requires expected returns"
        ))),
        _ => Ok(()),
    }
}

fn build_objective<'a>(
    objective: ObjectiveKind,
    expected_returns: Option<&'a Array1<f64>>,
    covariance: &'a Array2<f64>,
    config: &SolverConfig,
) -> Box<dyn Fn(&Array1<f64>) -> f64 + 'a> {
    let risk_aversion = config.risk_aversion;
    let risk_free_rate = config.risk_free_rate;
    match objective {
        ObjectiveKind::MeanVariance => {
            let mu = expected_returns.expect("validated");
            Box::new(move |w| objectives::mean_variance(w, mu, covariance, risk_aversion))
        }
        ObjectiveKind::MinVariance => {
            Box::new(move |w| objectives::min_variance(w, covariance))
        }
        ObjectiveKind::MaxSharpe => {
            let mu = expected_returns.expect("validated");
            Box::new(move |w| objectives::negative_sharpe(w, mu, covariance, risk_free_rate))
        }
        ObjectiveKind::RiskParity => Box::new(move |w| objectives::risk_parity(w, covariance)),
        ObjectiveKind::MaxDiversification => {
            Box::new(move |w| objectives::negative_diversification(w, covariance))
        }
    }
}
