//! Factor weight optimization.
//!
//! Turns a panel of per-factor return streams into a factor weight
//! vector. Covariance-driven methods align the panel on the target's
//! dates, z-score each factor stream, estimate a shrunk covariance, and
//! delegate to the projected-gradient solver; IC-driven weighting scores
//! each factor by the strength of its correlation with forward target
//! returns. Group and turnover constraints enter the solve as quadratic
//! penalties and are verified on the final weights.

use crate::constraints::WeightConstraints;
use cadiz_risk::{ShrinkageConfig, ShrinkageEstimator};
use cadiz_solve::{ObjectiveKind, Optimized, ProjectedGradientSolver, SolverConfig, SolverDiagnostics};
use cadiz_traits::{stats, CadizError, Panel, Result, ReturnSeries, Weights};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// IC magnitudes summing below this are treated as no signal.
const MIN_IC_MASS: f64 = 1e-10;

/// How factor weights are derived from factor return streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightingMethod {
    /// Maximize the Sharpe ratio of the combined factor stream.
    SharpeRatio,
    /// Minimize the variance of the combined factor stream.
    MinVariance,
    /// Equalize each factor's fractional risk contribution.
    RiskParity,
    /// Maximize the diversification ratio across factor streams.
    MaxDiversification,
    /// Uniform weights, no optimization.
    EqualWeight,
    /// Weights proportional to each factor's predictive correlation with
    /// forward target returns.
    IcWeighted,
}

impl WeightingMethod {
    const fn objective(self) -> Option<ObjectiveKind> {
        match self {
            Self::SharpeRatio => Some(ObjectiveKind::MaxSharpe),
            Self::MinVariance => Some(ObjectiveKind::MinVariance),
            Self::RiskParity => Some(ObjectiveKind::RiskParity),
            Self::MaxDiversification => Some(ObjectiveKind::MaxDiversification),
            Self::EqualWeight | Self::IcWeighted => None,
        }
    }
}

/// Factor weight optimizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Weight derivation method.
    pub method: WeightingMethod,
    /// Solver settings for covariance-driven methods.
    pub solver: SolverConfig,
    /// Covariance estimation settings.
    pub shrinkage: ShrinkageConfig,
    /// Group and turnover constraints.
    pub constraints: WeightConstraints,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            method: WeightingMethod::SharpeRatio,
            solver: SolverConfig::default(),
            shrinkage: ShrinkageConfig::default(),
            constraints: WeightConstraints::default(),
        }
    }
}

/// Derives factor weights from factor return streams.
#[derive(Debug)]
pub struct FactorWeightOptimizer {
    config: OptimizerConfig,
    estimator: ShrinkageEstimator,
    solver: ProjectedGradientSolver,
}

impl FactorWeightOptimizer {
    /// Create an optimizer from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CadizError::Validation`] for inconsistent solver settings.
    pub fn new(config: OptimizerConfig) -> Result<Self> {
        let estimator = ShrinkageEstimator::new(config.shrinkage.clone());
        let solver = ProjectedGradientSolver::new(config.solver.clone())?;
        Ok(Self {
            config,
            estimator,
            solver,
        })
    }

    /// Returns the optimizer configuration.
    pub const fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Derive factor weights from the given factor return panel.
    ///
    /// Columns of `factor_returns` are factor identifiers; each column is
    /// that factor's per-period return stream. `target` supplies the
    /// forward returns the IC-weighted method correlates against; when
    /// present, covariance-driven methods restrict the panel to the dates
    /// it covers.
    ///
    /// Covariance-driven methods z-score each factor stream before
    /// estimation, so the weights depend on the correlation structure and
    /// risk-scaled means rather than on the scale of any one stream.
    ///
    /// # Errors
    ///
    /// Returns [`CadizError::Validation`] for malformed inputs (including
    /// a missing `target` with [`WeightingMethod::IcWeighted`]),
    /// [`CadizError::InsufficientData`] when too few complete periods
    /// remain for covariance estimation, and
    /// [`CadizError::RiskConstraintViolation`] when the final weights
    /// breach the configured constraints.
    pub fn optimize(
        &self,
        factor_returns: &Panel,
        target: Option<&ReturnSeries>,
    ) -> Result<Optimized> {
        if factor_returns.is_empty() {
            return Err(CadizError::Validation(
                "factor return panel is empty".to_string(),
            ));
        }
        let names = factor_returns.columns().to_vec();
        let resolved = self.config.constraints.resolve(&names)?;

        let result = match self.config.method {
            WeightingMethod::EqualWeight => unoptimized(Weights::equal(names)),
            WeightingMethod::IcWeighted => {
                let target = target.ok_or_else(|| {
                    CadizError::Validation(
                        "ic_weighted requires a target return series".to_string(),
                    )
                })?;
                let values = ic_weights(factor_returns, target)?;
                unoptimized(Weights::new(names, values)?)
            }
            method => {
                let objective = method.objective().expect("covariance-driven method");
                let aligned = match target {
                    Some(series) => align_to_target(factor_returns, series)?,
                    None => factor_returns.clone(),
                };
                let standardized = standardize_columns(&aligned)?;
                let covariance = self.estimator.estimate_panel(&standardized)?;
                let mu = risk_scaled_returns(&aligned);
                let expected = matches!(objective, ObjectiveKind::MaxSharpe).then_some(&mu);
                self.solver.solve_with_penalty(
                    objective,
                    expected,
                    &covariance,
                    &names,
                    |w| resolved.penalty(w),
                )?
            }
        };

        resolved.verify(&result.weights)?;
        Ok(result)
    }
}

fn unoptimized(weights: Weights) -> Optimized {
    Optimized {
        weights,
        diagnostics: SolverDiagnostics {
            converged: true,
            objective: 0.0,
            iterations: 0,
            fell_back: false,
        },
    }
}

/// Restricts the factor panel to the dates the target series covers.
fn align_to_target(factor_returns: &Panel, target: &ReturnSeries) -> Result<Panel> {
    let values = Array2::from_shape_fn((target.len(), 1), |(i, _)| target.values()[i]);
    let target_panel = Panel::new(target.dates().to_vec(), vec!["target".to_string()], values)?;
    let (aligned, _) = factor_returns.align_dates(&target_panel)?;
    Ok(aligned)
}

/// Z-scores each column of the panel independently.
fn standardize_columns(panel: &Panel) -> Result<Panel> {
    let mut values = Array2::zeros((panel.n_periods(), panel.n_columns()));
    for j in 0..panel.n_columns() {
        let column: Vec<f64> = panel.values().column(j).to_vec();
        let (scored, _) = stats::standardize(&column);
        for (t, v) in scored.into_iter().enumerate() {
            values[[t, j]] = v;
        }
    }
    Panel::new(panel.dates().to_vec(), panel.columns().to_vec(), values)
}

/// Annualized mean return of each factor stream per unit of its own
/// volatility, matching the unit-variance scale of the z-scored streams.
fn risk_scaled_returns(factor_returns: &Panel) -> Array1<f64> {
    Array1::from_iter((0..factor_returns.n_columns()).map(|j| {
        let column: Vec<f64> = factor_returns.values().column(j).to_vec();
        let std = stats::std_dev(&column);
        if std < stats::MIN_STD_THRESHOLD {
            0.0
        } else {
            stats::annualized_return(&column) / std
        }
    }))
}

/// Weights proportional to `|IC|`, where IC is the Pearson correlation of
/// each factor's value at `t` with the target return at `t + 1`.
///
/// When no factor carries signal (all ICs vanish or are undefined) the
/// weights fall back to uniform.
fn ic_weights(factor_returns: &Panel, target: &ReturnSeries) -> Result<Vec<f64>> {
    let target_dates = target.dates();
    let n_factors = factor_returns.n_columns();

    // Pair the factor snapshot at t with the first target return after t.
    let mut factor_obs: Vec<Vec<f64>> = vec![Vec::new(); n_factors];
    let mut forward_obs = Vec::new();
    for (t, date) in factor_returns.dates().iter().enumerate() {
        let next = match target_dates.binary_search(date) {
            Ok(j) => j + 1,
            Err(j) => j,
        };
        if next >= target.len() {
            continue;
        }
        forward_obs.push(target.values()[next]);
        for (j, obs) in factor_obs.iter_mut().enumerate() {
            obs.push(factor_returns.values()[[t, j]]);
        }
    }
    if forward_obs.len() < 2 {
        return Err(CadizError::InsufficientData {
            required: 2,
            actual: forward_obs.len(),
        });
    }

    let ics: Vec<f64> = factor_obs
        .iter()
        .map(|obs| {
            let ic = stats::pearson(obs, &forward_obs);
            if ic.is_finite() { ic.abs() } else { 0.0 }
        })
        .collect();

    let mass: f64 = ics.iter().sum();
    if mass < MIN_IC_MASS {
        tracing::warn!("no factor shows predictive correlation, using equal weights");
        return Ok(vec![1.0 / n_factors as f64; n_factors]);
    }
    Ok(ics.iter().map(|ic| ic / mass).collect())
}
