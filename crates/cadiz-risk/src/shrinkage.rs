//! Shrinkage covariance estimation.
//!
//! Shrinks the sample covariance matrix toward a scaled-identity target
//! using the analytic intensity from Ledoit & Wolf (2004), then applies
//! diagonal loading. Shrinkage reduces estimation noise when the number
//! of observations is close to the number of assets; the diagonal loading
//! guarantees strict positive-definiteness even when shrinkage alone does
//! not.
//!
//! The estimator has the form:
//!
//! ```text
//! Σ = δ* F + (1 - δ*) S + λ I
//! ```
//!
//! where `S` is the sample covariance, `F = (trace(S)/n) I` is the
//! scaled-identity target, `δ*` is the optimal shrinkage intensity, and
//! `λ` is the regularization strength.

use crate::CovarianceEstimator;
use cadiz_traits::{CadizError, Panel, Result};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

/// Shrinkage estimator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShrinkageConfig {
    /// Minimum number of complete observation rows required.
    pub min_periods: usize,
    /// Diagonal loading strength added after shrinkage.
    pub regularization: f64,
    /// Whether to center returns (subtract column means) before computing
    /// covariance.
    pub center: bool,
}

impl Default for ShrinkageConfig {
    fn default() -> Self {
        Self {
            min_periods: 20,
            regularization: 0.01,
            center: true,
        }
    }
}

/// Shrinkage covariance estimator with diagonal loading.
#[derive(Debug, Default)]
pub struct ShrinkageEstimator {
    config: ShrinkageConfig,
}

impl ShrinkageEstimator {
    /// Create a new estimator with the given configuration.
    pub const fn new(config: ShrinkageConfig) -> Self {
        Self { config }
    }

    /// Estimate the covariance of a return panel.
    ///
    /// Rows containing any missing value are excluded before estimation;
    /// the remaining complete rows must number at least `min_periods`.
    ///
    /// # Errors
    ///
    /// Returns [`CadizError::Validation`] for panels with fewer than two
    /// columns and [`CadizError::InsufficientData`] when too few complete
    /// rows remain.
    pub fn estimate_panel(&self, panel: &Panel) -> Result<Array2<f64>> {
        let complete: Vec<usize> = (0..panel.n_periods())
            .filter(|&i| panel.row(i).iter().all(|v| v.is_finite()))
            .collect();

        let mut returns = Array2::zeros((complete.len(), panel.n_columns()));
        for (r, &i) in complete.iter().enumerate() {
            returns.row_mut(r).assign(&panel.row(i));
        }
        self.estimate(&returns)
    }

    /// The optimal shrinkage intensity for the given returns.
    ///
    /// Exposed for diagnostics; [`CovarianceEstimator::estimate`] applies
    /// it internally.
    pub fn shrinkage_intensity(&self, returns: &Array2<f64>) -> Result<f64> {
        self.check_shape(returns)?;
        let centered = self.centered(returns);
        let sample = sample_covariance(&centered);
        let target = identity_target(&sample);
        Ok(optimal_intensity(&centered, &sample, &target))
    }

    fn check_shape(&self, returns: &Array2<f64>) -> Result<()> {
        if returns.ncols() < 2 {
            return Err(CadizError::Validation(
                "covariance requires at least 2 columns".to_string(),
            ));
        }
        if returns.nrows() < self.config.min_periods {
            return Err(CadizError::InsufficientData {
                required: self.config.min_periods,
                actual: returns.nrows(),
            });
        }
        Ok(())
    }

    fn centered(&self, returns: &Array2<f64>) -> Array2<f64> {
        if self.config.center {
            let means = returns.mean_axis(Axis(0)).unwrap_or_default();
            returns - &means.insert_axis(Axis(0))
        } else {
            returns.clone()
        }
    }
}

impl CovarianceEstimator for ShrinkageEstimator {
    fn estimate(&self, returns: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_shape(returns)?;

        let centered = self.centered(returns);
        let sample = sample_covariance(&centered);
        let target = identity_target(&sample);
        let delta = optimal_intensity(&centered, &sample, &target);

        let mut cov = &target * delta + &sample * (1.0 - delta);
        for i in 0..cov.nrows() {
            cov[[i, i]] += self.config.regularization;
        }
        Ok(cov)
    }
}

/// Sample covariance `S = (1/n) X^T X` of centered returns.
fn sample_covariance(centered: &Array2<f64>) -> Array2<f64> {
    let n = centered.nrows() as f64;
    centered.t().dot(centered) / n
}

/// Scaled-identity target `F = (trace(S)/n) I`.
fn identity_target(sample: &Array2<f64>) -> Array2<f64> {
    let n = sample.nrows();
    let mu = sample.diag().sum() / n as f64;
    Array2::eye(n) * mu
}

/// Analytic shrinkage intensity `δ* = min(b̄², d²) / d²` (Ledoit & Wolf
/// 2004, identity target).
///
/// `b̄²` estimates the sampling error of the sample covariance, `d²` its
/// squared distance from the target; shrinkage only goes as far as the
/// estimation noise warrants.
fn optimal_intensity(centered: &Array2<f64>, sample: &Array2<f64>, target: &Array2<f64>) -> f64 {
    let (n_periods, n_cols) = centered.dim();
    let n = n_periods as f64;

    // b̄² = (1/n²) Σ_t ||x_t x_t' - S||²_F
    let mut b2 = 0.0;
    for t in 0..n_periods {
        let row = centered.row(t);
        for i in 0..n_cols {
            for j in 0..n_cols {
                let diff = row[i] * row[j] - sample[[i, j]];
                b2 += diff * diff;
            }
        }
    }
    b2 /= n * n;

    // d² = ||S - F||²_F
    let mut d2 = 0.0;
    for i in 0..n_cols {
        for j in 0..n_cols {
            let diff = sample[[i, j]] - target[[i, j]];
            d2 += diff * diff;
        }
    }

    if d2 > 0.0 {
        b2.min(d2) / d2
    } else {
        // Sample covariance equals the target, no shrinkage needed
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::is_positive_definite;
    use approx::assert_relative_eq;
    use cadiz_traits::Date;
    use ndarray::Array2;

    fn varied_returns(rows: usize, cols: usize) -> Array2<f64> {
        Array2::from_shape_fn((rows, cols), |(i, j)| {
            ((i * cols + j) as f64 * 0.7).sin() * 0.02
        })
    }

    #[test]
    fn test_config_defaults() {
        let config = ShrinkageConfig::default();
        assert_eq!(config.min_periods, 20);
        assert_relative_eq!(config.regularization, 0.01);
        assert!(config.center);
    }

    #[test]
    fn test_single_column_is_invalid() {
        let estimator = ShrinkageEstimator::default();
        let returns = varied_returns(30, 1);
        assert!(matches!(
            estimator.estimate(&returns),
            Err(CadizError::Validation(_))
        ));
    }

    #[test]
    fn test_min_periods_boundary() {
        let estimator = ShrinkageEstimator::default();

        let exactly_enough = varied_returns(20, 3);
        assert!(estimator.estimate(&exactly_enough).is_ok());

        let one_short = varied_returns(19, 3);
        assert!(matches!(
            estimator.estimate(&one_short),
            Err(CadizError::InsufficientData {
                required: 20,
                actual: 19
            })
        ));
    }

    #[test]
    fn test_estimate_is_symmetric_positive_definite() {
        let estimator = ShrinkageEstimator::default();
        let returns = varied_returns(60, 4);
        let cov = estimator.estimate(&returns).unwrap();

        assert_eq!(cov.dim(), (4, 4));
        for i in 0..4 {
            for j in 0..4 {
                assert_relative_eq!(cov[[i, j]], cov[[j, i]], epsilon = 1e-12);
            }
        }
        assert!(is_positive_definite(&cov));
    }

    #[test]
    fn test_regularization_rescues_degenerate_sample() {
        // More assets than observations would leave the sample covariance
        // singular; diagonal loading must still give a PD matrix.
        let estimator = ShrinkageEstimator::new(ShrinkageConfig {
            min_periods: 3,
            ..Default::default()
        });
        let returns = varied_returns(3, 6);
        let cov = estimator.estimate(&returns).unwrap();
        assert!(is_positive_definite(&cov));
    }

    #[test]
    fn test_shrinkage_intensity_bounds() {
        let estimator = ShrinkageEstimator::default();
        let returns = varied_returns(40, 3);
        let delta = estimator.shrinkage_intensity(&returns).unwrap();
        assert!((0.0..=1.0).contains(&delta));
    }

    #[test]
    fn test_estimate_preserves_variance_ordering() {
        // One column with far larger variance than the rest: shrinkage
        // must not collapse the estimate onto the scaled identity, and
        // the diagonal must keep the variance ordering of the data.
        let estimator = ShrinkageEstimator::default();
        let mut returns = varied_returns(60, 3);
        for i in 0..60 {
            returns[[i, 0]] *= 100.0;
        }

        let delta = estimator.shrinkage_intensity(&returns).unwrap();
        assert!(delta < 0.5, "delta = {delta}");

        let cov = estimator.estimate(&returns).unwrap();
        assert!(cov[[0, 0]] > 10.0 * cov[[1, 1]]);
        assert!(cov[[0, 0]] > 10.0 * cov[[2, 2]]);
    }

    #[test]
    fn test_estimate_panel_drops_incomplete_rows() {
        let estimator = ShrinkageEstimator::new(ShrinkageConfig {
            min_periods: 2,
            ..Default::default()
        });
        let dates: Vec<Date> = (1..=4)
            .map(|d| Date::from_ymd_opt(2024, 1, d).unwrap())
            .collect();
        let mut values = varied_returns(4, 2);
        values[[1, 0]] = f64::NAN;
        let panel = Panel::new(dates, vec!["A".to_string(), "B".to_string()], values).unwrap();

        let cov = estimator.estimate_panel(&panel).unwrap();
        assert_eq!(cov.dim(), (2, 2));
    }

    #[test]
    fn test_estimate_panel_insufficient_complete_rows() {
        let estimator = ShrinkageEstimator::default();
        let dates: Vec<Date> = (1..=10)
            .map(|d| Date::from_ymd_opt(2024, 1, d).unwrap())
            .collect();
        let panel = Panel::new(
            dates,
            vec!["A".to_string(), "B".to_string()],
            varied_returns(10, 2),
        )
        .unwrap();
        assert!(matches!(
            estimator.estimate_panel(&panel),
            Err(CadizError::InsufficientData { .. })
        ));
    }
}
