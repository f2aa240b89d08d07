//! Portfolio objective functions.
//!
//! Pure functions of a weight vector, expected returns, and a covariance
//! matrix. Each returns the value a minimizer should drive down; maximized
//! quantities (Sharpe, diversification ratio) are negated.

use ndarray::{Array1, Array2};

/// Penalty value returned when a ratio objective would divide by zero
/// volatility. Large enough that zero-volatility candidates are never
/// optimal for a maximization objective.
pub const ZERO_VOL_PENALTY: f64 = 1e6;

const MIN_VOL: f64 = 1e-12;

/// Portfolio variance `w' Σ w`.
pub fn portfolio_variance(weights: &Array1<f64>, cov: &Array2<f64>) -> f64 {
    weights.dot(&cov.dot(weights))
}

/// Portfolio expected return `w · μ`.
pub fn portfolio_return(weights: &Array1<f64>, expected_returns: &Array1<f64>) -> f64 {
    weights.dot(expected_returns)
}

/// Mean-variance utility to minimize: `-w·μ + λ w'Σw`.
pub fn mean_variance(
    weights: &Array1<f64>,
    expected_returns: &Array1<f64>,
    cov: &Array2<f64>,
    risk_aversion: f64,
) -> f64 {
    -portfolio_return(weights, expected_returns) + risk_aversion * portfolio_variance(weights, cov)
}

/// Minimum-variance objective: the portfolio variance itself.
pub fn min_variance(weights: &Array1<f64>, cov: &Array2<f64>) -> f64 {
    portfolio_variance(weights, cov)
}

/// Negative Sharpe ratio `-(w·μ - rf) / sqrt(w'Σw)`.
///
/// Zero-volatility candidates receive [`ZERO_VOL_PENALTY`] so they are
/// treated as non-optimal rather than dividing by zero.
pub fn negative_sharpe(
    weights: &Array1<f64>,
    expected_returns: &Array1<f64>,
    cov: &Array2<f64>,
    risk_free_rate: f64,
) -> f64 {
    let vol = portfolio_variance(weights, cov).max(0.0).sqrt();
    if vol < MIN_VOL {
        return ZERO_VOL_PENALTY;
    }
    -(portfolio_return(weights, expected_returns) - risk_free_rate) / vol
}

/// Risk-parity objective: sum of squared deviations of each asset's
/// fractional risk contribution from the equal-contribution target `1/n`.
pub fn risk_parity(weights: &Array1<f64>, cov: &Array2<f64>) -> f64 {
    let n = weights.len();
    let variance = portfolio_variance(weights, cov);
    if variance < MIN_VOL {
        return 0.0;
    }
    let marginal = cov.dot(weights);
    let target = 1.0 / n as f64;
    (0..n)
        .map(|i| {
            let contribution = weights[i] * marginal[i] / variance;
            (contribution - target).powi(2)
        })
        .sum()
}

/// Negative diversification ratio `-(Σ w_i σ_i) / sqrt(w'Σw)`.
pub fn negative_diversification(weights: &Array1<f64>, cov: &Array2<f64>) -> f64 {
    let vol = portfolio_variance(weights, cov).max(0.0).sqrt();
    if vol < MIN_VOL {
        return ZERO_VOL_PENALTY;
    }
    let weighted_avg_vol: f64 = weights
        .iter()
        .enumerate()
        .map(|(i, w)| w * cov[[i, i]].max(0.0).sqrt())
        .sum();
    -weighted_avg_vol / vol
}

/// Inverse-variance weights, used to seed the risk-parity solve.
///
/// Near-zero variances are floored so a riskless asset does not swamp the
/// initial guess.
pub fn inverse_variance_weights(cov: &Array2<f64>) -> Array1<f64> {
    let n = cov.nrows();
    let mut inv: Array1<f64> = (0..n).map(|i| 1.0 / cov[[i, i]].max(1e-8)).collect();
    let total = inv.sum();
    if total > 0.0 && total.is_finite() {
        inv.mapv_inplace(|v| v / total);
    } else {
        inv.fill(1.0 / n as f64);
    }
    inv
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_portfolio_variance() {
        let cov = array![[0.04, 0.0], [0.0, 0.01]];
        let w = array![0.5, 0.5];
        assert_relative_eq!(portfolio_variance(&w, &cov), 0.0125, epsilon = 1e-12);
    }

    #[test]
    fn test_negative_sharpe_zero_vol_penalty() {
        let cov = array![[0.0, 0.0], [0.0, 0.0]];
        let mu = array![0.1, 0.05];
        let w = array![0.5, 0.5];
        assert_relative_eq!(negative_sharpe(&w, &mu, &cov, 0.03), ZERO_VOL_PENALTY);
    }

    #[test]
    fn test_risk_parity_equal_at_balanced_contributions() {
        // Diagonal covariance with equal variances: equal weights give
        // exactly equal risk contributions.
        let cov = array![[0.04, 0.0], [0.0, 0.04]];
        let w = array![0.5, 0.5];
        assert_relative_eq!(risk_parity(&w, &cov), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_risk_parity_penalizes_imbalance() {
        let cov = array![[0.04, 0.0], [0.0, 0.01]];
        let balanced = array![1.0 / 3.0, 2.0 / 3.0]; // w ∝ 1/σ
        let skewed = array![0.9, 0.1];
        assert!(risk_parity(&balanced, &cov) < risk_parity(&skewed, &cov));
    }

    #[test]
    fn test_inverse_variance_weights() {
        let cov = array![[0.04, 0.0], [0.0, 0.01]];
        let w = inverse_variance_weights(&cov);
        assert_relative_eq!(w[0], 0.2, epsilon = 1e-12);
        assert_relative_eq!(w[1], 0.8, epsilon = 1e-12);
    }

    #[test]
    fn test_diversification_prefers_spreading() {
        let cov = array![[0.04, 0.0], [0.0, 0.04]];
        let spread = array![0.5, 0.5];
        let concentrated = array![1.0, 0.0];
        assert!(
            negative_diversification(&spread, &cov)
                < negative_diversification(&concentrated, &cov)
        );
    }
}
