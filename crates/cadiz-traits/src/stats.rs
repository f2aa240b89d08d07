//! Shared performance and risk statistics.
//!
//! Pure functions computing named scalar statistics from a single return
//! series, used identically by solver diagnostics and backtest summaries.
//! All functions are NaN-safe: non-finite observations are excluded, and
//! ratios guard division by zero volatility by returning 0 rather than
//! raising.

use serde::{Deserialize, Serialize};

/// Trading days per year used for annualization.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Minimum threshold for standard deviation to avoid division by zero.
/// Values below this threshold are treated as zero variance.
pub const MIN_STD_THRESHOLD: f64 = 1e-10;

fn finite(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| v.is_finite()).collect()
}

fn mean_of(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (N-1 denominator) of the finite observations.
pub fn std_dev(values: &[f64]) -> f64 {
    let v = finite(values);
    if v.len() < 2 {
        return 0.0;
    }
    let mean = mean_of(&v);
    let variance = v.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (v.len() - 1) as f64;
    variance.sqrt()
}

/// Compounded total return of the series.
pub fn total_return(returns: &[f64]) -> f64 {
    finite(returns).iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0
}

/// Annualized return using the arithmetic convention `mean * 252`.
pub fn annualized_return(returns: &[f64]) -> f64 {
    let v = finite(returns);
    if v.is_empty() {
        return 0.0;
    }
    mean_of(&v) * TRADING_DAYS_PER_YEAR
}

/// Annualized volatility `std * sqrt(252)`.
pub fn annualized_volatility(returns: &[f64]) -> f64 {
    std_dev(returns) * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Annualized Sharpe ratio against an annual risk-free rate.
///
/// Returns 0 when volatility is effectively zero.
pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64) -> f64 {
    let vol = annualized_volatility(returns);
    if vol < MIN_STD_THRESHOLD {
        return 0.0;
    }
    (annualized_return(returns) - risk_free_rate) / vol
}

/// Annualized Sortino ratio: excess return over downside deviation only.
///
/// Returns 0 when there is no downside deviation.
pub fn sortino_ratio(returns: &[f64], risk_free_rate: f64) -> f64 {
    let v = finite(returns);
    if v.is_empty() {
        return 0.0;
    }
    let per_period_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;
    let downside: f64 = v
        .iter()
        .map(|r| (r - per_period_rf).min(0.0).powi(2))
        .sum::<f64>()
        / v.len() as f64;
    let downside_dev = downside.sqrt() * TRADING_DAYS_PER_YEAR.sqrt();
    if downside_dev < MIN_STD_THRESHOLD {
        return 0.0;
    }
    (annualized_return(returns) - risk_free_rate) / downside_dev
}

/// Maximum peak-to-trough drawdown of a cumulative return series.
pub fn max_drawdown(cumulative_returns: &[f64]) -> f64 {
    let mut max_dd = 0.0;
    let mut peak = 0.0;
    for &cum_ret in cumulative_returns {
        if !cum_ret.is_finite() {
            continue;
        }
        if cum_ret > peak {
            peak = cum_ret;
        }
        let dd = (peak - cum_ret) / (1.0 + peak);
        if dd > max_dd {
            max_dd = dd;
        }
    }
    max_dd
}

/// Longest run, in periods, between a peak and its recovery.
///
/// An unrecovered drawdown at the end of the series counts toward the
/// maximum.
pub fn max_drawdown_duration(cumulative_returns: &[f64]) -> usize {
    let mut peak = f64::NEG_INFINITY;
    let mut peak_idx = 0usize;
    let mut max_duration = 0usize;
    for (i, &cum_ret) in cumulative_returns.iter().enumerate() {
        if !cum_ret.is_finite() {
            continue;
        }
        if cum_ret >= peak {
            peak = cum_ret;
            peak_idx = i;
        } else {
            max_duration = max_duration.max(i - peak_idx);
        }
    }
    max_duration
}

/// Calmar ratio: annualized return over maximum drawdown.
///
/// Returns 0 when the drawdown is zero.
pub fn calmar_ratio(returns: &[f64]) -> f64 {
    let mut cum = Vec::with_capacity(returns.len());
    let mut acc = 0.0;
    for &r in returns {
        let r = if r.is_finite() { r } else { 0.0 };
        acc = (1.0 + acc) * (1.0 + r) - 1.0;
        cum.push(acc);
    }
    let dd = max_drawdown(&cum);
    if dd < MIN_STD_THRESHOLD {
        return 0.0;
    }
    annualized_return(returns) / dd
}

/// Empirical value-at-risk at the given confidence level.
///
/// Returns the `1 - confidence` quantile of the return distribution (for
/// a 95% confidence level, the 5th percentile). A losing tail yields a
/// negative value. Returns 0 for an empty series.
pub fn value_at_risk(returns: &[f64], confidence: f64) -> f64 {
    let mut v = finite(returns);
    if v.is_empty() {
        return 0.0;
    }
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    quantile_sorted(&v, 1.0 - confidence)
}

/// Empirical conditional value-at-risk: mean return in the tail at or
/// below the VaR threshold.
pub fn conditional_value_at_risk(returns: &[f64], confidence: f64) -> f64 {
    let var = value_at_risk(returns, confidence);
    let tail: Vec<f64> = finite(returns).into_iter().filter(|&r| r <= var).collect();
    if tail.is_empty() {
        return var;
    }
    mean_of(&tail)
}

fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}

/// Fraction of periods with strictly positive return.
pub fn win_rate(returns: &[f64]) -> f64 {
    let v = finite(returns);
    if v.is_empty() {
        return 0.0;
    }
    v.iter().filter(|&&r| r > 0.0).count() as f64 / v.len() as f64
}

/// Sample skewness of the return distribution.
///
/// Returns 0 when variance is effectively zero.
pub fn skewness(returns: &[f64]) -> f64 {
    let v = finite(returns);
    if v.len() < 3 {
        return 0.0;
    }
    let mean = mean_of(&v);
    let n = v.len() as f64;
    let m2 = v.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    let m3 = v.iter().map(|x| (x - mean).powi(3)).sum::<f64>() / n;
    let std = m2.sqrt();
    if std < MIN_STD_THRESHOLD {
        return 0.0;
    }
    m3 / std.powi(3)
}

/// Excess kurtosis of the return distribution.
///
/// Returns 0 when variance is effectively zero.
pub fn kurtosis(returns: &[f64]) -> f64 {
    let v = finite(returns);
    if v.len() < 4 {
        return 0.0;
    }
    let mean = mean_of(&v);
    let n = v.len() as f64;
    let m2 = v.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    let m4 = v.iter().map(|x| (x - mean).powi(4)).sum::<f64>() / n;
    if m2 < MIN_STD_THRESHOLD {
        return 0.0;
    }
    m4 / m2.powi(2) - 3.0
}

/// Pearson correlation between two series, excluding non-finite pairs.
///
/// Returns `NaN` when fewer than two valid pairs remain or either series
/// has zero variance.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() {
        return f64::NAN;
    }
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y.iter())
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(&a, &b)| (a, b))
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(a, _)| a).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, b)| b).sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in &pairs {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x < MIN_STD_THRESHOLD || var_y < MIN_STD_THRESHOLD {
        return f64::NAN;
    }
    cov / (var_x.sqrt() * var_y.sqrt())
}

/// Z-score standardization result containing computed statistics.
#[derive(Debug, Clone, Copy)]
pub struct StandardizeResult {
    /// The computed mean of the input values.
    pub mean: f64,
    /// The computed sample standard deviation (N-1 denominator).
    pub std: f64,
    /// Whether the standardization was applied (false if variance was too low).
    pub applied: bool,
}

/// Standardize a slice of f64 values to z-scores (mean=0, std=1).
///
/// Uses sample standard deviation (N-1 denominator). Non-finite values
/// are excluded from the mean/std calculation and produce `NaN` in the
/// output. If the standard deviation is below [`MIN_STD_THRESHOLD`],
/// returns zeros to avoid division by near-zero values.
pub fn standardize(values: &[f64]) -> (Vec<f64>, StandardizeResult) {
    let finite_values = finite(values);
    if finite_values.is_empty() {
        return (
            vec![f64::NAN; values.len()],
            StandardizeResult {
                mean: f64::NAN,
                std: f64::NAN,
                applied: false,
            },
        );
    }

    let n = finite_values.len();
    let mean = mean_of(&finite_values);
    let variance = if n > 1 {
        finite_values
            .iter()
            .map(|x| (x - mean).powi(2))
            .sum::<f64>()
            / (n - 1) as f64
    } else {
        0.0
    };
    let std = variance.sqrt();
    let applied = std > MIN_STD_THRESHOLD;

    let standardized = if applied {
        values.iter().map(|x| (x - mean) / std).collect()
    } else {
        values
            .iter()
            .map(|x| if x.is_finite() { 0.0 } else { f64::NAN })
            .collect()
    };

    (standardized, StandardizeResult { mean, std, applied })
}

/// Named performance statistics of a single return series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// Compounded total return.
    pub total_return: f64,
    /// Annualized return (`mean * 252`).
    pub annualized_return: f64,
    /// Annualized volatility (`std * sqrt(252)`).
    pub annualized_volatility: f64,
    /// Annualized Sharpe ratio.
    pub sharpe_ratio: f64,
    /// Maximum peak-to-trough drawdown.
    pub max_drawdown: f64,
    /// Calmar ratio (annualized return over max drawdown).
    pub calmar_ratio: f64,
    /// Sortino ratio (downside deviation only).
    pub sortino_ratio: f64,
    /// Fraction of winning periods.
    pub win_rate: f64,
    /// Sample skewness.
    pub skewness: f64,
    /// Excess kurtosis.
    pub kurtosis: f64,
}

impl PerformanceSummary {
    /// Computes the full summary from a return series.
    pub fn from_returns(returns: &[f64], risk_free_rate: f64) -> Self {
        let mut cum = Vec::with_capacity(returns.len());
        let mut acc = 0.0;
        for &r in returns {
            let r = if r.is_finite() { r } else { 0.0 };
            acc = (1.0 + acc) * (1.0 + r) - 1.0;
            cum.push(acc);
        }
        Self {
            total_return: total_return(returns),
            annualized_return: annualized_return(returns),
            annualized_volatility: annualized_volatility(returns),
            sharpe_ratio: sharpe_ratio(returns, risk_free_rate),
            max_drawdown: max_drawdown(&cum),
            calmar_ratio: calmar_ratio(returns),
            sortino_ratio: sortino_ratio(returns, risk_free_rate),
            win_rate: win_rate(returns),
            skewness: skewness(returns),
            kurtosis: kurtosis(returns),
        }
    }
}

/// Tail-risk statistics of a single return series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// Value-at-risk at 95% confidence.
    pub var_95: f64,
    /// Value-at-risk at 99% confidence.
    pub var_99: f64,
    /// Conditional value-at-risk at 95% confidence.
    pub cvar_95: f64,
    /// Conditional value-at-risk at 99% confidence.
    pub cvar_99: f64,
    /// Longest drawdown, in periods, between a peak and its recovery.
    pub max_drawdown_duration: usize,
}

impl RiskMetrics {
    /// Computes tail-risk statistics from a return series.
    pub fn from_returns(returns: &[f64]) -> Self {
        let mut cum = Vec::with_capacity(returns.len());
        let mut acc = 0.0;
        for &r in returns {
            let r = if r.is_finite() { r } else { 0.0 };
            acc = (1.0 + acc) * (1.0 + r) - 1.0;
            cum.push(acc);
        }
        Self {
            var_95: value_at_risk(returns, 0.95),
            var_99: value_at_risk(returns, 0.99),
            cvar_95: conditional_value_at_risk(returns, 0.95),
            cvar_99: conditional_value_at_risk(returns, 0.99),
            max_drawdown_duration: max_drawdown_duration(&cum),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sharpe_zero_volatility_returns_zero() {
        let returns = vec![0.01; 30];
        assert_eq!(sharpe_ratio(&returns, 0.03), 0.0);
    }

    #[test]
    fn test_sharpe_finite_for_varying_returns() {
        let returns = vec![0.01, -0.005, 0.015, 0.002, -0.003, 0.007];
        let sharpe = sharpe_ratio(&returns, 0.03);
        assert!(sharpe.is_finite());
        assert!(sharpe > 0.0);
    }

    #[test]
    fn test_max_drawdown_known_path() {
        let cumulative = vec![0.0, 0.1, 0.15, 0.05, 0.08, 0.12];
        let dd = max_drawdown(&cumulative);
        assert_relative_eq!(dd, (0.15 - 0.05) / 1.15, epsilon = 1e-12);
    }

    #[test]
    fn test_max_drawdown_duration_counts_unrecovered_tail() {
        // Peak at index 1, never recovered
        let cumulative = vec![0.0, 0.2, 0.1, 0.15, 0.05];
        assert_eq!(max_drawdown_duration(&cumulative), 3);
    }

    #[test]
    fn test_max_drawdown_duration_recovery() {
        let cumulative = vec![0.0, 0.1, 0.05, 0.02, 0.12, 0.15];
        // Drawdown from index 1, last below-peak index is 3
        assert_eq!(max_drawdown_duration(&cumulative), 2);
    }

    #[test]
    fn test_value_at_risk_quantile() {
        let returns: Vec<f64> = (0..100).map(|i| -0.05 + i as f64 * 0.001).collect();
        let var = value_at_risk(&returns, 0.95);
        // 5th percentile of a uniform grid from -0.05 to 0.049
        assert_relative_eq!(var, -0.05 + 0.001 * 4.95, epsilon = 1e-9);
        let cvar = conditional_value_at_risk(&returns, 0.95);
        assert!(cvar <= var);
    }

    #[test]
    fn test_win_rate() {
        let returns = vec![0.01, -0.01, 0.02, 0.0, f64::NAN];
        assert_relative_eq!(win_rate(&returns), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_skewness_symmetric_is_zero() {
        let returns = vec![-0.02, -0.01, 0.0, 0.01, 0.02];
        assert_relative_eq!(skewness(&returns), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_pearson_perfect_correlation() {
        let x = vec![1.0, 2.0, 3.0, 4.0];
        let y = vec![0.01, 0.02, 0.03, 0.04];
        assert_relative_eq!(pearson(&x, &y), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_pearson_zero_variance_is_nan() {
        let x = vec![1.0, 1.0, 1.0];
        let y = vec![0.01, 0.02, 0.03];
        assert!(pearson(&x, &y).is_nan());
    }

    #[test]
    fn test_standardize_basic() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let (z, result) = standardize(&values);
        assert!(result.applied);
        assert_relative_eq!(result.mean, 3.0, epsilon = 1e-12);
        let z_mean = z.iter().sum::<f64>() / z.len() as f64;
        assert_relative_eq!(z_mean, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_standardize_constant_yields_zeros() {
        let values = vec![2.0, 2.0, 2.0];
        let (z, result) = standardize(&values);
        assert!(!result.applied);
        assert!(z.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_standardize_preserves_nan_positions() {
        let values = vec![1.0, f64::NAN, 3.0];
        let (z, _) = standardize(&values);
        assert!(z[0].is_finite());
        assert!(z[1].is_nan());
        assert!(z[2].is_finite());
    }

    #[test]
    fn test_performance_summary_fields() {
        let returns = vec![0.01, -0.02, 0.015, 0.005, -0.01, 0.02, 0.0, 0.003];
        let summary = PerformanceSummary::from_returns(&returns, 0.03);
        assert!(summary.total_return.is_finite());
        assert!(summary.annualized_volatility > 0.0);
        assert!(summary.max_drawdown >= 0.0);
        assert!(summary.win_rate > 0.0 && summary.win_rate < 1.0);
    }

    #[test]
    fn test_risk_metrics_ordering() {
        let returns = vec![
            0.01, -0.03, 0.02, -0.015, 0.005, -0.02, 0.012, -0.008, 0.003, -0.025,
        ];
        let risk = RiskMetrics::from_returns(&returns);
        assert!(risk.var_99 <= risk.var_95);
        assert!(risk.cvar_95 <= risk.var_95);
    }
}
