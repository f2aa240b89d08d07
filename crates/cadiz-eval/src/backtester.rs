//! Factor backtesting methodologies.
//!
//! Evaluates a factor panel against historical returns under four
//! methodologies: layered bucket spreads, IC analysis, long-short, and
//! equal-weight top-N. The portfolio-forming methodologies share one
//! bucket-and-average core: each period the valid cross-section is
//! ranked by factor value, a selection policy assigns ranks to buckets,
//! and each bucket earns the equal-weight mean of its members' returns
//! over the following period.

use crate::ic;
use cadiz_traits::{
    stats, CadizError, Date, Panel, PerformanceSummary, Result, ReturnSeries, RiskMetrics,
};
use serde::{Deserialize, Serialize};

/// Backtest configuration, validated at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Number of buckets for the layered methodology.
    pub layers: usize,
    /// Rebalance frequency label, informational only: every methodology
    /// here re-forms its buckets each period.
    pub rebalance_freq: String,
    /// Proportional cost per unit turnover, reported for downstream
    /// accounting; bucket returns here are gross.
    pub transaction_cost: f64,
    /// Annual risk-free rate for performance summaries.
    pub risk_free_rate: f64,
    /// Minimum valid cross-sectional observations for an IC date.
    pub min_periods: usize,
    /// Fraction of the cross-section held long, in `(0, 0.5]`.
    pub long_pct: f64,
    /// Fraction of the cross-section held short, in `(0, 0.5]`.
    pub short_pct: f64,
    /// Fraction of the cross-section selected by the top-N methodology,
    /// in `(0, 0.5]`.
    pub top_pct: f64,
    /// Forward horizons, in periods, for IC decay analysis.
    pub ic_horizons: Vec<usize>,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            layers: 5,
            rebalance_freq: "daily".to_string(),
            transaction_cost: 0.002,
            risk_free_rate: 0.03,
            min_periods: 20,
            long_pct: 0.3,
            short_pct: 0.3,
            top_pct: 0.2,
            ic_horizons: vec![1, 5, 10, 21],
        }
    }
}

impl BacktestConfig {
    fn validate(&self) -> Result<()> {
        if self.layers < 2 {
            return Err(CadizError::Validation(
                "layers must be at least 2".to_string(),
            ));
        }
        // A selection leg can never exceed half the cross-section, so a
        // larger fraction would be silently truncated.
        for (name, pct) in [
            ("long_pct", self.long_pct),
            ("short_pct", self.short_pct),
            ("top_pct", self.top_pct),
        ] {
            if !(pct > 0.0 && pct <= 0.5) {
                return Err(CadizError::Validation(format!(
                    "{name} must lie in (0, 0.5], got {pct}"
                )));
            }
        }
        if self.min_periods < 2 {
            return Err(CadizError::Validation(
                "min_periods must be at least 2".to_string(),
            ));
        }
        if self.ic_horizons.iter().any(|&h| h == 0) {
            return Err(CadizError::Validation(
                "ic_horizons must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Result of a layered backtest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayeredResult {
    /// Per-layer return series, layer 1 (lowest factor values) first.
    pub layer_returns: Vec<ReturnSeries>,
    /// Spread series: top layer minus bottom layer.
    pub long_short_returns: ReturnSeries,
    /// Performance of the spread series.
    pub summary: PerformanceSummary,
    /// Tail risk of the spread series.
    pub risk: RiskMetrics,
}

/// Result of a long-short backtest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LongShortResult {
    /// Long-minus-short portfolio returns.
    pub returns: ReturnSeries,
    /// Performance of the portfolio.
    pub summary: PerformanceSummary,
    /// Tail risk of the portfolio.
    pub risk: RiskMetrics,
}

/// Result of an equal-weight top-N backtest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopNResult {
    /// Equal-weight returns of the selected top fraction.
    pub returns: ReturnSeries,
    /// Performance of the selection.
    pub summary: PerformanceSummary,
    /// Tail risk of the selection.
    pub risk: RiskMetrics,
}

/// Mean IC at one forward horizon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HorizonIc {
    /// Forward horizon in periods.
    pub horizon: usize,
    /// Mean Pearson IC at that horizon, `NaN` when no date qualifies.
    pub mean_ic: f64,
}

/// Aggregated IC analysis of a factor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IcReport {
    /// Snapshot dates that met the `min_periods` requirement.
    pub dates: Vec<Date>,
    /// Pearson IC per retained date.
    pub ic: Vec<f64>,
    /// Rank IC per retained date.
    pub rank_ic: Vec<f64>,
    /// Mean Pearson IC.
    pub ic_mean: f64,
    /// Standard deviation of the Pearson IC series.
    pub ic_std: f64,
    /// Information ratio `ic_mean / ic_std`, 0 when the std vanishes.
    pub information_ratio: f64,
    /// Fraction of dates with positive Pearson IC.
    pub ic_win_rate: f64,
    /// Mean rank IC.
    pub rank_ic_mean: f64,
    /// Mean Pearson IC per forward horizon.
    pub decay: Vec<HorizonIc>,
    /// Mean rank correlation between consecutive factor snapshots; low
    /// values indicate a fast-turning signal.
    pub rank_autocorrelation: f64,
}

/// Evaluates factor predictive power and realized bucket performance.
#[derive(Debug, Clone)]
pub struct FactorBacktester {
    config: BacktestConfig,
}

impl FactorBacktester {
    /// Create a backtester from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CadizError::Validation`] for out-of-range settings.
    pub fn new(config: BacktestConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the backtest configuration.
    pub const fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Layered backtest: sorts the cross-section into equal-sized buckets
    /// by factor value each period and tracks each bucket's equal-weight
    /// forward return. The spread series is the top bucket minus the
    /// bottom bucket.
    ///
    /// Periods with fewer valid assets than buckets are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`CadizError::Validation`] when the panels share no dates
    /// or identifiers, or when no period has enough valid assets.
    pub fn layered(&self, factor: &Panel, returns: &Panel) -> Result<LayeredResult> {
        let (factor, returns) = factor.align(returns)?;
        let layers = self.config.layers;

        let (dates, buckets) = bucket_series(&factor, &returns, layers, |pos, n_valid| {
            Some(pos * layers / n_valid)
        })?;

        let spread: Vec<f64> = buckets[layers - 1]
            .iter()
            .zip(buckets[0].iter())
            .map(|(top, bottom)| top - bottom)
            .collect();
        let long_short_returns = ReturnSeries::new(dates.clone(), spread)?;
        let layer_returns = buckets
            .into_iter()
            .map(|b| ReturnSeries::new(dates.clone(), b))
            .collect::<Result<Vec<_>>>()?;

        let summary =
            PerformanceSummary::from_returns(long_short_returns.values(), self.config.risk_free_rate);
        let risk = RiskMetrics::from_returns(long_short_returns.values());
        Ok(LayeredResult {
            layer_returns,
            long_short_returns,
            summary,
            risk,
        })
    }

    /// Long-short backtest: longs the top `long_pct` and shorts the
    /// bottom `short_pct` of the valid cross-section each period; the
    /// portfolio return is the long bucket mean minus the short bucket
    /// mean.
    ///
    /// # Errors
    ///
    /// Returns [`CadizError::Validation`] when the panels share no dates
    /// or identifiers, or when no period has enough valid assets.
    pub fn long_short(&self, factor: &Panel, returns: &Panel) -> Result<LongShortResult> {
        let (factor, returns) = factor.align(returns)?;
        let long_pct = self.config.long_pct;
        let short_pct = self.config.short_pct;

        let (dates, buckets) = bucket_series(&factor, &returns, 2, |pos, n_valid| {
            if pos < leg_size(n_valid, short_pct) {
                Some(0)
            } else if pos >= n_valid - leg_size(n_valid, long_pct) {
                Some(1)
            } else {
                None
            }
        })?;

        let values: Vec<f64> = buckets[1]
            .iter()
            .zip(buckets[0].iter())
            .map(|(long, short)| long - short)
            .collect();
        let series = ReturnSeries::new(dates, values)?;
        let summary = PerformanceSummary::from_returns(series.values(), self.config.risk_free_rate);
        let risk = RiskMetrics::from_returns(series.values());
        Ok(LongShortResult {
            returns: series,
            summary,
            risk,
        })
    }

    /// Equal-weight top-N backtest: holds the top `top_pct` of the valid
    /// cross-section each period at equal weight.
    ///
    /// # Errors
    ///
    /// Returns [`CadizError::Validation`] when the panels share no dates
    /// or identifiers, or when no period has enough valid assets.
    pub fn top_n(&self, factor: &Panel, returns: &Panel) -> Result<TopNResult> {
        let (factor, returns) = factor.align(returns)?;
        let top_pct = self.config.top_pct;

        let (dates, mut buckets) = bucket_series(&factor, &returns, 1, |pos, n_valid| {
            (pos >= n_valid - leg_size(n_valid, top_pct)).then_some(0)
        })?;

        let series = ReturnSeries::new(dates, buckets.swap_remove(0))?;
        let summary = PerformanceSummary::from_returns(series.values(), self.config.risk_free_rate);
        let risk = RiskMetrics::from_returns(series.values());
        Ok(TopNResult {
            returns: series,
            summary,
            risk,
        })
    }

    /// IC analysis: Pearson and rank correlation between each factor
    /// snapshot and the next period's returns, aggregated into mean, std,
    /// information ratio, and win rate, with per-horizon decay and the
    /// signal's rank autocorrelation.
    ///
    /// Snapshot dates with fewer than `min_periods` valid cross-sectional
    /// pairs are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`CadizError::Validation`] when the panels share no dates
    /// or identifiers, and [`CadizError::InsufficientData`] when no
    /// snapshot date retains `min_periods` valid observations.
    pub fn ic_analysis(&self, factor: &Panel, returns: &Panel) -> Result<IcReport> {
        let (factor, returns) = factor.align(returns)?;

        let (dates, ic, rank_ic) = self.ic_at_horizon(&factor, &returns, 1)?;

        let ic_mean = mean(&ic);
        let ic_std = stats::std_dev(&ic);
        let information_ratio = if ic_std < stats::MIN_STD_THRESHOLD {
            0.0
        } else {
            ic_mean / ic_std
        };

        let mut decay = Vec::with_capacity(self.config.ic_horizons.len());
        for &horizon in &self.config.ic_horizons {
            let mean_ic = match self.ic_at_horizon(&factor, &returns, horizon) {
                Ok((_, horizon_ic, _)) => mean(&horizon_ic),
                Err(_) => f64::NAN,
            };
            decay.push(HorizonIc { horizon, mean_ic });
        }

        Ok(IcReport {
            ic_win_rate: stats::win_rate(&ic),
            rank_ic_mean: mean(&rank_ic),
            rank_autocorrelation: rank_autocorrelation(&factor),
            dates,
            ic,
            rank_ic,
            ic_mean,
            ic_std,
            information_ratio,
            decay,
        })
    }

    /// Per-date Pearson and rank IC against returns `horizon` periods
    /// ahead, applying the `min_periods` skip rule.
    fn ic_at_horizon(
        &self,
        factor: &Panel,
        returns: &Panel,
        horizon: usize,
    ) -> Result<(Vec<Date>, Vec<f64>, Vec<f64>)> {
        let n_periods = factor.n_periods();
        let n_assets = factor.n_columns();
        let mut dates = Vec::new();
        let mut ic = Vec::new();
        let mut rank = Vec::new();
        let mut max_valid = 0;

        for t in 0..n_periods.saturating_sub(horizon) {
            let mut snapshot = Vec::with_capacity(n_assets);
            let mut forward = Vec::with_capacity(n_assets);
            for j in 0..n_assets {
                let f = factor.values()[[t, j]];
                let r = returns.values()[[t + horizon, j]];
                if f.is_finite() && r.is_finite() {
                    snapshot.push(f);
                    forward.push(r);
                }
            }
            max_valid = max_valid.max(snapshot.len());
            if snapshot.len() < self.config.min_periods {
                continue;
            }
            dates.push(factor.dates()[t]);
            ic.push(ic::pearson_ic(&snapshot, &forward));
            rank.push(ic::rank_ic(&snapshot, &forward));
        }

        if dates.is_empty() {
            return Err(CadizError::InsufficientData {
                required: self.config.min_periods,
                actual: max_valid,
            });
        }
        Ok((dates, ic, rank))
    }
}

fn mean(values: &[f64]) -> f64 {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return f64::NAN;
    }
    finite.iter().sum::<f64>() / finite.len() as f64
}

/// Mean Spearman correlation between consecutive factor snapshots.
fn rank_autocorrelation(factor: &Panel) -> f64 {
    let autocorr: Vec<f64> = (0..factor.n_periods().saturating_sub(1))
        .map(|t| {
            let current: Vec<f64> = factor.row(t).to_vec();
            let next: Vec<f64> = factor.row(t + 1).to_vec();
            ic::rank_ic(&current, &next)
        })
        .collect();
    mean(&autocorr)
}

/// Assets in a selection leg, at least one and at most half the
/// cross-section.
fn leg_size(n_valid: usize, pct: f64) -> usize {
    (((n_valid as f64) * pct).floor() as usize).clamp(1, (n_valid / 2).max(1))
}

/// The bucket-and-average core shared by the portfolio methodologies.
///
/// For each period, assets with a finite factor value and a finite
/// forward return are ranked ascending by factor value; `assign` maps a
/// rank position and the valid count to a bucket index (or `None` for
/// the unheld middle). Each bucket's period return is the equal-weight
/// mean of its members' next-period returns, dated at the holding date.
/// Periods with fewer valid assets than `n_buckets` (or fewer than two)
/// are skipped.
fn bucket_series<F>(
    factor: &Panel,
    returns: &Panel,
    n_buckets: usize,
    assign: F,
) -> Result<(Vec<Date>, Vec<Vec<f64>>)>
where
    F: Fn(usize, usize) -> Option<usize>,
{
    let n_periods = factor.n_periods();
    let mut dates = Vec::new();
    let mut buckets: Vec<Vec<f64>> = vec![Vec::new(); n_buckets];

    for t in 0..n_periods.saturating_sub(1) {
        let factor_row = factor.row(t);
        let returns_row = returns.row(t + 1);

        let mut ranked: Vec<usize> = (0..factor.n_columns())
            .filter(|&j| factor_row[j].is_finite() && returns_row[j].is_finite())
            .collect();
        ranked.sort_by(|&a, &b| {
            factor_row[a]
                .partial_cmp(&factor_row[b])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let n_valid = ranked.len();
        if n_valid < n_buckets.max(2) {
            continue;
        }

        let mut sums = vec![0.0; n_buckets];
        let mut counts = vec![0usize; n_buckets];
        for (pos, &j) in ranked.iter().enumerate() {
            if let Some(bucket) = assign(pos, n_valid) {
                sums[bucket] += returns_row[j];
                counts[bucket] += 1;
            }
        }

        dates.push(factor.dates()[t + 1]);
        for (bucket, values) in buckets.iter_mut().enumerate() {
            let value = if counts[bucket] > 0 {
                sums[bucket] / counts[bucket] as f64
            } else {
                f64::NAN
            };
            values.push(value);
        }
    }

    if dates.is_empty() {
        return Err(CadizError::Validation(
            "no period has enough valid observations to form buckets".to_string(),
        ));
    }
    Ok((dates, buckets))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cadiz_traits::AssetId;
    use ndarray::Array2;

    fn d(offset: usize) -> Date {
        Date::from_ymd_opt(2024, 6, 3).unwrap() + chrono::Days::new(offset as u64)
    }

    fn asset_names(n: usize) -> Vec<AssetId> {
        (0..n).map(|i| format!("S{i}")).collect()
    }

    /// Returns that vary across assets and dates with a shifting order.
    fn varied_returns(n_periods: usize, n_assets: usize) -> Panel {
        let mut values = Array2::zeros((n_periods, n_assets));
        for t in 0..n_periods {
            for j in 0..n_assets {
                values[[t, j]] = ((j * 7 + t * 3) % 13) as f64 * 0.001 - 0.006;
            }
        }
        Panel::new((0..n_periods).map(d).collect(), asset_names(n_assets), values).unwrap()
    }

    /// Factor equal to the next period's return: perfect foresight.
    fn perfect_foresight_factor(returns: &Panel) -> Panel {
        returns.forward(1)
    }

    fn monotone_factor(n_periods: usize, n_assets: usize) -> Panel {
        let mut values = Array2::zeros((n_periods, n_assets));
        for t in 0..n_periods {
            for j in 0..n_assets {
                values[[t, j]] = j as f64;
            }
        }
        Panel::new((0..n_periods).map(d).collect(), asset_names(n_assets), values).unwrap()
    }

    fn monotone_returns(n_periods: usize, n_assets: usize) -> Panel {
        let mut values = Array2::zeros((n_periods, n_assets));
        for t in 0..n_periods {
            for j in 0..n_assets {
                values[[t, j]] = -0.012 + 0.001 * j as f64;
            }
        }
        Panel::new((0..n_periods).map(d).collect(), asset_names(n_assets), values).unwrap()
    }

    #[test]
    fn test_perfect_foresight_ic_is_one() {
        let returns = varied_returns(30, 25);
        let factor = perfect_foresight_factor(&returns);
        let backtester = FactorBacktester::new(BacktestConfig::default()).unwrap();

        let report = backtester.ic_analysis(&factor, &returns).unwrap();
        assert!(report.ic_mean > 0.99, "ic mean {}", report.ic_mean);
        assert!(report.rank_ic_mean > 0.99);
        assert_relative_eq!(report.ic_win_rate, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_monotone_factor_layered_spread_strictly_positive() {
        let factor = monotone_factor(30, 25);
        let returns = monotone_returns(30, 25);
        let backtester = FactorBacktester::new(BacktestConfig::default()).unwrap();

        let result = backtester.layered(&factor, &returns).unwrap();
        assert_eq!(result.layer_returns.len(), 5);
        assert_eq!(result.long_short_returns.len(), 29);
        for &r in result.long_short_returns.values() {
            assert!(r > 0.0, "spread return {r}");
        }
    }

    #[test]
    fn test_layered_buckets_are_ordered_for_monotone_returns() {
        let factor = monotone_factor(30, 25);
        let returns = monotone_returns(30, 25);
        let backtester = FactorBacktester::new(BacktestConfig::default()).unwrap();

        let result = backtester.layered(&factor, &returns).unwrap();
        // Each higher layer earns strictly more every period
        for k in 1..5 {
            for (hi, lo) in result.layer_returns[k]
                .values()
                .iter()
                .zip(result.layer_returns[k - 1].values().iter())
            {
                assert!(hi > lo);
            }
        }
    }

    #[test]
    fn test_long_short_positive_for_monotone_factor() {
        let factor = monotone_factor(30, 25);
        let returns = monotone_returns(30, 25);
        let backtester = FactorBacktester::new(BacktestConfig::default()).unwrap();

        let result = backtester.long_short(&factor, &returns).unwrap();
        assert_eq!(result.returns.len(), 29);
        // Top 7 (mean j = 21) minus bottom 7 (mean j = 3)
        for &r in result.returns.values() {
            assert_relative_eq!(r, 0.001 * 18.0, epsilon = 1e-12);
        }
        assert!(result.summary.total_return > 0.0);
    }

    #[test]
    fn test_top_n_selects_best_performers() {
        let factor = monotone_factor(30, 25);
        let returns = monotone_returns(30, 25);
        let backtester = FactorBacktester::new(BacktestConfig::default()).unwrap();

        let result = backtester.top_n(&factor, &returns).unwrap();
        // Top 5 of 25: mean of returns for j in 20..25
        let expected = (20..25).map(|j| -0.012 + 0.001 * j as f64).sum::<f64>() / 5.0;
        for &r in result.returns.values() {
            assert_relative_eq!(r, expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_ic_skips_dates_below_min_periods() {
        let returns = varied_returns(30, 25);
        // First 10 snapshots keep only 10 finite factor values
        let mut values = perfect_foresight_factor(&returns).values().clone();
        for t in 0..10 {
            for j in 10..25 {
                values[[t, j]] = f64::NAN;
            }
        }
        let factor = Panel::new(
            returns.dates().to_vec(),
            returns.columns().to_vec(),
            values,
        )
        .unwrap();

        let backtester = FactorBacktester::new(BacktestConfig::default()).unwrap();
        let report = backtester.ic_analysis(&factor, &returns).unwrap();
        // 29 horizon-1 snapshots, the first 10 skipped
        assert_eq!(report.dates.len(), 19);
        assert_eq!(report.dates[0], d(10));
    }

    #[test]
    fn test_ic_all_dates_skipped_is_insufficient_data() {
        let returns = varied_returns(30, 25);
        let sparse = Array2::from_elem((30, 25), f64::NAN);
        let factor = Panel::new(returns.dates().to_vec(), asset_names(25), sparse).unwrap();

        let backtester = FactorBacktester::new(BacktestConfig::default()).unwrap();
        assert!(matches!(
            backtester.ic_analysis(&factor, &returns),
            Err(CadizError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_disjoint_panels_are_fatal() {
        let factor = monotone_factor(30, 25);
        let late_returns = Panel::new(
            (100..130).map(d).collect(),
            asset_names(25),
            Array2::zeros((30, 25)),
        )
        .unwrap();
        let backtester = FactorBacktester::new(BacktestConfig::default()).unwrap();
        assert!(matches!(
            backtester.layered(&factor, &late_returns),
            Err(CadizError::Validation(_))
        ));
    }

    #[test]
    fn test_decay_reports_each_horizon() {
        let returns = varied_returns(60, 25);
        let factor = perfect_foresight_factor(&returns);
        let backtester = FactorBacktester::new(BacktestConfig::default()).unwrap();

        let report = backtester.ic_analysis(&factor, &returns).unwrap();
        assert_eq!(report.decay.len(), 4);
        assert_eq!(report.decay[0].horizon, 1);
        // Horizon 1 is the perfect-foresight horizon
        assert!(report.decay[0].mean_ic > 0.99);
        // Longer horizons lose the alignment and decay toward zero
        assert!(report.decay[3].mean_ic.abs() < report.decay[0].mean_ic);
    }

    #[test]
    fn test_rank_autocorrelation_of_stable_signal_is_one() {
        let returns = varied_returns(30, 25);
        let factor = monotone_factor(30, 25);
        let backtester = FactorBacktester::new(BacktestConfig::default()).unwrap();

        let report = backtester.ic_analysis(&factor, &returns).unwrap();
        assert_relative_eq!(report.rank_autocorrelation, 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = BacktestConfig {
            layers: 1,
            ..Default::default()
        };
        assert!(FactorBacktester::new(config).is_err());

        let config = BacktestConfig {
            long_pct: 0.6,
            short_pct: 0.6,
            ..Default::default()
        };
        assert!(FactorBacktester::new(config).is_err());
    }

    #[test]
    fn test_leg_fraction_beyond_half_rejected() {
        // More than half the cross-section cannot be selected; a config
        // asking for it must fail instead of being silently truncated.
        let config = BacktestConfig {
            top_pct: 0.8,
            ..Default::default()
        };
        assert!(FactorBacktester::new(config).is_err());

        let config = BacktestConfig {
            long_pct: 0.5,
            short_pct: 0.5,
            top_pct: 0.5,
            ..Default::default()
        };
        assert!(FactorBacktester::new(config).is_ok());
    }
}
