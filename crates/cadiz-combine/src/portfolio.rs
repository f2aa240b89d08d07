//! Composite portfolio construction from weighted factor exposures.
//!
//! Combines per-asset factor exposure panels into a single composite
//! score using factor weights, forms a long/short portfolio from the
//! ranked cross-section each period, and accounts for transaction costs
//! proportional to turnover.

use cadiz_traits::{
    stats, AssetId, CadizError, Panel, PerformanceSummary, Result, ReturnSeries, Weights,
};
use serde::{Deserialize, Serialize};

/// Factor weights whose magnitudes sum below this carry no signal.
const MIN_WEIGHT_MASS: f64 = 1e-10;

/// Portfolio construction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioConfig {
    /// Fraction of the ranked cross-section held long, in `(0, 0.5]`.
    pub long_pct: f64,
    /// Fraction of the ranked cross-section held short, in `[0, 0.5]`;
    /// zero builds a long-only portfolio.
    pub short_pct: f64,
    /// Proportional cost charged per unit of turnover.
    pub transaction_cost: f64,
    /// Annual risk-free rate for the performance summary.
    pub risk_free_rate: f64,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            long_pct: 0.3,
            short_pct: 0.3,
            transaction_cost: 0.002,
            risk_free_rate: 0.03,
        }
    }
}

impl PortfolioConfig {
    fn validate(&self) -> Result<()> {
        // A selection leg can never exceed half the cross-section, so a
        // larger fraction would be silently truncated.
        if !(self.long_pct > 0.0 && self.long_pct <= 0.5) {
            return Err(CadizError::Validation(
                "long_pct must lie in (0, 0.5]".to_string(),
            ));
        }
        if !(0.0..=0.5).contains(&self.short_pct) {
            return Err(CadizError::Validation(
                "short_pct must lie in [0, 0.5]".to_string(),
            ));
        }
        if self.transaction_cost < 0.0 {
            return Err(CadizError::Validation(
                "transaction_cost must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Output of [`build_portfolio`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioResult {
    /// Per-period portfolio returns before costs.
    pub gross_returns: ReturnSeries,
    /// Per-period portfolio returns net of transaction costs.
    pub net_returns: ReturnSeries,
    /// Performance statistics of the net return series.
    pub summary: PerformanceSummary,
    /// Mean one-sided turnover per rebalance.
    pub avg_turnover: f64,
    /// The factor weights actually applied.
    pub weights_used: Weights,
}

/// Builds a long/short composite portfolio from weighted factor exposures.
///
/// Each entry of `factors` pairs a factor identifier with its exposure
/// panel (dates x assets). All factor panels and the return panel are
/// aligned on their common dates and assets. For each period, per-asset
/// exposures are z-scored cross-sectionally and combined with the factor
/// weights into a composite score; the top `long_pct` of the ranked
/// cross-section is held long and the bottom `short_pct` short, equally
/// weighted within each leg, over the following period.
///
/// All-zero factor weights carry no ranking information, so uniform
/// weights are substituted and a warning is logged.
///
/// # Errors
///
/// Returns [`CadizError::Validation`] when a weighted factor has no
/// exposure panel, when the panels share no dates or assets, or when
/// fewer than two common periods remain.
pub fn build_portfolio(
    factors: &[(AssetId, Panel)],
    weights: &Weights,
    returns: &Panel,
    config: &PortfolioConfig,
) -> Result<PortfolioResult> {
    config.validate()?;
    if factors.is_empty() {
        return Err(CadizError::Validation(
            "at least one factor panel is required".to_string(),
        ));
    }

    let weights_used = effective_weights(weights);
    let mut weighted: Vec<(f64, &Panel)> = Vec::with_capacity(weights_used.len());
    for (name, w) in weights_used.iter() {
        let panel = factors
            .iter()
            .find(|(id, _)| id == name)
            .map(|(_, p)| p)
            .ok_or_else(|| {
                CadizError::Validation(format!("no exposure panel for weighted factor: {name}"))
            })?;
        weighted.push((w, panel));
    }

    // Intersect dates and assets across every panel involved.
    let mut dates = returns.dates().to_vec();
    let mut assets = returns.columns().to_vec();
    for (_, panel) in &weighted {
        dates.retain(|d| panel.dates().binary_search(d).is_ok());
        assets.retain(|a| panel.column_index(a).is_some());
    }
    if dates.len() < 2 {
        return Err(CadizError::Validation(
            "fewer than two periods are common to all panels".to_string(),
        ));
    }
    if assets.is_empty() {
        return Err(CadizError::Validation(
            "no assets are common to all panels".to_string(),
        ));
    }

    let returns = returns.restrict(&dates, &assets)?;
    let aligned: Vec<(f64, Panel)> = weighted
        .iter()
        .map(|(w, panel)| Ok((*w, panel.restrict(&dates, &assets)?)))
        .collect::<Result<_>>()?;

    let n_periods = returns.n_periods();
    let n_assets = assets.len();
    let mut gross = Vec::with_capacity(n_periods - 1);
    let mut net = Vec::with_capacity(n_periods - 1);
    let mut turnovers = Vec::with_capacity(n_periods - 1);
    let mut previous_positions: Option<Vec<f64>> = None;

    for t in 0..n_periods - 1 {
        let composite = composite_scores(&aligned, t, n_assets);
        let positions = rank_positions(&composite, config);

        let turnover = match &previous_positions {
            None => positions.iter().map(|p| p.abs()).sum::<f64>(),
            Some(prev) => positions
                .iter()
                .zip(prev.iter())
                .map(|(p, q)| (p - q).abs())
                .sum(),
        };
        turnovers.push(turnover);

        let next_row = returns.row(t + 1);
        let period_return: f64 = positions
            .iter()
            .zip(next_row.iter())
            .filter(|(_, r)| r.is_finite())
            .map(|(p, r)| p * r)
            .sum();

        gross.push(period_return);
        net.push(period_return - config.transaction_cost * turnover);
        previous_positions = Some(positions);
    }

    let series_dates = returns.dates()[1..].to_vec();
    let gross_returns = ReturnSeries::new(series_dates.clone(), gross)?;
    let net_returns = ReturnSeries::new(series_dates, net)?;
    let summary = PerformanceSummary::from_returns(net_returns.values(), config.risk_free_rate);
    let avg_turnover = if turnovers.is_empty() {
        0.0
    } else {
        turnovers.iter().sum::<f64>() / turnovers.len() as f64
    };

    Ok(PortfolioResult {
        gross_returns,
        net_returns,
        summary,
        avg_turnover,
        weights_used,
    })
}

/// Substitutes uniform weights when the provided ones carry no mass.
fn effective_weights(weights: &Weights) -> Weights {
    let mass: f64 = weights.values().iter().map(|w| w.abs()).sum();
    if mass < MIN_WEIGHT_MASS {
        tracing::warn!("factor weights are all zero, using equal weights");
        Weights::equal(weights.names().to_vec())
    } else {
        weights.clone()
    }
}

/// Weighted sum of cross-sectionally z-scored factor exposures at row `t`.
///
/// An asset missing any weighted factor gets a `NaN` composite and drops
/// out of the ranking for that period.
fn composite_scores(aligned: &[(f64, Panel)], t: usize, n_assets: usize) -> Vec<f64> {
    let mut composite = vec![0.0; n_assets];
    for (w, panel) in aligned {
        let row: Vec<f64> = panel.row(t).to_vec();
        let (z, _) = stats::standardize(&row);
        for (c, z_i) in composite.iter_mut().zip(z.iter()) {
            *c += w * z_i;
        }
    }
    composite
}

/// Per-asset position weights from the ranked composite cross-section.
///
/// Longs get `+1/n_long`, shorts `-1/n_short`, the middle zero. Each leg
/// takes its configured fraction of the valid cross-section, at least one
/// asset when the fraction is positive.
fn rank_positions(composite: &[f64], config: &PortfolioConfig) -> Vec<f64> {
    let mut ranked: Vec<usize> = (0..composite.len())
        .filter(|&i| composite[i].is_finite())
        .collect();
    ranked.sort_by(|&a, &b| {
        composite[b]
            .partial_cmp(&composite[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let n_valid = ranked.len();
    let mut positions = vec![0.0; composite.len()];
    if n_valid < 2 {
        return positions;
    }

    let n_long = leg_size(n_valid, config.long_pct);
    let n_short = leg_size(n_valid, config.short_pct);
    for &i in &ranked[..n_long] {
        positions[i] = 1.0 / n_long as f64;
    }
    if n_short > 0 {
        for &i in &ranked[n_valid - n_short..] {
            positions[i] = -1.0 / n_short as f64;
        }
    }
    positions
}

fn leg_size(n_valid: usize, pct: f64) -> usize {
    if pct <= 0.0 {
        return 0;
    }
    (((n_valid as f64) * pct).floor() as usize).clamp(1, n_valid / 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadiz_traits::Date;
    use ndarray::Array2;

    fn d(offset: usize) -> Date {
        Date::from_ymd_opt(2024, 3, 1).unwrap() + chrono::Days::new(offset as u64)
    }

    fn asset_names(n: usize) -> Vec<AssetId> {
        (0..n).map(|i| format!("S{i}")).collect()
    }

    /// Exposures where asset rank is constant: S9 highest, S0 lowest.
    fn monotone_factor(n_periods: usize, n_assets: usize) -> Panel {
        let mut values = Array2::zeros((n_periods, n_assets));
        for t in 0..n_periods {
            for j in 0..n_assets {
                values[[t, j]] = j as f64;
            }
        }
        Panel::new((0..n_periods).map(d).collect(), asset_names(n_assets), values).unwrap()
    }

    /// Returns where higher-ranked assets earn more every period.
    fn monotone_returns(n_periods: usize, n_assets: usize) -> Panel {
        let mut values = Array2::zeros((n_periods, n_assets));
        for t in 0..n_periods {
            for j in 0..n_assets {
                values[[t, j]] = -0.01 + 0.002 * j as f64;
            }
        }
        Panel::new((0..n_periods).map(d).collect(), asset_names(n_assets), values).unwrap()
    }

    fn single_factor(n_periods: usize, n_assets: usize) -> Vec<(AssetId, Panel)> {
        vec![("alpha".to_string(), monotone_factor(n_periods, n_assets))]
    }

    #[test]
    fn test_monotone_factor_earns_positive_gross_returns() {
        let factors = single_factor(20, 10);
        let weights = Weights::new(vec!["alpha".to_string()], vec![1.0]).unwrap();
        let returns = monotone_returns(20, 10);

        let result =
            build_portfolio(&factors, &weights, &returns, &PortfolioConfig::default()).unwrap();

        assert_eq!(result.gross_returns.len(), 19);
        // Longs always beat shorts by construction
        for &r in result.gross_returns.values() {
            assert!(r > 0.0, "gross return {r}");
        }
    }

    #[test]
    fn test_costs_reduce_net_returns() {
        let factors = single_factor(20, 10);
        let weights = Weights::new(vec!["alpha".to_string()], vec![1.0]).unwrap();
        let returns = monotone_returns(20, 10);

        let result =
            build_portfolio(&factors, &weights, &returns, &PortfolioConfig::default()).unwrap();

        // First period pays full entry turnover of 2 (long leg + short leg)
        assert!((result.gross_returns.values()[0] - result.net_returns.values()[0] - 0.004).abs() < 1e-12);
        // Stable ranking means no turnover afterwards
        for t in 1..result.net_returns.len() {
            assert!(
                (result.gross_returns.values()[t] - result.net_returns.values()[t]).abs() < 1e-12
            );
        }
        assert!(result.avg_turnover < 2.0 / 19.0 + 1e-9);
    }

    #[test]
    fn test_zero_weights_fall_back_to_equal() {
        let n = 20;
        let factors = vec![
            ("alpha".to_string(), monotone_factor(n, 10)),
            ("beta".to_string(), monotone_factor(n, 10)),
        ];
        let weights =
            Weights::new(vec!["alpha".to_string(), "beta".to_string()], vec![0.0, 0.0]).unwrap();
        let returns = monotone_returns(n, 10);

        let result =
            build_portfolio(&factors, &weights, &returns, &PortfolioConfig::default()).unwrap();
        assert_eq!(result.weights_used.get("alpha"), Some(0.5));
        assert_eq!(result.weights_used.get("beta"), Some(0.5));
    }

    #[test]
    fn test_missing_factor_panel_is_invalid() {
        let factors = single_factor(20, 10);
        let weights =
            Weights::new(vec!["alpha".to_string(), "gamma".to_string()], vec![0.5, 0.5]).unwrap();
        let returns = monotone_returns(20, 10);

        assert!(matches!(
            build_portfolio(&factors, &weights, &returns, &PortfolioConfig::default()),
            Err(CadizError::Validation(_))
        ));
    }

    #[test]
    fn test_disjoint_dates_are_invalid() {
        let factors = single_factor(20, 10);
        let weights = Weights::new(vec!["alpha".to_string()], vec![1.0]).unwrap();
        let late_dates: Vec<Date> = (100..120).map(d).collect();
        let returns = Panel::new(
            late_dates,
            asset_names(10),
            Array2::zeros((20, 10)),
        )
        .unwrap();

        assert!(build_portfolio(&factors, &weights, &returns, &PortfolioConfig::default()).is_err());
    }

    #[test]
    fn test_nan_exposures_drop_asset_from_ranking() {
        let n_periods = 20;
        let mut factor = monotone_factor(n_periods, 10);
        // Poison the top-ranked asset's exposures
        let mut values = factor.values().clone();
        for t in 0..n_periods {
            values[[t, 9]] = f64::NAN;
        }
        factor = Panel::new(factor.dates().to_vec(), factor.columns().to_vec(), values).unwrap();

        let factors = vec![("alpha".to_string(), factor)];
        let weights = Weights::new(vec!["alpha".to_string()], vec![1.0]).unwrap();
        let returns = monotone_returns(n_periods, 10);

        let result =
            build_portfolio(&factors, &weights, &returns, &PortfolioConfig::default()).unwrap();
        // S8 leads the remaining 9-asset cross-section; the portfolio is
        // still profitable without S9.
        for &r in result.gross_returns.values() {
            assert!(r > 0.0);
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = PortfolioConfig {
            long_pct: 0.7,
            short_pct: 0.7,
            ..Default::default()
        };
        let factors = single_factor(20, 10);
        let weights = Weights::new(vec!["alpha".to_string()], vec![1.0]).unwrap();
        let returns = monotone_returns(20, 10);
        assert!(matches!(
            build_portfolio(&factors, &weights, &returns, &config),
            Err(CadizError::Validation(_))
        ));
    }

    #[test]
    fn test_leg_fraction_beyond_half_rejected() {
        let config = PortfolioConfig {
            long_pct: 0.6,
            short_pct: 0.3,
            ..Default::default()
        };
        let factors = single_factor(20, 10);
        let weights = Weights::new(vec!["alpha".to_string()], vec![1.0]).unwrap();
        let returns = monotone_returns(20, 10);
        assert!(matches!(
            build_portfolio(&factors, &weights, &returns, &config),
            Err(CadizError::Validation(_))
        ));

        let config = PortfolioConfig {
            long_pct: 0.5,
            short_pct: 0.5,
            ..Default::default()
        };
        assert!(build_portfolio(&factors, &weights, &returns, &config).is_ok());
    }
}
