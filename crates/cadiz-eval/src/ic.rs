//! Information Coefficient calculations.
//!
//! The IC of a factor is the correlation between its cross-sectional
//! values at time t and the returns realized over the following period.
//! Pearson IC uses raw values; Rank IC uses rank-transformed values and
//! is robust to outliers. Non-finite pairs are excluded, and fewer than
//! two valid pairs yields `NaN`.

use cadiz_traits::stats;

/// Pearson IC between a factor cross-section and forward returns.
pub fn pearson_ic(factor: &[f64], forward_returns: &[f64]) -> f64 {
    stats::pearson(factor, forward_returns)
}

/// Rank IC: Spearman rank correlation between a factor cross-section and
/// forward returns.
pub fn rank_ic(factor: &[f64], forward_returns: &[f64]) -> f64 {
    if factor.len() != forward_returns.len() {
        return f64::NAN;
    }
    let pairs: Vec<(f64, f64)> = factor
        .iter()
        .zip(forward_returns.iter())
        .filter(|(f, r)| f.is_finite() && r.is_finite())
        .map(|(&f, &r)| (f, r))
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }

    let factor_ranks = compute_ranks(&pairs.iter().map(|(f, _)| *f).collect::<Vec<_>>());
    let return_ranks = compute_ranks(&pairs.iter().map(|(_, r)| *r).collect::<Vec<_>>());
    stats::pearson(&factor_ranks, &return_ranks)
}

/// Ranks of values, ties receiving their average rank.
pub fn compute_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut indexed: Vec<(usize, f64)> = values.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j < n && (indexed[j].1 - indexed[i].1).abs() < f64::EPSILON {
            j += 1;
        }
        let avg_rank = (i + j - 1) as f64 / 2.0;
        for k in i..j {
            ranks[indexed[k].0] = avg_rank;
        }
        i = j;
    }
    ranks
}
