//! Common types used throughout the Cadiz framework.
//!
//! This module defines the core data model: time-indexed panels of
//! per-asset values, single return series, and weight vectors. Panels
//! replace implicit frame indexing with an explicit keyed container whose
//! invariants (dates chronological and unique, identifiers unique) are
//! validated once at construction.

use crate::error::{CadizError, Result};
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

// Re-export date type from chrono
pub use chrono::NaiveDate as Date;

/// An asset or factor identifier.
///
/// Typically a ticker symbol like "AAPL" or a factor name like "momentum".
pub type AssetId = String;

/// A time-indexed table of per-asset (or per-factor) values.
///
/// Rows are dates in strictly increasing order; columns are unique
/// identifiers. Values are `f64` with `NaN` marking missing history —
/// missing values are never silently treated as zero.
///
/// The same container serves as a Return Panel (per-asset returns) and a
/// Factor Panel (per-asset factor exposures, or per-factor return
/// streams), so alignment and bucketing logic is written once.
///
/// # Example
///
/// ```
/// use cadiz_traits::{Panel, Date};
/// use ndarray::array;
///
/// let dates = vec![
///     Date::from_ymd_opt(2024, 1, 2).unwrap(),
///     Date::from_ymd_opt(2024, 1, 3).unwrap(),
/// ];
/// let panel = Panel::new(
///     dates,
///     vec!["AAPL".to_string(), "MSFT".to_string()],
///     array![[0.01, -0.02], [0.005, 0.01]],
/// ).unwrap();
///
/// assert_eq!(panel.n_periods(), 2);
/// assert_eq!(panel.n_columns(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    dates: Vec<Date>,
    columns: Vec<AssetId>,
    values: Array2<f64>,
}

impl Panel {
    /// Creates a new panel, validating its invariants.
    ///
    /// # Errors
    ///
    /// Returns [`CadizError::Validation`] if dates are not strictly
    /// increasing, column identifiers are not unique, or the value matrix
    /// shape does not match the index lengths.
    pub fn new(dates: Vec<Date>, columns: Vec<AssetId>, values: Array2<f64>) -> Result<Self> {
        if values.nrows() != dates.len() {
            return Err(CadizError::DimensionMismatch {
                expected: dates.len(),
                actual: values.nrows(),
            });
        }
        if values.ncols() != columns.len() {
            return Err(CadizError::DimensionMismatch {
                expected: columns.len(),
                actual: values.ncols(),
            });
        }
        if dates.windows(2).any(|w| w[0] >= w[1]) {
            return Err(CadizError::Validation(
                "panel dates must be strictly increasing".to_string(),
            ));
        }
        for (i, name) in columns.iter().enumerate() {
            if columns[..i].contains(name) {
                return Err(CadizError::Validation(format!(
                    "duplicate column identifier: {name}"
                )));
            }
        }
        Ok(Self {
            dates,
            columns,
            values,
        })
    }

    /// Returns the date index.
    pub fn dates(&self) -> &[Date] {
        &self.dates
    }

    /// Returns the column identifiers.
    pub fn columns(&self) -> &[AssetId] {
        &self.columns
    }

    /// Returns the underlying value matrix (dates x columns).
    pub const fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Number of time periods (rows).
    pub const fn n_periods(&self) -> usize {
        self.dates.len()
    }

    /// Number of columns.
    pub const fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Returns whether the panel has no rows or no columns.
    pub const fn is_empty(&self) -> bool {
        self.dates.is_empty() || self.columns.is_empty()
    }

    /// Finds the positional index of a column identifier.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Returns a view of a single column's time series, if present.
    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.column_index(name).map(|i| self.values.column(i))
    }

    /// Returns a view of the cross-section at row `i`.
    pub fn row(&self, i: usize) -> ArrayView1<'_, f64> {
        self.values.row(i)
    }

    /// Counts rows in which every column has a finite value.
    pub fn complete_rows(&self) -> usize {
        (0..self.n_periods())
            .filter(|&i| self.values.row(i).iter().all(|v| v.is_finite()))
            .count()
    }

    /// Extracts a sub-panel by row and column positions.
    ///
    /// Positions must be valid and row positions must be increasing so the
    /// date invariant is preserved.
    fn select(&self, row_idx: &[usize], col_idx: &[usize]) -> Self {
        let dates = row_idx.iter().map(|&i| self.dates[i]).collect();
        let columns = col_idx.iter().map(|&j| self.columns[j].clone()).collect();
        let mut values = Array2::zeros((row_idx.len(), col_idx.len()));
        for (r, &i) in row_idx.iter().enumerate() {
            for (c, &j) in col_idx.iter().enumerate() {
                values[[r, c]] = self.values[[i, j]];
            }
        }
        Self {
            dates,
            columns,
            values,
        }
    }

    /// Aligns two panels on their common dates and common columns.
    ///
    /// Column order follows `self`. Dates and identifiers found in only
    /// one panel are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`CadizError::Validation`] if the panels share no dates or
    /// no columns — no meaningful joint computation can proceed.
    pub fn align(&self, other: &Self) -> Result<(Self, Self)> {
        let (self_rows, other_rows) = common_date_positions(&self.dates, &other.dates);
        if self_rows.is_empty() {
            return Err(CadizError::Validation(
                "panels share no common dates".to_string(),
            ));
        }

        let mut self_cols = Vec::new();
        let mut other_cols = Vec::new();
        for (j, name) in self.columns.iter().enumerate() {
            if let Some(k) = other.column_index(name) {
                self_cols.push(j);
                other_cols.push(k);
            }
        }
        if self_cols.is_empty() {
            return Err(CadizError::Validation(
                "panels share no common identifiers".to_string(),
            ));
        }

        Ok((
            self.select(&self_rows, &self_cols),
            other.select(&other_rows, &other_cols),
        ))
    }

    /// Aligns two panels on their common dates only, keeping each panel's
    /// own columns.
    ///
    /// Used when the panels are keyed by different identifier sets, e.g.
    /// factor return streams against asset returns.
    ///
    /// # Errors
    ///
    /// Returns [`CadizError::Validation`] if the panels share no dates.
    pub fn align_dates(&self, other: &Self) -> Result<(Self, Self)> {
        let (self_rows, other_rows) = common_date_positions(&self.dates, &other.dates);
        if self_rows.is_empty() {
            return Err(CadizError::Validation(
                "panels share no common dates".to_string(),
            ));
        }
        let self_cols: Vec<usize> = (0..self.n_columns()).collect();
        let other_cols: Vec<usize> = (0..other.n_columns()).collect();
        Ok((
            self.select(&self_rows, &self_cols),
            other.select(&other_rows, &other_cols),
        ))
    }

    /// Restricts the panel to the given dates and columns, in the order
    /// given, dropping entries the panel does not contain.
    ///
    /// # Errors
    ///
    /// Returns [`CadizError::Validation`] if no requested date or no
    /// requested column is present.
    pub fn restrict(&self, dates: &[Date], columns: &[AssetId]) -> Result<Self> {
        let row_idx: Vec<usize> = self
            .dates
            .iter()
            .enumerate()
            .filter(|(_, d)| dates.contains(d))
            .map(|(i, _)| i)
            .collect();
        if row_idx.is_empty() {
            return Err(CadizError::Validation(
                "panel contains none of the requested dates".to_string(),
            ));
        }
        let col_idx: Vec<usize> = columns
            .iter()
            .filter_map(|name| self.column_index(name))
            .collect();
        if col_idx.is_empty() {
            return Err(CadizError::Validation(
                "panel contains none of the requested identifiers".to_string(),
            ));
        }
        Ok(self.select(&row_idx, &col_idx))
    }

    /// Returns a panel of forward values: row `t` holds the value observed
    /// at `t + horizon`, with the trailing `horizon` rows set to `NaN`.
    ///
    /// Applied to a return panel this produces forward returns, the
    /// quantity a factor snapshot at `t` is asked to predict.
    pub fn forward(&self, horizon: usize) -> Self {
        let n = self.n_periods();
        let mut values = Array2::from_elem((n, self.n_columns()), f64::NAN);
        for t in 0..n.saturating_sub(horizon) {
            for j in 0..self.n_columns() {
                values[[t, j]] = self.values[[t + horizon, j]];
            }
        }
        Self {
            dates: self.dates.clone(),
            columns: self.columns.clone(),
            values,
        }
    }
}

/// Positions of the common dates in two sorted date indexes.
fn common_date_positions(a: &[Date], b: &[Date]) -> (Vec<usize>, Vec<usize>) {
    let mut a_pos = Vec::new();
    let mut b_pos = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                a_pos.push(i);
                b_pos.push(j);
                i += 1;
                j += 1;
            }
        }
    }
    (a_pos, b_pos)
}

/// A single time-indexed return series.
///
/// Produced by backtests and portfolio construction; immutable after
/// construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    dates: Vec<Date>,
    values: Vec<f64>,
}

impl ReturnSeries {
    /// Creates a new return series.
    ///
    /// # Errors
    ///
    /// Returns [`CadizError::Validation`] if dates are not strictly
    /// increasing or lengths differ.
    pub fn new(dates: Vec<Date>, values: Vec<f64>) -> Result<Self> {
        if dates.len() != values.len() {
            return Err(CadizError::DimensionMismatch {
                expected: dates.len(),
                actual: values.len(),
            });
        }
        if dates.windows(2).any(|w| w[0] >= w[1]) {
            return Err(CadizError::Validation(
                "series dates must be strictly increasing".to_string(),
            ));
        }
        Ok(Self { dates, values })
    }

    /// Returns the date index.
    pub fn dates(&self) -> &[Date] {
        &self.dates
    }

    /// Returns the per-period returns.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of periods.
    pub const fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns whether the series is empty.
    pub const fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Derives the compounded cumulative return series.
    ///
    /// Non-finite periods contribute zero growth rather than poisoning the
    /// rest of the series.
    pub fn cumulative(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.values.len());
        let mut cum = 0.0;
        for &r in &self.values {
            let r = if r.is_finite() { r } else { 0.0 };
            cum = (1.0 + cum) * (1.0 + r) - 1.0;
            out.push(cum);
        }
        out
    }
}

/// An ordered mapping from asset or factor identifiers to weights.
///
/// Long-only portfolio weights sum to 1.0 within floating tolerance and
/// are non-negative; factor weights may be signed and are not required to
/// sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    names: Vec<AssetId>,
    values: Vec<f64>,
}

impl Weights {
    /// Creates a weight vector.
    ///
    /// # Errors
    ///
    /// Returns [`CadizError::Validation`] if names are not unique or
    /// lengths differ.
    pub fn new(names: Vec<AssetId>, values: Vec<f64>) -> Result<Self> {
        if names.len() != values.len() {
            return Err(CadizError::DimensionMismatch {
                expected: names.len(),
                actual: values.len(),
            });
        }
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(CadizError::Validation(format!(
                    "duplicate weight identifier: {name}"
                )));
            }
        }
        Ok(Self { names, values })
    }

    /// Creates an equal-weight vector over the given identifiers.
    pub fn equal(names: Vec<AssetId>) -> Self {
        let n = names.len();
        let w = if n > 0 { 1.0 / n as f64 } else { 0.0 };
        Self {
            names,
            values: vec![w; n],
        }
    }

    /// Returns the identifiers in order.
    pub fn names(&self) -> &[AssetId] {
        &self.names
    }

    /// Returns the weight values in the same order as [`Self::names`].
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Looks up the weight for an identifier.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }

    /// Sum of all weights.
    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Number of entries.
    pub const fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns whether the vector is empty.
    pub const fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over `(identifier, weight)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&AssetId, f64)> {
        self.names.iter().zip(self.values.iter().copied())
    }
}
