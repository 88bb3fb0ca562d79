//! Row filter chain
//!
//! Three stages run in a fixed order:
//!
//! ```text
//! RawTable ──► Constant ──► Nonzero ──► Outlier ──► filtered RawTable
//!              (consensus)  (no zeros)  (|z| < 3)
//! ```
//!
//! Outlier detection must see data that is already cleaned of rows from a
//! different invocation and of failed instrumentation, so the order is not
//! configurable. A stage without a column selector passes the table through.

use crate::error::TableError;
use crate::stats::mean_std;
use crate::table::RawTable;
use log::debug;
use serde::Serialize;
use std::collections::HashMap;

/// Rows with an absolute z-score at or above this are outliers
pub const Z_SCORE_THRESHOLD: f64 = 3.0;

/// Ordered, duplicate-free list of zero-based column indices
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSelector(Vec<usize>);

impl ColumnSelector {
    pub fn new(columns: impl IntoIterator<Item = usize>) -> Self {
        let mut selected = Vec::new();
        for column in columns {
            if !selected.contains(&column) {
                selected.push(column);
            }
        }
        Self(selected)
    }

    /// `None` when no columns were given, which disables the stage
    pub fn from_args(columns: &[usize]) -> Option<Self> {
        if columns.is_empty() { None } else { Some(Self::new(columns.iter().copied())) }
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    fn check(&self, columns: usize) -> Result<(), TableError> {
        match self.0.iter().find(|c| **c >= columns) {
            Some(&column) => Err(TableError::ColumnOutOfRange { column, columns }),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterStage {
    Constant,
    Nonzero,
    Outlier,
}

impl FilterStage {
    pub fn describe(&self) -> &'static str {
        match self {
            FilterStage::Constant => "non-constant values",
            FilterStage::Nonzero => "zero values",
            FilterStage::Outlier => "outliers",
        }
    }
}

/// Row mask produced by one stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOutcome {
    pub mask: Vec<bool>,
    pub dropped: usize,
}

impl FilterOutcome {
    fn from_mask(mask: Vec<bool>) -> Self {
        let dropped = mask.iter().filter(|keep| !**keep).count();
        Self { mask, dropped }
    }
}

/// How many rows a stage removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub stage: FilterStage,
    pub dropped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSelection {
    pub stage: FilterStage,
    pub columns: Option<ColumnSelector>,
}

/// The three filter stages in execution order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterChain {
    stages: [StageSelection; 3],
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::new(None, None, None)
    }
}

impl FilterChain {
    pub fn new(
        constant: Option<ColumnSelector>,
        nonzero: Option<ColumnSelector>,
        outlier: Option<ColumnSelector>,
    ) -> Self {
        Self {
            stages: [
                StageSelection { stage: FilterStage::Constant, columns: constant },
                StageSelection { stage: FilterStage::Nonzero, columns: nonzero },
                StageSelection { stage: FilterStage::Outlier, columns: outlier },
            ],
        }
    }

    pub fn stages(&self) -> &[StageSelection] {
        &self.stages
    }

    /// Fail on the first selected column that does not exist in a table of
    /// `columns` columns
    pub fn check_columns(&self, columns: usize) -> Result<(), TableError> {
        self.enabled().try_for_each(|(_, selector)| selector.check(columns))
    }

    /// Run every enabled stage over `table`, in order
    pub fn apply(&self, table: &mut RawTable) -> Result<Vec<StageReport>, TableError> {
        self.check_columns(table.columns())?;

        let mut reports = Vec::new();
        for (stage, selector) in self.enabled() {
            let outcome = evaluate(stage, table, selector);
            table.retain_rows(&outcome.mask);
            debug!("\tFiltered {} rows containing {}", outcome.dropped, stage.describe());
            reports.push(StageReport { stage, dropped: outcome.dropped });
        }
        Ok(reports)
    }

    fn enabled(&self) -> impl Iterator<Item = (FilterStage, &ColumnSelector)> {
        self.stages.iter().filter_map(|step| step.columns.as_ref().map(|c| (step.stage, c)))
    }
}

/// Compute one stage's mask without modifying the table
pub fn evaluate(stage: FilterStage, table: &RawTable, selector: &ColumnSelector) -> FilterOutcome {
    match stage {
        FilterStage::Constant => constant_filter(table, selector),
        FilterStage::Nonzero => nonzero_filter(table, selector),
        FilterStage::Outlier => outlier_filter(table, selector),
    }
}

/// Keep the rows whose selected values equal the most frequent tuple.
///
/// Among equally frequent tuples the one seen first (lowest row index) wins.
pub fn constant_filter(table: &RawTable, selector: &ColumnSelector) -> FilterOutcome {
    let cols = selector.indices();
    let tuple = |row: &[u64]| cols.iter().map(|&c| row[c]).collect::<Vec<u64>>();

    // tuple -> (count, first row index)
    let mut counts: HashMap<Vec<u64>, (usize, usize)> = HashMap::new();
    for (index, row) in table.iter_rows().enumerate() {
        counts.entry(tuple(row)).or_insert((0, index)).0 += 1;
    }

    let mode = counts
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(values, _)| values);

    let mask = match mode {
        Some(mode) => table.iter_rows().map(|row| cols.iter().zip(&mode).all(|(&c, v)| row[c] == *v)).collect(),
        None => Vec::new(),
    };
    FilterOutcome::from_mask(mask)
}

/// Drop every row with a zero in any selected column
pub fn nonzero_filter(table: &RawTable, selector: &ColumnSelector) -> FilterOutcome {
    let cols = selector.indices();
    let mask = table.iter_rows().map(|row| cols.iter().all(|&c| row[c] != 0)).collect();
    FilterOutcome::from_mask(mask)
}

/// Drop every row whose value in any selected column has |z| >= 3
pub fn outlier_filter(table: &RawTable, selector: &ColumnSelector) -> FilterOutcome {
    let mut mask = vec![true; table.rows()];
    for &column in selector.indices() {
        let values: Vec<f64> = table.column(column).map(|v| v as f64).collect();
        for (keep, z) in mask.iter_mut().zip(z_scores(&values)) {
            if z.abs() >= Z_SCORE_THRESHOLD {
                *keep = false;
            }
        }
    }
    FilterOutcome::from_mask(mask)
}

/// Population z-scores of `values`.
///
/// A constant column has zero deviation, which makes every score NaN; those
/// are reported as 0 so such a column never marks a row as an outlier.
pub fn z_scores(values: &[f64]) -> Vec<f64> {
    let (mean, std) = mean_std(values);
    values
        .iter()
        .map(|v| (v - mean) / std)
        .map(|z| if z.is_finite() { z } else { 0.0 })
        .collect()
}

#[cfg(test)]
#[path = "filter_test.rs"]
mod filter_test;
