//! Per-column mean and population standard deviation

use crate::error::TableError;
use crate::table::RawTable;
use serde::Serialize;

/// Mean and standard deviation of every column of a filtered table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

impl SummaryStats {
    /// Number of columns summarized
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }
}

/// Mean and population standard deviation (divides by N).
///
/// Both are NaN for an empty slice; callers that can see an empty table must
/// check first.
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Reduce `table` to per-column statistics.
///
/// An empty table is an error rather than a vector of NaNs.
pub fn summarize(table: &RawTable) -> Result<SummaryStats, TableError> {
    if table.is_empty() {
        return Err(TableError::Empty);
    }

    let (mean, std): (Vec<f64>, Vec<f64>) = (0..table.columns()).map(|c| column_mean_std(table, c)).unzip();

    Ok(SummaryStats { mean, std })
}

/// Mean and population standard deviation of one counter column.
///
/// The sum is exact in `u128`. The variance is taken over deviations from the
/// first value, so a column that never varies has a deviation of exactly 0
/// whatever its magnitude.
fn column_mean_std(table: &RawTable, column: usize) -> (f64, f64) {
    let n = table.rows() as f64;
    let sum: u128 = table.column(column).map(u128::from).sum();
    let mean = sum as f64 / n;

    let first = table.column(column).next().map_or(0, i128::from);
    let shifted: Vec<f64> = table.column(column).map(|v| (i128::from(v) - first) as f64).collect();
    let (_, std) = mean_std(&shifted);
    (mean, std)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_row_has_zero_deviation() {
        let table = RawTable::from_rows(vec![vec![7, 0, 123456]]).unwrap();
        let stats = summarize(&table).unwrap();
        assert_eq!(stats.mean, vec![7.0, 0.0, 123456.0]);
        assert_eq!(stats.std, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_population_deviation_divides_by_n() {
        let table = RawTable::from_rows(vec![vec![2], vec![4], vec![4], vec![4], vec![5], vec![5], vec![7], vec![9]])
            .unwrap();
        let stats = summarize(&table).unwrap();
        assert_eq!(stats.mean, vec![5.0]);
        assert_eq!(stats.std, vec![2.0]);
    }

    #[test]
    fn test_columns_are_independent() {
        let table = RawTable::from_rows(vec![vec![1, 10], vec![3, 10]]).unwrap();
        let stats = summarize(&table).unwrap();
        assert_eq!(stats.mean, vec![2.0, 10.0]);
        assert_eq!(stats.std, vec![1.0, 0.0]);
        assert_eq!(stats.len(), 2);
    }

    #[test]
    fn test_empty_table_is_an_error() {
        let mut table = RawTable::from_rows(vec![vec![1, 2]]).unwrap();
        table.retain_rows(&[false]);
        assert!(matches!(summarize(&table), Err(TableError::Empty)));
    }

    #[test]
    fn test_large_constant_column_has_zero_deviation() {
        let table = RawTable::from_rows(vec![vec![1_000_000_000_001, u64::MAX]; 10_000]).unwrap();
        let stats = summarize(&table).unwrap();
        assert_eq!(stats.mean[0], 1_000_000_000_001.0);
        assert_eq!(stats.std, vec![0.0, 0.0]);
    }

    #[test]
    fn test_large_counters_keep_small_spread() {
        let base = 1u64 << 60;
        let table = RawTable::from_rows(vec![vec![base + 1], vec![base + 3]]).unwrap();
        let stats = summarize(&table).unwrap();
        assert_eq!(stats.std, vec![1.0]);
    }

    #[test]
    fn test_mean_std_of_empty_slice_is_nan() {
        let (mean, std) = mean_std(&[]);
        assert!(mean.is_nan());
        assert!(std.is_nan());
    }
}
