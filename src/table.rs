//! Raw counter tables
//!
//! A raw result file looks like this (one header, one row per execution,
//! every line terminated by the delimiter):
//!
//! ```text
//! cycles|instructions|br_misp_retired|
//! 10231|5120|3|
//! 10187|5120|2|
//! ```
//!
//! The field after the last `|` is a structural artifact and is dropped, so
//! the example above loads as a 2 × 3 table.

use crate::error::{DigestError, TableError};
use log::debug;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Field separator used by the monitor
pub const DELIMITER: u8 = b'|';

/// Row-major matrix of unsigned counter values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    columns: usize,
    values: Vec<u64>,
}

impl RawTable {
    /// Build a table from explicit rows; all rows must have the same width
    #[cfg(test)]
    pub fn from_rows(rows: Vec<Vec<u64>>) -> Result<Self, TableError> {
        let columns = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut values = Vec::with_capacity(rows.len() * columns);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != columns {
                return Err(TableError::RaggedRow { line: i as u64 + 1, expected: columns, found: row.len() });
            }
            values.extend(row);
        }
        Ok(Self { columns, values })
    }

    /// Parse a raw result file body
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TableError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(DELIMITER)
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut columns: Option<usize> = None;
        let mut values = Vec::new();

        for result in csv_reader.records() {
            let record = result.map_err(|e| TableError::Parse {
                line: e.position().map(|p| p.line()).unwrap_or(0),
                message: e.to_string(),
            })?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            if record.len() == 1 && record[0].is_empty() {
                continue;
            }

            // Last field is the artifact left by the trailing delimiter
            let width = record.len() - 1;
            if width == 0 {
                return Err(TableError::Parse { line, message: "row has no counter fields".to_string() });
            }

            match columns {
                None => columns = Some(width),
                Some(expected) if expected != width => {
                    return Err(TableError::RaggedRow { line, expected, found: width });
                }
                Some(_) => {}
            }

            for field in record.iter().take(width) {
                let value = field.parse::<u64>().map_err(|_| TableError::Parse {
                    line,
                    message: format!("'{}' is not an unsigned integer", field),
                })?;
                values.push(value);
            }
        }

        match columns {
            Some(columns) => Ok(Self { columns, values }),
            None => Err(TableError::NoRows),
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        if self.columns == 0 { 0 } else { self.values.len() / self.columns }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[cfg(test)]
    pub fn row(&self, index: usize) -> &[u64] {
        let start = index * self.columns;
        &self.values[start..start + self.columns]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[u64]> {
        self.values.chunks_exact(self.columns.max(1))
    }

    /// Values of one column, top to bottom
    pub fn column(&self, column: usize) -> impl Iterator<Item = u64> + '_ {
        self.iter_rows().map(move |row| row[column])
    }

    /// Keep only the rows whose mask entry is `true`; returns the number dropped
    pub fn retain_rows(&mut self, mask: &[bool]) -> usize {
        debug_assert_eq!(mask.len(), self.rows());
        let columns = self.columns;
        let mut kept = Vec::with_capacity(self.values.len());
        for (row, keep) in self.values.chunks_exact(columns.max(1)).zip(mask) {
            if *keep {
                kept.extend_from_slice(row);
            }
        }
        let dropped = mask.iter().filter(|keep| !**keep).count();
        self.values = kept;
        dropped
    }
}

/// Load a raw result file from disk
pub fn load_table(path: &Path) -> Result<RawTable, DigestError> {
    let file = File::open(path).map_err(|e| DigestError::io(path, e))?;
    let table = RawTable::from_reader(BufReader::new(file)).map_err(|e| DigestError::table(path, e))?;
    debug!("Loaded {} rows x {} columns from {}", table.rows(), table.columns(), path.display());
    Ok(table)
}
