//! Cumulative report output.
//!
//! The report is opened once per run (truncated), held under an exclusive
//! lock and appended to one block per result file, in processing order.

use crate::error::DigestError;
use crate::template::{SubstitutionMapping, Template};
use fs2::FileExt;
use log::debug;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Name of the report written into the results location
pub const REPORT_FILE_NAME: &str = "final_results.txt";

/// Append-only sink for rendered template blocks
pub struct Report<W: Write> {
    writer: W,
    path: PathBuf,
    blocks: usize,
}

impl Report<BufWriter<File>> {
    /// Create (or truncate) the report file and lock it for this run
    pub fn create(path: &Path) -> Result<Self, DigestError> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| DigestError::resource(path, e))?;

        // Released when the file is dropped
        file.try_lock_exclusive().map_err(|e| DigestError::resource(path, e))?;
        debug!("Opened report {:?}", path);

        Ok(Self::new(BufWriter::new(file), path))
    }
}

impl<W: Write> Report<W> {
    pub fn new(writer: W, path: impl Into<PathBuf>) -> Self {
        Self { writer, path: path.into(), blocks: 0 }
    }

    /// Render `template` with `mapping` and append the block
    pub fn append(&mut self, template: &Template, mapping: &SubstitutionMapping) -> Result<(), DigestError> {
        for line in template.render(mapping) {
            self.writer.write_all(line.as_bytes()).map_err(|e| DigestError::io(&self.path, e))?;
        }
        self.blocks += 1;
        Ok(())
    }

    /// Number of blocks appended so far
    pub fn blocks(&self) -> usize {
        self.blocks
    }

    /// Flush and hand back the underlying writer
    pub fn finish(mut self) -> Result<W, DigestError> {
        self.writer.flush().map_err(|e| DigestError::io(&self.path, e))?;
        Ok(self.writer)
    }
}
