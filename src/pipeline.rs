//! Per-file digest pipeline
//!
//! ```text
//!   results dir ──► discover ──► load ──► filter chain ──► summarize ──► render
//!                   (sorted)     table                                  (append to report)
//! ```
//!
//! Files are digested independently. With more than one job the digests are
//! computed on scoped threads, but they are always appended to the report in
//! discovery order, so the output does not depend on `jobs`.

use crate::config::DigestConfig;
use crate::error::DigestError;
use crate::filter::{FilterChain, StageReport};
use crate::report::{REPORT_FILE_NAME, Report};
use crate::stats::{SummaryStats, summarize};
use crate::table::load_table;
use crate::template::{SubstitutionMapping, Template};
use crate::ui;
use log::debug;
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Everything learned about one result file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileDigest {
    pub file: String,
    pub path: PathBuf,
    pub rows_loaded: usize,
    pub rows_kept: usize,
    pub stages: Vec<StageReport>,
    pub stats: SummaryStats,
}

/// Outcome of a whole `process` run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub processed: usize,
    pub skipped: Vec<PathBuf>,
    pub digests: Vec<FileDigest>,
}

/// Load, filter and summarize a single result file
pub fn digest_file(path: &Path, chain: &FilterChain) -> Result<FileDigest, DigestError> {
    let mut table = load_table(path)?;
    let rows_loaded = table.rows();

    let stages = chain.apply(&mut table).map_err(|e| DigestError::table(path, e))?;
    let stats = summarize(&table).map_err(|e| DigestError::table(path, e))?;

    Ok(FileDigest {
        file: display_name(path),
        path: path.to_path_buf(),
        rows_loaded,
        rows_kept: table.rows(),
        stages,
        stats,
    })
}

/// Name bound to `$filename`: the file's base name
fn display_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| path.display().to_string())
}

/// Every result file under `root`.
///
/// Each directory contributes its files in sorted order first, then its
/// subdirectories, also sorted. Report files and `excluded` paths are skipped.
pub fn discover_result_files(root: &Path, excluded: &[PathBuf]) -> io::Result<Vec<PathBuf>> {
    let excluded: Vec<PathBuf> = excluded.iter().map(|p| fs::canonicalize(p).unwrap_or_else(|_| p.clone())).collect();
    let mut found = Vec::new();
    walk(root, &excluded, &mut found)?;
    Ok(found)
}

fn walk(dir: &Path, excluded: &[PathBuf], found: &mut Vec<PathBuf>) -> io::Result<()> {
    let mut entries: Vec<_> = fs::read_dir(dir)?.collect::<Result<_, _>>()?;
    entries.sort_by_key(|e| e.file_name());

    let mut subdirs = Vec::new();
    for entry in entries {
        let path = entry.path();
        // Symlinked directories are not descended into
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            subdirs.push(path);
            continue;
        }
        if file_type.is_symlink() && path.is_dir() {
            debug!("Not following directory link {:?}", path);
            continue;
        }
        if entry.file_name() == REPORT_FILE_NAME {
            continue;
        }
        let canonical = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
        if excluded.contains(&canonical) {
            debug!("Skipping output file {:?}", path);
            continue;
        }
        found.push(path);
    }

    for subdir in subdirs {
        walk(&subdir, excluded, found)?;
    }
    Ok(())
}

/// Digest `files` on up to `jobs` threads; results keep the order of `files`
pub fn digest_all(files: &[PathBuf], chain: &FilterChain, jobs: usize) -> Vec<Result<FileDigest, DigestError>> {
    if jobs <= 1 || files.len() <= 1 {
        return files.iter().map(|f| digest_file(f, chain)).collect();
    }

    let chunk_size = files.len().div_ceil(jobs);
    std::thread::scope(|scope| {
        let handles: Vec<_> = files
            .chunks(chunk_size)
            .map(|chunk| scope.spawn(move || chunk.iter().map(|f| digest_file(f, chain)).collect::<Vec<_>>()))
            .collect();

        handles
            .into_iter()
            .flat_map(|handle| match handle.join() {
                Ok(results) => results,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    })
}

/// Run the whole `process` pipeline described by `config`
pub fn run(config: &DigestConfig) -> Result<RunSummary, DigestError> {
    // Both resources are acquired before any result file is touched
    let template = Template::load(&config.template)?;
    let mut report = Report::create(&config.report)?;

    let files =
        discover_result_files(&config.location, &config.excluded_paths()).map_err(|e| DigestError::io(&config.location, e))?;
    debug!("Found {} result files under {:?}", files.len(), config.location);

    let mut summary = RunSummary::default();
    let total = files.len();

    // Sequential runs digest lazily so that a fatal error stops further work
    let results: Box<dyn Iterator<Item = Result<FileDigest, DigestError>> + '_> = if config.jobs > 1 {
        Box::new(digest_all(&files, &config.chain, config.jobs).into_iter())
    } else {
        Box::new(files.iter().map(|f| {
            debug!("Considering {}", display_name(f));
            digest_file(f, &config.chain)
        }))
    };

    for (index, (path, result)) in files.iter().zip(results).enumerate() {
        let digest = match result {
            Ok(digest) => digest,
            Err(e) if config.skip_invalid && e.is_skippable() => {
                ui::print_warning(&format!("skipping {}", e));
                summary.skipped.push(path.clone());
                continue;
            }
            Err(e) => {
                // Keep the blocks rendered so far
                report.finish()?;
                return Err(e);
            }
        };

        if !config.verbose {
            ui::status(&format!("[{}/{}] {}", index + 1, total, digest.file));
        }
        report.append(&template, &SubstitutionMapping::for_file(&digest.file, &digest.stats))?;
        summary.processed += 1;
        summary.digests.push(digest);
    }

    debug!("Wrote {} blocks to {:?}", report.blocks(), config.report);
    report.finish()?;

    if let Some(json_path) = &config.json {
        export_json(&summary.digests, json_path)?;
    }

    Ok(summary)
}

/// Write all digests as pretty-printed JSON
pub fn export_json(digests: &[FileDigest], path: &Path) -> Result<(), DigestError> {
    let file = fs::File::create(path).map_err(|e| DigestError::io(path, e))?;
    let mut writer = io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, digests)?;
    writer.write_all(b"\n").map_err(|e| DigestError::io(path, e))?;
    writer.flush().map_err(|e| DigestError::io(path, e))?;
    debug!("JSON digest saved to {:?}", path);
    Ok(())
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod pipeline_test;
