/// Configuration resolution module
///
/// This module handles:
/// - Building a DigestConfig from `process` arguments
/// - Resolving the default template location
/// - Building a CollectPlan from `collect` arguments
use crate::cli::{CollectArgs, ProcessArgs};
use crate::error::DigestError;
use crate::filter::{ColumnSelector, FilterChain};
use crate::report::REPORT_FILE_NAME;
use log::debug;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Environment variable pointing at the installation holding the default template
pub const HOME_ENV: &str = "COUNTER_DIGEST_HOME";

/// Template location relative to the installation (or working) directory
pub const DEFAULT_TEMPLATE: &str = "scripts/templates/final_results.txt.in";

/// Fully resolved settings for one `process` run
#[derive(Debug, Clone)]
pub struct DigestConfig {
    pub location: PathBuf,
    pub template: PathBuf,
    pub report: PathBuf,
    pub chain: FilterChain,
    pub skip_invalid: bool,
    pub jobs: usize,
    pub json: Option<PathBuf>,
    pub verbose: bool,
}

impl DigestConfig {
    /// Paths under the results location that are outputs, not inputs
    pub fn excluded_paths(&self) -> Vec<PathBuf> {
        let mut excluded = vec![self.report.clone()];
        excluded.extend(self.json.clone());
        excluded
    }
}

/// Fully resolved settings for one `collect` run
#[derive(Debug, Clone)]
pub struct CollectPlan {
    pub tests_dir: PathBuf,
    pub results_dir: PathBuf,
    pub monitor: PathBuf,
    pub repeat: u64,
    pub cleanup: bool,
}

/// Build a DigestConfig from CLI arguments
///
/// The results location must exist; the template is only checked when the
/// run opens it.
pub fn build_digest_config(args: &ProcessArgs, verbose: bool) -> Result<DigestConfig, DigestError> {
    if !args.location.is_dir() {
        return Err(DigestError::Config(format!(
            "Result location {} is not a directory",
            args.location.display()
        )));
    }

    let template = resolve_template_path(args.template.as_deref(), env::var_os(HOME_ENV));
    debug!("Using template {:?}", template);

    let chain = FilterChain::new(
        ColumnSelector::from_args(&args.constant_cols),
        ColumnSelector::from_args(&args.nonzero_cols),
        ColumnSelector::from_args(&args.outlier_cols),
    );
    for step in chain.stages() {
        debug!("{:?} filter columns: {:?}", step.stage, step.columns.as_ref().map(|c| c.indices()));
    }

    Ok(DigestConfig {
        report: args.location.join(REPORT_FILE_NAME),
        location: args.location.clone(),
        template,
        chain,
        skip_invalid: args.skip_invalid,
        jobs: args.jobs,
        json: args.json.clone(),
        verbose,
    })
}

/// Explicit template path, else `$COUNTER_DIGEST_HOME/<default>`, else the
/// default relative to the working directory
pub fn resolve_template_path(explicit: Option<&Path>, home: Option<OsString>) -> PathBuf {
    match (explicit, home) {
        (Some(path), _) => path.to_path_buf(),
        (None, Some(home)) if !home.is_empty() => PathBuf::from(home).join(DEFAULT_TEMPLATE),
        _ => PathBuf::from(DEFAULT_TEMPLATE),
    }
}

/// Build a CollectPlan from CLI arguments
pub fn build_collect_plan(args: &CollectArgs) -> Result<CollectPlan, DigestError> {
    let tests_dir = args.project.join("tests");
    if !tests_dir.is_dir() {
        return Err(DigestError::Config(format!("No tests directory at {}", tests_dir.display())));
    }

    let monitor = args.monitor.clone().unwrap_or_else(|| args.project.join("speculator_mon"));
    debug!("Collecting with monitor {:?}, {} repetitions", monitor, args.repeat);

    Ok(CollectPlan {
        tests_dir,
        results_dir: args.project.join("results"),
        monitor,
        repeat: args.repeat,
        cleanup: args.cleanup,
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
