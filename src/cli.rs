use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "counter-digest")]
#[command(about = "Filter repeated performance-counter runs and summarize them into a report")]
#[command(version)]
pub struct CliArgs {
    /// Print debug output (rows dropped per filter stage, files considered)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Summarize every result file of a results directory into final_results.txt
    Process(ProcessArgs),

    /// Run the monitor over every test executable of a project, producing result files
    Collect(CollectArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ProcessArgs {
    /// Result directory to process
    #[arg(long, short = 'l', value_name = "DIR")]
    pub location: PathBuf,

    /// Path to the template file
    /// Default: $COUNTER_DIGEST_HOME/scripts/templates/final_results.txt.in,
    /// or scripts/templates/final_results.txt.in when the variable is unset
    #[arg(long, short = 't', value_name = "PATH")]
    pub template: Option<PathBuf>,

    /// Columns expected to hold a constant value; rows not matching the most
    /// frequent combination are discarded
    #[arg(long = "constant-cols", short = 'c', value_name = "COL", num_args = 1..)]
    pub constant_cols: Vec<usize>,

    /// Columns in which a zero marks the whole row as invalid
    #[arg(long = "nonzero-cols", short = 'n', value_name = "COL", num_args = 1..)]
    pub nonzero_cols: Vec<usize>,

    /// Columns in which outliers (|z| >= 3) are removed
    #[arg(long = "outlier-cols", short = 'o', value_name = "COL", num_args = 1..)]
    pub outlier_cols: Vec<usize>,

    /// Warn about unreadable or fully filtered files and keep going instead of aborting
    #[arg(long)]
    pub skip_invalid: bool,

    /// Number of worker threads used to digest files (report order is unaffected)
    #[arg(long, short = 'j', default_value = "1")]
    pub jobs: usize,

    /// Also write the per-file statistics as JSON
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct CollectArgs {
    /// Project directory containing tests/ and receiving results/
    #[arg(value_name = "PROJECT")]
    pub project: PathBuf,

    /// Number of repetitions per executable
    #[arg(long, short = 'r', default_value = "10000")]
    pub repeat: u64,

    /// Delete every file of the results folder before collecting
    #[arg(long, short = 'c')]
    pub cleanup: bool,

    /// Monitor binary to invoke (default: PROJECT/speculator_mon)
    #[arg(long, value_name = "PATH")]
    pub monitor: Option<PathBuf>,
}

impl CliArgs {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        CliArgs::parse()
    }

    /// Validate argument combinations
    pub fn validate(&self) -> Result<(), String> {
        match &self.command {
            Command::Process(args) => {
                if args.jobs == 0 {
                    return Err("--jobs must be at least 1".to_string());
                }
                if let Some(json) = &args.json
                    && json.file_name().is_some_and(|n| n == crate::report::REPORT_FILE_NAME)
                {
                    return Err(format!("--json cannot overwrite the report ({})", json.display()));
                }
            }
            Command::Collect(args) => {
                if args.repeat == 0 {
                    return Err("--repeat must be at least 1".to_string());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(argv).expect("Arguments should parse")
    }

    #[test]
    fn test_process_column_lists() {
        let args = parse(&["counter-digest", "process", "-l", "results", "-c", "0", "1", "-o", "4", "-v"]);
        assert!(args.verbose);
        let Command::Process(p) = args.command else { panic!("expected process") };
        assert_eq!(p.location, PathBuf::from("results"));
        assert_eq!(p.constant_cols, vec![0, 1]);
        assert!(p.nonzero_cols.is_empty());
        assert_eq!(p.outlier_cols, vec![4]);
        assert_eq!(p.jobs, 1);
    }

    #[test]
    fn test_process_requires_location() {
        assert!(CliArgs::try_parse_from(["counter-digest", "process"]).is_err());
    }

    #[test]
    fn test_negative_column_is_rejected() {
        assert!(CliArgs::try_parse_from(["counter-digest", "process", "-l", "r", "-n", "-1"]).is_err());
    }

    #[test]
    fn test_validate_zero_jobs_fails() {
        let args = parse(&["counter-digest", "process", "-l", "r", "--jobs", "0"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validate_json_cannot_replace_report() {
        let args = parse(&["counter-digest", "process", "-l", "r", "--json", "r/final_results.txt"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_collect_defaults() {
        let args = parse(&["counter-digest", "collect", "proj"]);
        assert!(args.validate().is_ok());
        let Command::Collect(c) = args.command else { panic!("expected collect") };
        assert_eq!(c.repeat, 10000);
        assert!(!c.cleanup);
        assert!(c.monitor.is_none());
    }
}
