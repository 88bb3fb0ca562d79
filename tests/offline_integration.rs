/// Offline integration tests for counter-digest
///
/// These tests copy the result fixtures in test-data/ into a temporary
/// directory and run the built binary over them.
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const EXPECTED_REPORT: &str = "\
cond_cached
    instructions: 5120.0 (std 0.0)
    cycles:       10200.0 (std 10.0)
    mispredicts:  3.0 (std 0.0)

cond_uncached
    instructions: 5120.0 (std 0.0)
    cycles:       20000.0 (std 7.0710678118654755)
    mispredicts:  5.0 (std 0.0)

";

// Helper to get the repository root
fn repo_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

fn default_template() -> PathBuf {
    repo_dir().join("scripts/templates/final_results.txt.in")
}

// Copy the fixture results into a fresh directory
fn results_copy() -> TempDir {
    let temp = TempDir::new().unwrap();
    for entry in fs::read_dir(repo_dir().join("test-data/results")).unwrap() {
        let entry = entry.unwrap();
        fs::copy(entry.path(), temp.path().join(entry.file_name())).unwrap();
    }
    temp
}

// Helper to run the binary with the given arguments
fn run_digest(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_counter-digest"))
        .args(args)
        .current_dir(cwd)
        .env_remove("COUNTER_DIGEST_HOME")
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run counter-digest {}: {}", args.join(" "), e))
}

fn process_fixtures(results: &Path, extra: &[&str]) -> Output {
    let location = results.to_str().unwrap();
    let template = default_template();
    let mut args = vec!["process", "-l", location, "-t", template.to_str().unwrap(), "-c", "0", "-n", "2", "-o", "1"];
    args.extend_from_slice(extra);
    run_digest(&args, &repo_dir())
}

// Helper to assert the command succeeded
fn assert_success(output: &Output, context: &str) {
    assert!(
        output.status.success(),
        "{} failed with status: {:?}\nstderr: {}",
        context,
        output.status.code(),
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn test_fixtures_exist() {
    assert!(repo_dir().join("test-data/results/cond_cached").exists());
    assert!(repo_dir().join("test-data/results/cond_uncached").exists());
    assert!(default_template().exists());
}

#[test]
fn test_process_writes_expected_report() {
    let results = results_copy();

    let output = process_fixtures(results.path(), &[]);

    assert_success(&output, "process");
    let report = fs::read_to_string(results.path().join("final_results.txt")).unwrap();
    assert_eq!(report, EXPECTED_REPORT);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Processed: 2"), "stdout: {}", stdout);
}

#[test]
fn test_process_is_idempotent() {
    let results = results_copy();

    assert_success(&process_fixtures(results.path(), &[]), "first run");
    let first = fs::read(results.path().join("final_results.txt")).unwrap();
    assert_success(&process_fixtures(results.path(), &["--jobs", "2"]), "second run");
    let second = fs::read(results.path().join("final_results.txt")).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_verbose_reports_dropped_rows() {
    let results = results_copy();

    let output = process_fixtures(results.path(), &["-v"]);

    assert_success(&output, "verbose process");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Filtered 2 rows containing non-constant values"), "stderr: {}", stderr);
    assert!(stderr.contains("Filtered 1 rows containing zero values"), "stderr: {}", stderr);
    assert!(stderr.contains("Filtered 1 rows containing outliers"), "stderr: {}", stderr);
}

#[test]
fn test_default_template_comes_from_home_variable() {
    let results = results_copy();
    let location = results.path().to_str().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_counter-digest"))
        .args(["process", "-l", location, "-c", "0", "-n", "2", "-o", "1"])
        .current_dir(results.path())
        .env("COUNTER_DIGEST_HOME", repo_dir())
        .output()
        .unwrap();

    assert_success(&output, "process with default template");
    assert_eq!(fs::read_to_string(results.path().join("final_results.txt")).unwrap(), EXPECTED_REPORT);
}

#[test]
fn test_out_of_range_column_fails() {
    let results = results_copy();
    let location = results.path().to_str().unwrap();
    let template = default_template();

    let output = run_digest(&["process", "-l", location, "-t", template.to_str().unwrap(), "-o", "7"], &repo_dir());

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("column 7") && stderr.contains("cond_cached"), "stderr: {}", stderr);
}

#[test]
fn test_missing_template_fails_without_report() {
    let results = results_copy();
    let location = results.path().to_str().unwrap();

    let output = run_digest(&["process", "-l", location, "-t", "/nonexistent/template.in"], &repo_dir());

    assert_eq!(output.status.code(), Some(1));
    assert!(!results.path().join("final_results.txt").exists());
}

#[test]
fn test_bad_file_aborts_unless_skipped() {
    let results = results_copy();
    fs::write(results.path().join("broken"), "a|b|\n1|oops|\n").unwrap();

    let output = process_fixtures(results.path(), &[]);
    assert_eq!(output.status.code(), Some(1));

    let output = process_fixtures(results.path(), &["--skip-invalid"]);
    assert_success(&output, "process with --skip-invalid");
    let report = fs::read_to_string(results.path().join("final_results.txt")).unwrap();
    assert_eq!(report, EXPECTED_REPORT);
    assert!(String::from_utf8_lossy(&output.stdout).contains("Skipped:   1"));
}
