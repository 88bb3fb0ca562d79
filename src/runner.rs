use crate::config::CollectPlan;
use crate::error::DigestError;
use crate::ui;
use log::debug;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

/// One monitor invocation: which executable, and where its results go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectTask {
    pub executable: PathBuf,
    pub output: PathBuf,
}

/// Result of one finished task
#[derive(Debug, Clone)]
pub struct TaskResult {
    pub task: CollectTask,
    pub status: ExitStatus,
}

/// Run the monitor over every test executable, strictly one after another.
///
/// The callback is invoked for each finished task.
pub fn run_collect<F>(plan: &CollectPlan, mut on_result: F) -> Result<Vec<TaskResult>, DigestError>
where
    F: FnMut(usize, &TaskResult),
{
    if plan.cleanup && plan.results_dir.is_dir() {
        ui::status("Cleaning up results folder as requested");
        clean_results(&plan.results_dir).map_err(|e| DigestError::io(&plan.results_dir, e))?;
    }
    fs::create_dir_all(&plan.results_dir).map_err(|e| DigestError::io(&plan.results_dir, e))?;

    let executables = find_executables(&plan.tests_dir).map_err(|e| DigestError::io(&plan.tests_dir, e))?;
    let tasks = plan_tasks(&executables, &plan.results_dir);
    debug!("Planned {} monitor runs", tasks.len());

    let mut results = Vec::with_capacity(tasks.len());
    for (index, task) in tasks.into_iter().enumerate() {
        let status = run_monitor(plan, &task)?;
        if !status.success() {
            ui::print_warning(&format!("{} exited with {} for {}", plan.monitor.display(), status, task.executable.display()));
        }
        let result = TaskResult { task, status };
        on_result(index + 1, &result);
        results.push(result);
    }

    Ok(results)
}

/// Assign an output path to every executable.
///
/// The output is named after the executable; if that name is taken (on disk
/// or earlier in this plan) `_0`, `_1`, ... is appended until it is free.
pub fn plan_tasks(executables: &[PathBuf], results_dir: &Path) -> Vec<CollectTask> {
    let mut taken: HashSet<PathBuf> = HashSet::new();
    let mut tasks = Vec::with_capacity(executables.len());

    for executable in executables {
        let Some(name) = executable.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };

        let is_free = |p: &Path, taken: &HashSet<PathBuf>| !p.exists() && !taken.contains(p);
        let mut output = results_dir.join(&name);
        let mut suffix = 0;
        while !is_free(&output, &taken) {
            output = results_dir.join(format!("{}_{}", name, suffix));
            suffix += 1;
        }

        taken.insert(output.clone());
        tasks.push(CollectTask { executable: executable.clone(), output });
    }

    tasks
}

/// Executable files under `dir`, recursively, in sorted order
pub fn find_executables(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut entries: Vec<_> = fs::read_dir(dir)?.collect::<Result<_, _>>()?;
    entries.sort_by_key(|e| e.file_name());

    let mut subdirs = Vec::new();
    for entry in entries {
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            subdirs.push(path);
        } else if is_executable(&path) {
            found.push(path);
        } else {
            debug!("Skipping non-executable {:?}", path);
        }
    }
    for subdir in subdirs {
        found.extend(find_executables(&subdir)?);
    }
    Ok(found)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path).map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0).unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.extension().is_some_and(|e| e.eq_ignore_ascii_case("exe"))
}

/// Delete every file below `dir`, keeping the directories
fn clean_results(dir: &Path) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            clean_results(&path)?;
        } else {
            debug!("Deleting {:?}", path);
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

/// Build the monitor command line for `task`
pub fn monitor_command(plan: &CollectPlan, task: &CollectTask) -> Command {
    let mut cmd = Command::new(&plan.monitor);
    cmd.arg("-r")
        .arg(plan.repeat.to_string())
        .arg("-o")
        .arg(&task.output)
        .arg("-v")
        .arg(&task.executable);
    cmd
}

fn run_monitor(plan: &CollectPlan, task: &CollectTask) -> Result<ExitStatus, DigestError> {
    debug!("Running {:?} on {:?}", plan.monitor, task.executable);

    let mut cmd = monitor_command(plan, task);
    cmd.stdout(Stdio::piped()).stderr(Stdio::inherit());

    let output = cmd.output().map_err(|e| DigestError::Launch { program: plan.monitor.clone(), source: e })?;
    Ok(output.status)
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod runner_test;
