use std::{path::Path, time::Duration};

use tokio::process::Command;

use crate::engine::{error::RunError, process};

/// What the run stage executes: a binary produced by the build stage, or
/// the source itself through `go run`.
#[derive(Debug, Clone, Copy)]
pub enum RunTarget<'a> {
    Artifact(&'a Path),
    Source(&'a Path),
}

/// Runs the target inside `work_dir` with stdin closed, bounded by
/// `deadline`, and returns the program's stdout bytes untouched. Failures
/// resolve in order: captured stderr verbatim, then the elapsed deadline,
/// then whatever else went wrong.
pub async fn run(
    go_bin: &Path,
    target: RunTarget<'_>,
    work_dir: &Path,
    deadline: Duration,
) -> Result<Vec<u8>, RunError> {
    let mut cmd = match target {
        RunTarget::Artifact(path) => Command::new(path),
        RunTarget::Source(path) => {
            let mut cmd = Command::new(go_bin);
            cmd.args(["run", "-gcflags=-N"]).arg(path);
            cmd
        }
    };
    cmd.current_dir(work_dir);

    let output = process::run_bounded(cmd, deadline)
        .await
        .map_err(|err| RunError::Failed(err.to_string()))?;

    if output.success() {
        return Ok(output.stdout);
    }
    if !output.stderr.is_empty() {
        return Err(RunError::Stderr(
            String::from_utf8_lossy(&output.stderr).to_string(),
        ));
    }
    if output.timed_out {
        return Err(RunError::TimedOut(deadline));
    }
    Err(RunError::Failed(describe_exit(output.status)))
}

fn describe_exit(status: Option<std::process::ExitStatus>) -> String {
    match status {
        Some(status) => status.to_string(),
        None => "process terminated without status".to_string(),
    }
}
