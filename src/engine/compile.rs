use std::{
    env::consts::EXE_SUFFIX,
    path::{Path, PathBuf},
    time::Duration,
};

use tokio::process::Command;

use crate::engine::{error::CompileError, process};

/// Base name of the compiled binary inside a workspace.
pub const ARTIFACT_NAME: &str = "program";

/// Compiles `source` into `work_dir` with optimizations disabled, bounded
/// by `deadline`. Returns the artifact path on success. Failures resolve in
/// order: compiler stderr as a diagnostic, then the elapsed deadline, then
/// whatever else went wrong.
pub async fn compile(
    go_bin: &Path,
    source: &Path,
    work_dir: &Path,
    deadline: Duration,
) -> Result<PathBuf, CompileError> {
    let artifact = work_dir.join(format!("{ARTIFACT_NAME}{EXE_SUFFIX}"));

    let mut cmd = Command::new(go_bin);
    cmd.arg("build")
        .arg("-gcflags=-N")
        .arg("-o")
        .arg(&artifact)
        .arg(source)
        .current_dir(work_dir);

    let output = process::run_bounded(cmd, deadline)
        .await
        .map_err(|err| CompileError::Failed(err.to_string()))?;

    if output.success() {
        return Ok(artifact);
    }
    if !output.stderr.is_empty() {
        return Err(CompileError::Diagnostic(
            String::from_utf8_lossy(&output.stderr).to_string(),
        ));
    }
    if output.timed_out {
        return Err(CompileError::TimedOut(deadline));
    }
    Err(CompileError::Failed(describe_exit(output.status)))
}

fn describe_exit(status: Option<std::process::ExitStatus>) -> String {
    match status {
        Some(status) => status.to_string(),
        None => "toolchain terminated without status".to_string(),
    }
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use std::{
        env::consts::EXE_SUFFIX,
        path::{Path, PathBuf},
        time::{Duration, Instant},
    };

    use super::{ARTIFACT_NAME, compile};
    use crate::engine::error::CompileError;

    fn stub(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("go");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[tokio::test]
    async fn success_names_the_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let go = stub(dir.path(), "exit 0");
        let source = dir.path().join("main.go");
        std::fs::write(&source, "package main").unwrap();

        let artifact = compile(&go, &source, dir.path(), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(
            artifact,
            dir.path().join(format!("{ARTIFACT_NAME}{EXE_SUFFIX}"))
        );
    }

    #[tokio::test]
    async fn stderr_becomes_a_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        let go = stub(dir.path(), "echo 'main.go:3:1: undefined: x' >&2; exit 1");
        let source = dir.path().join("main.go");
        std::fs::write(&source, "package main").unwrap();

        let err = compile(&go, &source, dir.path(), Duration::from_secs(5))
            .await
            .unwrap_err();
        match err {
            CompileError::Diagnostic(text) => {
                assert_eq!(text, "main.go:3:1: undefined: x\n");
            }
            other => panic!("expected diagnostic, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn deadline_expiry_is_a_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let go = stub(dir.path(), "exec sleep 30");
        let source = dir.path().join("main.go");
        std::fs::write(&source, "package main").unwrap();

        let started = Instant::now();
        let err = compile(&go, &source, dir.path(), Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, CompileError::TimedOut(_)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn stderr_takes_precedence_over_the_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let go = stub(dir.path(), "echo 'stuck on main.go' >&2; exec sleep 30");
        let source = dir.path().join("main.go");
        std::fs::write(&source, "package main").unwrap();

        let err = compile(&go, &source, dir.path(), Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, CompileError::Diagnostic(_)));
    }

    #[tokio::test]
    async fn silent_nonzero_exit_is_generic() {
        let dir = tempfile::tempdir().unwrap();
        let go = stub(dir.path(), "exit 7");
        let source = dir.path().join("main.go");
        std::fs::write(&source, "package main").unwrap();

        let err = compile(&go, &source, dir.path(), Duration::from_secs(5))
            .await
            .unwrap_err();
        match err {
            CompileError::Failed(text) => assert!(text.contains('7'), "{text}"),
            other => panic!("expected generic failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_toolchain_is_generic() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("main.go");
        std::fs::write(&source, "package main").unwrap();

        let err = compile(
            Path::new("/nonexistent/go"),
            &source,
            dir.path(),
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CompileError::Failed(_)));
    }
}
