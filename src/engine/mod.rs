pub mod classifier;
pub mod compile;
pub mod error;
pub mod metrics;
mod process;
pub mod run;
pub mod workspace;

use std::{path::PathBuf, sync::Arc, time::Duration};

use crate::{
    config::AppConfig,
    engine::{
        classifier::{ExecutionPath, classify},
        error::ExecError,
        metrics::MetricsRegistry,
        run::RunTarget,
        workspace::Workspace,
    },
};

/// File name the submitted source is written under within its workspace.
pub const SOURCE_FILE: &str = "main.go";

#[derive(Debug, Clone, Copy)]
pub struct TimeoutPolicy {
    pub compile: Duration,
    pub run: Duration,
}

/// Drives a submission through classify, workspace setup, the chosen
/// pipeline and teardown. The workspace is released on every exit after it
/// has been created, success or not.
#[derive(Debug)]
pub struct Engine {
    go_bin: PathBuf,
    workspace_root: PathBuf,
    timeouts: TimeoutPolicy,
    metrics: Arc<MetricsRegistry>,
}

impl Engine {
    pub fn new(config: &AppConfig, metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            go_bin: config.go_bin.clone(),
            workspace_root: config.workspace_root.clone(),
            timeouts: TimeoutPolicy {
                compile: config.compile_timeout,
                run: config.run_timeout,
            },
            metrics,
        }
    }

    /// Executes one source submission and returns its stdout bytes.
    pub async fn execute(&self, source: &str) -> Result<Vec<u8>, ExecError> {
        if source.is_empty() {
            return Err(ExecError::EmptySource);
        }

        let path = classify(source);
        let _in_flight = self.metrics.started();
        match path {
            ExecutionPath::Fast => self.metrics.fast_path(),
            ExecutionPath::Full => self.metrics.full_path(),
        }
        tracing::debug!(path = ?path, bytes = source.len(), "dispatching execution");

        let result = self.execute_on(path, source).await;
        match &result {
            Ok(_) => self.metrics.completed(),
            Err(err) if err.is_timeout() => self.metrics.timed_out(),
            Err(_) => self.metrics.failed(),
        }
        result
    }

    async fn execute_on(&self, path: ExecutionPath, source: &str) -> Result<Vec<u8>, ExecError> {
        let workspace = Workspace::create(&self.workspace_root).await?;
        let result = self.run_in(&workspace, path, source).await;
        workspace.release().await;
        result
    }

    async fn run_in(
        &self,
        workspace: &Workspace,
        path: ExecutionPath,
        source: &str,
    ) -> Result<Vec<u8>, ExecError> {
        let source_path = workspace.write_source(SOURCE_FILE, source.as_bytes()).await?;

        let stdout = match path {
            ExecutionPath::Fast => {
                run::run(
                    &self.go_bin,
                    RunTarget::Source(&source_path),
                    workspace.dir(),
                    self.timeouts.run,
                )
                .await?
            }
            ExecutionPath::Full => {
                let artifact = compile::compile(
                    &self.go_bin,
                    &source_path,
                    workspace.dir(),
                    self.timeouts.compile,
                )
                .await?;
                run::run(
                    &self.go_bin,
                    RunTarget::Artifact(&artifact),
                    workspace.dir(),
                    self.timeouts.run,
                )
                .await?
            }
        };
        Ok(stdout)
    }
}
