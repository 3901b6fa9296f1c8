use std::{io, time::Duration};

use thiserror::Error;

/// Failures while preparing the scratch directory, before any toolchain
/// process is spawned.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("failed to create workspace directory: {0}")]
    Create(#[source] io::Error),
    #[error("failed to write source file: {0}")]
    Write(#[source] io::Error),
}

/// Build stage failures, in precedence order: a compiler diagnostic wins
/// over a deadline, a deadline wins over anything else.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("compilation error: {0}")]
    Diagnostic(String),
    #[error("compilation timed out after {} seconds", .0.as_secs_f64())]
    TimedOut(Duration),
    #[error("compilation failed: {0}")]
    Failed(String),
}

/// Run stage failures. `Stderr` carries the program's stderr verbatim.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("{0}")]
    Stderr(String),
    #[error("execution timed out after {} seconds", .0.as_secs_f64())]
    TimedOut(Duration),
    #[error("execution error: {0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("no code provided")]
    EmptySource,
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Run(#[from] RunError),
}

impl ExecError {
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ExecError::Compile(CompileError::TimedOut(_)) | ExecError::Run(RunError::TimedOut(_))
        )
    }
}
