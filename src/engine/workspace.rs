use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::engine::error::WorkspaceError;

/// A scratch directory owned by a single execution. Created under the
/// configured root with a unique name, removed on `release`. Dropping an
/// unreleased workspace removes the directory as a backstop.
#[derive(Debug)]
pub struct Workspace {
    dir: PathBuf,
    released: bool,
}

impl Workspace {
    pub async fn create(root: &Path) -> Result<Self, WorkspaceError> {
        let dir = root.join(format!("run-{}", Uuid::new_v4().as_simple()));
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(WorkspaceError::Create)?;
        Ok(Self {
            dir,
            released: false,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn write_source(
        &self,
        name: &str,
        contents: &[u8],
    ) -> Result<PathBuf, WorkspaceError> {
        let path = self.dir.join(name);
        tokio::fs::write(&path, contents)
            .await
            .map_err(WorkspaceError::Write)?;
        Ok(path)
    }

    /// Removes the directory and everything in it; removal failures are
    /// ignored.
    pub async fn release(mut self) {
        self.released = true;
        let _ = tokio::fs::remove_dir_all(&self.dir).await;
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if !self.released {
            let _ = std::fs::remove_dir_all(&self.dir);
        }
    }
}
