//! Scratch directory for request-scoped artifacts.

use std::path::{Path, PathBuf};

use retime_models::RunId;
use tokio::fs;

use crate::error::MediaResult;

/// Root of all transient artifacts.
///
/// Names are `<run_id>_<name>`, so runs never collide. Nothing here deletes
/// files; cleanup is left to whoever owns the directory.
#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory tree if needed.
    pub async fn ensure(&self) -> MediaResult<()> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Path for one artifact of a run.
    pub fn artifact(&self, run_id: &RunId, name: &str) -> PathBuf {
        self.root.join(format!("{}_{}", run_id, name))
    }
}

/// Whether `path` is a non-empty regular file.
pub async fn artifact_exists(path: impl AsRef<Path>) -> bool {
    match fs::metadata(path.as_ref()).await {
        Ok(meta) => meta.is_file() && meta.len() > 0,
        Err(_) => false,
    }
}
