use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::foundation::error::{GridError, GridResult};

static NEXT_SEQ: AtomicU64 = AtomicU64::new(0);

/// A uniquely named scratch directory, removed with everything in it when dropped.
///
/// Callers create one per submission and hold it for as long as staged artifacts are needed;
/// every exit path, including errors and panics that unwind, tears it down.
#[derive(Debug)]
pub struct Workspace {
    id: String,
    path: Option<PathBuf>,
}

impl Workspace {
    /// Create `root/gifgrid-<pid>-<nanos>-<seq>/`. `root` is created if missing.
    pub fn create(root: impl AsRef<Path>) -> GridResult<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root)
            .map_err(|e| GridError::resource(format!("create workspace root: {e}")))?;

        let id = format!(
            "gifgrid-{}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0),
            NEXT_SEQ.fetch_add(1, Ordering::Relaxed)
        );
        let path = root.join(&id);
        std::fs::create_dir(&path)
            .map_err(|e| GridError::resource(format!("create workspace {id}: {e}")))?;
        tracing::debug!(%id, "created workspace");
        Ok(Self {
            id,
            path: Some(path),
        })
    }

    /// Unique identifier, also the directory name.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Directory backing this workspace.
    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }

    /// Tear down now, reporting failures instead of ignoring them.
    pub fn close(mut self) -> GridResult<()> {
        if let Some(path) = self.path.take() {
            std::fs::remove_dir_all(&path)
                .map_err(|e| GridError::resource(format!("remove workspace {}: {e}", self.id)))?;
            tracing::debug!(id = %self.id, "removed workspace");
        }
        Ok(())
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let _ = std::fs::remove_dir_all(path);
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/workspace.rs"]
mod tests;
