//! # Upload Spool
//!
//! Browser uploads are written to disk before they can be selected as a library pick. Each file
//! gets its own `{root}/{uuid}/` directory. At most one spooled file is kept: the one backing the
//! current selection. Everything else is removed as soon as it stops being selected.

use log::{debug, warn};
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug)]
pub struct Spool {
    root: PathBuf,
    /// Spooled file backing the current selection
    current: Option<PathBuf>,
}

impl Spool {
    /// Opens the spool, creating `root` if needed.
    ///
    /// The root is made absolute, so spooled paths never get resolved against another directory.
    pub async fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = std::path::absolute(root.into())?;
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            current: None,
        })
    }

    pub fn current(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    /// Writes `data` as `file_name` in a fresh directory and returns the file's path.
    ///
    /// The file is not kept until [`Spool::keep`] is called with it.
    pub async fn write(&self, file_name: &str, data: &[u8]) -> io::Result<PathBuf> {
        let dir = self.root.join(Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(file_name);
        if let Err(e) = tokio::fs::write(&path, data).await {
            remove_dir(&dir).await;
            return Err(e);
        }
        Ok(path)
    }

    /// Makes `path` the current spooled file and removes the previous one.
    pub async fn keep(&mut self, path: PathBuf) {
        if let Some(previous) = self.current.replace(path) {
            self.discard(&previous).await;
        }
    }

    /// Removes a spooled file that was never kept. The current file is left alone.
    pub async fn discard(&self, path: &Path) {
        if self.current.as_deref() == Some(path) {
            return;
        }
        if let Some(dir) = self.spool_dir_of(path) {
            remove_dir(dir).await;
        }
    }

    /// Removes the current spooled file, if any.
    pub async fn release(&mut self) {
        if let Some(path) = self.current.take() {
            self.discard(&path).await;
        }
    }

    /// The per-file directory holding `path`, if `path` lives in this spool.
    fn spool_dir_of<'a>(&self, path: &'a Path) -> Option<&'a Path> {
        path.parent().filter(|dir| dir.parent() == Some(self.root.as_path()))
    }
}

async fn remove_dir(dir: &Path) {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => debug!("Removed spool directory {}", dir.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove spool directory {}: {}", dir.display(), e),
    }
}
