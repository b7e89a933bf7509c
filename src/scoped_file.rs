use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

/// A temporary file path owned by one request. The file, if it exists, is
/// removed when the guard is dropped, whichever way the owner exits.
#[derive(Debug)]
pub struct ScopedFile {
    path: PathBuf,
}

impl ScopedFile {
    /// Reserves a fresh random name in `dir` ending in `extension`
    /// (either empty or including the leading dot). Nothing is created on disk.
    pub fn reserve(dir: &Path, extension: &str) -> Self {
        let name = format!("{}{}", Uuid::new_v4().simple(), extension);
        Self {
            path: dir.join(name),
        }
    }

    /// Reserves a name and creates the file for writing. Fails rather than
    /// reuse an existing path.
    pub async fn create(dir: &Path, extension: &str) -> io::Result<(Self, tokio::fs::File)> {
        let guard = Self::reserve(dir, extension);
        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&guard.path)
            .await?;
        Ok((guard, file))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScopedFile {
    fn drop(&mut self) {
        // Drop cannot await; a single unlink runs inline on the runtime thread
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::trace!(path = %self.path.display(), "removed temporary file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "failed to remove temporary file"
            ),
        }
    }
}
