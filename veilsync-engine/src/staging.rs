//! Scoped ciphertext staging files.
//!
//! Uploads stage encrypted content on disk before transfer; downloads
//! land raw ciphertext on disk before decryption. Either way the staged
//! artifact must disappear on every exit path, including transfer and
//! decryption failures, so no ciphertext (or worse, misnamed plaintext)
//! accumulates locally.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::trace;

/// RAII guard around a staged ciphertext file.
///
/// The file is removed when the guard drops; a file that never came into
/// existence (failed download) is tolerated.
pub(crate) struct StagedFile {
    path: PathBuf,
}

impl StagedFile {
    /// Writes `bytes` to `path` and takes ownership of the file.
    pub fn create(path: PathBuf, bytes: &[u8]) -> io::Result<Self> {
        fs::write(&path, bytes)?;
        trace!(path = %path.display(), "staged {} bytes", bytes.len());
        Ok(Self { path })
    }

    /// Takes ownership of `path` before a connector writes to it.
    pub fn adopt(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> io::Result<Vec<u8>> {
        fs::read(&self.path)
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                trace!(path = %self.path.display(), "staged file cleanup failed: {e}");
            }
        }
    }
}
