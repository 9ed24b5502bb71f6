//! Staging: write upload bytes to a uniquely named temporary file.
//!
//! Extraction strategies work on file-system paths, so every upload is
//! staged for the duration of one conversion. [`StagedFile`] owns the file:
//! it is removed by [`StagedFile::release`] on the normal path and by `Drop`
//! on every other exit (early return, error, panic unwind), so a failing
//! strategy can never leak a staged upload.
//!
//! Names are `<fingerprint>_<unix-ts>_<random><ext>`: a blake3 prefix of the
//! content, the staging time and a random tail from `tempfile`, which keeps
//! concurrent uploads of identical bytes apart.

use crate::pipeline::detect::extension_of;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Hex characters of the content fingerprint kept in the staged name.
const FINGERPRINT_LEN: usize = 16;

/// A staged upload, deleted when released or dropped.
#[derive(Debug)]
pub struct StagedFile {
    file: NamedTempFile,
}

impl StagedFile {
    /// Stage `content` inside `dir`, keeping the original extension so
    /// extension-sensitive parsers still recognise the file.
    pub fn create(dir: &Path, original_name: &str, content: &[u8]) -> std::io::Result<Self> {
        let prefix = staging_prefix(content);
        let suffix = staging_suffix(original_name);

        let mut file = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(&suffix)
            .rand_bytes(6)
            .tempfile_in(dir)?;
        file.write_all(content)?;
        file.flush()?;

        debug!(
            path = %file.path().display(),
            bytes = content.len(),
            "Staged upload"
        );
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Delete the staged file now, reporting any I/O error.
    pub fn release(self) -> std::io::Result<()> {
        let path = self.file.path().to_path_buf();
        self.file.close()?;
        debug!(path = %path.display(), "Released staged upload");
        Ok(())
    }

    /// Delete the staged file, logging instead of returning a failure.
    pub fn release_logged(self) {
        let path: PathBuf = self.file.path().to_path_buf();
        if let Err(e) = self.release() {
            warn!(path = %path.display(), error = %e, "Failed to remove staged upload");
        }
    }
}

fn staging_prefix(content: &[u8]) -> String {
    let digest = blake3::hash(content).to_hex();
    let timestamp = chrono::Utc::now().timestamp();
    format!("{}_{}_", &digest.as_str()[..FINGERPRINT_LEN], timestamp)
}

fn staging_suffix(original_name: &str) -> String {
    let extension = extension_of(original_name);
    // Only keep well-formed extensions in the staged name.
    if extension.len() > 1
        && extension.len() <= 16
        && extension[1..].chars().all(|c| c.is_ascii_alphanumeric())
    {
        extension
    } else {
        String::new()
    }
}
