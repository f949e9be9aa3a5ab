//! Persisted reply audio for the native platform
//!
//! One file at a fixed path, overwritten by every turn.

use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::{Error, Result};

/// File name of the cached reply
pub const REPLY_FILE_NAME: &str = "response.mp3";

/// The reply cache file under a cache directory
#[derive(Debug, Clone)]
pub struct ReplyCache {
    dir: PathBuf,
}

impl ReplyCache {
    /// Cache rooted at `dir`; the directory is created on first write
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the cached reply
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.dir.join(REPLY_FILE_NAME)
    }

    /// Cache directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Base64-encode reply bytes for [`ReplyCache::write_base64`]
    #[must_use]
    pub fn encode(bytes: &[u8]) -> String {
        STANDARD.encode(bytes)
    }

    /// Decode base64 text and overwrite the cached reply with it
    ///
    /// # Errors
    ///
    /// Returns `Error::Decode` for invalid base64, `Error::Io` if the write fails
    pub async fn write_base64(&self, encoded: &str) -> Result<PathBuf> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| Error::Decode(format!("invalid base64 reply: {e}")))?;

        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.path();
        tokio::fs::write(&path, &bytes).await?;

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "reply cached");
        Ok(path)
    }
}
