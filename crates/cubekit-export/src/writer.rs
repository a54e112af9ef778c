//! Document output
//!
//! Documents are encoded in memory and persisted through a temporary file
//! in the target directory, so a failed export never leaves a partial file
//! behind.

use cubekit_core::{Error, Result};
use serde::Serialize;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Write `bytes` to `path`, replacing it only once everything is on disk
pub fn write_atomic(path: impl AsRef<Path>, bytes: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }

    let mut file = NamedTempFile::new_in(&dir)?;
    {
        let mut out = BufWriter::new(file.as_file_mut());
        out.write_all(bytes)?;
        out.flush()?;
    }
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| Error::Io(e.error))?;

    debug!(path = %path.display(), bytes = bytes.len(), "Wrote file");
    Ok(())
}

/// JSON document writer
#[derive(Debug, Clone, Copy)]
pub struct DocumentWriter {
    /// Indent output (two spaces)
    pub pretty: bool,
}

impl DocumentWriter {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Encode a document; the text always ends with a newline
    pub fn to_string<T: Serialize>(&self, document: &T) -> Result<String> {
        let mut text = if self.pretty {
            serde_json::to_string_pretty(document)?
        } else {
            serde_json::to_string(document)?
        };
        text.push('\n');
        Ok(text)
    }

    pub fn write<T: Serialize>(&self, document: &T, path: impl AsRef<Path>) -> Result<()> {
        let text = self.to_string(document)?;
        write_atomic(path, text.as_bytes())
    }
}

impl Default for DocumentWriter {
    fn default() -> Self {
        Self::new()
    }
}
