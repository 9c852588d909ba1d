use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use relay_core::Range;
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("snapshot at {path} is not valid JSON: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Durable last-known range counters, stored as a JSON array of ranges.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The last saved snapshot; a missing file is an empty snapshot.
    pub fn load(&self) -> Result<Vec<Range>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(self.io_error(err)),
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(|source| StoreError::Format {
            path: self.path.clone(),
            source,
        })
    }

    /// Atomically replaces the snapshot by writing a temp file next to it and
    /// renaming it over the target.
    pub fn save(&self, ranges: &[Range]) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(ranges).map_err(|source| StoreError::Format {
            path: self.path.clone(),
            source,
        })?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let io = |err| self.io_error(err);
        fs::create_dir_all(&dir).map_err(io)?;

        let mut tmp = NamedTempFile::new_in(&dir).map_err(io)?;
        tmp.write_all(content.as_bytes()).map_err(io)?;
        tmp.flush().map_err(io)?;
        tmp.as_file_mut().sync_all().map_err(io)?;
        tmp.persist(&self.path).map_err(|err| io(err.error))?;
        Ok(())
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
