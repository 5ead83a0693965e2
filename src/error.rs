use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MergeError>;

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("CBZ file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Not a valid ZIP/CBZ file: {} ({reason})", path.display())]
    InvalidFormat { path: PathBuf, reason: String },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write {}: {reason}", path.display())]
    Write { path: PathBuf, reason: String },

    #[error("Duplicate output path '{path}' from archive #{index}")]
    DuplicateOutputPath { path: String, index: usize },

    #[error("Merge worker stopped unexpectedly: {0}")]
    Worker(String),
}

impl MergeError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        MergeError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn write(path: &Path, reason: impl ToString) -> Self {
        MergeError::Write {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Map a failure while re-reading an input that was valid at load time
    pub(crate) fn reread(path: &Path, err: zip::result::ZipError) -> Self {
        Self::io(path, io::Error::from(err))
    }

    /// Location the error refers to, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            MergeError::NotFound { path }
            | MergeError::InvalidFormat { path, .. }
            | MergeError::Io { path, .. }
            | MergeError::Write { path, .. } => Some(path),
            MergeError::DuplicateOutputPath { .. } | MergeError::Worker(_) => None,
        }
    }
}
