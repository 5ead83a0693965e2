use crate::error::{MergeError, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zip::ZipArchive;

mod central;


/// Directory placeholders carry no bytes and are recognized by this suffix only
const DIR_MARKER: char = '/';

/// Read-only listing of one input archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveDescriptor {
    /// Location of the backing archive
    path: PathBuf,
    /// Leaf entry paths in the archive's own listing order
    entries: Vec<String>,
}

impl ArchiveDescriptor {
    /// Open an archive, list its file entries and close it again
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut archive = open_archive(path)?;

        let mut names = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            // Raw access reads the local header only, never the payload
            let file = archive
                .by_index_raw(i)
                .map_err(|e| invalid_format(path, e))?;
            names.push(file.name().to_string());
        }

        if let Some(all) = repeated_listing(path, names.len())? {
            names = all;
        }

        // Skip directory markers
        let entries: Vec<String> = names
            .into_iter()
            .filter(|name| !is_dir_marker(name))
            .collect();

        debug!(
            archive = %path.display(),
            entries = entries.len(),
            "loaded archive listing"
        );

        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    #[cfg(test)]
    pub(crate) fn from_parts(path: impl Into<PathBuf>, entries: Vec<String>) -> Self {
        Self {
            path: path.into(),
            entries,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File entry paths, directory markers excluded
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Short name for reports, e.g. "chapter1.cbz"
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Whether an entry path is an empty-directory placeholder
pub fn is_dir_marker(name: &str) -> bool {
    name.ends_with(DIR_MARKER)
}

/// Open a ZIP container, classifying failures as missing, unreadable or malformed
pub(crate) fn open_archive(path: &Path) -> Result<ZipArchive<BufReader<File>>> {
    if !path.exists() {
        return Err(MergeError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let file = File::open(path).map_err(|e| MergeError::io(path, e))?;

    // The file opened fine, so any parse failure means it is not a ZIP container
    ZipArchive::new(BufReader::new(file)).map_err(|e| invalid_format(path, e))
}

/// Full listing when the central directory holds more records than
/// `ZipArchive` kept, which happens when a name is repeated
fn repeated_listing(path: &Path, kept: usize) -> Result<Option<Vec<String>>> {
    let file = File::open(path).map_err(|e| MergeError::io(path, e))?;
    let mut reader = BufReader::new(file);

    let directory = match central::locate(&mut reader) {
        Ok(directory) => directory,
        Err(e) => {
            debug!(archive = %path.display(), error = %e, "central directory not inspected");
            return Ok(None);
        }
    };
    if directory.records <= kept as u64 {
        return Ok(None);
    }

    let names = central::names(&mut reader, &directory).map_err(|e| MergeError::InvalidFormat {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    warn!(
        archive = %path.display(),
        records = names.len(),
        unique = kept,
        "archive repeats entry names"
    );
    Ok(Some(names))
}

fn invalid_format(path: &Path, err: zip::result::ZipError) -> MergeError {
    MergeError::InvalidFormat {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}
