use crate::error::{MergeError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Extensions accepted as comic archives
pub const ARCHIVE_EXTENSIONS: &[&str] = &["cbz", "zip"];

/// Minimum inputs worth merging
pub const MIN_MERGE_INPUTS: usize = 2;

/// Ordered, duplicate-free list of archives queued for a merge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputList {
    paths: Vec<PathBuf>,
}

impl InputList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `path` unless it is already queued or not an archive by extension
    pub fn add(&mut self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        if !has_archive_extension(&path) || self.paths.contains(&path) {
            return false;
        }
        debug!(path = %path.display(), "queued archive");
        self.paths.push(path);
        true
    }

    /// Append an explicitly chosen file whatever its extension
    pub fn add_file(&mut self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        if self.paths.contains(&path) {
            return false;
        }
        self.paths.push(path);
        true
    }

    /// Queue every archive directly inside `dir`, sorted by file name.
    /// Returns how many were added.
    pub fn add_dir(&mut self, dir: impl AsRef<Path>) -> Result<usize> {
        let dir = dir.as_ref();
        let mut added = 0;

        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| MergeError::io(dir, e.into()))?;
            if entry.file_type().is_file() && self.add(entry.into_path()) {
                added += 1;
            }
        }

        Ok(added)
    }

    /// Remove and return the path at `index`
    pub fn remove(&mut self, index: usize) -> Option<PathBuf> {
        (index < self.paths.len()).then(|| self.paths.remove(index))
    }

    /// Move the path at `from` so it ends up at `to`
    pub fn move_item(&mut self, from: usize, to: usize) -> bool {
        if from >= self.paths.len() || to >= self.paths.len() {
            return false;
        }
        let path = self.paths.remove(from);
        self.paths.insert(to, path);
        true
    }

    pub fn clear(&mut self) {
        self.paths.clear();
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// File name, or `parent/file` when another queued archive shares the name
    pub fn display_name(&self, index: usize) -> Option<String> {
        let path = self.paths.get(index)?;
        let name = path.file_name()?;

        let shared = self
            .paths
            .iter()
            .filter(|other| other.file_name() == Some(name))
            .count()
            > 1;

        let name = name.to_string_lossy();
        let parent = path
            .parent()
            .and_then(Path::file_name)
            .map(|p| p.to_string_lossy());

        Some(match parent {
            Some(parent) if shared => format!("{}/{}", parent, name),
            _ => name.into_owned(),
        })
    }

    /// Enough inputs and somewhere to write them
    pub fn can_merge(&self, output: Option<&Path>) -> bool {
        self.paths.len() >= MIN_MERGE_INPUTS && output.is_some()
    }

    pub fn into_paths(self) -> Vec<PathBuf> {
        self.paths
    }
}

fn has_archive_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            ARCHIVE_EXTENSIONS
                .iter()
                .any(|known| e.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}
