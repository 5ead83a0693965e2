use crate::merger::{ConflictMap, Merger};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// One entry path shared by several archives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictEntry {
    pub path: String,
    pub indices: Vec<usize>,
    /// Display names of the archives at `indices`
    pub archives: Vec<String>,
}

/// Human- and machine-readable view of a conflict map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub archives: Vec<String>,
    pub conflicts: Vec<ConflictEntry>,
}

impl ConflictReport {
    pub fn new(merger: &Merger, conflicts: &ConflictMap) -> Self {
        let archives: Vec<String> = merger.descriptors().iter().map(|d| d.file_name()).collect();

        let conflicts = conflicts
            .iter()
            .map(|(path, indices)| ConflictEntry {
                path: path.clone(),
                indices: indices.clone(),
                archives: indices.iter().map(|&i| archives[i].clone()).collect(),
            })
            .collect();

        Self {
            archives,
            conflicts,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    /// Text summary listing at most `limit` conflicts
    pub fn render_summary(&self, limit: usize) -> String {
        let mut out = String::new();

        if self.conflicts.is_empty() {
            out.push_str("[OK] No conflicts detected\n");
            return out;
        }

        let _ = writeln!(
            out,
            "[WARNING] Found {} file path conflicts:",
            self.conflicts.len()
        );
        for conflict in self.conflicts.iter().take(limit) {
            let _ = writeln!(out, "  - {}", conflict.path);
            let _ = writeln!(out, "    Found in: {}", conflict.archives.join(", "));
        }
        if self.conflicts.len() > limit {
            let _ = writeln!(
                out,
                "  ... and {} more conflicts",
                self.conflicts.len() - limit
            );
        }

        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
