use super::RenameMode;
use std::fmt;

/// Coarse checkpoints reported while loading and merging
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Loading { archives: usize },
    DetectingConflicts,
    ConflictsFound { count: usize, mode: RenameMode },
    Merging { archives: usize },
    ArchiveStarted { index: usize, name: String, entries: usize },
    WritingEntry { current: usize, total: usize, path: String },
    Done { entries: usize },
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Progress::Loading { archives } => write!(f, "Loading {} CBZ files...", archives),
            Progress::DetectingConflicts => f.write_str("Detecting conflicts..."),
            Progress::ConflictsFound { count, mode } => {
                write!(f, "Found {} conflicts, resolving with {}...", count, mode)
            }
            Progress::Merging { archives } => write!(f, "Merging {} CBZ files...", archives),
            Progress::ArchiveStarted {
                index,
                name,
                entries,
            } => write!(f, "[{}] {} ({} entries)", index, name, entries),
            Progress::WritingEntry {
                current,
                total,
                path,
            } => write!(f, "Writing entry {} of {}: {}", current, total, path),
            Progress::Done { entries } => write!(f, "Done! Wrote {} entries", entries),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            Progress::Loading { archives: 3 }.to_string(),
            "Loading 3 CBZ files..."
        );
        assert_eq!(
            Progress::ConflictsFound {
                count: 2,
                mode: RenameMode::Namespace
            }
            .to_string(),
            "Found 2 conflicts, resolving with folders..."
        );
        assert_eq!(
            Progress::WritingEntry {
                current: 4,
                total: 6,
                path: "1_page.jpg".to_string()
            }
            .to_string(),
            "Writing entry 4 of 6: 1_page.jpg"
        );
    }
}
