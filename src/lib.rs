// Public API exports
pub mod archive;
pub mod error;
pub mod input;
pub mod merger;
pub mod report;
pub mod telemetry;
pub mod verify;

#[cfg(test)]
mod test_support;

// Re-export main types for convenience
pub use archive::ArchiveDescriptor;
pub use error::{MergeError, Result};
pub use input::InputList;

pub use merger::worker::{MergeHandle, MergeJob, MergeRequest, WorkerEvent};
pub use merger::{
    padding_width, ConflictMap, EntryCompression, MergeOptions, MergeSummary, Merger, Progress,
    RenameMode,
};

pub use report::{ConflictEntry, ConflictReport};
pub use verify::{verify_merge, VerifyReport};
