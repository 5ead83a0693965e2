use chrono::{Datelike, Timelike};
use serde::{Deserialize, Serialize};
use zip::write::FileOptions;
use zip::CompressionMethod;

/// How entry payloads are stored in the merged archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryCompression {
    /// Recompress every entry with deflate
    #[default]
    Deflated,
    /// Store entries uncompressed
    Stored,
    /// Copy each entry's compressed stream as-is. With timestamps not
    /// preserved, entries are rewritten instead: stored ones stay stored,
    /// the rest are deflated.
    Preserve,
}

/// Knobs for a single merge run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOptions {
    pub(crate) compression: EntryCompression,
    pub(crate) compression_level: Option<i64>,
    pub(crate) preserve_timestamps: bool,
    pub(crate) max_entry_size: u64,
}

impl MergeOptions {
    /// Defaults: deflate at the library level, source timestamps kept, no size cap
    pub fn new() -> Self {
        Self {
            compression: EntryCompression::Deflated,
            compression_level: None,
            preserve_timestamps: true,
            max_entry_size: u64::MAX,
        }
    }

    pub fn compression(mut self, compression: EntryCompression) -> Self {
        self.compression = compression;
        self
    }

    /// Deflate level; ignored for stored and preserved entries
    pub fn compression_level(mut self, level: Option<i64>) -> Self {
        self.compression_level = level;
        self
    }

    pub fn preserve_timestamps(mut self, preserve: bool) -> Self {
        self.preserve_timestamps = preserve;
        self
    }

    /// Set maximum uncompressed size of any single entry
    pub fn max_entry_size(mut self, size: u64) -> Self {
        self.max_entry_size = size;
        self
    }

    pub fn entry_compression(&self) -> EntryCompression {
        self.compression
    }

    /// Base options for entries written through the decompress/recompress path
    pub(crate) fn file_options(&self) -> FileOptions<'static, ()> {
        let method = match self.compression {
            EntryCompression::Stored => CompressionMethod::Stored,
            EntryCompression::Deflated | EntryCompression::Preserve => CompressionMethod::Deflated,
        };

        let options: FileOptions<'static, ()> = FileOptions::default().compression_method(method);
        if method == CompressionMethod::Deflated {
            options.compression_level(self.compression_level)
        } else {
            options
        }
    }
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Current local time as a ZIP timestamp
pub(crate) fn now_timestamp() -> zip::DateTime {
    let now = chrono::Local::now();
    zip::DateTime::from_date_and_time(
        now.year() as u16,
        now.month() as u8,
        now.day() as u8,
        now.hour() as u8,
        now.minute() as u8,
        now.second() as u8,
    )
    .unwrap_or_default()
}
