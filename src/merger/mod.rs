mod naming;
mod options;
mod progress;
pub mod worker;


pub use naming::{padding_width, RenameMode};
pub use options::{EntryCompression, MergeOptions};
pub use progress::Progress;

use options::now_timestamp;

use crate::archive::{open_archive, ArchiveDescriptor};
use crate::error::{MergeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};
use zip::{CompressionMethod, ZipWriter};

/// Conflicting entry path -> ascending indices of the archives holding it
pub type ConflictMap = BTreeMap<String, Vec<usize>>;

/// Outcome of a completed merge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeSummary {
    pub output: PathBuf,
    pub archives: usize,
    pub entries: usize,
    /// Uncompressed bytes written
    pub bytes: u64,
    pub mode: RenameMode,
}

/// Merges an ordered, fixed set of archives into one
#[derive(Debug, Clone)]
pub struct Merger {
    descriptors: Vec<ArchiveDescriptor>,
}

impl Merger {
    /// Load every archive in order, stopping at the first one that fails
    pub fn new<I, P>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let descriptors = paths
            .into_iter()
            .map(ArchiveDescriptor::from_path)
            .collect::<Result<Vec<_>>>()?;

        info!(archives = descriptors.len(), "loaded archives");
        Ok(Self::from_descriptors(descriptors))
    }

    pub fn from_descriptors(descriptors: Vec<ArchiveDescriptor>) -> Self {
        Self { descriptors }
    }

    pub fn descriptors(&self) -> &[ArchiveDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Total file entries across all inputs
    pub fn total_entries(&self) -> usize {
        self.descriptors.iter().map(|d| d.entry_count()).sum()
    }

    /// Entry paths present in more than one archive
    ///
    /// A path repeated inside a single archive is listed once per occurrence,
    /// but only reported when some other archive also has it.
    pub fn detect_conflicts(&self) -> ConflictMap {
        let mut path_to_indices: ConflictMap = BTreeMap::new();

        for (idx, descriptor) in self.descriptors.iter().enumerate() {
            for entry in descriptor.entries() {
                path_to_indices.entry(entry.clone()).or_default().push(idx);
            }
        }

        // Indices are ascending, so differing ends means two archives
        path_to_indices.retain(|_, indices| indices.first() != indices.last());
        path_to_indices
    }

    /// Digits used to zero-pad archive indices in output paths
    pub fn padding_width(&self) -> usize {
        padding_width(self.descriptors.len())
    }

    /// Renamed output paths per archive, in write order
    ///
    /// Fails if two entries would land on the same output path, which only
    /// happens when one input lists the same path twice.
    pub fn output_paths(&self, mode: RenameMode) -> Result<Vec<Vec<String>>> {
        let width = self.padding_width();
        let mut seen = HashSet::with_capacity(self.total_entries());

        self.descriptors
            .iter()
            .enumerate()
            .map(|(idx, descriptor)| {
                descriptor
                    .entries()
                    .iter()
                    .map(|entry| {
                        let renamed = mode.rename(idx, width, entry);
                        if !seen.insert(renamed.clone()) {
                            return Err(MergeError::DuplicateOutputPath {
                                path: renamed,
                                index: idx,
                            });
                        }
                        Ok(renamed)
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect()
    }

    /// Merge all inputs into a fresh archive at `output`
    pub fn merge(&self, output: impl AsRef<Path>, mode: RenameMode) -> Result<MergeSummary> {
        self.merge_with_options(output, mode, &MergeOptions::default(), |_| {})
    }

    /// Like [`Merger::merge`], reporting checkpoints to `sink`
    pub fn merge_with_progress<F>(
        &self,
        output: impl AsRef<Path>,
        mode: RenameMode,
        sink: F,
    ) -> Result<MergeSummary>
    where
        F: FnMut(&Progress),
    {
        self.merge_with_options(output, mode, &MergeOptions::default(), sink)
    }

    /// Write every retained entry of every input, renamed, into `output`.
    ///
    /// An existing file at `output` is overwritten. If the merge fails part
    /// way, the truncated output file is left in place.
    pub fn merge_with_options<F>(
        &self,
        output: impl AsRef<Path>,
        mode: RenameMode,
        options: &MergeOptions,
        mut sink: F,
    ) -> Result<MergeSummary>
    where
        F: FnMut(&Progress),
    {
        let output = output.as_ref();
        let plan = self.output_paths(mode)?;
        let total = self.total_entries();

        sink(&Progress::Merging {
            archives: self.descriptors.len(),
        });
        info!(
            output = %output.display(),
            archives = self.descriptors.len(),
            entries = total,
            mode = %mode,
            "merging archives"
        );

        let file = File::create(output).map_err(|e| MergeError::write(output, e))?;
        let mut zip = ZipWriter::new(BufWriter::new(file));
        let base_options = options.file_options();
        let merge_time = now_timestamp();
        // Raw copies keep their source timestamp, so touching forces a rewrite
        let raw_copy =
            options.compression == EntryCompression::Preserve && options.preserve_timestamps;

        let mut written = 0usize;
        let mut bytes = 0u64;

        for (idx, (descriptor, renamed)) in self.descriptors.iter().zip(&plan).enumerate() {
            let source = descriptor.path();
            sink(&Progress::ArchiveStarted {
                index: idx,
                name: descriptor.file_name(),
                entries: descriptor.entry_count(),
            });
            debug!(index = idx, archive = %source.display(), "copying entries");

            // Re-open: construction only read the listing
            let mut input = reopen(source)?;

            for (entry, new_path) in descriptor.entries().iter().zip(renamed) {
                written += 1;
                sink(&Progress::WritingEntry {
                    current: written,
                    total,
                    path: new_path.clone(),
                });
                trace!(from = %entry, to = %new_path, "writing entry");

                let index = input.index_for_name(entry).ok_or_else(|| {
                    MergeError::io(
                        source,
                        io::Error::new(
                            io::ErrorKind::NotFound,
                            format!("entry '{}' is no longer in the archive", entry),
                        ),
                    )
                })?;

                if raw_copy {
                    let file = input
                        .by_index_raw(index)
                        .map_err(|e| MergeError::reread(source, e))?;
                    check_size(output, entry, file.size(), options.max_entry_size)?;
                    bytes += file.size();
                    zip.raw_copy_file_rename(file, new_path.as_str())
                        .map_err(|e| MergeError::write(output, e))?;
                    continue;
                }

                let mut file = input
                    .by_index(index)
                    .map_err(|e| MergeError::reread(source, e))?;
                check_size(output, entry, file.size(), options.max_entry_size)?;

                let modified = if options.preserve_timestamps {
                    file.last_modified().unwrap_or(merge_time)
                } else {
                    merge_time
                };
                let mut entry_options = base_options.last_modified_time(modified);
                if options.compression == EntryCompression::Preserve
                    && file.compression() == CompressionMethod::Stored
                {
                    entry_options = entry_options
                        .compression_method(CompressionMethod::Stored)
                        .compression_level(None);
                }
                if let Some(perms) = file.unix_mode() {
                    entry_options = entry_options.unix_permissions(perms);
                }

                zip.start_file(new_path.as_str(), entry_options)
                    .map_err(|e| MergeError::write(output, e))?;
                bytes += copy_entry(&mut file, &mut zip, source, output)?;
            }
        }

        let mut buffered = zip.finish().map_err(|e| MergeError::write(output, e))?;
        buffered.flush().map_err(|e| MergeError::write(output, e))?;

        info!(output = %output.display(), entries = written, bytes, "merge complete");
        sink(&Progress::Done { entries: written });

        Ok(MergeSummary {
            output: output.to_path_buf(),
            archives: self.descriptors.len(),
            entries: written,
            bytes,
            mode,
        })
    }

    /// Log the conflicts that renaming is about to resolve
    pub fn log_conflicts(&self, conflicts: &ConflictMap) {
        for (path, indices) in conflicts {
            warn!(path = %path, archives = ?indices, "entry path conflict");
        }
    }
}

/// Open an input again at merge time, where every failure is a read error
fn reopen(source: &Path) -> Result<zip::ZipArchive<io::BufReader<File>>> {
    open_archive(source).map_err(|e| match e {
        MergeError::NotFound { path } => MergeError::Io {
            path,
            source: io::Error::new(io::ErrorKind::NotFound, "archive was removed"),
        },
        MergeError::InvalidFormat { path, reason } => MergeError::Io {
            path,
            source: io::Error::new(io::ErrorKind::InvalidData, reason),
        },
        other => other,
    })
}

fn check_size(output: &Path, entry: &str, size: u64, max: u64) -> Result<()> {
    if size > max {
        return Err(MergeError::write(
            output,
            format!("entry '{}' is too large: {} bytes (max: {})", entry, size, max),
        ));
    }
    Ok(())
}

/// Stream one entry's bytes, telling read failures apart from write failures
fn copy_entry<R, W>(reader: &mut R, writer: &mut W, source: &Path, output: &Path) -> Result<u64>
where
    R: io::Read,
    W: Write,
{
    let mut buf = [0u8; 64 * 1024];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(MergeError::io(source, e)),
        };
        writer
            .write_all(&buf[..n])
            .map_err(|e| MergeError::write(output, e))?;
        total += n as u64;
    }
}
