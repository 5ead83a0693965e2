//! Post-merge check that the output holds exactly the renamed inputs,
//! byte for byte.

use crate::archive::{is_dir_marker, open_archive};
use crate::error::{MergeError, Result};
use crate::merger::{Merger, RenameMode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::io::{self, Read};
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    /// Entries whose digests were compared
    pub checked: usize,
    /// Expected output paths that are absent
    pub missing: Vec<String>,
    /// Output paths whose bytes differ from the source entry
    pub mismatched: Vec<String>,
    /// Output paths that no input accounts for
    pub unexpected: Vec<String>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.missing.is_empty() && self.mismatched.is_empty() && self.unexpected.is_empty()
    }
}

/// Compare `output` against what merging `merger` with `mode` should produce
pub fn verify_merge(
    merger: &Merger,
    output: impl AsRef<Path>,
    mode: RenameMode,
) -> Result<VerifyReport> {
    let output = output.as_ref();
    let plan = merger.output_paths(mode)?;
    let mut merged = open_archive(output)?;

    let mut remaining: BTreeSet<String> = merged
        .file_names()
        .filter(|name| !is_dir_marker(name))
        .map(str::to_string)
        .collect();
    let mut report = VerifyReport::default();

    for (descriptor, renamed) in merger.descriptors().iter().zip(&plan) {
        let source = descriptor.path();
        let mut input = open_archive(source)?;

        for (entry, new_path) in descriptor.entries().iter().zip(renamed) {
            if !remaining.remove(new_path) {
                report.missing.push(new_path.clone());
                continue;
            }

            let expected = {
                let file = input
                    .by_name(entry)
                    .map_err(|e| MergeError::reread(source, e))?;
                sha256_hex(file).map_err(|e| MergeError::io(source, e))?
            };
            let actual = {
                let file = merged
                    .by_name(new_path)
                    .map_err(|e| MergeError::reread(output, e))?;
                sha256_hex(file).map_err(|e| MergeError::io(output, e))?
            };

            report.checked += 1;
            if expected != actual {
                warn!(entry = %new_path, "content mismatch");
                report.mismatched.push(new_path.clone());
            }
        }
    }

    report.unexpected = remaining.into_iter().collect();
    debug!(
        checked = report.checked,
        missing = report.missing.len(),
        mismatched = report.mismatched.len(),
        unexpected = report.unexpected.len(),
        "verified merged archive"
    );

    Ok(report)
}

fn sha256_hex(mut reader: impl Read) -> io::Result<String> {
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}
