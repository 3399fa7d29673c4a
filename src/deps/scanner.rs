use crate::deps::archive::{ArchiveError, PackageArchive};
use crate::deps::tokenizer::{ManifestScanner, ManifestToken};
use crate::index::{AddOutcome, PackageIndex};
use crate::{MirrorError, Result};
use std::io::Read;
use std::path::Path;

/// Archive member holding the full package metadata
pub const MANIFEST_ENTRY: &str = "+MANIFEST";

/// Key of the object whose immediate keys are dependency names
pub const DEPS_KEY: &str = "deps";

/// Bytes read from the manifest per tokenizer call
pub const CHUNK_SIZE: usize = 2048;

/// Outcome of scanning one package archive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Dependency names found in the manifest
    pub dependencies: usize,
    /// How many of those were not yet in the index
    pub added: usize,
}

/// Tracks where the token stream is relative to the `deps` object
#[derive(Debug, Default)]
struct DepsTracker {
    deps_level: Option<i32>,
}

enum Verdict {
    Ignore,
    Dependency,
    Finished,
}

impl DepsTracker {
    fn classify(&mut self, token: &ManifestToken) -> Verdict {
        let Some(deps_level) = self.deps_level else {
            if token.text == DEPS_KEY {
                self.deps_level = Some(token.level);
            }
            return Verdict::Ignore;
        };

        if token.level == deps_level + 1 {
            Verdict::Dependency
        } else if token.level <= deps_level {
            // A sibling key of "deps": its object has closed
            Verdict::Finished
        } else {
            Verdict::Ignore
        }
    }
}

/// Reads the dependency list of a package and adds it to the index
///
/// Only the `+MANIFEST` entry is examined. Its bytes are tokenized in
/// [`CHUNK_SIZE`] chunks, and every key directly inside the `deps` object is
/// added to `index`. Scanning stops as soon as the `deps` object closes.
///
/// # Arguments
///
/// * `archive_path` - A downloaded package archive
/// * `index` - The index that receives the dependency names
///
/// # Returns
///
/// * `Ok(ScanReport)` - Dependencies registered (possibly none)
/// * `Err(MirrorError::Archive)` - Unreadable archive or no manifest
/// * `Err(MirrorError::ResourceExhausted)` - The index could not grow
pub fn scan_dependencies(archive_path: &Path, index: &mut PackageIndex) -> Result<ScanReport> {
    let archive_error = |source: ArchiveError| MirrorError::Archive {
        path: archive_path.to_path_buf(),
        source,
    };

    let mut archive = PackageArchive::open(archive_path).map_err(archive_error)?;

    for entry in archive.entries().map_err(archive_error)? {
        let mut entry = entry.map_err(archive_error)?;
        if entry.name() != MANIFEST_ENTRY {
            // tar skips the unread data when advancing
            continue;
        }

        let report = scan_manifest(&mut entry, index).map_err(|e| match e {
            ManifestReadError::Io(source) => archive_error(ArchiveError::Entry {
                entry: MANIFEST_ENTRY.to_string(),
                source,
            }),
            ManifestReadError::Index(e) => e,
        })?;

        tracing::debug!(
            "{}: {} dependencies, {} new",
            archive_path.display(),
            report.dependencies,
            report.added
        );
        return Ok(report);
    }

    Err(archive_error(ArchiveError::ManifestMissing(MANIFEST_ENTRY)))
}

enum ManifestReadError {
    Io(std::io::Error),
    Index(MirrorError),
}

/// Streams a manifest through the tokenizer and registers its dependencies
fn scan_manifest<R: Read>(
    reader: &mut R,
    index: &mut PackageIndex,
) -> std::result::Result<ScanReport, ManifestReadError> {
    let mut scanner = ManifestScanner::new();
    let mut tracker = DepsTracker::default();
    let mut report = ScanReport::default();
    let mut block = [0u8; CHUNK_SIZE];

    loop {
        let n = match reader.read(&mut block) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ManifestReadError::Io(e)),
        };

        for token in scanner.feed(&block[..n]) {
            match tracker.classify(&token) {
                Verdict::Ignore => {}
                Verdict::Dependency => {
                    report.dependencies += 1;
                    tracing::trace!("Dependency: {}", token.text);
                    if index.add(&token.text).map_err(ManifestReadError::Index)?
                        == AddOutcome::Added
                    {
                        report.added += 1;
                    }
                }
                Verdict::Finished => return Ok(report),
            }
        }
    }

    Ok(report)
}
