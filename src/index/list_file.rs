//! Package list persistence
//!
//! The package list is a plain text file. The first line holds the repository
//! base URL; every following line holds one package base-name, sorted.

use super::PackageIndex;
use crate::{MirrorError, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::Path;

impl PackageIndex {
    /// Loads a package list file
    ///
    /// A missing file yields an empty index so that a first run can start
    /// from nothing. Session counters are reset after loading because the
    /// load itself is not session activity.
    ///
    /// # Returns
    ///
    /// * `Ok(PackageIndex)` - The loaded (or empty) index
    /// * `Err(MirrorError::AccessDenied)` - The file exists but can't be opened
    /// * `Err(MirrorError::Read)` - A line could not be read
    pub fn load(path: &Path) -> Result<Self> {
        let mut index = Self::new();

        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No package list at {}, starting empty", path.display());
                return Ok(index);
            }
            Err(source) => {
                return Err(MirrorError::AccessDenied {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let read_error = |e: std::io::Error| MirrorError::Read {
            resource: path.display().to_string(),
            message: e.to_string(),
        };

        let mut lines = BufReader::new(file).lines();

        if let Some(first) = lines.next() {
            let first = first.map_err(read_error)?;
            index.set_repository_url(first.trim_end_matches(['\r', '\n']));
        }

        for line in lines {
            index.add(&line.map_err(read_error)?)?;
        }

        index.reset_stats();
        tracing::debug!(
            "Loaded {} package names from {}",
            index.len(),
            path.display()
        );

        Ok(index)
    }

    /// Saves the index as a package list file
    ///
    /// The destination may be left partially written when a write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|source| MirrorError::AccessDenied {
            path: path.to_path_buf(),
            source,
        })?;

        let write_error = |source: std::io::Error| MirrorError::Write {
            path: path.to_path_buf(),
            source,
        };

        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", self.repository_url().unwrap_or_default()).map_err(write_error)?;
        for name in self.iter() {
            writeln!(writer, "{}", name).map_err(write_error)?;
        }
        writer.flush().map_err(write_error)?;

        tracing::debug!("Saved {} package names to {}", self.len(), path.display());
        Ok(())
    }
}
