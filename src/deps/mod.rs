//! Dependency discovery for downloaded packages
//!
//! This module contains:
//! - Sequential reading of compressed package archives
//! - A streaming tokenizer for the package manifest
//! - The scanner that registers dependency names in the package index

mod archive;
mod scanner;
mod tokenizer;

pub use archive::{ArchiveEntries, ArchiveEntry, ArchiveError, Compression, PackageArchive};
pub use scanner::{scan_dependencies, ScanReport, CHUNK_SIZE, DEPS_KEY, MANIFEST_ENTRY};
pub use tokenizer::{ManifestScanner, ManifestToken, Tokens};
