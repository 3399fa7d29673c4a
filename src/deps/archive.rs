//! Sequential access to package archives
//!
//! FreeBSD packages are tar streams wrapped in xz (`.txz`, older `.pkg`),
//! zstd (current `.pkg`) or occasionally gzip. The compression is detected
//! from magic bytes rather than the file name, since `.pkg` covers several.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use thiserror::Error;

/// Errors raised while opening or walking an archive
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("can't open archive: {0}")]
    Open(std::io::Error),

    #[error("corrupted archive: {0}")]
    Corrupted(std::io::Error),

    #[error("can't read entry {entry}: {source}")]
    Entry {
        entry: String,
        source: std::io::Error,
    },

    #[error("no {0} entry in archive")]
    ManifestMissing(&'static str),
}

/// Outer compression of a tar stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Xz,
    Zstd,
}

impl Compression {
    /// Identifies the compression from the first bytes of a file
    pub fn sniff(head: &[u8]) -> Self {
        if head.starts_with(&[0xFD, b'7', b'z', b'X', b'Z', 0x00]) {
            Self::Xz
        } else if head.starts_with(&[0x28, 0xB5, 0x2F, 0xFD]) {
            Self::Zstd
        } else if head.starts_with(&[0x1F, 0x8B]) {
            Self::Gzip
        } else {
            Self::None
        }
    }
}

fn wrap_reader<R: Read + 'static>(
    reader: R,
    codec: Compression,
) -> Result<Box<dyn Read>, ArchiveError> {
    match codec {
        Compression::None => Ok(Box::new(reader)),
        Compression::Gzip => Ok(Box::new(flate2::read::GzDecoder::new(reader))),
        Compression::Xz => Ok(Box::new(xz2::read::XzDecoder::new(reader))),
        Compression::Zstd => {
            let decoder = zstd::stream::read::Decoder::new(reader).map_err(ArchiveError::Open)?;
            Ok(Box::new(decoder))
        }
    }
}

/// An opened package archive, read front to back exactly once
pub struct PackageArchive {
    archive: tar::Archive<Box<dyn Read>>,
    compression: Compression,
}

impl PackageArchive {
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        let file = File::open(path).map_err(ArchiveError::Open)?;
        let mut reader = BufReader::new(file);
        let compression = Compression::sniff(reader.fill_buf().map_err(ArchiveError::Open)?);

        tracing::trace!("{} is a {:?} tar stream", path.display(), compression);

        Ok(Self {
            archive: tar::Archive::new(wrap_reader(reader, compression)?),
            compression,
        })
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Iterates entries in archive order
    pub fn entries(&mut self) -> Result<ArchiveEntries<'_>, ArchiveError> {
        Ok(ArchiveEntries {
            inner: self.archive.entries().map_err(ArchiveError::Corrupted)?,
        })
    }
}

/// Entry iterator; an entry's data must be read before advancing past it
pub struct ArchiveEntries<'a> {
    inner: tar::Entries<'a, Box<dyn Read>>,
}

impl<'a> Iterator for ArchiveEntries<'a> {
    type Item = Result<ArchiveEntry<'a>, ArchiveError>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = match self.inner.next()? {
            Ok(entry) => entry,
            Err(e) => return Some(Err(ArchiveError::Corrupted(e))),
        };

        let name = match entry.path() {
            Ok(path) => path.to_string_lossy().into_owned(),
            Err(e) => return Some(Err(ArchiveError::Corrupted(e))),
        };

        Some(Ok(ArchiveEntry { name, entry }))
    }
}

/// One archive member, readable as a byte stream
pub struct ArchiveEntry<'a> {
    name: String,
    entry: tar::Entry<'a, Box<dyn Read>>,
}

impl ArchiveEntry<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Read for ArchiveEntry<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.entry.read(buf)
    }
}
