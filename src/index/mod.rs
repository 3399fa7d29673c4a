//! The wanted-package index
//!
//! This module holds the sorted, deduplicated list of package base-names that
//! drives every download decision:
//! - Name normalization (version suffix and whitespace stripping)
//! - Sorted insertion with a hybrid linear/binary search
//! - Per-session new/existing counters
//! - Persistence to the package list file (see [`list_file`])

mod list_file;
mod name;

pub use name::{PackageName, MAX_NAME_LEN};
pub(crate) use name::is_space;

use crate::{MirrorError, Result};
use std::cmp::Ordering;

/// Slots reserved by the first insertion
const INITIAL_CAPACITY: usize = 50;

/// Ranges smaller than this are scanned linearly
const LINEAR_SEARCH_THRESHOLD: usize = 8;

/// What an [`PackageIndex::add`] call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The name was not present and has been inserted
    Added,
    /// The name was already present
    AlreadyPresent,
    /// The raw input normalized to nothing
    Ignored,
}

/// Sorted set of wanted package base-names plus the repository URL
#[derive(Debug, Default)]
pub struct PackageIndex {
    names: Vec<PackageName>,
    repository_url: Option<String>,
    last_insert: Option<usize>,
    stat_new: usize,
    stat_existing: usize,
    exhausted: bool,
}

impl PackageIndex {
    /// Creates an empty index with no repository URL
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a raw package name
    ///
    /// The name is normalized first; input that normalizes to nothing is
    /// ignored without touching the counters.
    ///
    /// # Returns
    ///
    /// * `Ok(AddOutcome)` - Whether the name was inserted or already known
    /// * `Err(MirrorError::ResourceExhausted)` - Storage could not grow; every
    ///   later call fails the same way
    pub fn add(&mut self, raw: &str) -> Result<AddOutcome> {
        if self.exhausted {
            return Err(MirrorError::ResourceExhausted);
        }

        let Some(name) = PackageName::normalize(raw) else {
            return Ok(AddOutcome::Ignored);
        };

        self.ensure_capacity()?;

        match self.locate(name.as_str()) {
            Ok(_) => {
                self.stat_existing += 1;
                Ok(AddOutcome::AlreadyPresent)
            }
            Err(pos) => {
                self.names.insert(pos, name);
                self.last_insert = Some(pos);
                self.stat_new += 1;
                Ok(AddOutcome::Added)
            }
        }
    }

    /// Returns true if the normalized form of `raw` is in the index
    pub fn contains(&self, raw: &str) -> bool {
        match PackageName::normalize(raw) {
            Some(name) => self.locate(name.as_str()).is_ok(),
            None => false,
        }
    }

    /// Iterates the names in ascending order
    pub fn iter(&self) -> std::slice::Iter<'_, PackageName> {
        self.names.iter()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names added for the first time this session
    pub fn stat_new(&self) -> usize {
        self.stat_new
    }

    /// Adds of names that were already present this session
    pub fn stat_existing(&self) -> usize {
        self.stat_existing
    }

    /// Repository base URL, always ending in `/`
    pub fn repository_url(&self) -> Option<&str> {
        self.repository_url.as_deref()
    }

    /// Sets the repository base URL, appending a trailing `/` if missing
    ///
    /// An empty string clears the URL.
    pub fn set_repository_url(&mut self, url: &str) {
        self.repository_url = if url.is_empty() {
            None
        } else if url.ends_with('/') {
            Some(url.to_string())
        } else {
            Some(format!("{}/", url))
        };
    }

    #[cfg(test)]
    pub(crate) fn mark_exhausted(&mut self) {
        self.exhausted = true;
    }

    pub(crate) fn reset_stats(&mut self) {
        self.stat_new = 0;
        self.stat_existing = 0;
    }

    /// Grows storage geometrically: 50 slots first, doubling when fewer than
    /// two free slots remain
    fn ensure_capacity(&mut self) -> Result<()> {
        let capacity = self.names.capacity();
        let len = self.names.len();

        let wanted = if capacity == 0 {
            INITIAL_CAPACITY
        } else if capacity - len < 2 {
            capacity * 2
        } else {
            return Ok(());
        };

        self.names.try_reserve_exact(wanted - len).map_err(|e| {
            tracing::error!("Package list allocation of {} slots failed: {}", wanted, e);
            self.exhausted = true;
            MirrorError::ResourceExhausted
        })
    }

    /// Finds `name`, probing the last insertion point before a range search
    ///
    /// Same contract as `slice::binary_search`: `Ok(index)` when found,
    /// `Err(position)` with the sorted insertion position otherwise.
    fn locate(&self, name: &str) -> std::result::Result<usize, usize> {
        let len = self.names.len();

        match self.last_insert.filter(|&hint| hint < len) {
            Some(hint) => match self.names[hint].as_str().cmp(name) {
                Ordering::Equal => Ok(hint),
                Ordering::Less => search_range(&self.names, name, hint + 1, len),
                Ordering::Greater => search_range(&self.names, name, 0, hint),
            },
            None => search_range(&self.names, name, 0, len),
        }
    }
}

impl<'a> IntoIterator for &'a PackageIndex {
    type Item = &'a PackageName;
    type IntoIter = std::slice::Iter<'a, PackageName>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Searches the half-open range `[lo, hi)` of a sorted slice
///
/// Binary search narrows the range until it is small enough that a linear
/// scan is cheaper.
fn search_range(
    names: &[PackageName],
    name: &str,
    mut lo: usize,
    mut hi: usize,
) -> std::result::Result<usize, usize> {
    while hi - lo >= LINEAR_SEARCH_THRESHOLD {
        let mid = lo + (hi - lo) / 2;
        match names[mid].as_str().cmp(name) {
            Ordering::Equal => return Ok(mid),
            Ordering::Less => lo = mid + 1,
            Ordering::Greater => hi = mid,
        }
    }

    for (i, candidate) in names[lo..hi].iter().enumerate() {
        match candidate.as_str().cmp(name) {
            Ordering::Less => continue,
            Ordering::Equal => return Ok(lo + i),
            Ordering::Greater => return Err(lo + i),
        }
    }

    Err(hi)
}
