//! Link classification and download decisions
//!
//! Directory listings mix navigation links, absolute links, sort-order
//! links and the entries themselves. Only relative entries below the
//! current directory are ever followed.

use crate::index::{PackageIndex, PackageName};
use std::path::Path;

/// Extensions of tar-based package archives
const ARCHIVE_EXTENSIONS: &[&str] = &["txz", "tzst", "tgz", "tar", "pkg"];

/// Repository catalogs share the archive extensions but carry no manifest
const CATALOG_STEMS: &[&str] = &["digests", "meta", "packagesite", "data"];

/// What a listing href points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// Absolute, parent, hidden, sort-order or otherwise out-of-tree link
    Skip,
    /// A subdirectory (trailing `/`)
    Directory,
    /// A file in this directory
    File,
}

/// Classifies an href found in a directory listing
pub fn classify_link(href: &str) -> LinkKind {
    if href.is_empty() || href.starts_with(['/', '.', '?', '#']) {
        return LinkKind::Skip;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("http:") || lower.starts_with("https:") {
        return LinkKind::Skip;
    }

    if href.split('/').any(|segment| segment == "..") {
        return LinkKind::Skip;
    }

    if href.ends_with('/') {
        LinkKind::Directory
    } else {
        LinkKind::File
    }
}

/// Last path segment of an href
pub fn base_name(href: &str) -> &str {
    let trimmed = href.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(pos) => &trimmed[pos + 1..],
        None => trimmed,
    }
}

/// True for package archives whose manifest lists dependencies
///
/// Repository catalogs (`packagesite.pkg`, `meta.txz`, ...) use the same
/// extensions and are excluded by stem.
pub fn is_package_archive(name: &str) -> bool {
    let Some((stem, ext)) = name.rsplit_once('.') else {
        return false;
    };

    if stem.is_empty() {
        return false;
    }

    let ext = ext.to_ascii_lowercase();
    if !ARCHIVE_EXTENSIONS.contains(&ext.as_str()) {
        return false;
    }

    !CATALOG_STEMS
        .iter()
        .any(|catalog| stem.eq_ignore_ascii_case(catalog))
}

/// Why a file was or wasn't downloaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Listed in the always-fetch set; refreshed on every run
    AlwaysFetch,
    /// A wanted package not yet present locally
    Wanted,
    /// A wanted package already present locally
    UpToDate,
    /// Not in the package index
    Unwanted,
}

impl Decision {
    pub fn should_download(self) -> bool {
        matches!(self, Self::AlwaysFetch | Self::Wanted)
    }
}

/// Decides which listed files are downloaded
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    always_fetch: Vec<String>,
}

impl FetchPolicy {
    /// Creates a policy from always-fetch file names (matched case-insensitively)
    pub fn new<I, S>(always_fetch: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            always_fetch: always_fetch
                .into_iter()
                .map(|name| name.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn is_always_fetch(&self, file_name: &str) -> bool {
        let lower = file_name.to_ascii_lowercase();
        self.always_fetch.iter().any(|name| *name == lower)
    }

    /// Decides what to do with a listed file
    ///
    /// # Arguments
    ///
    /// * `href` - The listing entry, relative to its directory
    /// * `local_path` - Where the file would be stored
    /// * `index` - The wanted packages
    pub fn decide(&self, href: &str, local_path: &Path, index: &PackageIndex) -> Decision {
        let file_name = base_name(href);

        if self.is_always_fetch(file_name) {
            return Decision::AlwaysFetch;
        }

        let wanted = PackageName::normalize(file_name)
            .map(|name| index.contains(&name))
            .unwrap_or(false);

        if !wanted {
            Decision::Unwanted
        } else if local_path.exists() {
            Decision::UpToDate
        } else {
            Decision::Wanted
        }
    }
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_ALWAYS_FETCH)
    }
}
