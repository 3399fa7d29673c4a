//! Crawler coordinator - recursive repository mirroring
//!
//! This module walks the remote directory tree and coordinates:
//! - Retrieving each listing into a scoped temporary file
//! - Streaming the listing through the link scanner
//! - Recursing into subdirectories
//! - Downloading wanted files atomically
//! - Feeding package dependencies back into the index

use crate::crawler::classify::{base_name, classify_link, is_package_archive, FetchPolicy, LinkKind};
use crate::crawler::fetcher::{FetchError, Fetcher};
use crate::crawler::parser::LinkScanner;
use crate::deps::{scan_dependencies, CHUNK_SIZE};
use crate::index::PackageIndex;
use crate::{MirrorError, Result};
use std::collections::HashSet;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Prefix of the temporary file a listing is retrieved into
const PAGE_TEMP_PREFIX: &str = ".pkgmirror-page";

/// Prefix of the temporary file a download streams into
const DOWNLOAD_TEMP_PREFIX: &str = ".pkgmirror-";

/// Counters for one or more mirror runs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorStats {
    /// Directory listings processed
    pub directories: usize,
    /// Files written to the cache
    pub downloaded: usize,
    /// Files left alone as up to date or unwanted
    pub skipped: usize,
    /// Downloads abandoned after a transient failure
    pub failed: usize,
    /// Dependency names that were new to the index
    pub dependencies_added: usize,
}

/// Mirrors the wanted part of a remote repository into a local directory
///
/// One `Mirror` may run several times over the same tree; always-fetch files
/// are then retrieved only on the first pass.
pub struct Mirror<'a, F: Fetcher + ?Sized> {
    fetcher: &'a F,
    index: &'a mut PackageIndex,
    policy: FetchPolicy,
    refreshed: HashSet<PathBuf>,
    stats: MirrorStats,
}

impl<'a, F: Fetcher + ?Sized> Mirror<'a, F> {
    /// Creates a new mirror
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Retrieves listings and files
    /// * `index` - Wanted packages; receives discovered dependencies
    /// * `policy` - Decides which listed files are downloaded
    pub fn new(fetcher: &'a F, index: &'a mut PackageIndex, policy: FetchPolicy) -> Self {
        Self {
            fetcher,
            index,
            policy,
            refreshed: HashSet::new(),
            stats: MirrorStats::default(),
        }
    }

    pub fn stats(&self) -> &MirrorStats {
        &self.stats
    }

    /// Mirrors `remote_url` (a directory URL ending in `/`) into `local_dir`
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The whole tree was listed; some single downloads may
    ///   have failed and been counted in [`MirrorStats::failed`]
    /// * `Err(MirrorError::IncompletePage)` - A listing was cut short
    /// * `Err(MirrorError)` - Any other failure, which aborts the walk
    pub async fn run(&mut self, remote_url: &str, local_dir: &Path) -> Result<()> {
        tracing::info!("Mirroring {} into {}", remote_url, local_dir.display());
        self.mirror_dir(remote_url, local_dir).await
    }

    async fn mirror_dir(&mut self, remote_url: &str, local_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(local_dir).map_err(|source| MirrorError::AccessDenied {
            path: local_dir.to_path_buf(),
            source,
        })?;

        tracing::debug!("Listing {}", remote_url);
        self.stats.directories += 1;

        // Removed on drop, whichever way this frame exits
        let mut page = self.retrieve_page(remote_url, local_dir).await?;
        page.as_file_mut().seek(SeekFrom::Start(0))?;

        let mut scanner = LinkScanner::new();
        let mut block = [0u8; CHUNK_SIZE];

        loop {
            let n = match page.as_file_mut().read(&mut block) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };

            let hrefs: Vec<String> = scanner.feed(&block[..n]).collect();
            for href in hrefs {
                self.visit(remote_url, local_dir, &href).await?;
            }

            if scanner.is_done() {
                break;
            }
        }

        if !scanner.is_done() {
            return Err(MirrorError::IncompletePage {
                url: remote_url.to_string(),
            });
        }

        Ok(())
    }

    /// Retrieves a listing into a temporary file inside `local_dir`
    async fn retrieve_page(&self, url: &str, local_dir: &Path) -> Result<NamedTempFile> {
        let mut page = tempfile::Builder::new()
            .prefix(PAGE_TEMP_PREFIX)
            .tempfile_in(local_dir)
            .map_err(|source| MirrorError::Write {
                path: local_dir.to_path_buf(),
                source,
            })?;

        match self.fetcher.fetch_to(url, page.as_file_mut()).await {
            Ok(bytes) => tracing::trace!("Listing {} is {} bytes", url, bytes),
            Err(FetchError::Body { received, source, .. }) => {
                // Parse what arrived; a truncated listing lacks </html>
                tracing::warn!("Listing {} broke off after {} bytes: {}", url, received, source);
            }
            Err(FetchError::Stalled { received, secs, .. }) if received > 0 => {
                tracing::warn!("Listing {} stalled for {}s after {} bytes", url, secs, received);
            }
            Err(FetchError::Write(source)) => {
                return Err(MirrorError::Write {
                    path: page.path().to_path_buf(),
                    source,
                })
            }
            Err(e) => {
                return Err(MirrorError::Read {
                    resource: url.to_string(),
                    message: e.to_string(),
                })
            }
        }

        Ok(page)
    }

    /// Handles one href of the listing at `remote_url`
    async fn visit(&mut self, remote_url: &str, local_dir: &Path, href: &str) -> Result<()> {
        let kind = classify_link(href);
        if kind == LinkKind::Skip {
            tracing::trace!("Ignoring link {}", href);
            return Ok(());
        }

        let child_url = format!("{}{}", remote_url, href);
        let child_path = local_dir.join(href.trim_end_matches('/'));

        if kind == LinkKind::Directory {
            return Box::pin(self.mirror_dir(&child_url, &child_path)).await;
        }

        let decision = self.policy.decide(href, &child_path, self.index);
        if !decision.should_download() || self.refreshed.contains(&child_path) {
            tracing::debug!("Skipping {} ({:?})", href, decision);
            self.stats.skipped += 1;
            return Ok(());
        }

        let part = match self.download(&child_url, &child_path).await {
            Ok(part) => part,
            Err(e) if e.is_transient() => {
                tracing::warn!("{}", e);
                self.stats.failed += 1;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        // A package is scanned before it is moved into place, so one that
        // fails the scan is not mistaken for up to date by the next run
        if is_package_archive(base_name(href)) {
            let report = scan_dependencies(part.path(), self.index).map_err(|e| match e {
                MirrorError::Archive { source, .. } => MirrorError::Archive {
                    path: child_path.clone(),
                    source,
                },
                other => other,
            })?;
            self.stats.dependencies_added += report.added;
        }

        part.persist(&child_path).map_err(|e| MirrorError::Write {
            path: child_path.clone(),
            source: e.error,
        })?;

        tracing::info!("Downloaded {}", child_url);
        self.stats.downloaded += 1;
        self.refreshed.insert(child_path);

        Ok(())
    }

    /// Streams `url` into a temporary file beside `dest`
    ///
    /// A transient retrieval failure is returned as [`MirrorError::Read`] and
    /// leaves no partial file behind. The caller moves the returned file into
    /// place.
    async fn download(&mut self, url: &str, dest: &Path) -> Result<NamedTempFile> {
        let dir = dest.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir).map_err(|source| MirrorError::AccessDenied {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut part = tempfile::Builder::new()
            .prefix(DOWNLOAD_TEMP_PREFIX)
            .suffix(".part")
            .tempfile_in(dir)
            .map_err(|source| MirrorError::Write {
                path: dir.to_path_buf(),
                source,
            })?;

        match self.fetcher.fetch_to(url, part.as_file_mut()).await {
            Ok(bytes) => tracing::trace!("{} is {} bytes", url, bytes),
            Err(FetchError::Write(source)) => {
                return Err(MirrorError::Write {
                    path: dest.to_path_buf(),
                    source,
                })
            }
            Err(e) => {
                return Err(MirrorError::Read {
                    resource: url.to_string(),
                    message: e.to_string(),
                })
            }
        }

        Ok(part)
    }
}
