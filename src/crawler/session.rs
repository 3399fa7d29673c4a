use crate::config::MirrorConfig;
use crate::crawler::classify::FetchPolicy;
use crate::crawler::coordinator::{Mirror, MirrorStats};
use crate::crawler::fetcher::Fetcher;
use crate::index::PackageIndex;
use crate::{MirrorError, Result};
use std::path::Path;

/// Summary of a [`download_updates`] call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    /// Complete passes over the repository tree
    pub rounds: usize,
    /// Passes restarted after a listing was cut short
    pub retries: u32,
    /// Counters summed over every pass
    pub stats: MirrorStats,
}

/// Brings the local cache up to date with the repository
///
/// The repository tree is walked until a full pass adds no new package names.
/// A dependency discovered after its directory was already listed is thus
/// fetched by the following pass. A listing that arrives truncated restarts
/// the pass, at most `settings.incomplete_page_retries` times.
///
/// # Arguments
///
/// * `fetcher` - Retrieves listings and files
/// * `index` - Wanted packages, with the repository URL
/// * `cache_dir` - Local root of the mirror
/// * `settings` - Always-fetch names and the retry limit
///
/// # Returns
///
/// * `Ok(SessionReport)` - The cache is up to date
/// * `Err(MirrorError::RepositoryUrlMissing)` - The index carries no URL
/// * `Err(MirrorError)` - The first non-recoverable failure
pub async fn download_updates<F: Fetcher + ?Sized>(
    fetcher: &F,
    index: &mut PackageIndex,
    cache_dir: &Path,
    settings: &MirrorConfig,
) -> Result<SessionReport> {
    let url = index
        .repository_url()
        .ok_or(MirrorError::RepositoryUrlMissing)?
        .to_string();

    let policy = FetchPolicy::new(&settings.always_fetch);
    let mut mirror = Mirror::new(fetcher, index, policy);
    let mut report = SessionReport::default();

    loop {
        let known_before = mirror.stats().dependencies_added;

        match mirror.run(&url, cache_dir).await {
            Ok(()) => report.rounds += 1,
            Err(e) if e.is_retryable() && report.retries < settings.incomplete_page_retries => {
                report.retries += 1;
                tracing::warn!(
                    "{}; retrying ({}/{})",
                    e,
                    report.retries,
                    settings.incomplete_page_retries
                );
                continue;
            }
            Err(e) => return Err(e),
        }

        let added = mirror.stats().dependencies_added - known_before;
        if added == 0 {
            break;
        }
        tracing::info!("{} dependencies discovered late, walking the tree again", added);
    }

    report.stats = mirror.stats().clone();
    tracing::info!(
        "Mirror complete: {} downloaded, {} skipped, {} failed in {} round(s)",
        report.stats.downloaded,
        report.stats.skipped,
        report.stats.failed,
        report.rounds
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::fetcher::FetchError;
    use async_trait::async_trait;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Serves one listing, truncated for the first `failures` requests
    struct FlakyListing {
        failures: usize,
        served: AtomicUsize,
    }

    #[async_trait]
    impl Fetcher for FlakyListing {
        async fn fetch_to(
            &self,
            _url: &str,
            dest: &mut (dyn Write + Send),
        ) -> std::result::Result<u64, FetchError> {
            let attempt = self.served.fetch_add(1, Ordering::SeqCst);
            let body: &[u8] = if attempt < self.failures {
                b"<html><body>"
            } else {
                b"<html><body></body></html>"
            };
            dest.write_all(body).map_err(FetchError::Write)?;
            Ok(body.len() as u64)
        }
    }

    fn settings(retries: u32) -> MirrorConfig {
        MirrorConfig {
            incomplete_page_retries: retries,
            ..MirrorConfig::default()
        }
    }

    fn index_for(url: &str) -> PackageIndex {
        let mut index = PackageIndex::new();
        index.set_repository_url(url);
        index
    }

    #[tokio::test]
    async fn test_missing_url() {
        let fetcher = FlakyListing {
            failures: 0,
            served: AtomicUsize::new(0),
        };
        let dir = TempDir::new().unwrap();
        let mut index = PackageIndex::new();

        let result = download_updates(&fetcher, &mut index, dir.path(), &settings(3)).await;
        assert!(matches!(result, Err(MirrorError::RepositoryUrlMissing)));
        assert_eq!(fetcher.served.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_incomplete_page_is_retried() {
        let fetcher = FlakyListing {
            failures: 2,
            served: AtomicUsize::new(0),
        };
        let dir = TempDir::new().unwrap();
        let mut index = index_for("http://mirror.test/repo");

        let report = download_updates(&fetcher, &mut index, dir.path(), &settings(3))
            .await
            .unwrap();

        assert_eq!(report.retries, 2);
        assert_eq!(report.rounds, 1);
        assert_eq!(fetcher.served.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_limit() {
        let fetcher = FlakyListing {
            failures: 10,
            served: AtomicUsize::new(0),
        };
        let dir = TempDir::new().unwrap();
        let mut index = index_for("http://mirror.test/repo/");

        let result = download_updates(&fetcher, &mut index, dir.path(), &settings(1)).await;

        assert!(matches!(result, Err(MirrorError::IncompletePage { .. })));
        assert_eq!(fetcher.served.load(Ordering::SeqCst), 2);
    }
}
