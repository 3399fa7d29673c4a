use serde::Deserialize;

/// Read timeout used when nothing better is configured (3 minutes)
pub const DEFAULT_TIMEOUT_SECS: u64 = 180;

/// Repository files that are fetched on every run regardless of the list
pub const DEFAULT_ALWAYS_FETCH: &[&str] = &[
    "digests.txz",
    "meta.txz",
    "packagesite.txz",
    "pkg-devel.txz",
    "pkg.txz",
    "pkg.txz.sig",
    "meta.conf",
    "digests.pkg",
    "data.pkg",
    "packagesite.pkg",
    "pkg.pkg",
    "pkg.pkg.sig",
];

/// Main configuration structure for pkgmirror
///
/// Every section is optional; an empty file yields [`Config::default`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub mirror: MirrorConfig,
}

/// HTTP retrieval configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Longest wait for response data, in seconds
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connection establishment timeout in seconds
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

/// Mirror behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MirrorConfig {
    /// Package list filename used when only a directory is given
    #[serde(rename = "list-file", default = "default_list_file")]
    pub list_file: String,

    /// Repository URL used when the package list does not carry one
    #[serde(rename = "repository-url", default)]
    pub repository_url: Option<String>,

    /// Repository metadata files downloaded unconditionally
    #[serde(rename = "always-fetch", default = "default_always_fetch")]
    pub always_fetch: Vec<String>,

    /// How many times a truncated directory listing is re-crawled
    #[serde(rename = "incomplete-page-retries", default = "default_retries")]
    pub incomplete_page_retries: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            list_file: default_list_file(),
            repository_url: None,
            always_fetch: default_always_fetch(),
            incomplete_page_retries: default_retries(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("pkgmirror/{}", env!("CARGO_PKG_VERSION"))
}

fn default_list_file() -> String {
    ".pkgcachelist".to_string()
}

fn default_always_fetch() -> Vec<String> {
    DEFAULT_ALWAYS_FETCH.iter().map(|s| s.to_string()).collect()
}

fn default_retries() -> u32 {
    3
}
