//! Crawler module for repository mirroring
//!
//! This module contains the core mirroring logic, including:
//! - HTTP fetching behind the [`Fetcher`] trait
//! - Streaming link extraction from directory listings
//! - Link classification and download decisions
//! - The recursive mirror walk and the multi-round session around it

mod classify;
mod coordinator;
mod fetcher;
mod parser;
mod session;

pub use classify::{base_name, classify_link, is_package_archive, Decision, FetchPolicy, LinkKind};
pub use coordinator::{Mirror, MirrorStats};
pub use fetcher::{build_http_client, FetchError, Fetcher, HttpFetcher};
pub use parser::{extract_links, LinkScanner, LinkState, Links, MAX_TOKEN_LEN};
pub use session::{download_updates, SessionReport};
