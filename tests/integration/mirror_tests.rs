//! Integration tests for the mirror
//!
//! These tests use wiremock to serve a small package repository and run
//! the full download session end-to-end against it.

use pkgmirror::config::{HttpConfig, MirrorConfig};
use pkgmirror::crawler::{download_updates, HttpFetcher};
use pkgmirror::{MirrorError, PackageIndex};
use std::io::Write;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Renders an Apache-style directory listing
fn listing(title: &str, hrefs: &[&str]) -> String {
    let mut html = format!(
        "<!DOCTYPE HTML PUBLIC \"-//W3C//DTD HTML 3.2 Final//EN\">\n<html>\n<head>\n\
         <title>Index of {0}</title>\n</head>\n<body>\n<h1>Index of {0}</h1>\n<pre>\
         <a href=\"?C=N;O=D\">Name</a>  <a href=\"?C=M;O=A\">Last modified</a>\n<hr>\
         <a href=\"/\">Parent Directory</a>\n",
        title
    );
    for href in hrefs {
        html.push_str(&format!(
            "<a href=\"{0}\">{0}</a>    10-Jan-2024 04:11  1.2M\n",
            href
        ));
    }
    html.push_str("<hr></pre>\n</body>\n</HTML>\n");
    html
}

fn tar_with_manifest(manifest: &str) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, data) in [
        ("+COMPACT_MANIFEST", r#"{"name":"compact"}"#),
        ("+MANIFEST", manifest),
    ] {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        builder.append_data(&mut header, name, data.as_bytes()).unwrap();
    }
    builder.into_inner().unwrap()
}

/// A `.txz` style package
fn xz_package(manifest: &str) -> Vec<u8> {
    let mut xz = xz2::write::XzEncoder::new(Vec::new(), 6);
    xz.write_all(&tar_with_manifest(manifest)).unwrap();
    xz.finish().unwrap()
}

/// A current `.pkg` package
fn zstd_package(manifest: &str) -> Vec<u8> {
    zstd::stream::encode_all(&tar_with_manifest(manifest)[..], 3).unwrap()
}

async fn serve(server: &MockServer, route: &str, body: Vec<u8>, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .expect(times)
        .mount(server)
        .await;
}

fn test_fetcher() -> HttpFetcher {
    HttpFetcher::new(&HttpConfig::default(), 10).unwrap()
}

#[tokio::test]
async fn test_full_mirror_with_dependencies() {
    let server = MockServer::start().await;
    let base_url = format!("{}/FreeBSD:14:amd64/latest", server.uri());

    serve(
        &server,
        "/FreeBSD:14:amd64/latest/",
        listing(
            "/FreeBSD:14:amd64/latest",
            &["All/", "Latest/", "meta.conf", "packagesite.pkg", "http://elsewhere/"],
        )
        .into_bytes(),
        2,
    )
    .await;

    serve(
        &server,
        "/FreeBSD:14:amd64/latest/All/",
        listing(
            "/FreeBSD:14:amd64/latest/All",
            &[
                "aaa-1.0.pkg",
                "curl-8.4.0.pkg",
                "libpsl-0.21.2_4.pkg",
                "vim-9.0.2116.pkg",
                "zzz-2.0.pkg",
            ],
        )
        .into_bytes(),
        2,
    )
    .await;

    serve(
        &server,
        "/FreeBSD:14:amd64/latest/Latest/",
        listing("/FreeBSD:14:amd64/latest/Latest", &["pkg.txz"]).into_bytes(),
        2,
    )
    .await;

    // aaa is listed before zzz, which depends on it: fetched in the second round
    serve(
        &server,
        "/FreeBSD:14:amd64/latest/All/aaa-1.0.pkg",
        zstd_package(r#"{"name":"aaa","deps":{}}"#),
        1,
    )
    .await;
    serve(
        &server,
        "/FreeBSD:14:amd64/latest/All/curl-8.4.0.pkg",
        zstd_package(
            r#"{"name":"curl","deps":{"libpsl":{"origin":"dns/libpsl","version":"0.21.2_4"}}}"#,
        ),
        1,
    )
    .await;
    serve(
        &server,
        "/FreeBSD:14:amd64/latest/All/libpsl-0.21.2_4.pkg",
        zstd_package(r#"{"name":"libpsl"}"#),
        1,
    )
    .await;
    serve(
        &server,
        "/FreeBSD:14:amd64/latest/All/vim-9.0.2116.pkg",
        zstd_package("{}"),
        0,
    )
    .await;
    serve(
        &server,
        "/FreeBSD:14:amd64/latest/All/zzz-2.0.pkg",
        xz_package(r#"{"name":"zzz","deps":{"aaa":{"origin":"misc/aaa"}},"options":{}}"#),
        1,
    )
    .await;
    serve(
        &server,
        "/FreeBSD:14:amd64/latest/Latest/pkg.txz",
        xz_package(r#"{"name":"pkg","origin":"ports-mgmt/pkg"}"#),
        1,
    )
    .await;
    serve(
        &server,
        "/FreeBSD:14:amd64/latest/meta.conf",
        b"version = 2;\npacking_format = \"tzst\";\n".to_vec(),
        1,
    )
    .await;
    serve(
        &server,
        "/FreeBSD:14:amd64/latest/packagesite.pkg",
        b"catalog".to_vec(),
        1,
    )
    .await;

    let cache = TempDir::new().unwrap();
    let mut index = PackageIndex::new();
    index.set_repository_url(&base_url);
    index.add("curl-8.4.0").unwrap();
    index.add("zzz").unwrap();

    let report = download_updates(&test_fetcher(), &mut index, cache.path(), &MirrorConfig::default())
        .await
        .unwrap();

    assert_eq!(report.rounds, 2);
    assert_eq!(report.retries, 0);
    assert_eq!(report.stats.downloaded, 7);
    assert_eq!(report.stats.failed, 0);
    assert_eq!(report.stats.dependencies_added, 2);

    for file in [
        "All/aaa-1.0.pkg",
        "All/curl-8.4.0.pkg",
        "All/libpsl-0.21.2_4.pkg",
        "All/zzz-2.0.pkg",
        "Latest/pkg.txz",
        "meta.conf",
        "packagesite.pkg",
    ] {
        assert!(cache.path().join(file).is_file(), "{} missing", file);
    }
    assert!(!cache.path().join("All/vim-9.0.2116.pkg").exists());

    let names: Vec<&str> = index.iter().map(|n| n.as_str()).collect();
    assert_eq!(names, vec!["aaa", "curl", "libpsl", "zzz"]);

    // Nothing but the mirrored tree is left in the cache
    let mut leftovers = Vec::new();
    for dir in [cache.path().to_path_buf(), cache.path().join("All"), cache.path().join("Latest")] {
        for entry in std::fs::read_dir(dir).unwrap() {
            let name = entry.unwrap().file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                leftovers.push(name);
            }
        }
    }
    assert!(leftovers.is_empty(), "{:?}", leftovers);
}

#[tokio::test]
async fn test_package_list_survives_a_session() {
    let server = MockServer::start().await;
    let base_url = format!("{}/repo/", server.uri());

    // The new names make the session walk the tree a second time
    serve(&server, "/repo/", listing("/repo", &["git-2.43.0.pkg"]).into_bytes(), 2).await;
    serve(
        &server,
        "/repo/git-2.43.0.pkg",
        zstd_package(r#"{"name":"git","deps":{"curl":{},"expat":{},"pcre2":{}}}"#),
        1,
    )
    .await;

    let cache = TempDir::new().unwrap();
    let list = cache.path().join(".pkgcachelist");
    std::fs::write(&list, format!("{}\ngit\n", base_url)).unwrap();

    let mut index = PackageIndex::load(&list).unwrap();
    download_updates(&test_fetcher(), &mut index, cache.path(), &MirrorConfig::default())
        .await
        .unwrap();
    index.save(&list).unwrap();

    let reloaded = PackageIndex::load(&list).unwrap();
    assert_eq!(reloaded.repository_url(), Some(base_url.as_str()));
    let names: Vec<&str> = reloaded.iter().map(|n| n.as_str()).collect();
    assert_eq!(names, vec!["curl", "expat", "git", "pcre2"]);
}

#[tokio::test]
async fn test_missing_package_is_skipped() {
    let server = MockServer::start().await;

    serve(
        &server,
        "/repo/",
        listing("/repo", &["gone-1.0.pkg", "here-1.0.pkg"]).into_bytes(),
        1,
    )
    .await;
    serve(&server, "/repo/here-1.0.pkg", zstd_package("{}"), 1).await;
    Mock::given(method("GET"))
        .and(path("/repo/gone-1.0.pkg"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let cache = TempDir::new().unwrap();
    let mut index = PackageIndex::new();
    index.set_repository_url(&format!("{}/repo", server.uri()));
    index.add("gone").unwrap();
    index.add("here").unwrap();

    let report = download_updates(&test_fetcher(), &mut index, cache.path(), &MirrorConfig::default())
        .await
        .unwrap();

    assert_eq!(report.stats.failed, 1);
    assert_eq!(report.stats.downloaded, 1);
    assert!(!cache.path().join("gone-1.0.pkg").exists());
    assert!(cache.path().join("here-1.0.pkg").exists());
}

#[tokio::test]
async fn test_truncated_listing_fails_after_retries() {
    let server = MockServer::start().await;

    serve(
        &server,
        "/repo/",
        b"<html><body><pre><a href=\"All/\">All/</a>\n".to_vec(),
        3,
    )
    .await;
    serve(&server, "/repo/All/", listing("/repo/All", &[]).into_bytes(), 3).await;

    let cache = TempDir::new().unwrap();
    let mut index = PackageIndex::new();
    index.set_repository_url(&format!("{}/repo/", server.uri()));

    let settings = MirrorConfig {
        incomplete_page_retries: 2,
        ..MirrorConfig::default()
    };
    let result = download_updates(&test_fetcher(), &mut index, cache.path(), &settings).await;

    match result {
        Err(MirrorError::IncompletePage { url }) => {
            assert_eq!(url, format!("{}/repo/", server.uri()));
        }
        other => panic!("expected IncompletePage, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_listing_is_fatal() {
    let server = MockServer::start().await;

    let cache = TempDir::new().unwrap();
    let mut index = PackageIndex::new();
    index.set_repository_url(&format!("{}/nothing-here/", server.uri()));

    let result =
        download_updates(&test_fetcher(), &mut index, cache.path(), &MirrorConfig::default()).await;

    assert!(matches!(result, Err(MirrorError::Read { .. })));
}

#[tokio::test]
async fn test_missing_repository_url() {
    let cache = TempDir::new().unwrap();
    let mut index = PackageIndex::new();
    index.add("curl").unwrap();

    let result =
        download_updates(&test_fetcher(), &mut index, cache.path(), &MirrorConfig::default()).await;

    assert!(matches!(result, Err(MirrorError::RepositoryUrlMissing)));
}
