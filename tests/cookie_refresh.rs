//! Integration tests for the cookie refresh path: remote fetch, raw-URL
//! rewrite, unique local filenames, and fail-fast batch semantics.

use std::fs;
use std::sync::Once;

use assert_matches::assert_matches;
use tempfile::TempDir;
use tunefetch::youtube::cookies::CookiePool;
use tunefetch::SourceError;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("tunefetch=debug")
            .with_test_writer()
            .init();
    });
}

fn cookie_files(dir: &TempDir) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .flatten()
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn refresh_writes_fetched_bytes_to_unique_files() {
    init_tracing();
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // The pool must rewrite the share link to its raw-content variant.
    Mock::given(method("GET"))
        .and(path("/me/raw/pool-a"))
        .respond_with(ResponseTemplate::new(200).set_body_string("# cookie payload A"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me/raw/pool-b"))
        .respond_with(ResponseTemplate::new(200).set_body_string("# cookie payload B"))
        .expect(1)
        .mount(&server)
        .await;

    let pool = CookiePool::new(dir.path().to_path_buf());
    let urls = vec![
        format!("{}/me/pool-a", server.uri()),
        format!("{}/me/pool-b", server.uri()),
    ];
    pool.refresh(&urls).await.expect("refresh should succeed");

    let names = cookie_files(&dir);
    assert_eq!(names.len(), 2);
    let mut bodies: Vec<String> = names
        .iter()
        .map(|name| {
            assert!(name.starts_with("cookie"), "unexpected name {}", name);
            assert!(name.ends_with(".txt"), "unexpected name {}", name);
            // cookie + 5 digits + .txt
            assert_eq!(name.len(), "cookie".len() + 5 + ".txt".len());
            fs::read_to_string(dir.path().join(name)).unwrap()
        })
        .collect();
    bodies.sort();
    assert_eq!(bodies, ["# cookie payload A", "# cookie payload B"]);
}

#[tokio::test]
async fn refresh_failure_aborts_batch_and_propagates() {
    init_tracing();
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/me/raw/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    // The URL after the failing one must never be fetched.
    Mock::given(method("GET"))
        .and(path("/me/raw/never"))
        .respond_with(ResponseTemplate::new(200).set_body_string("unreached"))
        .expect(0)
        .mount(&server)
        .await;

    let pool = CookiePool::new(dir.path().to_path_buf());
    let urls = vec![
        format!("{}/me/broken", server.uri()),
        format!("{}/me/never", server.uri()),
    ];

    let result = pool.refresh(&urls).await;
    assert_matches!(result, Err(SourceError::Http(_)));
    assert!(cookie_files(&dir).is_empty());
}

#[tokio::test]
async fn refreshed_cookies_are_selectable_by_a_fresh_pool() {
    init_tracing();
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/me/raw/pool"))
        .respond_with(ResponseTemplate::new(200).set_body_string("# cookie payload"))
        .mount(&server)
        .await;

    let pool = CookiePool::new(dir.path().to_path_buf());
    pool.refresh(&[format!("{}/me/pool", server.uri())])
        .await
        .unwrap();

    // The running jar freezes at first select; a fresh pool (next process)
    // sees the refreshed file.
    let fresh = CookiePool::new(dir.path().to_path_buf());
    let picked = fresh.select().expect("refreshed cookie should be selectable");
    assert!(picked.starts_with(dir.path()));
}
