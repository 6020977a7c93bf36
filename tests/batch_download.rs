//! End-to-end batches through the public API against a mock HTTP endpoint

mod common;

use std::time::Duration;

use commons_dl::{Downloader, Error, Outcome, OutcomeRecord};
use common::{ENDPOINT_PATH, config_for, serve_file, serve_status, write_work_list};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_downloads_every_listed_file() {
    let server = MockServer::start().await;
    serve_file(&server, "catA.jpg", b"cat a bytes", 1).await;
    serve_file(&server, "catB.png", b"cat b bytes", 1).await;

    let temp_dir = TempDir::new().unwrap();
    let input = write_work_list(temp_dir.path(), "list.csv", b"catA.jpg,foo\ncatB.png,bar\n");
    let events = temp_dir.path().join("events.jsonl");
    let mut config = config_for(&server, &temp_dir, input);
    config.events_file = Some(events.clone());
    let dest = config.download.destination.clone();

    let downloader = Downloader::new(config).await.unwrap();
    let summary = downloader.run_configured().await.unwrap();
    downloader.shutdown().await;

    assert_eq!(summary.success, 2);
    assert_eq!(summary.total(), 2);
    assert_eq!(std::fs::read(dest.join("catA.jpg")).unwrap(), b"cat a bytes");
    assert_eq!(std::fs::read(dest.join("catB.png")).unwrap(), b"cat b bytes");

    let records: Vec<OutcomeRecord> = std::fs::read_to_string(&events)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.outcome == Outcome::Success));
    let b = records.iter().find(|r| r.identifier == "catB.png").unwrap();
    assert_eq!(b.line, 2);
}

#[tokio::test]
async fn test_resume_skips_files_already_present() {
    let server = MockServer::start().await;
    serve_file(&server, "catA.jpg", b"new a", 0).await;
    serve_file(&server, "catB.png", b"cat b", 1).await;

    let temp_dir = TempDir::new().unwrap();
    let input = write_work_list(temp_dir.path(), "list.csv", b"catA.jpg,foo\ncatB.png,bar\n");
    let config = config_for(&server, &temp_dir, input);
    let dest = config.download.destination.clone();
    std::fs::create_dir_all(&dest).unwrap();
    std::fs::write(dest.join("catA.jpg"), b"old a").unwrap();

    let downloader = Downloader::new(config).await.unwrap();
    let summary = downloader.run_configured().await.unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.success, 1);
    assert_eq!(std::fs::read(dest.join("catA.jpg")).unwrap(), b"old a");
}

#[tokio::test]
async fn test_restart_replaces_files_already_present() {
    let server = MockServer::start().await;
    serve_file(&server, "catA.jpg", b"new a", 1).await;

    let temp_dir = TempDir::new().unwrap();
    let input = write_work_list(temp_dir.path(), "list.csv", b"catA.jpg,foo\n");
    let mut config = config_for(&server, &temp_dir, input);
    config.download.mode = commons_dl::Mode::Restart;
    let dest = config.download.destination.clone();
    std::fs::create_dir_all(&dest).unwrap();
    std::fs::write(dest.join("catA.jpg"), b"old a").unwrap();

    let downloader = Downloader::new(config).await.unwrap();
    let summary = downloader.run_configured().await.unwrap();

    assert_eq!(summary.success, 1);
    assert_eq!(std::fs::read(dest.join("catA.jpg")).unwrap(), b"new a");
}

#[tokio::test]
async fn test_failing_item_does_not_block_the_batch() {
    let server = MockServer::start().await;
    serve_file(&server, "catA.jpg", b"cat a", 1).await;
    // Slower than the client timeout
    Mock::given(method("GET"))
        .and(path(ENDPOINT_PATH))
        .and(query_param("file", "catB.png"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;
    serve_status(&server, "gone.gif", 404).await;

    let temp_dir = TempDir::new().unwrap();
    let input = write_work_list(
        temp_dir.path(),
        "list.csv",
        b"catA.jpg,foo\ncatB.png,bar\ngone.gif,baz\n",
    );
    let mut config = config_for(&server, &temp_dir, input);
    config.http.request_timeout = Some(Duration::from_millis(500));
    let dest = config.download.destination.clone();

    let downloader = Downloader::new(config).await.unwrap();
    let summary = tokio::time::timeout(Duration::from_secs(10), downloader.run_configured())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(summary.success, 1);
    assert_eq!(summary.error, 2);
    assert!(dest.join("catA.jpg").exists());
    assert!(!dest.join("catB.png").exists());
    assert!(!dest.join("gone.gif").exists());
}

#[tokio::test]
async fn test_unusable_destination_issues_no_requests() {
    let server = MockServer::start().await;

    let temp_dir = TempDir::new().unwrap();
    let input = write_work_list(temp_dir.path(), "list.csv", b"catA.jpg,foo\n");
    let blocker = temp_dir.path().join("occupied");
    std::fs::write(&blocker, b"a file").unwrap();
    let mut config = config_for(&server, &temp_dir, input);
    config.download.destination = blocker.join("out");

    let downloader = Downloader::new(config).await.unwrap();
    let err = downloader.run_configured().await.unwrap_err();

    assert!(matches!(err, Error::DestinationUnavailable { .. }), "{:?}", err);
    assert!(err.is_fatal());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_input_is_fatal() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let config = config_for(&server, &temp_dir, temp_dir.path().join("nope.csv"));

    let downloader = Downloader::new(config).await.unwrap();
    let err = downloader.run_configured().await.unwrap_err();

    assert!(matches!(err, Error::InputUnavailable { .. }), "{:?}", err);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_latin1_work_list_is_decoded() {
    let server = MockServer::start().await;
    serve_file(&server, "Café.jpg", b"coffee", 1).await;

    let temp_dir = TempDir::new().unwrap();
    // "Café.jpg,x" in ISO-8859-1
    let input = write_work_list(temp_dir.path(), "list.csv", b"Caf\xe9.jpg,x\n");
    let mut config = config_for(&server, &temp_dir, input);
    config.input.charset = "ISO-8859-1".to_string();
    let dest = config.download.destination.clone();

    let downloader = Downloader::new(config).await.unwrap();
    let summary = downloader.run_configured().await.unwrap();

    assert_eq!(summary.success, 1);
    assert_eq!(std::fs::read(dest.join("Café.jpg")).unwrap(), b"coffee");
}

#[tokio::test]
async fn test_malformed_and_blank_lines() {
    let server = MockServer::start().await;
    serve_file(&server, "catA.jpg", b"cat a", 1).await;
    serve_file(&server, "catB.png", b"cat b", 1).await;

    let temp_dir = TempDir::new().unwrap();
    let input = write_work_list(
        temp_dir.path(),
        "list.csv",
        b"catA.jpg,foo\r\n\r\nno-delimiter\r\ncatB.png,bar\r\n",
    );
    let config = config_for(&server, &temp_dir, input);

    let downloader = Downloader::new(config).await.unwrap();
    let summary = downloader.run_configured().await.unwrap();

    assert_eq!(summary.success, 2);
    assert_eq!(summary.error, 1);
    assert_eq!(summary.total(), 3);
}

#[tokio::test]
async fn test_unknown_charset_is_rejected_before_dispatch() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let input = write_work_list(temp_dir.path(), "list.csv", b"catA.jpg,foo\n");
    let mut config = config_for(&server, &temp_dir, input);
    config.input.charset = "klingon".to_string();

    let downloader = Downloader::new(config).await.unwrap();
    let err = downloader.run_configured().await.unwrap_err();

    assert!(matches!(err, Error::Config { .. }), "{:?}", err);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_zero_request_timeout_is_rejected() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let input = write_work_list(temp_dir.path(), "list.csv", b"catA.jpg,foo\n");
    let mut config = config_for(&server, &temp_dir, input);
    config.http.request_timeout = Some(Duration::ZERO);

    match Downloader::new(config).await {
        Err(Error::Config { key, .. }) => assert_eq!(key.as_deref(), Some("request_timeout")),
        Err(other) => panic!("Expected Config error, got {:?}", other),
        Ok(_) => panic!("zero timeout accepted"),
    }
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_no_request_deadline_by_default() {
    let server = MockServer::start().await;
    // Slower than any short deadline, but finishes
    Mock::given(method("GET"))
        .and(path(ENDPOINT_PATH))
        .and(query_param("file", "slow.tif"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"eventually".to_vec())
                .set_delay(Duration::from_millis(1500)),
        )
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let input = write_work_list(temp_dir.path(), "list.csv", b"slow.tif,x\n");
    let mut config = config_for(&server, &temp_dir, input);
    config.http.request_timeout = None;
    let dest = config.download.destination.clone();

    let downloader = Downloader::new(config).await.unwrap();
    let summary = downloader.run_configured().await.unwrap();

    assert_eq!(summary.success, 1);
    assert_eq!(std::fs::read(dest.join("slow.tif")).unwrap(), b"eventually");
}
