//! Common test utilities for commons-dl integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use commons_dl::Config;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the mock endpoint serves files under
pub const ENDPOINT_PATH: &str = "/w/index.php";

/// Write a work list file into `dir`
pub fn write_work_list(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let file = dir.join(name);
    std::fs::write(&file, content).unwrap();
    file
}

/// Configuration pointing at `server`, reading `input` and writing under `temp_dir/out`
pub fn config_for(server: &MockServer, temp_dir: &TempDir, input: PathBuf) -> Config {
    let mut config = Config::default();
    config.input.file = input;
    config.download.destination = temp_dir.path().join("out");
    config.download.max_concurrent_downloads = 4;
    config.endpoint.base_url = format!("{}{}", server.uri(), ENDPOINT_PATH);
    config.http.request_timeout = Some(Duration::from_secs(5));
    config
}

/// Serve `body` for `identifier`, expecting exactly `times` requests
pub async fn serve_file(server: &MockServer, identifier: &str, body: &[u8], times: u64) {
    Mock::given(method("GET"))
        .and(path(ENDPOINT_PATH))
        .and(query_param("title", "Special:FilePath"))
        .and(query_param("file", identifier))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .expect(times)
        .mount(server)
        .await;
}

/// Answer `status` for `identifier`
pub async fn serve_status(server: &MockServer, identifier: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(ENDPOINT_PATH))
        .and(query_param("file", identifier))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}
