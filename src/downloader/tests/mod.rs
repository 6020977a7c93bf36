use super::test_helpers::{Reply, ScriptedTransport, create_test_downloader, items, test_config};
use super::*;
use crate::error::{Error, TransportError};
use crate::sink::MemorySink;
use crate::types::{Mode, Outcome, WorkItem};
use futures::stream;
use std::path::PathBuf;
use std::time::Duration;


/// Destination directory configured for a test downloader
fn destination(downloader: &Downloader) -> PathBuf {
    downloader.config().download.destination.clone()
}

/// Wait until `sink` holds at least `count` records
async fn wait_for_records(sink: &MemorySink, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while sink.records().len() < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("timed out waiting for outcome records");
}
