//! Shared test helpers for creating Downloader instances in tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures::StreamExt;
use tempfile::TempDir;
use url::Url;

use crate::config::Config;
use crate::downloader::Downloader;
use crate::error::{Result, TransportError};
use crate::sink::MemorySink;
use crate::transport::{FetchedBody, Transport};
use crate::types::WorkItem;

/// What the scripted transport answers for one identifier
#[derive(Clone, Debug)]
pub(crate) enum Reply {
    /// 200 with this body
    Body(Vec<u8>),
    /// Fail with this transport error
    Fail(TransportError),
    /// Never answer
    Hang,
    /// Send the first chunk, then stall forever
    Stall(Vec<u8>),
    /// Announce `announced` bytes but end the body after `body`
    Truncated { body: Vec<u8>, announced: u64 },
}

/// In-memory [`Transport`] that answers per identifier (the `file` query parameter)
///
/// Identifiers without a script get `404`.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    replies: Mutex<HashMap<String, Reply>>,
    requests: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(self, identifier: &str, reply: Reply) -> Self {
        self.replies
            .lock()
            .unwrap()
            .insert(identifier.to_string(), reply);
        self
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub(crate) fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, url: &Url) -> std::result::Result<FetchedBody, TransportError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let identifier = url
            .query_pairs()
            .find(|(k, _)| k == "file")
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default();
        self.requested.lock().unwrap().push(identifier.clone());

        let reply = self.replies.lock().unwrap().get(&identifier).cloned();
        match reply {
            Some(Reply::Body(bytes)) => Ok(FetchedBody::from_bytes(bytes)),
            Some(Reply::Fail(e)) => Err(e),
            Some(Reply::Hang) => futures::future::pending().await,
            Some(Reply::Stall(first)) => {
                let first = futures::stream::once(async move { Ok(bytes::Bytes::from(first)) });
                Ok(FetchedBody {
                    content_length: None,
                    body: first.chain(futures::stream::pending()).boxed(),
                })
            }
            Some(Reply::Truncated { body, announced }) => {
                let mut fetched = FetchedBody::from_bytes(body);
                fetched.content_length = Some(announced);
                Ok(fetched)
            }
            None => Err(TransportError::Status(404)),
        }
    }
}

/// Test configuration: a small concurrency limit and the destination inside `temp_dir`
pub(crate) fn test_config(temp_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.download.destination = temp_dir.path().join("out");
    config.download.max_concurrent_downloads = 3;
    config.download.max_pending_jobs = 16;
    config
}

/// Create a downloader around `transport`, recording outcomes into a [`MemorySink`]
/// Returns the downloader, the sink and the tempdir (which must be kept alive).
pub(crate) fn create_test_downloader(
    transport: Arc<ScriptedTransport>,
) -> (Downloader, Arc<MemorySink>, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(MemorySink::new());
    let downloader =
        Downloader::with_parts(test_config(&temp_dir), transport, sink.clone()).unwrap();
    (downloader, sink, temp_dir)
}

/// Work items numbered from line 1
pub(crate) fn items(identifiers: &[&str]) -> Vec<Result<WorkItem>> {
    identifiers
        .iter()
        .enumerate()
        .map(|(i, id)| {
            Ok(WorkItem {
                identifier: id.to_string(),
                line: i as u64 + 1,
            })
        })
        .collect()
}
