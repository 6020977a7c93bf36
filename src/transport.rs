//! HTTP transport seam: the shared asynchronous client all jobs submit through

use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use url::Url;

use crate::config::HttpConfig;
use crate::error::{Error, Result, TransportError};

/// Stream of body chunks from a successful response
pub type BodyStream = BoxStream<'static, std::result::Result<Bytes, TransportError>>;

/// A response that passed the status check, with its body still streaming
pub struct FetchedBody {
    /// Content length announced by the server, if any
    pub content_length: Option<u64>,
    /// Body chunks
    pub body: BodyStream,
}

impl FetchedBody {
    /// Wrap an in-memory body (used by non-HTTP transports and tests)
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        Self {
            content_length: Some(bytes.len() as u64),
            body: futures::stream::once(async move { Ok(bytes) }).boxed(),
        }
    }
}

/// Abstraction over the HTTP client, enabling testability.
///
/// Implementations must be safe to call concurrently from many jobs.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Issue a GET for `url` and return the body of a 2xx response
    async fn get(&self, url: &Url) -> std::result::Result<FetchedBody, TransportError>;
}

/// Production [`Transport`] backed by one shared `reqwest::Client`
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build the shared client from [`HttpConfig`]
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .connect_timeout(config.connect_timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects));
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| Error::Config {
            message: format!("failed to create HTTP client: {}", e),
            key: None,
        })?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &Url) -> std::result::Result<FetchedBody, TransportError> {
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let content_length = response.content_length();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(TransportError::from))
            .boxed();
        Ok(FetchedBody {
            content_length,
            body,
        })
    }
}
