//! Configuration types for commons-dl

use crate::error::{Error, Result};
use crate::types::Mode;
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Where the work list comes from and how it is decoded
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InputConfig {
    /// Path to the line-delimited input file
    #[serde(default)]
    pub file: PathBuf,

    /// Charset label of the input file (default: "UTF-8")
    #[serde(default = "default_charset")]
    pub charset: String,

    /// Identifier/metadata separator; the identifier is everything before its last occurrence (default: ',')
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::new(),
            charset: default_charset(),
            delimiter: default_delimiter(),
        }
    }
}

/// Download behavior (destination, existing-file policy, concurrency)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Destination directory (default: ".")
    #[serde(default = "default_destination")]
    pub destination: PathBuf,

    /// Existing-file policy (default: resume)
    #[serde(default)]
    pub mode: Mode,

    /// Maximum requests in flight at once (default: 8)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_downloads: usize,

    /// Maximum dispatched jobs that have not reached a terminal outcome (default: 1024)
    ///
    /// Bounds memory for very long work lists: the reader pauses once this many
    /// jobs are pending.
    #[serde(default = "default_max_pending")]
    pub max_pending_jobs: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            destination: default_destination(),
            mode: Mode::default(),
            max_concurrent_downloads: default_max_concurrent(),
            max_pending_jobs: default_max_pending(),
        }
    }
}

/// Remote endpoint the identifiers are resolved against
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Base URL (default: Wikimedia Commons `index.php`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Query parameters added to every request before the identifier
    #[serde(default = "default_fixed_params")]
    pub fixed_params: Vec<(String, String)>,

    /// Query parameter carrying the identifier (default: "file")
    #[serde(default = "default_identifier_param")]
    pub identifier_param: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            fixed_params: default_fixed_params(),
            identifier_param: default_identifier_param(),
        }
    }
}

/// Shared HTTP client settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// TCP/TLS connect timeout (default: 30 seconds)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,

    /// Whole-request deadline including the body (default: none)
    ///
    /// Large files can take longer than any fixed deadline to stream, so only
    /// the connect timeout applies unless this is set.
    #[serde(default, with = "optional_duration_serde")]
    pub request_timeout: Option<Duration>,

    /// Maximum redirects followed per request (default: 10)
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            connect_timeout: default_connect_timeout(),
            request_timeout: None,
            max_redirects: default_max_redirects(),
        }
    }
}

/// Main configuration for [`Downloader`](crate::Downloader)
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Work list input
    #[serde(default)]
    pub input: InputConfig,

    /// Download behavior
    #[serde(default)]
    pub download: DownloadConfig,

    /// Remote endpoint
    #[serde(default)]
    pub endpoint: EndpointConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Append one JSON outcome record per line to this file
    #[serde(default)]
    pub events_file: Option<PathBuf>,
}

impl Config {
    /// Reject settings that cannot work before anything touches the network
    pub fn validate(&self) -> Result<()> {
        if self.download.max_concurrent_downloads == 0 {
            return Err(Error::config(
                "max_concurrent_downloads must be at least 1",
                "max_concurrent_downloads",
            ));
        }
        if self.download.max_pending_jobs == 0 {
            return Err(Error::config(
                "max_pending_jobs must be at least 1",
                "max_pending_jobs",
            ));
        }
        if self.http.connect_timeout.is_zero() {
            return Err(Error::config(
                "connect_timeout must be greater than zero",
                "connect_timeout",
            ));
        }
        if matches!(self.http.request_timeout, Some(timeout) if timeout.is_zero()) {
            return Err(Error::config(
                "request_timeout must be greater than zero",
                "request_timeout",
            ));
        }
        if self.endpoint.identifier_param.is_empty() {
            return Err(Error::config(
                "identifier parameter name is empty",
                "identifier_param",
            ));
        }
        if self.endpoint.fixed_params.iter().any(|(k, _)| k.is_empty()) {
            return Err(Error::config("fixed parameter with empty name", "fixed_params"));
        }
        url::Url::parse(&self.endpoint.base_url).map_err(|e| {
            Error::config(
                format!("invalid base URL '{}': {}", self.endpoint.base_url, e),
                "base_url",
            )
        })?;
        Ok(())
    }
}

fn default_charset() -> String {
    "UTF-8".to_string()
}

fn default_delimiter() -> char {
    ','
}

fn default_destination() -> PathBuf {
    PathBuf::from(".")
}

fn default_max_concurrent() -> usize {
    8
}

fn default_max_pending() -> usize {
    1024
}

fn default_base_url() -> String {
    "https://commons.wikimedia.org/w/index.php".to_string()
}

fn default_fixed_params() -> Vec<(String, String)> {
    vec![("title".to_string(), "Special:FilePath".to_string())]
}

fn default_identifier_param() -> String {
    "file".to_string()
}

fn default_user_agent() -> String {
    format!("commons-dl/{}", env!("CARGO_PKG_VERSION"))
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_redirects() -> usize {
    10
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
