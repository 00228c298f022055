//! Single fetch of the schedule feed.
//!
//! One call is one GET. Retries, the overall time bound and cancellation
//! belong to the caller (`core`); dropping the returned future aborts the
//! request.

use std::future::Future;
use std::time::Duration;

use voicehub_proto::presenter::FailureKind;
use voicehub_proto::schedule::{parse_feed, Feed};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Connection, DNS, body read or non-2xx status.
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request timed out")]
    Timeout,
    /// The body is not a JSON array of entries.
    #[error("invalid feed: {0}")]
    Parse(String),
    #[error("fetch failed: {0}")]
    Other(String),
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::Transport(_) => FailureKind::Transport,
            FetchError::Timeout => FailureKind::Timeout,
            FetchError::Parse(_) => FailureKind::Parse,
            FetchError::Other(_) => FailureKind::Other,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_builder() {
            FetchError::Other(e.to_string())
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

pub trait ScheduleSource: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Feed, FetchError>> + Send;
}

/// `reqwest`-backed source. One client per instance, reused across fetches.
pub struct HttpScheduleSource {
    client: reqwest::Client,
}

impl HttpScheduleSource {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("voicehub-daemon/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl ScheduleSource for HttpScheduleSource {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Feed, FetchError>> + Send {
        let request = self.client.get(url).header("Accept", "application/json");
        async move {
            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Transport(format!("server returned {}", status)));
            }
            let body = response.text().await?;
            parse_feed(&body).map_err(|e| FetchError::Parse(e.to_string()))
        }
    }
}
