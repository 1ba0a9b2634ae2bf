//! Where raw feed bytes come from

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

/// Default address of the sensor's web server
pub const DEFAULT_FEED_URL: &str = "http://esp32.local/";

/// Source of the raw, newline-separated sensor feed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch the whole feed. Implementations must give up in bounded time.
    async fn fetch(&self) -> Result<Bytes>;
}

/// Feed served over plain HTTP GET, e.g. by an ESP32 on the LAN
pub struct HttpFeedSource {
    client: reqwest::Client,
    url: String,
}

impl HttpFeedSource {
    /// Create a source for `url`; requests are abandoned after `timeout`
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self) -> Result<Bytes> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.bytes().await?)
    }
}
