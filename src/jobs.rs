//! Background jobs started at boot.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::config::KeepAliveConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Periodically GETs a URL so that an idle free-tier host is not put to
/// sleep.
pub struct KeepAlive {
    client: reqwest::Client,
    url: String,
    every: Duration,
}

impl KeepAlive {
    pub fn new(config: KeepAliveConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            url: config.url,
            every: Duration::from_secs(config.interval_secs),
        })
    }

    /// One ping. Returns the HTTP status, or the transport error.
    pub async fn ping(&self) -> Result<reqwest::StatusCode, reqwest::Error> {
        let res = self.client.get(&self.url).send().await?;
        Ok(res.status())
    }

    /// Run forever on the runtime. The first ping fires after one full
    /// interval.
    pub fn spawn(self) -> JoinHandle<()> {
        tracing::info!(url = %self.url, every_secs = self.every.as_secs(), "keep-alive job scheduled");
        tokio::spawn(async move {
            let mut ticker = interval(self.every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match self.ping().await {
                    Ok(status) if status.is_success() => {
                        tracing::info!(url = %self.url, %status, "keep-alive ping ok")
                    }
                    Ok(status) => {
                        tracing::warn!(url = %self.url, %status, "keep-alive ping returned error status")
                    }
                    Err(e) => tracing::error!(url = %self.url, error = %e, "keep-alive ping failed"),
                }
            }
        })
    }
}
