//! Broker monitoring endpoint source (`GET {monitor}/jsz`).

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::stats::snapshot::{unix_now, StatisticSnapshot};

const MONITOR_REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("http request: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid response code ({0})")]
    Status(u16),
}

/// Top-level account totals of the `jsz` report.
#[derive(Debug, Default, Deserialize)]
struct JszReport {
    #[serde(default)]
    streams: u64,
    #[serde(default)]
    consumers: u64,
    #[serde(default)]
    messages: u64,
    #[serde(default)]
    bytes: u64,
}

impl From<JszReport> for StatisticSnapshot {
    fn from(report: JszReport) -> Self {
        StatisticSnapshot {
            time: unix_now(),
            streams: report.streams,
            consumers: report.consumers,
            messages: report.messages,
            bytes: report.bytes,
        }
    }
}

pub struct MonitorClient {
    http: reqwest::Client,
    url: String,
}

impl MonitorClient {
    pub fn new(monitor_url: &str) -> Result<Self, MonitorError> {
        let http = reqwest::Client::builder()
            .timeout(MONITOR_REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            url: format!("{}/jsz", monitor_url.trim_end_matches('/')),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn sample(&self) -> Result<StatisticSnapshot, MonitorError> {
        let response = self.http.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(MonitorError::Status(response.status().as_u16()));
        }

        let report: JszReport = response.json().await?;
        Ok(report.into())
    }
}
