// src/report/mod.rs

//! Best-effort progress reporting to the backend.
//!
//! Reporting never influences the update: every failure is logged and
//! swallowed inside the reporter, so [`StatusReporter::report`] has no error
//! type at all.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use anyhow::Context;
use tracing::{debug, info, warn};

use crate::config::DeviceConfig;
use crate::types::StatusEvent;

pub mod payload;

pub use payload::{is_acknowledged, status_url, StatusPayload, API_KEY_HEADER, STATUS_PATH};

/// Boxed future returned by [`StatusReporter::report`].
pub type ReportFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Sink for status events of one transaction.
pub trait StatusReporter: Send + Sync {
    fn report<'a>(&'a self, version: &'a str, event: &'a StatusEvent) -> ReportFuture<'a>;
}

/// POSTs each event as JSON to `{serverUrl}/api/device/update-status`.
#[derive(Debug, Clone)]
pub struct HttpStatusReporter {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl HttpStatusReporter {
    pub fn new(device: &DeviceConfig, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            url: status_url(&device.server_url),
            api_key: device.api_key.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post(&self, version: &str, event: &StatusEvent) -> anyhow::Result<String> {
        let response = self
            .client
            .post(&self.url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&StatusPayload::new(version, event))
            .send()
            .await
            .with_context(|| format!("POST {}", self.url))?;
        let status = response.status();
        let body = response.text().await.context("reading response body")?;
        if !status.is_success() {
            anyhow::bail!("backend answered {}: {}", status, body.trim());
        }
        Ok(body)
    }
}

impl StatusReporter for HttpStatusReporter {
    fn report<'a>(&'a self, version: &'a str, event: &'a StatusEvent) -> ReportFuture<'a> {
        Box::pin(async move {
            match self.post(version, event).await {
                Ok(body) if is_acknowledged(&body) => {
                    debug!(status = %event.status, "status acknowledged by backend");
                }
                Ok(body) => {
                    warn!(status = %event.status, body = %body.trim(), "status not acknowledged by backend");
                }
                Err(err) => {
                    warn!(status = %event.status, error = %format!("{err:#}"), "failed to report status");
                }
            }
        })
    }
}

/// Used when no device config is available: events only reach the log.
#[derive(Debug, Clone, Default)]
pub struct LogOnlyReporter;

impl StatusReporter for LogOnlyReporter {
    fn report<'a>(&'a self, version: &'a str, event: &'a StatusEvent) -> ReportFuture<'a> {
        Box::pin(async move {
            info!(version, status = %event.status, message = %event.message, "status (not reported)");
        })
    }
}
