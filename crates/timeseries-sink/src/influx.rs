//! InfluxDB v2 HTTP writer

use crate::point::Point;
use crate::{SinkError, TelemetrySink};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

/// Connection settings for an InfluxDB v2 bucket
#[derive(Debug, Clone)]
pub struct InfluxConfig {
    /// Server base URL, e.g. `http://localhost:8086`
    pub url: String,
    /// API token
    pub token: String,
    pub org: String,
    pub bucket: String,
    /// Per-request timeout
    pub timeout: Duration,
}

/// Writes each point with one synchronous `/api/v2/write` request
pub struct InfluxSink {
    client: Client,
    config: InfluxConfig,
    base_url: String,
}

impl InfluxSink {
    /// Build the HTTP client and check the server is reachable.
    ///
    /// Fails if `/health` cannot be reached or reports a non-2xx status.
    pub async fn connect(config: InfluxConfig) -> Result<Self, SinkError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SinkError::Unavailable(format!("HTTP client: {}", e)))?;
        let base_url = config.url.trim_end_matches('/').to_string();

        let sink = Self {
            client,
            config,
            base_url,
        };
        sink.health().await?;

        info!(
            "Connected to InfluxDB at {} (org={}, bucket={})",
            sink.base_url, sink.config.org, sink.config.bucket
        );
        Ok(sink)
    }

    /// Query the server health endpoint
    pub async fn health(&self) -> Result<(), SinkError> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SinkError::Unavailable(format!("{}: {}", url, e)))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(SinkError::Unavailable(format!("{} returned {}", url, status)))
        }
    }

    pub fn config(&self) -> &InfluxConfig {
        &self.config
    }
}

impl TelemetrySink for InfluxSink {
    async fn write(&self, point: &Point) -> Result<(), SinkError> {
        let body = point.to_line_protocol()?;
        debug!("Writing {}", body);

        let response = self
            .client
            .post(format!("{}/api/v2/write", self.base_url))
            .query(&[
                ("org", self.config.org.as_str()),
                ("bucket", self.config.bucket.as_str()),
                ("precision", "ns"),
            ])
            .header(AUTHORIZATION, format!("Token {}", self.config.token))
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await
            .map_err(|e| SinkError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(SinkError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
