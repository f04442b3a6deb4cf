//! Pipeline Configuration
//!
//! Settings are layered with the `config` crate: built-in defaults, then an
//! optional TOML file, then environment variables (`INFLUX_URL`,
//! `UDP_PORT`, ...). Later layers win.

use crate::ingest::LoopSettings;
use config::{Config, Environment, File, FileFormat};
use forza_protocol::PacketFormat;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use timeseries_sink::InfluxConfig;
use tracing::Level;
use window_buffer::{TimeWindow, WindowError};

/// Environment variable naming the optional TOML file
pub const CONFIG_FILE_ENV: &str = "FORZA_PIPELINE_CONFIG";
/// File read when `FORZA_PIPELINE_CONFIG` is unset
pub const DEFAULT_CONFIG_FILE: &str = "forza-pipeline.toml";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("INFLUX_TOKEN is not set")]
    MissingToken,
    #[error("Invalid window: {0}")]
    Window(#[from] WindowError),
}

/// Runtime settings for the ingestion service
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub influx_url: String,
    /// Required once the Influx sink is built
    pub influx_token: Option<String>,
    pub influx_org: String,
    pub influx_bucket: String,
    pub udp_port: u16,
    /// Trailing window length in seconds
    pub window_seconds: f64,
    /// Frames required in the window before classifying
    pub min_frames: usize,
    pub model_path: PathBuf,
    pub packet_format: String,
    pub recv_timeout_ms: u64,
    pub report_interval_ms: u64,
    pub sink_timeout_ms: u64,
    pub log_level: String,
    /// Prometheus exporter port; no exporter when unset
    pub metrics_port: Option<u16>,
}

impl PipelineConfig {
    /// Load from defaults, the optional config file and the process environment
    pub fn load() -> Result<Self, ConfigError> {
        let file = std::env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::build(Some(Path::new(&file)), None)
    }

    /// Load from defaults and the given variables only
    pub fn from_env_map(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::build(None, Some(vars))
    }

    /// Load from defaults, a TOML file and the given variables
    pub fn from_file_and_env_map(
        path: &Path,
        vars: HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        Self::build(Some(path), Some(vars))
    }

    fn build(
        file: Option<&Path>,
        vars: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("influx_url", "http://localhost:8086")?
            .set_default("influx_org", "fh4-test")?
            .set_default("influx_bucket", "fh4-telemetry")?
            .set_default("udp_port", 5000_i64)?
            .set_default("window_seconds", 2.0)?
            .set_default("min_frames", 1_i64)?
            .set_default("model_path", "driving_style_model.json")?
            .set_default("packet_format", "fh4")?
            .set_default("recv_timeout_ms", 2000_i64)?
            .set_default("report_interval_ms", 500_i64)?
            .set_default("sink_timeout_ms", 5000_i64)?
            .set_default("log_level", "info")?;

        if let Some(path) = file {
            builder = builder.add_source(
                File::from(path)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let settings: Self = builder
            .add_source(Environment::default().source(vars))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check ranges and parse the string-typed settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.window_seconds.is_finite() || self.window_seconds <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "WINDOW_SECONDS must be positive, got {}",
                self.window_seconds
            )));
        }
        if self.min_frames == 0 {
            return Err(ConfigError::Invalid("MIN_FRAMES must be at least 1".to_string()));
        }
        if self.recv_timeout_ms == 0 {
            return Err(ConfigError::Invalid("RECV_TIMEOUT_MS must be positive".to_string()));
        }
        // Rejects windows too long to compare capture times against
        TimeWindow::new(self.window()?)?;
        self.packet_format()?;
        self.log_level()?;
        Ok(())
    }

    pub fn window(&self) -> Result<Duration, ConfigError> {
        Duration::try_from_secs_f64(self.window_seconds).map_err(|e| {
            ConfigError::Invalid(format!("WINDOW_SECONDS {}: {}", self.window_seconds, e))
        })
    }

    pub fn packet_format(&self) -> Result<PacketFormat, ConfigError> {
        self.packet_format
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("PACKET_FORMAT: {}", e)))
    }

    pub fn log_level(&self) -> Result<Level, ConfigError> {
        self.log_level
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("unknown LOG_LEVEL '{}'", self.log_level)))
    }

    /// Settings for the Influx sink. Fails without a token.
    pub fn influx_config(&self) -> Result<InfluxConfig, ConfigError> {
        let token = self
            .influx_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingToken)?;
        Ok(InfluxConfig {
            url: self.influx_url.clone(),
            token: token.to_string(),
            org: self.influx_org.clone(),
            bucket: self.influx_bucket.clone(),
            timeout: Duration::from_millis(self.sink_timeout_ms),
        })
    }

    /// Settings for the ingestion loop
    pub fn loop_settings(&self) -> Result<LoopSettings, ConfigError> {
        Ok(LoopSettings {
            format: self.packet_format()?,
            window: self.window()?,
            min_frames: self.min_frames,
            recv_timeout: Duration::from_millis(self.recv_timeout_ms),
            report_interval: Duration::from_millis(self.report_interval_ms),
        })
    }
}
