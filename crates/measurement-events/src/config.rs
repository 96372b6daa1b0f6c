//! Configuration for the measurement pipeline

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::scanner::DEFAULT_CHUNK_SIZE;

/// Environment variable prefix, e.g. `MEASUREMENT_EVENTS_KEEP_RUNNING=true`.
pub const ENV_PREFIX: &str = "MEASUREMENT_EVENTS";

/// Main pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Keep running after end-of-input until interrupted
    #[serde(default)]
    pub keep_running: bool,

    /// Do not write the header line
    #[serde(default)]
    pub no_headers: bool,

    /// Bytes per raw read from the input source
    #[serde(default = "default_read_chunk_size")]
    pub read_chunk_size: usize,

    /// Slots in the sample handoff channel
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// How long to wait for a blocked input read at exit, in milliseconds
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            keep_running: false,
            no_headers: false,
            read_chunk_size: default_read_chunk_size(),
            channel_capacity: default_channel_capacity(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level, used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_read_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_channel_capacity() -> usize {
    1
}

fn default_shutdown_grace_ms() -> u64 {
    250
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl PipelineConfig {
    /// Load configuration from defaults, an optional file and the environment
    pub fn load(path: Option<&str>) -> PipelineResult<Self> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&PipelineConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> PipelineResult<()> {
        if self.read_chunk_size == 0 {
            return Err(PipelineError::Config(
                "read_chunk_size must be at least 1".to_string(),
            ));
        }
        if self.channel_capacity == 0 {
            return Err(PipelineError::Config(
                "channel_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether end-of-input stops the pipeline
    pub fn stop_when_exhausted(&self) -> bool {
        !self.keep_running
    }
}
