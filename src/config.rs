//! Configuration for the Emotion Sentinel Agent.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::capture::CaptureSettings;
use crate::core::aggregator::AggregatorSettings;
use crate::core::evaluate::EvaluatorSettings;
use crate::poller::PollerSettings;

/// Main configuration for the sentinel agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Capture-side settings (mirroring, publish size, JPEG quality)
    pub capture: CaptureSettings,

    /// Period aggregation and warning settings
    pub aggregator: AggregatorSettings,

    /// Verdict ladder settings
    pub evaluator: EvaluatorSettings,

    /// Display poll cadence and restart policy
    pub poller: PollerSettings,

    /// Port for the local viewer; it binds to the loopback interface only
    pub viewer_port: u16,

    /// Path for exporting session outcomes
    pub export_path: PathBuf,

    /// Path for storing state and pipeline stats
    pub data_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("emotion-sentinel-agent");

        Self {
            capture: CaptureSettings::default(),
            aggregator: AggregatorSettings::default(),
            evaluator: EvaluatorSettings::default(),
            poller: PollerSettings::default(),
            viewer_port: 9090,
            export_path: data_dir.join("exports"),
            data_path: data_dir,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("emotion-sentinel-agent")
            .join("config.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.export_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        std::fs::create_dir_all(&self.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
