//! Service Settings
//!
//! Layered settings: `config/default.toml`, then an optional file named by
//! `MAINT_CONFIG`, then `MAINT__SECTION__KEY` environment variables.

use alerting::RiskBands;
use anyhow::Context;
use config::{Config, Environment, File};
use data_validator::ValidationConfig;
use feature_engine::FeatureSet;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable naming an extra config file
pub const CONFIG_PATH_ENV: &str = "MAINT_CONFIG";

/// Top-level settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub model: ModelSettings,
    pub risk: RiskBands,
    pub validation: ValidationConfig,
    pub ui: UiSettings,
    pub logging: LoggingSettings,
    pub metrics: MetricsSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Listen address
    pub addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Path to the JSON model artifact
    pub artifact_path: String,
    /// Expected feature set; startup fails if the artifact disagrees
    pub feature_set: Option<FeatureSet>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            artifact_path: "models/decision_tree_pipeline.json".to_string(),
            feature_set: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// Page title and heading
    pub title: String,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            title: "Vehicle Maintenance Prediction System".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// One of trace, debug, info, warn, error
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    /// Install the Prometheus recorder and serve `/metrics`
    pub enabled: bool,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Settings {
    /// Load from the default locations
    pub fn load() -> anyhow::Result<Self> {
        let extra = std::env::var(CONFIG_PATH_ENV).ok();
        Self::load_from(extra.as_deref().map(Path::new))
    }

    /// Load `config/default.toml` (if present), then `extra`, then the environment
    pub fn load_from(extra: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = Config::builder().add_source(File::with_name("config/default").required(false));

        if let Some(path) = extra {
            builder = builder.add_source(File::from(path).required(true));
        }

        let settings: Settings = builder
            .add_source(
                Environment::with_prefix("MAINT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")?;

        settings
            .risk
            .validate()
            .context("invalid [risk] thresholds")?;
        Ok(settings)
    }
}
