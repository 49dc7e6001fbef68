//! Configuration Management

use crate::codegen::GeneratorOptions;
use crate::graph::{ConverterOptions, DEFAULT_MAX_LABEL_LENGTH};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Test management service
    #[serde(default)]
    pub service: ServiceConfig,
    /// Coverage settings
    #[serde(default)]
    pub coverage: CoverageConfig,
    /// Test script generation settings
    #[serde(default)]
    pub generation: GenerationConfig,
    /// Diagram rendering settings
    #[serde(default)]
    pub diagram: DiagramConfig,
}

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the test management service
    pub base_url: String,
    /// Request timeout (seconds)
    pub timeout_secs: u64,
}

/// Coverage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoverageConfig {
    /// Tag names counted as coverage elements (empty = all)
    pub include_tags: Vec<String>,
}

/// Generation configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Share page methods between identical sections
    pub optimize: bool,
    /// Emit data-driven suites
    pub data_driven: bool,
    /// Maximum rows per data set (0 = unlimited)
    pub max_generation: usize,
}

/// Diagram configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagramConfig {
    /// Labels longer than this are truncated
    pub max_label_length: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3002".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            max_label_length: DEFAULT_MAX_LABEL_LENGTH,
        }
    }
}

impl ServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl GenerationConfig {
    pub fn options(&self) -> GeneratorOptions {
        GeneratorOptions {
            optimize: self.optimize,
            data_driven: self.data_driven,
            max_generation: self.max_generation,
        }
    }
}

impl DiagramConfig {
    pub fn options(&self) -> ConverterOptions {
        ConverterOptions {
            max_label_length: self.max_label_length,
        }
    }
}

impl Config {
    /// Validate config values are within acceptable ranges.
    /// Returns Ok(()) if valid, or Err with a description of the first invalid field.
    pub fn validate(&self) -> Result<(), crate::Error> {
        let base_url = self.service.base_url.trim();
        if base_url.is_empty() {
            return Err(crate::Error::Config("base_url must not be empty".to_string()));
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(crate::Error::Config(format!(
                "base_url must be an http(s) URL, got {}", base_url
            )));
        }
        if self.service.timeout_secs == 0 {
            return Err(crate::Error::Config("timeout_secs must be > 0".to_string()));
        }
        if self.diagram.max_label_length == 0 {
            return Err(crate::Error::Config("max_label_length must be > 0".to_string()));
        }
        Ok(())
    }

    /// Load config from file
    pub fn load(path: &PathBuf) -> Result<Self, crate::Error> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from default location
    pub fn load_default() -> Result<Self, crate::Error> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &PathBuf) -> Result<(), crate::Error> {
        let content = self.to_toml()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".testflow").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Generate TOML representation
    pub fn to_toml(&self) -> Result<String, crate::Error> {
        toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))
    }
}
