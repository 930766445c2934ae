//! Service configuration.
//!
//! Everything the service needs to stand up: how the dataset is cleaned,
//! how the engine scores, and the request contract. Loads from a JSON file
//! with every field optional.

use anyhow::{Context, Result};
use data_loader::CleaningOptions;
use guest_engine::{DEFAULT_RECOMMENDATIONS, EngineConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub engine: EngineConfig,
    pub cleaning: CleaningOptions,
    /// Fewest ratings a guest must supply
    pub min_guest_ratings: usize,
    /// Largest number of recommendations a request may ask for
    pub max_limit: usize,
    /// Limit used when a request doesn't carry one
    pub default_limit: usize,
    /// Abandon a request after this many milliseconds, no limit when unset
    pub request_timeout_ms: Option<u64>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            cleaning: CleaningOptions::default(),
            min_guest_ratings: 3,
            max_limit: 50,
            default_limit: DEFAULT_RECOMMENDATIONS,
            request_timeout_ms: None,
        }
    }
}

impl ServiceConfig {
    /// Read a config from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_cleaning(mut self, cleaning: CleaningOptions) -> Self {
        self.cleaning = cleaning;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}
