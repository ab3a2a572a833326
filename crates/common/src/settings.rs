//! Runtime settings.
//!
//! Loaded from TOML with environment overrides (`BIDON__SECTION__KEY`).
//! Every field has a default, so an empty document is a valid configuration.

use std::collections::HashMap;

use config::{Config, Environment, File, FileFormat};
use error_stack::{Report, ResultExt};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::adapter::cache_filter::DEFAULT_MAX_CACHE_COUNT;
use crate::auction::price_floor::DEFAULT_CUSTOM_MEDIATORS;
use crate::constants::DEFAULT_AUCTION_TIMEOUT_MS;
use crate::error::BidonError;
use crate::event::Topic;

pub const ENVIRONMENT_PREFIX: &str = "BIDON";

fn default_timeout_ms() -> u32 {
    DEFAULT_AUCTION_TIMEOUT_MS
}

fn default_custom_mediators() -> Vec<String> {
    DEFAULT_CUSTOM_MEDIATORS
        .iter()
        .map(|m| (*m).to_string())
        .collect()
}

fn default_max_cache_count() -> usize {
    DEFAULT_MAX_CACHE_COUNT
}

fn default_topics() -> HashMap<Topic, String> {
    [
        Topic::AdEvents,
        Topic::Config,
        Topic::Show,
        Topic::Click,
        Topic::Reward,
        Topic::Win,
        Topic::Loss,
    ]
    .into_iter()
    .map(|topic| (topic, topic.to_string()))
    .collect()
}

fn default_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AuctionSettings {
    /// Used when a configuration has no positive timeout.
    #[serde(default = "default_timeout_ms")]
    #[validate(range(min = 1))]
    pub default_timeout_ms: u32,
    /// Mediators whose previous auction price raises the floor.
    #[serde(default = "default_custom_mediators")]
    pub custom_mediators: Vec<String>,
}

impl Default for AuctionSettings {
    fn default() -> Self {
        Self {
            default_timeout_ms: default_timeout_ms(),
            custom_mediators: default_custom_mediators(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AdCacheSettings {
    #[serde(default = "default_max_cache_count")]
    #[validate(range(min = 1))]
    pub default_max_cache_count: usize,
}

impl Default for AdCacheSettings {
    fn default() -> Self {
        Self {
            default_max_cache_count: default_max_cache_count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct EventSettings {
    /// Transport topic for each event topic.
    #[serde(default = "default_topics")]
    pub topics: HashMap<Topic, String>,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            topics: default_topics(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct LoggingSettings {
    #[serde(default = "default_level")]
    #[validate(length(min = 1))]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct Settings {
    #[serde(default)]
    #[validate(nested)]
    pub auction: AuctionSettings,
    #[serde(default)]
    #[validate(nested)]
    pub ad_cache: AdCacheSettings,
    #[serde(default)]
    #[validate(nested)]
    pub events: EventSettings,
    #[serde(default)]
    #[validate(nested)]
    pub logging: LoggingSettings,
}

impl Settings {
    /// # Errors
    ///
    /// Returns [`BidonError::Configuration`] when the document cannot be
    /// parsed or a value is out of range.
    pub fn from_toml(toml_str: &str) -> Result<Self, Report<BidonError>> {
        let environment = Environment::default()
            .prefix(ENVIRONMENT_PREFIX)
            .separator("__");

        let toml = File::from_str(toml_str, FileFormat::Toml);
        let settings: Self = Config::builder()
            .add_source(toml)
            .add_source(environment)
            .build()
            .change_context(BidonError::Configuration {
                message: "failed to read settings".to_string(),
            })?
            .try_deserialize()
            .change_context(BidonError::Configuration {
                message: "failed to deserialize settings".to_string(),
            })?;

        settings
            .validate()
            .change_context(BidonError::Configuration {
                message: "invalid settings".to_string(),
            })?;
        Ok(settings)
    }
}
