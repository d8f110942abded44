use crate::constants::DEFAULT_FOLLOW_ON_MARGIN;
use crate::publish::PublisherConfig;
use crate::utils::{LoadConfigError, ScoringConfigLoader, ScoringConfigLoaderSync, load_from_file, load_from_file_sync};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the scoring service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Upper bound on one scoring call, lock wait included, in milliseconds
    pub scoring_timeout_ms: u64,
    /// Commit attempts per unit of work on transient storage errors
    pub storage_max_attempts: u32,
    /// Backoff before the second commit attempt, in milliseconds
    pub storage_retry_delay_ms: u64,
    /// Backoff ceiling, in milliseconds
    pub storage_retry_max_delay_ms: u64,
    /// Buffer size of the live event channel
    pub publish_channel_capacity: usize,
    /// Bound on one hand-off to the fan-out, in milliseconds
    pub publish_timeout_ms: u64,
    /// Hand-offs per live event before it is dropped
    pub publish_max_attempts: u32,
    /// Lifetime of a cached current-batsmen/bowler projection, in seconds
    pub query_cache_ttl_secs: u64,
    /// First-innings deficit that allows a follow-on in a Test
    pub follow_on_margin: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            scoring_timeout_ms: 2_000,
            storage_max_attempts: 3,
            storage_retry_delay_ms: 20,
            storage_retry_max_delay_ms: 200,
            publish_channel_capacity: 1024,
            publish_timeout_ms: 250,
            publish_max_attempts: 2,
            query_cache_ttl_secs: 5,
            follow_on_margin: DEFAULT_FOLLOW_ON_MARGIN,
        }
    }
}

impl ScoringConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> eyre::Result<Self> {
        let mut config = Self::default();

        if let Ok(timeout_str) = std::env::var("SCORING_TIMEOUT_MS") {
            config.scoring_timeout_ms = timeout_str.parse().map_err(|e| eyre::eyre!("Invalid SCORING_TIMEOUT_MS: {}", e))?;
        }

        if let Ok(attempts_str) = std::env::var("STORAGE_MAX_ATTEMPTS") {
            config.storage_max_attempts = attempts_str.parse().map_err(|e| eyre::eyre!("Invalid STORAGE_MAX_ATTEMPTS: {}", e))?;
        }

        if let Ok(delay_str) = std::env::var("STORAGE_RETRY_DELAY_MS") {
            config.storage_retry_delay_ms = delay_str.parse().map_err(|e| eyre::eyre!("Invalid STORAGE_RETRY_DELAY_MS: {}", e))?;
        }

        if let Ok(delay_str) = std::env::var("STORAGE_RETRY_MAX_DELAY_MS") {
            config.storage_retry_max_delay_ms = delay_str.parse().map_err(|e| eyre::eyre!("Invalid STORAGE_RETRY_MAX_DELAY_MS: {}", e))?;
        }

        if let Ok(capacity_str) = std::env::var("PUBLISH_CHANNEL_CAPACITY") {
            config.publish_channel_capacity = capacity_str.parse().map_err(|e| eyre::eyre!("Invalid PUBLISH_CHANNEL_CAPACITY: {}", e))?;
        }

        if let Ok(timeout_str) = std::env::var("PUBLISH_TIMEOUT_MS") {
            config.publish_timeout_ms = timeout_str.parse().map_err(|e| eyre::eyre!("Invalid PUBLISH_TIMEOUT_MS: {}", e))?;
        }

        if let Ok(attempts_str) = std::env::var("PUBLISH_MAX_ATTEMPTS") {
            config.publish_max_attempts = attempts_str.parse().map_err(|e| eyre::eyre!("Invalid PUBLISH_MAX_ATTEMPTS: {}", e))?;
        }

        if let Ok(ttl_str) = std::env::var("QUERY_CACHE_TTL_SECS") {
            config.query_cache_ttl_secs = ttl_str.parse().map_err(|e| eyre::eyre!("Invalid QUERY_CACHE_TTL_SECS: {}", e))?;
        }

        if let Ok(margin_str) = std::env::var("FOLLOW_ON_MARGIN") {
            config.follow_on_margin = margin_str.parse().map_err(|e| eyre::eyre!("Invalid FOLLOW_ON_MARGIN: {}", e))?;
        }

        Ok(config)
    }

    pub fn scoring_timeout(&self) -> Duration {
        Duration::from_millis(self.scoring_timeout_ms)
    }

    pub fn storage_retry_delay(&self) -> Duration {
        Duration::from_millis(self.storage_retry_delay_ms)
    }

    pub fn storage_retry_max_delay(&self) -> Duration {
        Duration::from_millis(self.storage_retry_max_delay_ms)
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }

    pub fn query_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.query_cache_ttl_secs)
    }

    pub fn publisher_config(&self) -> PublisherConfig {
        PublisherConfig {
            channel_capacity: self.publish_channel_capacity,
            delivery_timeout: self.publish_timeout(),
            max_attempts: self.publish_max_attempts,
        }
    }
}

/// File layout read by the loaders: everything under a `[scoring]` table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringConfigFile {
    #[serde(default)]
    pub scoring: ScoringConfig,
}

#[async_trait]
impl ScoringConfigLoader for ScoringConfig {
    type SectionType = ScoringConfig;

    async fn load_section_from_file(file_name: String) -> Result<Self::SectionType, LoadConfigError> {
        let file: ScoringConfigFile = load_from_file(file_name).await?;
        Ok(file.scoring)
    }
}

impl ScoringConfigLoaderSync for ScoringConfig {
    type SectionType = ScoringConfig;

    fn load_section_from_file_sync(file_name: String) -> Result<Self::SectionType, LoadConfigError> {
        let file: ScoringConfigFile = load_from_file_sync(file_name)?;
        Ok(file.scoring)
    }
}
