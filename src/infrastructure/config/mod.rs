//! Configuration loading with hierarchical merging.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::WardenConfig;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid cache capacity: {0}. Must be at least 1")]
    InvalidCacheCapacity(usize),

    #[error("Invalid cache TTL: {0}. Must be positive")]
    InvalidCacheTtl(u64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid retrieval depths: coarse_k {0} must be >= final_k {1}")]
    InvalidRetrievalDepths(usize, usize),

    #[error("Readiness weights sum to {0}, expected 1.0")]
    InvalidWeights(f64),

    #[error("Invalid threshold for {transition}: {detail}")]
    InvalidThreshold { transition: String, detail: String },

    #[error("Invalid context bonus cap: {0}. Must be in [0.0, 1.0]")]
    InvalidContextBonusCap(f64),

    #[error("Invalid action rules: {0}")]
    InvalidActions(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .warden/config.yaml (project config, created by init)
    /// 3. .warden/local.yaml (project local overrides, optional)
    /// 4. Environment variables (WARDEN_* prefix, highest priority)
    pub fn load() -> Result<WardenConfig> {
        let config: WardenConfig = Figment::new()
            .merge(Serialized::defaults(WardenConfig::default()))
            .merge(Yaml::file(".warden/config.yaml"))
            .merge(Yaml::file(".warden/local.yaml"))
            .merge(Env::prefixed("WARDEN_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<WardenConfig> {
        let config: WardenConfig = Figment::new()
            .merge(Serialized::defaults(WardenConfig::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &WardenConfig) -> Result<(), ConfigError> {
        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.database.max_connections,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if config.cache.capacity == 0 {
            return Err(ConfigError::InvalidCacheCapacity(config.cache.capacity));
        }
        if config.cache.ttl_secs == 0 {
            return Err(ConfigError::InvalidCacheTtl(config.cache.ttl_secs));
        }

        if config.retrieval.coarse_k < config.retrieval.final_k {
            return Err(ConfigError::InvalidRetrievalDepths(
                config.retrieval.coarse_k,
                config.retrieval.final_k,
            ));
        }

        let weight_sum = config.graduation.weights.sum();
        if (weight_sum - 1.0).abs() > 1e-6 {
            return Err(ConfigError::InvalidWeights(weight_sum));
        }

        if !(0.0..=1.0).contains(&config.graduation.context_bonus_cap) {
            return Err(ConfigError::InvalidContextBonusCap(
                config.graduation.context_bonus_cap,
            ));
        }

        for (transition, thresholds) in [
            ("student_to_intern", &config.graduation.student_to_intern),
            (
                "intern_to_supervised",
                &config.graduation.intern_to_supervised,
            ),
            (
                "supervised_to_autonomous",
                &config.graduation.supervised_to_autonomous,
            ),
        ] {
            if !(0.0..=1.0).contains(&thresholds.max_intervention_rate) {
                return Err(ConfigError::InvalidThreshold {
                    transition: transition.to_string(),
                    detail: format!(
                        "max_intervention_rate {} outside [0.0, 1.0]",
                        thresholds.max_intervention_rate
                    ),
                });
            }
            if !(0.0..=1.0).contains(&thresholds.min_compliance) {
                return Err(ConfigError::InvalidThreshold {
                    transition: transition.to_string(),
                    detail: format!(
                        "min_compliance {} outside [0.0, 1.0]",
                        thresholds.min_compliance
                    ),
                });
            }
            if thresholds.min_episodes == 0 {
                return Err(ConfigError::InvalidThreshold {
                    transition: transition.to_string(),
                    detail: "min_episodes must be at least 1".to_string(),
                });
            }
        }

        // Action rules must parse into a registry exactly once.
        crate::services::ActionRegistry::from_rules(&config.actions)
            .map_err(ConfigError::InvalidActions)?;

        Ok(())
    }
}
