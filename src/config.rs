use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::machines::pricing::PhaseRules;

/// Main configuration structure for bookforge.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BookforgeConfig {
    /// Automatic pricing thresholds and price points.
    pub pricing: PhaseRules,
    /// Content-generation worker settings.
    pub writer: WriterConfig,
    /// Observability settings.
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WriterConfig {
    /// Cap on chapters queued per book per daily sweep.
    pub max_chapters_per_day: u32,
    /// Planned chapter count when a book does not specify one.
    pub default_chapter_count: u32,
    /// Target word count when a book does not specify one.
    pub default_word_count: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level for the tracing subscriber.
    pub log_level: String,
    /// Emit JSON logs (structured) rather than plain text.
    pub json_logs: bool,
}

impl Default for BookforgeConfig {
    fn default() -> Self {
        Self {
            pricing: PhaseRules::default(),
            writer: WriterConfig {
                max_chapters_per_day: 5,
                default_chapter_count: 80,
                default_word_count: 80_000,
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                json_logs: true,
            },
        }
    }
}

impl BookforgeConfig {
    /// Load configuration with precedence:
    /// 1. Built-in defaults
    /// 2. bookforge.toml, if present
    /// 3. Environment variables prefixed with BOOKFORGE_
    pub fn load() -> Result<Self> {
        let defaults = Config::try_from(&Self::default())?;
        let mut builder = Config::builder().add_source(defaults);

        if Path::new("bookforge.toml").exists() {
            builder = builder.add_source(File::with_name("bookforge"));
        }

        builder = builder.add_source(
            Environment::with_prefix("BOOKFORGE")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Load .env file if it exists.
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_production_pricing_rules() {
        let config = BookforgeConfig::default();
        assert_eq!(config.pricing.launch_price_usd, 0.99);
        assert_eq!(config.pricing.reviews_threshold_for_growth, 20);
        assert_eq!(config.pricing.days_in_launch_phase, 7);
        assert_eq!(config.pricing.days_between_promotions, 90);
        assert_eq!(config.writer.max_chapters_per_day, 5);
    }
}
