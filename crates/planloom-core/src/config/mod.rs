//! Configuration management with file persistence

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::domain::conflicts::ConflictConfig;
use crate::domain::reindex::ReindexOptions;
use crate::domain::scoring::ScoringConfig;

/// Planloom configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub conflicts: ConflictConfig,
    #[serde(default)]
    pub reindex: ReindexConfig,
}

/// Reindex tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReindexConfig {
    /// Minimum feature-name similarity at which a SIMILAR_TO edge is written
    #[serde(default = "default_similarity_floor")]
    pub similarity_floor: f32,
}

fn default_similarity_floor() -> f32 {
    0.5
}

impl Default for ReindexConfig {
    fn default() -> Self {
        Self {
            similarity_floor: default_similarity_floor(),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("PLANLOOM_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("planloom")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, or create default if it doesn't exist
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            config.validate()?;
            Ok(config)
        } else {
            // Return default config without creating file
            Ok(Config::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        self.validate()?;

        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;

        let path = Self::config_path()?;
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        let weights = &self.scoring.weights;
        for (name, value) in [
            ("dependency", weights.dependency),
            ("priority", weights.priority),
            ("workload", weights.workload),
        ] {
            if value < 0.0 {
                return Err(anyhow!("scoring weight '{}' must not be negative", name));
            }
        }

        let threshold = self.conflicts.overlap_confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(anyhow!(
                "overlap_confidence_threshold must be between 0 and 1, got {}",
                threshold
            ));
        }

        if self.conflicts.stale_wip_days < 1 {
            return Err(anyhow!(
                "stale_wip_days must be at least 1, got {}",
                self.conflicts.stale_wip_days
            ));
        }

        let floor = self.reindex.similarity_floor;
        if !(0.0..=1.0).contains(&floor) {
            return Err(anyhow!(
                "similarity_floor must be between 0 and 1, got {}",
                floor
            ));
        }

        Ok(())
    }

    /// Build reindex options from this configuration
    pub fn reindex_options(&self) -> ReindexOptions {
        ReindexOptions {
            plan_id: None,
            similarity_floor: self.reindex.similarity_floor,
        }
    }
}
