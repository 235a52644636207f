//! Top-level sift configuration with layered resolution.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{ExpandConfig, PathConfig, RecallConfig, RerankConfig, RuntimeConfig};
use crate::errors::ConfigError;
use crate::models::{EntityCatalog, EntityTypeSpec};

/// Name of the project config file looked up by [`SiftConfig::load`].
pub const CONFIG_FILE_NAME: &str = "sift.toml";

/// Top-level configuration aggregating all sub-configs.
///
/// Resolution order (highest priority first):
/// 1. Per-request overrides (applied by the orchestrator)
/// 2. Environment variables (`SIFT_*`)
/// 3. Project config (`sift.toml`)
/// 4. Compiled defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiftConfig {
    pub recall: RecallConfig,
    pub expand: ExpandConfig,
    pub rerank: RerankConfig,
    pub paths: PathConfig,
    pub runtime: RuntimeConfig,
    pub entity_types: Vec<EntityTypeSpec>,
}

impl SiftConfig {
    /// Load configuration from `root/sift.toml` (if present) and the environment.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(CONFIG_FILE_NAME);
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit TOML file without environment overrides.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Load configuration from a TOML string (for testing).
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `SIFT_*` environment variables.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable source.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SIFT_RECALL_MODE") {
            self.recall.mode = v.parse()?;
        }
        if let Some(v) = lookup("SIFT_RERANK_STRATEGY") {
            self.rerank.strategy = v.parse()?;
        }
        if let Some(v) = lookup("SIFT_MAX_RESULTS") {
            self.rerank.max_results = parse_field("SIFT_MAX_RESULTS", &v)?;
        }
        if let Some(v) = lookup("SIFT_EXPAND_ENABLED") {
            self.expand.enabled = parse_field("SIFT_EXPAND_ENABLED", &v)?;
        }
        if let Some(v) = lookup("SIFT_PAGERANK_ENABLED") {
            self.rerank.pagerank.enabled = parse_field("SIFT_PAGERANK_ENABLED", &v)?;
        }
        if let Some(v) = lookup("SIFT_LEXICAL_ENABLED") {
            self.rerank.lexical_enabled = parse_field("SIFT_LEXICAL_ENABLED", &v)?;
        }
        if let Some(v) = lookup("SIFT_WORKER_THREADS") {
            self.runtime.worker_threads = parse_field("SIFT_WORKER_THREADS", &v)?;
        }
        if let Some(v) = lookup("SIFT_LOG") {
            self.runtime.log_level = v;
        }
        Ok(())
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit("recall.entity_similarity_threshold", self.recall.entity_similarity_threshold)?;
        check_unit("recall.intersection_threshold", self.recall.intersection_threshold)?;
        check_unit("expand.similarity_blend", self.expand.similarity_blend)?;
        check_unit("expand.hop_decay", self.expand.hop_decay)?;
        check_unit("rerank.pagerank.blend", self.rerank.pagerank.blend)?;
        if !(0.0..1.0).contains(&self.rerank.pagerank.damping) {
            return Err(invalid("rerank.pagerank.damping", "must be in [0.0, 1.0)"));
        }
        if self.recall.max_keys == 0 {
            return Err(invalid("recall.max_keys", "must be greater than 0"));
        }
        if self.rerank.max_results == 0 {
            return Err(invalid("rerank.max_results", "must be greater than 0"));
        }
        if self.runtime.worker_threads == 0 {
            return Err(invalid("runtime.worker_threads", "must be greater than 0"));
        }
        if self.recall.core_entity_boost < 1.0 {
            return Err(invalid("recall.core_entity_boost", "must be at least 1.0"));
        }
        if self.paths.max_depth == 0 {
            return Err(invalid("paths.max_depth", "must be greater than 0"));
        }
        let weights = &self.rerank.weights;
        for (field, w) in [
            ("rerank.weights.vector", weights.vector),
            ("rerank.weights.relation", weights.relation),
            ("rerank.weights.density", weights.density),
            ("rerank.weights.lexical", weights.lexical),
        ] {
            if !w.is_finite() || w < 0.0 {
                return Err(invalid(field, "must be a non-negative number"));
            }
        }
        for spec in &self.entity_types {
            if !spec.weight.is_finite() || spec.weight <= 0.0 {
                return Err(invalid(
                    &format!("entity_types.{}.weight", spec.name),
                    "must be a positive number",
                ));
            }
        }
        Ok(())
    }

    /// Lookup table over the configured entity types.
    pub fn catalog(&self) -> EntityCatalog {
        EntityCatalog::new(&self.entity_types)
    }
}

fn check_unit(field: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, "must be between 0.0 and 1.0"))
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::ValidationFailed {
        field: field.to_string(),
        message: message.to_string(),
    }
}

fn parse_field<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::ValidationFailed {
        field: field.to_string(),
        message: format!("cannot parse {value:?}"),
    })
}
