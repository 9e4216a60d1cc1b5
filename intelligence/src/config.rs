// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Intelligence Configuration
//
// Feature toggles and thresholds for the decision engine. Loaded from YAML,
// then overridden from AEGIS_INTELLIGENCE_* environment variables.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntelligenceConfig {
    #[serde(default = "default_true")]
    pub enable_pattern_matching: bool,

    #[serde(default = "default_true")]
    pub enable_context_trees: bool,

    /// Pushed to the pattern matcher at initialization
    #[serde(default = "default_fast_path_threshold")]
    pub fast_path_threshold: f64,

    /// Matches below this confidence always get context assembled
    #[serde(default = "default_context_confidence_threshold")]
    pub context_confidence_threshold: f64,

    #[serde(default = "default_max_context_nodes")]
    pub max_context_nodes: usize,

    #[serde(default)]
    pub include_low_priority: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_source_path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_template_path: Option<PathBuf>,
}

impl Default for IntelligenceConfig {
    fn default() -> Self {
        Self {
            enable_pattern_matching: true,
            enable_context_trees: true,
            fast_path_threshold: default_fast_path_threshold(),
            context_confidence_threshold: default_context_confidence_threshold(),
            max_context_nodes: default_max_context_nodes(),
            include_low_priority: false,
            pattern_source_path: None,
            context_template_path: None,
        }
    }
}

impl IntelligenceConfig {
    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config =
            serde_yaml::from_str(yaml).context("Failed to parse intelligence configuration")?;
        Ok(config)
    }

    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read intelligence configuration at {:?}", path))?;
        Self::from_yaml_str(&content)
    }

    /// Apply AEGIS_INTELLIGENCE_* environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("AEGIS_INTELLIGENCE_PATTERN_MATCHING") {
            if let Some(enabled) = parse_bool("AEGIS_INTELLIGENCE_PATTERN_MATCHING", &v) {
                self.enable_pattern_matching = enabled;
            }
        }
        if let Some(v) = lookup("AEGIS_INTELLIGENCE_CONTEXT_TREES") {
            if let Some(enabled) = parse_bool("AEGIS_INTELLIGENCE_CONTEXT_TREES", &v) {
                self.enable_context_trees = enabled;
            }
        }
        if let Some(v) = lookup("AEGIS_INTELLIGENCE_FAST_PATH_THRESHOLD") {
            match v.trim().parse::<f64>() {
                Ok(threshold) => {
                    tracing::info!("Environment override: AEGIS_INTELLIGENCE_FAST_PATH_THRESHOLD={}", threshold);
                    self.fast_path_threshold = threshold;
                }
                Err(_) => tracing::warn!(
                    "Invalid value for AEGIS_INTELLIGENCE_FAST_PATH_THRESHOLD: '{}'. Ignoring.",
                    v
                ),
            }
        }
        if let Some(v) = lookup("AEGIS_INTELLIGENCE_MAX_CONTEXT_NODES") {
            match v.trim().parse::<usize>() {
                Ok(nodes) => {
                    tracing::info!("Environment override: AEGIS_INTELLIGENCE_MAX_CONTEXT_NODES={}", nodes);
                    self.max_context_nodes = nodes;
                }
                Err(_) => tracing::warn!(
                    "Invalid value for AEGIS_INTELLIGENCE_MAX_CONTEXT_NODES: '{}'. Ignoring.",
                    v
                ),
            }
        }
        if let Some(v) = lookup("AEGIS_INTELLIGENCE_INCLUDE_LOW_PRIORITY") {
            if let Some(include) = parse_bool("AEGIS_INTELLIGENCE_INCLUDE_LOW_PRIORITY", &v) {
                self.include_low_priority = include;
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=1.0).contains(&self.fast_path_threshold) {
            anyhow::bail!(
                "fast_path_threshold must be within [0, 1], got {}",
                self.fast_path_threshold
            );
        }
        if !(0.0..=1.0).contains(&self.context_confidence_threshold) {
            anyhow::bail!(
                "context_confidence_threshold must be within [0, 1], got {}",
                self.context_confidence_threshold
            );
        }
        if self.max_context_nodes == 0 {
            anyhow::bail!("max_context_nodes must be greater than zero");
        }
        Ok(())
    }
}

fn parse_bool(name: &str, value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => {
            tracing::info!("Environment override: {}=true", name);
            Some(true)
        }
        "false" | "0" | "no" | "off" => {
            tracing::info!("Environment override: {}=false", name);
            Some(false)
        }
        _ => {
            tracing::warn!("Invalid value for {}: '{}'. Expected true/false. Ignoring.", name, value);
            None
        }
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_fast_path_threshold() -> f64 {
    0.85
}

fn default_context_confidence_threshold() -> f64 {
    0.75
}

fn default_max_context_nodes() -> usize {
    50
}
