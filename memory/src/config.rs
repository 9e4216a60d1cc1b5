// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Memory Configuration
//
// Tier policies (TTL + capacity), reaper schedule and feature toggles.
// Loaded from YAML, then overridden from AEGIS_MEMORY_* environment
// variables so container deployments can tune limits without a file.
//
// memory:
//   short_term: { ttl: 1h, max_entries: 1000 }
//   long_term:  { ttl: 30days, max_entries: 10000 }
//   reaper:     { enabled: true, interval: 1h }

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::domain::MemoryTier;

/// Retention policy for one tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierPolicy {
    /// Default time-to-live applied when a write carries no override
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,

    /// Entry cap; the oldest entries are evicted beyond it
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl TierPolicy {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self { ttl, max_entries }
    }
}

/// Background expiry sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaperConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_reaper_interval", with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: default_reaper_interval(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_short_term")]
    pub short_term: TierPolicy,

    #[serde(default = "default_long_term")]
    pub long_term: TierPolicy,

    #[serde(default)]
    pub reaper: ReaperConfig,

    /// Allow `aggregate` to mine stored entries
    #[serde(default = "default_true")]
    pub enable_aggregation: bool,

    /// Allow searches that are scoped to neither a session nor a namespace
    #[serde(default = "default_true")]
    pub allow_global_access: bool,

    /// Maximum number of entries fed to one aggregation
    #[serde(default = "default_aggregation_limit")]
    pub aggregation_limit: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            short_term: default_short_term(),
            long_term: default_long_term(),
            reaper: ReaperConfig::default(),
            enable_aggregation: true,
            allow_global_access: true,
            aggregation_limit: default_aggregation_limit(),
        }
    }
}

impl MemoryConfig {
    pub fn policy(&self, tier: MemoryTier) -> &TierPolicy {
        match tier {
            MemoryTier::ShortTerm => &self.short_term,
            MemoryTier::LongTerm => &self.long_term,
        }
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml).context("Failed to parse memory configuration")?;
        Ok(config)
    }

    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read memory configuration at {:?}", path))?;
        Self::from_yaml_str(&content)
    }

    /// Apply AEGIS_MEMORY_* environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable source
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ttl) = lookup("AEGIS_MEMORY_SHORT_TERM_TTL").and_then(|v| parse_duration("AEGIS_MEMORY_SHORT_TERM_TTL", &v)) {
            self.short_term.ttl = ttl;
        }
        if let Some(ttl) = lookup("AEGIS_MEMORY_LONG_TERM_TTL").and_then(|v| parse_duration("AEGIS_MEMORY_LONG_TERM_TTL", &v)) {
            self.long_term.ttl = ttl;
        }
        if let Some(max) = lookup("AEGIS_MEMORY_SHORT_TERM_MAX_ENTRIES").and_then(|v| parse_usize("AEGIS_MEMORY_SHORT_TERM_MAX_ENTRIES", &v)) {
            self.short_term.max_entries = max;
        }
        if let Some(max) = lookup("AEGIS_MEMORY_LONG_TERM_MAX_ENTRIES").and_then(|v| parse_usize("AEGIS_MEMORY_LONG_TERM_MAX_ENTRIES", &v)) {
            self.long_term.max_entries = max;
        }
        if let Some(interval) = lookup("AEGIS_MEMORY_REAPER_INTERVAL").and_then(|v| parse_duration("AEGIS_MEMORY_REAPER_INTERVAL", &v)) {
            self.reaper.interval = interval;
        }
        if let Some(enabled) = lookup("AEGIS_MEMORY_ENABLE_AGGREGATION").and_then(|v| parse_bool("AEGIS_MEMORY_ENABLE_AGGREGATION", &v)) {
            self.enable_aggregation = enabled;
        }
        if let Some(allowed) = lookup("AEGIS_MEMORY_ALLOW_GLOBAL_ACCESS").and_then(|v| parse_bool("AEGIS_MEMORY_ALLOW_GLOBAL_ACCESS", &v)) {
            self.allow_global_access = allowed;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        for tier in MemoryTier::ALL {
            if self.policy(tier).max_entries == 0 {
                anyhow::bail!("{}.max_entries must be greater than zero", tier);
            }
        }

        if self.reaper.enabled && self.reaper.interval.is_zero() {
            anyhow::bail!("reaper.interval must be greater than zero when the reaper is enabled");
        }

        if self.aggregation_limit == 0 {
            anyhow::bail!("aggregation_limit must be greater than zero");
        }

        Ok(())
    }
}

fn parse_duration(name: &str, value: &str) -> Option<Duration> {
    match humantime_serde::re::humantime::parse_duration(value) {
        Ok(duration) => {
            tracing::info!("Environment override: {}={}", name, value);
            Some(duration)
        }
        Err(e) => {
            tracing::warn!("Invalid duration for {}: '{}' ({}). Ignoring.", name, value, e);
            None
        }
    }
}

fn parse_usize(name: &str, value: &str) -> Option<usize> {
    match value.trim().parse::<usize>() {
        Ok(n) => {
            tracing::info!("Environment override: {}={}", name, n);
            Some(n)
        }
        Err(_) => {
            tracing::warn!("Invalid value for {}: '{}'. Expected a positive integer. Ignoring.", name, value);
            None
        }
    }
}

pub(crate) fn parse_bool(name: &str, value: &str) -> Option<bool> {
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

fn default_max_entries() -> usize {
    1000
}

fn default_short_term() -> TierPolicy {
    TierPolicy::new(Duration::from_secs(60 * 60), 1000)
}

fn default_long_term() -> TierPolicy {
    TierPolicy::new(Duration::from_secs(30 * 24 * 60 * 60), 10_000)
}

fn default_reaper_interval() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_aggregation_limit() -> usize {
    1000
}
