// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Memory Entries
//!
//! A [`MemoryEntry`] is one stored fact. It lives in exactly one
//! [`MemoryTier`] and is addressed by a composite key built from the tier,
//! the namespace (or the `*` wildcard when unscoped) and the caller's key:
//!
//! ```text
//! memory:{tier}:{namespace | *}:{key}
//! ```
//!
//! # Invariants
//!
//! - `expires_at >= created_at`.
//! - An entry whose `expires_at` has passed is logically absent from every
//!   read, even while still physically present.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

use super::execution::ExecutionRecord;

/// Root segment of every composite memory address.
pub const ADDRESS_PREFIX: &str = "memory";

/// Namespace segment used when an entry has no namespace.
pub const UNSCOPED_NAMESPACE: &str = "*";

/// Retention class with an independent TTL and capacity policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryTier {
    ShortTerm,
    LongTerm,
}

impl MemoryTier {
    pub const ALL: [MemoryTier; 2] = [MemoryTier::ShortTerm, MemoryTier::LongTerm];

    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryTier::ShortTerm => "short_term",
            MemoryTier::LongTerm => "long_term",
        }
    }
}

impl fmt::Display for MemoryTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pattern learned from execution history and kept for later mining.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnedPattern {
    pub pattern_id: String,
    pub description: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

/// Payload of a memory entry.
///
/// The known payload kinds get their own variant; anything else travels as
/// free-form JSON in [`MemoryValue::Data`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum MemoryValue {
    Execution(ExecutionRecord),
    LearnedPattern(LearnedPattern),
    Note(String),
    Data(serde_json::Value),
}

impl MemoryValue {
    pub fn note(text: impl Into<String>) -> Self {
        MemoryValue::Note(text.into())
    }

    pub fn value_type(&self) -> &'static str {
        match self {
            MemoryValue::Execution(_) => "execution",
            MemoryValue::LearnedPattern(_) => "learned_pattern",
            MemoryValue::Note(_) => "note",
            MemoryValue::Data(_) => "data",
        }
    }

    /// JSON text of the payload alone, without the enum envelope.
    pub fn payload_text(&self) -> String {
        let rendered = match self {
            MemoryValue::Execution(record) => serde_json::to_string(record),
            MemoryValue::LearnedPattern(pattern) => serde_json::to_string(pattern),
            MemoryValue::Note(text) => serde_json::to_string(text),
            MemoryValue::Data(value) => serde_json::to_string(value),
        };
        rendered.unwrap_or_default()
    }
}

impl From<serde_json::Value> for MemoryValue {
    fn from(value: serde_json::Value) -> Self {
        MemoryValue::Data(value)
    }
}

impl From<ExecutionRecord> for MemoryValue {
    fn from(record: ExecutionRecord) -> Self {
        MemoryValue::Execution(record)
    }
}

impl From<LearnedPattern> for MemoryValue {
    fn from(pattern: LearnedPattern) -> Self {
        MemoryValue::LearnedPattern(pattern)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub key: String,
    pub value: MemoryValue,
    pub tier: MemoryTier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl MemoryEntry {
    pub fn address(&self) -> String {
        memory_address(self.tier, self.namespace.as_deref(), &self.key)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Lower-cased text that substring searches run against:
    /// key, serialized value, namespace and tags.
    pub fn search_haystack(&self) -> String {
        let mut haystack = String::with_capacity(self.key.len() + 64);
        haystack.push_str(&self.key);
        haystack.push(' ');
        haystack.push_str(&self.value.payload_text());
        if let Some(namespace) = &self.namespace {
            haystack.push(' ');
            haystack.push_str(namespace);
        }
        for tag in &self.tags {
            haystack.push(' ');
            haystack.push_str(tag);
        }
        haystack.to_lowercase()
    }

    /// Serialized size of the whole entry in bytes.
    pub fn serialized_size(&self) -> usize {
        serde_json::to_vec(self).map(|bytes| bytes.len()).unwrap_or(0)
    }

    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        tags.iter().any(|tag| self.tags.contains(tag))
    }
}

/// Composite address for `key` in `tier`, scoped by `namespace`.
pub fn memory_address(tier: MemoryTier, namespace: Option<&str>, key: &str) -> String {
    format!(
        "{}:{}:{}:{}",
        ADDRESS_PREFIX,
        tier.as_str(),
        namespace.unwrap_or(UNSCOPED_NAMESPACE),
        key
    )
}

/// Optional attributes accepted by a store operation.
#[derive(Debug, Clone, Default)]
pub struct StoreOptions {
    pub session_id: Option<String>,
    pub namespace: Option<String>,
    pub tags: Vec<String>,
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// Overrides the tier's default TTL.
    pub ttl: Option<Duration>,
}

impl StoreOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}
