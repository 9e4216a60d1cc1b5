// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Pattern-match signal types.
//!
//! Patterns are owned by the [`crate::PatternMatcher`] collaborator. This
//! crate only reads them and requests confidence changes through the
//! adaptation path, which keeps confidence inside
//! [`MIN_CONFIDENCE`]..=[`MAX_CONFIDENCE`].

use serde::{Deserialize, Serialize};
use std::fmt;

pub const MIN_CONFIDENCE: f64 = 0.1;
pub const MAX_CONFIDENCE: f64 = 0.99;

pub fn clamp_confidence(confidence: f64) -> f64 {
    confidence.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PatternId(pub String);

impl PatternId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PatternId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStats {
    pub success_count: u64,
    pub failure_count: u64,
}

impl UsageStats {
    pub fn total(&self) -> u64 {
        self.success_count + self.failure_count
    }

    pub fn success_rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.success_count as f64 / total as f64,
        }
    }

    pub fn record(&mut self, success: bool) {
        if success {
            self.success_count += 1;
        } else {
            self.failure_count += 1;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub id: PatternId,
    #[serde(default)]
    pub description: String,
    pub confidence: f64,
    #[serde(default)]
    pub usage_stats: UsageStats,
}

impl Pattern {
    pub fn new(id: impl Into<String>, confidence: f64) -> Self {
        Self {
            id: PatternId::new(id),
            description: String::new(),
            confidence: clamp_confidence(confidence),
            usage_stats: UsageStats::default(),
        }
    }

    /// Shift confidence by `delta`, clamped. Returns the new confidence.
    pub fn nudge_confidence(&mut self, delta: f64) -> f64 {
        self.confidence = clamp_confidence(self.confidence + delta);
        self.confidence
    }
}

/// Explicit user feedback on a pattern-driven action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    Positive,
    Negative,
}

impl Feedback {
    pub fn confidence_delta(&self) -> f64 {
        match self {
            Feedback::Positive => 0.05,
            Feedback::Negative => -0.10,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Feedback::Positive)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub tool_name: String,
    #[serde(default)]
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternMatch {
    pub pattern_id: PatternId,
    pub tool: ToolInvocation,
}

/// One matcher verdict for one utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternMatchResult {
    pub matched: bool,
    pub confidence: f64,
    pub should_use_fast_path: bool,
    pub execution_time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_match: Option<PatternMatch>,
}

impl PatternMatchResult {
    pub fn no_match() -> Self {
        Self {
            matched: false,
            confidence: 0.0,
            should_use_fast_path: false,
            execution_time_ms: 0,
            pattern_match: None,
        }
    }

    pub fn pattern_id(&self) -> Option<&PatternId> {
        self.pattern_match.as_ref().map(|m| &m.pattern_id)
    }

    pub fn tool_name(&self) -> Option<&str> {
        self.pattern_match.as_ref().map(|m| m.tool.tool_name.as_str())
    }
}
