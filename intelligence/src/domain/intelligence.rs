// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Decision engine request and result types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::context::ContextTree;
use super::pattern::PatternMatchResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    /// Skip downstream reasoning and run the matched tool directly
    FastPath,
    /// Reason with the match plus assembled session context
    EnhancedContext,
    /// Full reasoning path
    StandardPath,
    NoMatch,
}

impl RecommendedAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendedAction::FastPath => "fast_path",
            RecommendedAction::EnhancedContext => "enhanced_context",
            RecommendedAction::StandardPath => "standard_path",
            RecommendedAction::NoMatch => "no_match",
        }
    }
}

impl fmt::Display for RecommendedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextPriority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub action: RecommendedAction,
    pub confidence: f64,
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_tools: Option<Vec<String>>,
    pub context_priority: ContextPriority,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_time_ms: u64,
    pub pattern_time_ms: u64,
    pub context_time_ms: u64,
    /// Cumulative across the engine's lifetime
    pub cache_hits: u64,
    pub cache_misses: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMetadata {
    pub request_id: Uuid,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub pattern_matching_used: bool,
    pub context_tree_used: bool,
    pub fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntelligenceResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_match: Option<PatternMatchResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_tree: Option<ContextTree>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_prompt: Option<String>,
    pub recommendation: Recommendation,
    pub performance: PerformanceMetrics,
    pub metadata: ResultMetadata,
}

/// Per-call overrides. Unset fields fall back to the engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntelligenceOptions {
    pub session_id: Option<String>,
    pub enable_pattern_matching: Option<bool>,
    pub enable_context_tree: Option<bool>,
    pub max_context_nodes: Option<usize>,
    pub include_low_priority: Option<bool>,
}

impl IntelligenceOptions {
    pub fn for_session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            ..Self::default()
        }
    }

    pub fn pattern_matching(mut self, enabled: bool) -> Self {
        self.enable_pattern_matching = Some(enabled);
        self
    }

    pub fn context_tree(mut self, enabled: bool) -> Self {
        self.enable_context_tree = Some(enabled);
        self
    }

    pub fn max_context_nodes(mut self, nodes: usize) -> Self {
        self.max_context_nodes = Some(nodes);
        self
    }

    pub fn include_low_priority(mut self, include: bool) -> Self {
        self.include_low_priority = Some(include);
        self
    }
}
