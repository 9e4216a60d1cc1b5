// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use aegis_memory::HealthStatus;
use serde::{Deserialize, Serialize};

use super::pattern::PatternId;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalStats {
    pub total_queries: u64,
    pub fast_path_count: u64,
    pub fast_path_rate: f64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_hit_rate: f64,
    pub active_sessions: usize,
    pub average_response_time_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternUsage {
    pub pattern_id: PatternId,
    pub confidence: f64,
    pub total_uses: u64,
    pub success_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternAnalytics {
    pub total_patterns: usize,
    pub average_confidence: f64,
    /// Confidence >= 0.8
    pub high_confidence_patterns: usize,
    /// Confidence < 0.3
    pub low_confidence_patterns: usize,
    /// Most used first
    pub top_patterns: Vec<PatternUsage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextAnalytics {
    pub active_sessions: usize,
    pub average_complexity: f64,
    pub cache_stats: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntelligenceHealth {
    pub status: HealthStatus,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub total_patterns: usize,
    pub active_contexts: usize,
}
