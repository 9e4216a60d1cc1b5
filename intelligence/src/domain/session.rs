// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Per-session rolling aggregate.
//!
//! Confidence and complexity are folded as `avg = (avg + new) / 2`, which
//! weights recent queries far more than a running mean would.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::pattern::PatternId;

pub const MAX_RECENT_PATTERNS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionIntelligence {
    pub session_id: String,
    pub total_queries: u64,
    pub fast_path_usage: u64,
    pub average_confidence: f64,
    /// Distinct pattern ids, least recently seen first
    pub recent_patterns: Vec<PatternId>,
    pub complexity_score: f64,
    pub learning_progress: f64,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl SessionIntelligence {
    pub fn new(session_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.into(),
            total_queries: 0,
            fast_path_usage: 0,
            average_confidence: 0.0,
            recent_patterns: Vec::new(),
            complexity_score: 0.0,
            learning_progress: 0.0,
            created_at: now,
            last_activity: now,
        }
    }

    pub fn record_query(
        &mut self,
        confidence: f64,
        fast_path: bool,
        pattern_id: Option<&PatternId>,
        complexity: f64,
        now: DateTime<Utc>,
    ) {
        self.total_queries += 1;
        if fast_path {
            self.fast_path_usage += 1;
        }
        self.average_confidence = (self.average_confidence + confidence) / 2.0;
        self.complexity_score = (self.complexity_score + complexity) / 2.0;
        self.learning_progress = self.fast_path_usage as f64 / self.total_queries as f64;
        self.last_activity = now;

        if let Some(id) = pattern_id {
            self.remember_pattern(id);
        }
    }

    fn remember_pattern(&mut self, id: &PatternId) {
        self.recent_patterns.retain(|seen| seen != id);
        self.recent_patterns.push(id.clone());
        if self.recent_patterns.len() > MAX_RECENT_PATTERNS {
            let overflow = self.recent_patterns.len() - MAX_RECENT_PATTERNS;
            self.recent_patterns.drain(..overflow);
        }
    }
}
