// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Frequency of one normalized key pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternFrequency {
    pub pattern: String,
    pub frequency: usize,
    /// Up to three literal keys that produced the pattern.
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn instant(at: DateTime<Utc>) -> Self {
        Self { start: at, end: at }
    }
}

/// Output of the aggregation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    pub summary: String,
    /// Sorted by descending frequency.
    pub patterns: Vec<PatternFrequency>,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
    pub time_range: TimeRange,
    pub total_entries_analyzed: usize,
}

impl AggregationResult {
    /// Canonical result for an empty input set.
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            summary: "No memory entries to analyze.".to_string(),
            patterns: Vec::new(),
            insights: Vec::new(),
            recommendations: Vec::new(),
            time_range: TimeRange::instant(now),
            total_entries_analyzed: 0,
        }
    }
}
