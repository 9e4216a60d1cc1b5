// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Aggregation Engine
//!
//! Mines a slice of [`MemoryEntry`] values for recurring key shapes and
//! produces heuristic insights and recommendations. Pure and synchronous:
//! the caller supplies the entries (usually a `query` result) and the
//! reference instant.
//!
//! Key normalization replaces hex-looking runs of 8+ characters with `{id}`
//! and remaining digit runs with `{n}`, so `task:42:run:7` and
//! `task:9:run:12` both count toward `task:{n}:run:{n}`. Entries whose
//! metadata carries a `valueType` string also count toward `type:{valueType}`.

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use crate::domain::{AggregationResult, MemoryEntry, MemoryTier, PatternFrequency, TimeRange};

const MAX_EXAMPLES: usize = 3;
const RECENT_WINDOW_MINUTES: i64 = 60;
const RECENT_ACTIVITY_RATIO: f64 = 0.7;
const SESSION_DIVERSITY_THRESHOLD: usize = 10;
const TRANSIENT_DOMINANCE_FACTOR: usize = 3;
const KNOWLEDGE_DOMINANCE_FACTOR: usize = 2;
const EXPIRED_CLEANUP_RATIO: f64 = 0.2;
const CACHEABLE_PATTERN_FREQUENCY: usize = 10;
const ARCHIVE_SIZE_BYTES: usize = 1024 * 1024;

/// Ordered normalization rules; earlier rules win.
static KEY_NORMALIZERS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [(r"[0-9a-fA-F]{8,}", "{id}"), (r"\d+", "{n}")]
        .into_iter()
        .filter_map(|(pattern, placeholder)| {
            Regex::new(pattern).ok().map(|regex| (regex, placeholder))
        })
        .collect()
});

pub fn normalize_key(key: &str) -> String {
    KEY_NORMALIZERS
        .iter()
        .fold(key.to_string(), |acc, (regex, placeholder)| {
            regex.replace_all(&acc, *placeholder).into_owned()
        })
}

#[derive(Debug, Clone)]
pub struct AggregationEngine {
    limit: usize,
}

impl AggregationEngine {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Analyze at most `limit` entries, in the order given.
    pub fn aggregate(&self, entries: &[MemoryEntry], now: DateTime<Utc>) -> AggregationResult {
        let entries = &entries[..entries.len().min(self.limit)];
        if entries.is_empty() {
            return AggregationResult::empty(now);
        }

        let total = entries.len();
        let short_term = entries
            .iter()
            .filter(|e| e.tier == MemoryTier::ShortTerm)
            .count();
        let long_term = total - short_term;
        let sessions: BTreeSet<&str> = entries
            .iter()
            .filter_map(|e| e.session_id.as_deref())
            .collect();

        let patterns = extract_patterns(entries);
        let insights = insights(entries, now, short_term, long_term, sessions.len());
        let recommendations = recommendations(entries, now, &patterns);

        let start = entries.iter().map(|e| e.created_at).min().unwrap_or(now);
        let end = entries.iter().map(|e| e.created_at).max().unwrap_or(now);

        AggregationResult {
            summary: format!(
                "Analyzed {} entries ({} short-term, {} long-term) across {} sessions.",
                total,
                short_term,
                long_term,
                sessions.len()
            ),
            patterns,
            insights,
            recommendations,
            time_range: TimeRange { start, end },
            total_entries_analyzed: total,
        }
    }
}

fn extract_patterns(entries: &[MemoryEntry]) -> Vec<PatternFrequency> {
    let mut table: HashMap<String, PatternFrequency> = HashMap::new();
    let mut count = |pattern: String, key: &str| {
        let slot = table
            .entry(pattern.clone())
            .or_insert_with(|| PatternFrequency {
                pattern,
                frequency: 0,
                examples: Vec::new(),
            });
        slot.frequency += 1;
        if slot.examples.len() < MAX_EXAMPLES && !slot.examples.iter().any(|k| k == key) {
            slot.examples.push(key.to_string());
        }
    };

    for entry in entries {
        count(normalize_key(&entry.key), &entry.key);
        if let Some(value_type) = entry.metadata.get("valueType").and_then(|v| v.as_str()) {
            count(format!("type:{}", value_type), &entry.key);
        }
    }

    let mut patterns: Vec<PatternFrequency> = table.into_values().collect();
    patterns.sort_by(|a, b| {
        b.frequency
            .cmp(&a.frequency)
            .then_with(|| a.pattern.cmp(&b.pattern))
    });
    patterns
}

fn insights(
    entries: &[MemoryEntry],
    now: DateTime<Utc>,
    short_term: usize,
    long_term: usize,
    distinct_sessions: usize,
) -> Vec<String> {
    let total = entries.len();
    let mut insights = Vec::new();

    let window_start = now - Duration::minutes(RECENT_WINDOW_MINUTES);
    let recent = entries.iter().filter(|e| e.created_at >= window_start).count();
    if recent as f64 > total as f64 * RECENT_ACTIVITY_RATIO {
        insights.push(format!(
            "High recent activity: {} of {} entries were created in the last hour.",
            recent, total
        ));
    }

    if distinct_sessions == 1 {
        insights.push("Single-session focus: every session-scoped entry belongs to one session.".to_string());
    } else if distinct_sessions > SESSION_DIVERSITY_THRESHOLD {
        insights.push(format!(
            "High session diversity: entries span {} distinct sessions.",
            distinct_sessions
        ));
    }

    if short_term > long_term * TRANSIENT_DOMINANCE_FACTOR {
        insights.push(format!(
            "Transient-workflow dominant: {} short-term vs {} long-term entries.",
            short_term, long_term
        ));
    } else if long_term > short_term * KNOWLEDGE_DOMINANCE_FACTOR {
        insights.push(format!(
            "Knowledge-accumulation dominant: {} long-term vs {} short-term entries.",
            long_term, short_term
        ));
    }

    insights
}

fn recommendations(
    entries: &[MemoryEntry],
    now: DateTime<Utc>,
    patterns: &[PatternFrequency],
) -> Vec<String> {
    let total = entries.len();
    let mut recommendations = Vec::new();

    let expired = entries.iter().filter(|e| e.is_expired_at(now)).count();
    if expired as f64 > total as f64 * EXPIRED_CLEANUP_RATIO {
        recommendations.push(format!(
            "Run a cleanup: {} of {} analyzed entries have expired.",
            expired, total
        ));
    }

    for pattern in patterns
        .iter()
        .filter(|p| p.frequency > CACHEABLE_PATTERN_FREQUENCY)
    {
        recommendations.push(format!(
            "Consider caching pattern '{}' ({} occurrences).",
            pattern.pattern, pattern.frequency
        ));
    }

    let total_size: usize = entries.iter().map(MemoryEntry::serialized_size).sum();
    if total_size > ARCHIVE_SIZE_BYTES {
        recommendations.push(format!(
            "Stored entries total {} bytes; archive older entries or shorten retention.",
            total_size
        ));
    }

    recommendations
}
