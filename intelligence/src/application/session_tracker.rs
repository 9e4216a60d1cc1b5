// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Session and global statistics.
//!
//! Updates take each lock briefly and independently, so two concurrent
//! queries for one session may interleave: the aggregates are advisory and
//! eventually consistent, not linearizable.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;

use crate::domain::{GlobalStats, PatternId, RecommendedAction, SessionIntelligence};

#[derive(Debug, Default, Clone, Copy)]
struct GlobalCounters {
    total_queries: u64,
    fast_path_count: u64,
    cache_hits: u64,
    cache_misses: u64,
    total_response_time_ms: u64,
}

/// Cumulative cache counters after an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheCounters {
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug, Default)]
pub struct SessionTracker {
    sessions: RwLock<HashMap<String, SessionIntelligence>>,
    global: Mutex<GlobalCounters>,
}

pub struct QueryOutcome<'a> {
    pub session_id: &'a str,
    pub action: RecommendedAction,
    pub confidence: f64,
    pub pattern_id: Option<&'a PatternId>,
    pub complexity: f64,
    pub response_time_ms: u64,
    pub at: DateTime<Utc>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one decided query into its session and the global counters.
    /// A `fast_path` decision counts as a cache hit, anything else a miss.
    pub fn record_query(&self, outcome: QueryOutcome<'_>) -> CacheCounters {
        let fast_path = outcome.action == RecommendedAction::FastPath;

        {
            let mut sessions = self.sessions.write();
            sessions
                .entry(outcome.session_id.to_string())
                .or_insert_with(|| SessionIntelligence::new(outcome.session_id, outcome.at))
                .record_query(
                    outcome.confidence,
                    fast_path,
                    outcome.pattern_id,
                    outcome.complexity,
                    outcome.at,
                );
        }

        let mut global = self.global.lock();
        global.total_queries += 1;
        global.total_response_time_ms += outcome.response_time_ms;
        if fast_path {
            global.fast_path_count += 1;
            global.cache_hits += 1;
        } else {
            global.cache_misses += 1;
        }
        CacheCounters {
            hits: global.cache_hits,
            misses: global.cache_misses,
        }
    }

    /// A failed request records one cache miss and nothing else.
    pub fn record_fallback(&self) -> CacheCounters {
        let mut global = self.global.lock();
        global.cache_misses += 1;
        CacheCounters {
            hits: global.cache_hits,
            misses: global.cache_misses,
        }
    }

    pub fn session(&self, session_id: &str) -> Option<SessionIntelligence> {
        self.sessions.read().get(session_id).cloned()
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn average_complexity(&self) -> f64 {
        let sessions = self.sessions.read();
        if sessions.is_empty() {
            return 0.0;
        }
        sessions.values().map(|s| s.complexity_score).sum::<f64>() / sessions.len() as f64
    }

    pub fn cache_counters(&self) -> CacheCounters {
        let global = self.global.lock();
        CacheCounters {
            hits: global.cache_hits,
            misses: global.cache_misses,
        }
    }

    pub fn global_stats(&self) -> GlobalStats {
        let active_sessions = self.active_sessions();
        let g = *self.global.lock();
        let ratio = |part: u64, whole: u64| {
            if whole == 0 {
                0.0
            } else {
                part as f64 / whole as f64
            }
        };

        GlobalStats {
            total_queries: g.total_queries,
            fast_path_count: g.fast_path_count,
            fast_path_rate: ratio(g.fast_path_count, g.total_queries),
            cache_hits: g.cache_hits,
            cache_misses: g.cache_misses,
            cache_hit_rate: ratio(g.cache_hits, g.cache_hits + g.cache_misses),
            active_sessions,
            average_response_time_ms: ratio(g.total_response_time_ms, g.total_queries),
        }
    }

    /// Drop every session and zero the global counters.
    pub fn reset(&self) {
        self.sessions.write().clear();
        *self.global.lock() = GlobalCounters::default();
    }
}
