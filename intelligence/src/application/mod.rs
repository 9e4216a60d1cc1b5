// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod fusion;
pub mod intelligence_service;
pub mod session_tracker;

pub use fusion::{fuse, has_analysis_intent, is_complex_input, query_complexity, should_build_context};
pub use intelligence_service::{IntelligenceEngine, DEFAULT_SESSION_ID};
pub use session_tracker::{CacheCounters, QueryOutcome, SessionTracker};
