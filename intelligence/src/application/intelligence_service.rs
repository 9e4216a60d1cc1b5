// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # IntelligenceEngine
//!
//! Per-request decision tree deciding whether a downstream reasoning call
//! can be skipped:
//!
//! 1. Ask the [`PatternMatcher`] for a match (if enabled).
//! 2. Decide whether session context is worth assembling.
//! 3. Ask the [`ContextTreeBuilder`] for a bounded tree and prompt (if so).
//! 4. [`fuse`] both signals into a [`Recommendation`].
//! 5. Fold the outcome into session and global statistics.
//!
//! Any failure in steps 1-5, including a call before [`initialize`], yields
//! a fallback `standard_path` result instead of an error.
//!
//! The adaptation path (`record_tool_execution`, `adapt_pattern`) feeds
//! outcomes back into the matcher's confidence state.
//!
//! [`initialize`]: IntelligenceEngine::initialize

use std::cmp::Reverse;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use aegis_memory::{Clock, DurableStorage, ExecutionRecord, HealthStatus, SystemClock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::fusion::{fuse, query_complexity, should_build_context};
use super::session_tracker::{QueryOutcome, SessionTracker};
use crate::config::IntelligenceConfig;
use crate::domain::{
    clamp_confidence, ContextAnalytics, ContextPriority, ContextTreeBuilder, Feedback, GlobalStats,
    IntelligenceError, IntelligenceHealth, IntelligenceOptions, IntelligenceResult, PatternAnalytics,
    PatternId, PatternMatcher, PatternUsage, PerformanceMetrics, Recommendation, RecommendedAction,
    ResultMetadata, SessionIntelligence,
};

pub const DEFAULT_SESSION_ID: &str = "default";
const FALLBACK_CONFIDENCE: f64 = 0.10;
const HIGH_CONFIDENCE: f64 = 0.8;
const LOW_CONFIDENCE: f64 = 0.3;
const TOP_PATTERNS: usize = 10;

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

pub struct IntelligenceEngine {
    config: IntelligenceConfig,
    matcher: Arc<dyn PatternMatcher>,
    context_builder: Arc<dyn ContextTreeBuilder>,
    durable: Arc<dyn DurableStorage>,
    clock: Arc<dyn Clock>,
    tracker: SessionTracker,
    initialized: AtomicBool,
}

impl IntelligenceEngine {
    pub fn new(
        config: IntelligenceConfig,
        matcher: Arc<dyn PatternMatcher>,
        context_builder: Arc<dyn ContextTreeBuilder>,
        durable: Arc<dyn DurableStorage>,
    ) -> Self {
        Self {
            config,
            matcher,
            context_builder,
            durable,
            clock: Arc::new(SystemClock),
            tracker: SessionTracker::new(),
            initialized: AtomicBool::new(false),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &IntelligenceConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Initialize both collaborators and check durable storage. Any failure
    /// is returned; the engine stays uninitialized.
    pub async fn initialize(&self) -> Result<(), IntelligenceError> {
        if self.is_initialized() {
            return Ok(());
        }

        self.config
            .validate()
            .map_err(|e| IntelligenceError::InvalidConfig(e.to_string()))?;

        self.matcher
            .initialize(self.config.pattern_source_path.as_deref())
            .await
            .map_err(|e| IntelligenceError::Initialization(format!("pattern matcher: {:#}", e)))?;
        self.matcher
            .set_fast_path_threshold(self.config.fast_path_threshold)
            .await
            .map_err(|e| IntelligenceError::Initialization(format!("pattern matcher: {:#}", e)))?;

        self.context_builder
            .initialize(self.config.context_template_path.as_deref())
            .await
            .map_err(|e| IntelligenceError::Initialization(format!("context builder: {:#}", e)))?;

        self.durable
            .health_check()
            .await
            .map_err(|e| IntelligenceError::Initialization(format!("durable storage: {}", e)))?;

        self.initialized.store(true, Ordering::SeqCst);
        info!(
            pattern_matching = self.config.enable_pattern_matching,
            context_trees = self.config.enable_context_trees,
            fast_path_threshold = self.config.fast_path_threshold,
            "Intelligence engine initialized"
        );
        Ok(())
    }

    /// Route one utterance. Never fails: internal errors produce a fallback
    /// result whose reasoning names the failure.
    pub async fn get_intelligence(
        &self,
        input: &str,
        options: IntelligenceOptions,
    ) -> IntelligenceResult {
        let started = Instant::now();
        let session_id = options
            .session_id
            .clone()
            .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string());

        let outcome = if self.is_initialized() {
            self.decide(input, &session_id, &options, started).await
        } else {
            Err(IntelligenceError::NotInitialized)
        };

        match outcome {
            Ok(result) => result,
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Intelligence request failed, returning fallback");
                self.fallback(&session_id, &e, started)
            }
        }
    }

    async fn decide(
        &self,
        input: &str,
        session_id: &str,
        options: &IntelligenceOptions,
        started: Instant,
    ) -> Result<IntelligenceResult, IntelligenceError> {
        let pattern_enabled = options
            .enable_pattern_matching
            .unwrap_or(self.config.enable_pattern_matching);
        let context_enabled = options
            .enable_context_tree
            .unwrap_or(self.config.enable_context_trees);
        let max_nodes = options
            .max_context_nodes
            .unwrap_or(self.config.max_context_nodes);
        let include_low_priority = options
            .include_low_priority
            .unwrap_or(self.config.include_low_priority);

        let mut pattern_time_ms = 0;
        let pattern_match = if pattern_enabled {
            let t = Instant::now();
            let result = self
                .matcher
                .process_user_input(input, session_id)
                .await
                .map_err(IntelligenceError::collaborator)?;
            pattern_time_ms = elapsed_ms(t);
            debug!(
                session_id,
                matched = result.matched,
                confidence = result.confidence,
                fast_path = result.should_use_fast_path,
                "Pattern matcher responded"
            );
            Some(result)
        } else {
            None
        };

        let build_context = context_enabled
            && should_build_context(
                input,
                pattern_match.as_ref(),
                self.config.context_confidence_threshold,
            );

        let mut context_time_ms = 0;
        let (context_tree, context_prompt) = if build_context {
            let t = Instant::now();
            let tree = self
                .context_builder
                .build_context_tree(session_id, max_nodes)
                .await
                .map_err(IntelligenceError::collaborator)?;
            let prompt = self
                .context_builder
                .get_context_for_prompt(session_id, max_nodes, include_low_priority)
                .await
                .map_err(IntelligenceError::collaborator)?;
            context_time_ms = elapsed_ms(t);
            debug!(session_id, total_nodes = tree.total_nodes, "Context tree built");
            (Some(tree), Some(prompt))
        } else {
            (None, None)
        };

        let recommendation = fuse(pattern_match.as_ref(), context_tree.as_ref());
        let total_time_ms = elapsed_ms(started);
        let now = self.clock.now();

        let counters = self.tracker.record_query(QueryOutcome {
            session_id,
            action: recommendation.action,
            confidence: recommendation.confidence,
            pattern_id: pattern_match
                .as_ref()
                .filter(|p| p.matched)
                .and_then(|p| p.pattern_id()),
            complexity: query_complexity(input),
            response_time_ms: total_time_ms,
            at: now,
        });

        debug!(
            session_id,
            action = %recommendation.action,
            confidence = recommendation.confidence,
            total_time_ms,
            "Intelligence decision"
        );

        Ok(IntelligenceResult {
            context_tree,
            context_prompt,
            recommendation,
            performance: PerformanceMetrics {
                total_time_ms,
                pattern_time_ms,
                context_time_ms,
                cache_hits: counters.hits,
                cache_misses: counters.misses,
            },
            metadata: ResultMetadata {
                request_id: Uuid::new_v4(),
                session_id: session_id.to_string(),
                timestamp: now,
                pattern_matching_used: pattern_match.is_some(),
                context_tree_used: build_context,
                fallback: false,
            },
            pattern_match,
        })
    }

    fn fallback(
        &self,
        session_id: &str,
        error: &IntelligenceError,
        started: Instant,
    ) -> IntelligenceResult {
        let counters = self.tracker.record_fallback();
        IntelligenceResult {
            pattern_match: None,
            context_tree: None,
            context_prompt: None,
            recommendation: Recommendation {
                action: RecommendedAction::StandardPath,
                confidence: FALLBACK_CONFIDENCE,
                reasoning: format!("fallback: {}", error),
                suggested_tools: None,
                context_priority: ContextPriority::Medium,
            },
            performance: PerformanceMetrics {
                total_time_ms: elapsed_ms(started),
                pattern_time_ms: 0,
                context_time_ms: 0,
                cache_hits: counters.hits,
                cache_misses: counters.misses,
            },
            metadata: ResultMetadata {
                request_id: Uuid::new_v4(),
                session_id: session_id.to_string(),
                timestamp: self.clock.now(),
                pattern_matching_used: false,
                context_tree_used: false,
                fallback: true,
            },
        }
    }

    /// Report a tool execution: forward the outcome to the matcher for the
    /// pattern that produced it, then append it to the durable history.
    pub async fn record_tool_execution(&self, record: &ExecutionRecord) -> Result<(), IntelligenceError> {
        if let Some(pattern_id) = record.pattern_id.as_deref() {
            let pattern_id = PatternId::new(pattern_id);
            if let Err(e) = self
                .matcher
                .update_pattern_confidence(&pattern_id, record.success, record.execution_time_ms)
                .await
            {
                warn!(pattern_id = %pattern_id, error = %e, "Pattern confidence update failed");
            }
        }

        self.durable.record_tool_execution(record).await?;
        debug!(
            session_id = %record.session_id,
            tool = %record.tool_name,
            success = record.success,
            "Recorded tool execution"
        );
        Ok(())
    }

    /// Apply user feedback to a pattern. Returns the new, clamped confidence.
    pub async fn adapt_pattern(
        &self,
        pattern_id: &PatternId,
        feedback: Feedback,
    ) -> Result<f64, IntelligenceError> {
        let pattern = self
            .matcher
            .get_pattern(pattern_id)
            .await
            .map_err(IntelligenceError::collaborator)?
            .ok_or_else(|| IntelligenceError::PatternNotFound(pattern_id.clone()))?;

        let confidence = clamp_confidence(pattern.confidence + feedback.confidence_delta());
        self.matcher
            .set_pattern_confidence(pattern_id, confidence)
            .await
            .map_err(IntelligenceError::collaborator)?;
        self.matcher
            .update_pattern_confidence(pattern_id, feedback.is_success(), 0)
            .await
            .map_err(IntelligenceError::collaborator)?;

        info!(
            pattern_id = %pattern_id,
            ?feedback,
            from = pattern.confidence,
            to = confidence,
            "Adapted pattern confidence"
        );
        Ok(confidence)
    }

    pub fn get_session_intelligence(&self, session_id: &str) -> Option<SessionIntelligence> {
        self.tracker.session(session_id)
    }

    pub fn get_global_stats(&self) -> GlobalStats {
        self.tracker.global_stats()
    }

    pub async fn get_pattern_analytics(&self) -> Result<PatternAnalytics, IntelligenceError> {
        let patterns = self
            .matcher
            .get_patterns()
            .await
            .map_err(IntelligenceError::collaborator)?;
        if patterns.is_empty() {
            return Ok(PatternAnalytics::default());
        }

        let total = patterns.len();
        let average_confidence = patterns.iter().map(|p| p.confidence).sum::<f64>() / total as f64;

        let mut top_patterns: Vec<PatternUsage> = patterns
            .iter()
            .map(|p| PatternUsage {
                pattern_id: p.id.clone(),
                confidence: p.confidence,
                total_uses: p.usage_stats.total(),
                success_rate: p.usage_stats.success_rate(),
            })
            .collect();
        top_patterns.sort_by_key(|p| (Reverse(p.total_uses), p.pattern_id.clone()));
        top_patterns.truncate(TOP_PATTERNS);

        Ok(PatternAnalytics {
            total_patterns: total,
            average_confidence,
            high_confidence_patterns: patterns.iter().filter(|p| p.confidence >= HIGH_CONFIDENCE).count(),
            low_confidence_patterns: patterns.iter().filter(|p| p.confidence < LOW_CONFIDENCE).count(),
            top_patterns,
        })
    }

    pub async fn get_context_analytics(&self) -> ContextAnalytics {
        let cache_stats = match self.context_builder.get_cache_stats().await {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, "Context builder cache stats unavailable");
                serde_json::Value::Null
            }
        };

        ContextAnalytics {
            active_sessions: self.tracker.active_sessions(),
            average_complexity: self.tracker.average_complexity(),
            cache_stats,
        }
    }

    pub async fn clear_context_cache(&self) -> Result<(), IntelligenceError> {
        self.context_builder
            .clear_cache()
            .await
            .map_err(IntelligenceError::collaborator)?;
        info!("Context builder cache cleared");
        Ok(())
    }

    /// Most recent executions first.
    pub async fn get_execution_history(
        &self,
        session_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ExecutionRecord>, IntelligenceError> {
        Ok(self.durable.execution_history(session_id, limit).await?)
    }

    pub async fn health_check(&self) -> IntelligenceHealth {
        let counters = self.tracker.cache_counters();
        let active_contexts = self.tracker.active_sessions();

        if !self.is_initialized() {
            return IntelligenceHealth {
                status: HealthStatus::Unhealthy,
                cache_hits: counters.hits,
                cache_misses: counters.misses,
                total_patterns: 0,
                active_contexts,
            };
        }

        let (status, total_patterns) = match self.matcher.get_patterns().await {
            Ok(patterns) => (HealthStatus::Healthy, patterns.len()),
            Err(e) => {
                warn!(error = %e, "Pattern matcher unreachable during health check");
                (HealthStatus::Degraded, 0)
            }
        };

        IntelligenceHealth {
            status,
            cache_hits: counters.hits,
            cache_misses: counters.misses,
            total_patterns,
            active_contexts,
        }
    }

    /// Drop all session and global statistics.
    pub fn reset_statistics(&self) {
        self.tracker.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ContextTree, Pattern, PatternMatchResult};
    use aegis_memory::InMemoryDurableStorage;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::path::Path;

    struct FailingMatcher;

    #[async_trait]
    impl PatternMatcher for FailingMatcher {
        async fn initialize(&self, _source: Option<&Path>) -> Result<()> {
            Ok(())
        }
        async fn set_fast_path_threshold(&self, _threshold: f64) -> Result<()> {
            Ok(())
        }
        async fn process_user_input(&self, _input: &str, _session_id: &str) -> Result<PatternMatchResult> {
            Err(anyhow!("matcher offline"))
        }
        async fn update_pattern_confidence(&self, _id: &PatternId, _success: bool, _ms: u64) -> Result<()> {
            Err(anyhow!("matcher offline"))
        }
        async fn set_pattern_confidence(&self, _id: &PatternId, _confidence: f64) -> Result<()> {
            Err(anyhow!("matcher offline"))
        }
        async fn get_pattern(&self, _id: &PatternId) -> Result<Option<Pattern>> {
            Ok(None)
        }
        async fn get_patterns(&self) -> Result<Vec<Pattern>> {
            Err(anyhow!("matcher offline"))
        }
    }

    struct EmptyContext;

    #[async_trait]
    impl ContextTreeBuilder for EmptyContext {
        async fn initialize(&self, _template: Option<&Path>) -> Result<()> {
            Ok(())
        }
        async fn build_context_tree(&self, session_id: &str, _limit: usize) -> Result<ContextTree> {
            Ok(ContextTree::new(session_id, 0))
        }
        async fn get_context_for_prompt(&self, _s: &str, _n: usize, _low: bool) -> Result<String> {
            Ok(String::new())
        }
        async fn get_cache_stats(&self) -> Result<serde_json::Value> {
            Err(anyhow!("no cache"))
        }
        async fn clear_cache(&self) -> Result<()> {
            Ok(())
        }
    }

    fn engine() -> IntelligenceEngine {
        IntelligenceEngine::new(
            IntelligenceConfig::default(),
            Arc::new(FailingMatcher),
            Arc::new(EmptyContext),
            Arc::new(InMemoryDurableStorage::new()),
        )
    }

    #[tokio::test]
    async fn test_uninitialized_engine_falls_back() {
        let engine = engine();
        let result = engine
            .get_intelligence("list files", IntelligenceOptions::for_session("s1"))
            .await;

        assert!(result.metadata.fallback);
        assert_eq!(result.recommendation.action, RecommendedAction::StandardPath);
        assert_eq!(result.recommendation.confidence, 0.10);
        assert!(result.recommendation.reasoning.starts_with("fallback"));
        assert_eq!(result.performance.cache_misses, 1);
        assert!(engine.get_session_intelligence("s1").is_none());
    }

    #[tokio::test]
    async fn test_matcher_failure_falls_back() {
        let engine = engine();
        engine.initialize().await.unwrap();

        let result = engine
            .get_intelligence("list files", IntelligenceOptions::for_session("s1"))
            .await;
        assert!(result.metadata.fallback);
        assert!(result.recommendation.reasoning.contains("matcher offline"));
        assert_eq!(engine.get_global_stats().total_queries, 0);
        assert_eq!(engine.get_global_stats().cache_misses, 1);
    }

    #[tokio::test]
    async fn test_health_degrades_when_matcher_unreachable() {
        let engine = engine();
        assert_eq!(engine.health_check().await.status, HealthStatus::Unhealthy);
        engine.initialize().await.unwrap();
        assert_eq!(engine.health_check().await.status, HealthStatus::Degraded);
    }

    #[test]
    fn test_context_analytics_tolerates_missing_cache_stats() {
        let engine = engine();
        let analytics = tokio_test::block_on(engine.get_context_analytics());
        assert_eq!(analytics.cache_stats, serde_json::Value::Null);
        assert_eq!(analytics.active_sessions, 0);
    }

    #[tokio::test]
    async fn test_initialize_fails_when_storage_unreachable() {
        let storage = InMemoryDurableStorage::new();
        storage.set_unavailable(true);
        let engine = IntelligenceEngine::new(
            IntelligenceConfig::default(),
            Arc::new(FailingMatcher),
            Arc::new(EmptyContext),
            Arc::new(storage),
        );
        assert!(matches!(
            engine.initialize().await,
            Err(IntelligenceError::Initialization(_))
        ));
        assert!(!engine.is_initialized());
    }

    #[tokio::test]
    async fn test_adapt_unknown_pattern() {
        let engine = engine();
        let result = engine
            .adapt_pattern(&PatternId::new("missing"), Feedback::Positive)
            .await;
        assert!(matches!(result, Err(IntelligenceError::PatternNotFound(_))));
    }

    #[tokio::test]
    async fn test_record_execution_survives_matcher_failure() {
        let engine = engine();
        let mut record = ExecutionRecord::new("s1", "read_file", true, 12);
        record.pattern_id = Some("p1".to_string());

        engine.record_tool_execution(&record).await.unwrap();
        let history = engine.get_execution_history(Some("s1"), 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].tool_name, "read_file");
    }
}
