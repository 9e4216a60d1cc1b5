// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use aegis_intelligence::{
    ContextTree, ContextTreeBuilder, Feedback, IntelligenceConfig, IntelligenceEngine,
    IntelligenceError, IntelligenceOptions, Pattern, PatternId, PatternMatch, PatternMatchResult,
    PatternMatcher, RecommendedAction, ToolInvocation, MAX_CONFIDENCE, MIN_CONFIDENCE,
};
use aegis_memory::{DurableStorage, ExecutionRecord, HealthStatus, InMemoryDurableStorage};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct MockPatternMatcher {
    /// `None` makes `process_user_input` fail
    result: Mutex<Option<PatternMatchResult>>,
    patterns: Mutex<HashMap<PatternId, Pattern>>,
    updates: Mutex<Vec<(PatternId, bool, u64)>>,
    threshold: Mutex<Option<f64>>,
}

impl MockPatternMatcher {
    fn returning(result: PatternMatchResult) -> Self {
        let matcher = Self::default();
        *matcher.result.lock() = Some(result);
        matcher
    }

    fn with_pattern(self, pattern: Pattern) -> Self {
        self.patterns.lock().insert(pattern.id.clone(), pattern);
        self
    }

    fn confidence_of(&self, id: &str) -> f64 {
        self.patterns.lock()[&PatternId::new(id)].confidence
    }
}

#[async_trait]
impl PatternMatcher for MockPatternMatcher {
    async fn initialize(&self, _source: Option<&Path>) -> Result<()> {
        Ok(())
    }

    async fn set_fast_path_threshold(&self, threshold: f64) -> Result<()> {
        *self.threshold.lock() = Some(threshold);
        Ok(())
    }

    async fn process_user_input(&self, _input: &str, _session_id: &str) -> Result<PatternMatchResult> {
        self.result
            .lock()
            .clone()
            .ok_or_else(|| anyhow!("pattern store unreachable"))
    }

    async fn update_pattern_confidence(
        &self,
        pattern_id: &PatternId,
        success: bool,
        execution_time_ms: u64,
    ) -> Result<()> {
        if let Some(pattern) = self.patterns.lock().get_mut(pattern_id) {
            pattern.usage_stats.record(success);
        }
        self.updates
            .lock()
            .push((pattern_id.clone(), success, execution_time_ms));
        Ok(())
    }

    async fn set_pattern_confidence(&self, pattern_id: &PatternId, confidence: f64) -> Result<()> {
        match self.patterns.lock().get_mut(pattern_id) {
            Some(pattern) => {
                pattern.confidence = confidence;
                Ok(())
            }
            None => Err(anyhow!("unknown pattern {}", pattern_id)),
        }
    }

    async fn get_pattern(&self, pattern_id: &PatternId) -> Result<Option<Pattern>> {
        Ok(self.patterns.lock().get(pattern_id).cloned())
    }

    async fn get_patterns(&self) -> Result<Vec<Pattern>> {
        Ok(self.patterns.lock().values().cloned().collect())
    }
}

struct MockContextBuilder {
    nodes: usize,
    fail: AtomicBool,
    builds: AtomicUsize,
    cleared: AtomicBool,
}

impl MockContextBuilder {
    fn with_nodes(nodes: usize) -> Self {
        Self {
            nodes,
            fail: AtomicBool::new(false),
            builds: AtomicUsize::new(0),
            cleared: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl ContextTreeBuilder for MockContextBuilder {
    async fn initialize(&self, _template: Option<&Path>) -> Result<()> {
        Ok(())
    }

    async fn build_context_tree(&self, session_id: &str, limit: usize) -> Result<ContextTree> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("context store timed out"));
        }
        self.builds.fetch_add(1, Ordering::SeqCst);
        Ok(ContextTree::new(session_id, self.nodes.min(limit)))
    }

    async fn get_context_for_prompt(
        &self,
        session_id: &str,
        max_nodes: usize,
        _include_low_priority: bool,
    ) -> Result<String> {
        Ok(format!("session {} ({} nodes max)", session_id, max_nodes))
    }

    async fn get_cache_stats(&self) -> Result<serde_json::Value> {
        Ok(serde_json::json!({ "entries": self.builds.load(Ordering::SeqCst) }))
    }

    async fn clear_cache(&self) -> Result<()> {
        self.cleared.store(true, Ordering::SeqCst);
        Ok(())
    }
}

fn matched(pattern_id: &str, confidence: f64, fast_path: bool) -> PatternMatchResult {
    PatternMatchResult {
        matched: true,
        confidence,
        should_use_fast_path: fast_path,
        execution_time_ms: 2,
        pattern_match: Some(PatternMatch {
            pattern_id: PatternId::new(pattern_id),
            tool: ToolInvocation {
                tool_name: "list_directory".to_string(),
                parameters: serde_json::json!({ "path": "." }),
            },
        }),
    }
}

struct Harness {
    engine: IntelligenceEngine,
    matcher: Arc<MockPatternMatcher>,
    context: Arc<MockContextBuilder>,
    durable: InMemoryDurableStorage,
}

async fn harness(matcher: MockPatternMatcher, context: MockContextBuilder) -> Harness {
    let matcher = Arc::new(matcher);
    let context = Arc::new(context);
    let durable = InMemoryDurableStorage::new();
    let engine = IntelligenceEngine::new(
        IntelligenceConfig::default(),
        matcher.clone(),
        context.clone(),
        Arc::new(durable.clone()),
    );
    engine.initialize().await.unwrap();
    Harness {
        engine,
        matcher,
        context,
        durable,
    }
}

#[tokio::test]
async fn initialize_pushes_fast_path_threshold_to_matcher() {
    let h = harness(MockPatternMatcher::default(), MockContextBuilder::with_nodes(0)).await;
    assert!(h.engine.is_initialized());
    assert_eq!(*h.matcher.threshold.lock(), Some(0.85));
}

#[tokio::test]
async fn confident_simple_match_takes_fast_path_without_context() {
    let h = harness(
        MockPatternMatcher::returning(matched("list-files", 0.92, true)),
        MockContextBuilder::with_nodes(40),
    )
    .await;

    let result = h
        .engine
        .get_intelligence("list files", IntelligenceOptions::for_session("s1"))
        .await;

    assert_eq!(result.recommendation.action, RecommendedAction::FastPath);
    assert_eq!(result.recommendation.confidence, 0.92);
    assert_eq!(
        result.recommendation.suggested_tools,
        Some(vec!["list_directory".to_string()])
    );
    assert!(result.context_tree.is_none());
    assert!(!result.metadata.context_tree_used);
    assert!(result.metadata.pattern_matching_used);
    assert!(!result.metadata.fallback);
    assert_eq!(h.context.builds.load(Ordering::SeqCst), 0);
    assert_eq!(result.performance.cache_hits, 1);
    assert_eq!(result.performance.cache_misses, 0);

    let session = h.engine.get_session_intelligence("s1").unwrap();
    assert_eq!(session.total_queries, 1);
    assert_eq!(session.fast_path_usage, 1);
    assert_eq!(session.recent_patterns, vec![PatternId::new("list-files")]);
}

#[tokio::test]
async fn weak_match_with_rich_context_is_enhanced() {
    let h = harness(
        MockPatternMatcher::returning(matched("list-files", 0.5, false)),
        MockContextBuilder::with_nodes(12),
    )
    .await;

    let result = h
        .engine
        .get_intelligence("list files", IntelligenceOptions::for_session("s1"))
        .await;

    assert_eq!(result.recommendation.action, RecommendedAction::EnhancedContext);
    assert!((result.recommendation.confidence - 0.6).abs() < 1e-9);
    assert_eq!(result.context_tree.as_ref().map(|t| t.total_nodes), Some(12));
    assert!(result.context_prompt.is_some());
    assert!(result.metadata.context_tree_used);
    assert_eq!(result.performance.cache_misses, 1);
}

#[tokio::test]
async fn no_match_with_context_disabled() {
    let h = harness(
        MockPatternMatcher::returning(PatternMatchResult::no_match()),
        MockContextBuilder::with_nodes(30),
    )
    .await;

    let result = h
        .engine
        .get_intelligence(
            "do something novel",
            IntelligenceOptions::for_session("s1").context_tree(false),
        )
        .await;

    assert_eq!(result.recommendation.action, RecommendedAction::NoMatch);
    assert_eq!(result.recommendation.confidence, 0.1);
    assert_eq!(h.context.builds.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn options_cap_context_nodes() {
    let h = harness(
        MockPatternMatcher::returning(PatternMatchResult::no_match()),
        MockContextBuilder::with_nodes(30),
    )
    .await;

    let result = h
        .engine
        .get_intelligence(
            "what changed?",
            IntelligenceOptions::for_session("s1").max_context_nodes(4),
        )
        .await;

    assert_eq!(result.context_tree.map(|t| t.total_nodes), Some(4));
    assert_eq!(result.recommendation.action, RecommendedAction::NoMatch);
}

#[tokio::test]
async fn missing_session_id_uses_default_session() {
    let h = harness(
        MockPatternMatcher::returning(matched("p1", 0.95, true)),
        MockContextBuilder::with_nodes(0),
    )
    .await;

    let result = h
        .engine
        .get_intelligence("list files", IntelligenceOptions::default())
        .await;
    assert_eq!(result.metadata.session_id, "default");
    assert!(h.engine.get_session_intelligence("default").is_some());
}

#[tokio::test]
async fn context_failure_yields_fallback() {
    let h = harness(
        MockPatternMatcher::returning(PatternMatchResult::no_match()),
        MockContextBuilder::with_nodes(12),
    )
    .await;
    h.context.fail.store(true, Ordering::SeqCst);

    let result = h
        .engine
        .get_intelligence("anything", IntelligenceOptions::for_session("s1"))
        .await;

    assert!(result.metadata.fallback);
    assert_eq!(result.recommendation.action, RecommendedAction::StandardPath);
    assert_eq!(result.recommendation.confidence, 0.10);
    assert!(result.recommendation.reasoning.starts_with("fallback"));
    assert!(result.recommendation.reasoning.contains("context store timed out"));
    assert_eq!(result.performance.cache_misses, 1);

    let stats = h.engine.get_global_stats();
    assert_eq!(stats.total_queries, 0);
    assert_eq!(stats.cache_misses, 1);
    assert!(h.engine.get_session_intelligence("s1").is_none());
}

#[tokio::test]
async fn matcher_failure_yields_fallback() {
    let h = harness(MockPatternMatcher::default(), MockContextBuilder::with_nodes(0)).await;

    let result = h
        .engine
        .get_intelligence("list files", IntelligenceOptions::for_session("s1"))
        .await;
    assert!(result.metadata.fallback);
    assert!(result.recommendation.reasoning.contains("pattern store unreachable"));
}

#[tokio::test]
async fn feedback_keeps_confidence_within_bounds() {
    let h = harness(
        MockPatternMatcher::default().with_pattern(Pattern::new("p1", 0.97)),
        MockContextBuilder::with_nodes(0),
    )
    .await;
    let id = PatternId::new("p1");

    for _ in 0..3 {
        let confidence = h.engine.adapt_pattern(&id, Feedback::Positive).await.unwrap();
        assert!(confidence <= MAX_CONFIDENCE);
    }
    assert_eq!(h.matcher.confidence_of("p1"), MAX_CONFIDENCE);

    for _ in 0..15 {
        let confidence = h.engine.adapt_pattern(&id, Feedback::Negative).await.unwrap();
        assert!(confidence >= MIN_CONFIDENCE);
    }
    assert_eq!(h.matcher.confidence_of("p1"), MIN_CONFIDENCE);

    let updates = h.matcher.updates.lock();
    assert_eq!(updates.len(), 18);
    assert_eq!(updates.iter().filter(|(_, success, _)| *success).count(), 3);
}

#[tokio::test]
async fn feedback_on_unknown_pattern_is_an_error() {
    let h = harness(MockPatternMatcher::default(), MockContextBuilder::with_nodes(0)).await;
    let result = h
        .engine
        .adapt_pattern(&PatternId::new("ghost"), Feedback::Negative)
        .await;
    assert!(matches!(result, Err(IntelligenceError::PatternNotFound(_))));
}

#[tokio::test]
async fn tool_execution_is_forwarded_and_persisted() {
    let h = harness(
        MockPatternMatcher::default().with_pattern(Pattern::new("p1", 0.8)),
        MockContextBuilder::with_nodes(0),
    )
    .await;

    let mut record = ExecutionRecord::new("s1", "list_directory", true, 40);
    record.pattern_id = Some("p1".to_string());
    h.engine.record_tool_execution(&record).await.unwrap();
    h.engine
        .record_tool_execution(&ExecutionRecord::new("s2", "read_file", false, 5))
        .await
        .unwrap();

    assert_eq!(
        *h.matcher.updates.lock(),
        vec![(PatternId::new("p1"), true, 40)]
    );

    let history = h.durable.execution_history(Some("s1"), 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].tool_name, "list_directory");

    let all = h.engine.get_execution_history(None, 10).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].tool_name, "read_file");
}

#[tokio::test]
async fn tool_execution_fails_when_storage_unavailable() {
    let h = harness(MockPatternMatcher::default(), MockContextBuilder::with_nodes(0)).await;
    h.durable.set_unavailable(true);

    let result = h
        .engine
        .record_tool_execution(&ExecutionRecord::new("s1", "read_file", true, 5))
        .await;
    assert!(matches!(result, Err(IntelligenceError::Storage(_))));
}

#[tokio::test]
async fn pattern_analytics_buckets_and_ranks() {
    let mut busy = Pattern::new("busy", 0.9);
    busy.usage_stats.success_count = 8;
    busy.usage_stats.failure_count = 2;
    let mut middling = Pattern::new("middling", 0.5);
    middling.usage_stats.success_count = 3;
    let weak = Pattern::new("weak", 0.2);

    let h = harness(
        MockPatternMatcher::default()
            .with_pattern(busy)
            .with_pattern(middling)
            .with_pattern(weak),
        MockContextBuilder::with_nodes(0),
    )
    .await;

    let analytics = h.engine.get_pattern_analytics().await.unwrap();
    assert_eq!(analytics.total_patterns, 3);
    assert_eq!(analytics.high_confidence_patterns, 1);
    assert_eq!(analytics.low_confidence_patterns, 1);
    assert!((analytics.average_confidence - (0.9 + 0.5 + 0.2) / 3.0).abs() < 1e-9);
    assert_eq!(analytics.top_patterns[0].pattern_id, PatternId::new("busy"));
    assert_eq!(analytics.top_patterns[0].total_uses, 10);
    assert!((analytics.top_patterns[0].success_rate - 0.8).abs() < 1e-9);
    assert_eq!(analytics.top_patterns[2].pattern_id, PatternId::new("weak"));
}

#[tokio::test]
async fn analytics_health_and_reset() {
    let h = harness(
        MockPatternMatcher::returning(matched("p1", 0.92, true)).with_pattern(Pattern::new("p1", 0.92)),
        MockContextBuilder::with_nodes(8),
    )
    .await;

    h.engine
        .get_intelligence("list files", IntelligenceOptions::for_session("a"))
        .await;
    h.engine
        .get_intelligence("why did the build fail?", IntelligenceOptions::for_session("b"))
        .await;

    let stats = h.engine.get_global_stats();
    assert_eq!(stats.total_queries, 2);
    assert_eq!(stats.fast_path_count, 2);
    assert_eq!(stats.active_sessions, 2);
    assert!((stats.cache_hit_rate - 1.0).abs() < 1e-9);

    let context = h.engine.get_context_analytics().await;
    assert_eq!(context.active_sessions, 2);
    assert_eq!(context.cache_stats["entries"], 1);
    assert!(context.average_complexity > 0.0);

    let health = h.engine.health_check().await;
    assert_eq!(health.status, HealthStatus::Healthy);
    assert_eq!(health.total_patterns, 1);
    assert_eq!(health.active_contexts, 2);
    assert_eq!(health.cache_hits, 2);

    h.engine.clear_context_cache().await.unwrap();
    assert!(h.context.cleared.load(Ordering::SeqCst));

    h.engine.reset_statistics();
    assert_eq!(h.engine.get_global_stats().total_queries, 0);
    assert!(h.engine.get_session_intelligence("a").is_none());
}
