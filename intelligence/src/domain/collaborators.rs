// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Collaborator Contracts
//!
//! The decision engine does not match natural language or assemble context
//! itself. It consumes two collaborators through these traits:
//!
//! - [`PatternMatcher`]: produces a [`PatternMatchResult`] for an utterance
//!   and owns the [`Pattern`] confidence state.
//! - [`ContextTreeBuilder`]: turns a session's tool-execution history into a
//!   bounded [`ContextTree`] and a prompt-ready string.
//!
//! Both are called sequentially per request; the context decision depends on
//! the match result.

use async_trait::async_trait;
use anyhow::Result;
use std::path::Path;

use super::context::ContextTree;
use super::pattern::{Pattern, PatternId, PatternMatchResult};

#[async_trait]
pub trait PatternMatcher: Send + Sync {
    /// Load patterns, optionally from `source`
    async fn initialize(&self, source: Option<&Path>) -> Result<()>;

    async fn set_fast_path_threshold(&self, threshold: f64) -> Result<()>;

    async fn process_user_input(&self, input: &str, session_id: &str) -> Result<PatternMatchResult>;

    /// Outcome signal for a pattern that drove a tool execution
    async fn update_pattern_confidence(
        &self,
        pattern_id: &PatternId,
        success: bool,
        execution_time_ms: u64,
    ) -> Result<()>;

    /// Overwrite a pattern's confidence; callers pass an already clamped value
    async fn set_pattern_confidence(&self, pattern_id: &PatternId, confidence: f64) -> Result<()>;

    async fn get_pattern(&self, pattern_id: &PatternId) -> Result<Option<Pattern>>;

    async fn get_patterns(&self) -> Result<Vec<Pattern>>;
}

#[async_trait]
pub trait ContextTreeBuilder: Send + Sync {
    async fn initialize(&self, template: Option<&Path>) -> Result<()>;

    async fn build_context_tree(&self, session_id: &str, limit: usize) -> Result<ContextTree>;

    async fn get_context_for_prompt(
        &self,
        session_id: &str,
        max_nodes: usize,
        include_low_priority: bool,
    ) -> Result<String>;

    async fn get_cache_stats(&self) -> Result<serde_json::Value>;

    async fn clear_cache(&self) -> Result<()>;
}
