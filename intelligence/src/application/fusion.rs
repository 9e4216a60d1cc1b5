// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Signal Fusion
//!
//! Pure functions combining the pattern-match signal and the context signal
//! into a single [`Recommendation`]. Rules are evaluated in priority order
//! and the first that applies wins:
//!
//! | # | Condition | Action | Confidence | Priority |
//! |---|-----------|--------|------------|----------|
//! | a | matched, matcher suggests fast path | `fast_path` | match | low |
//! | b | matched, tree with > 10 nodes | `enhanced_context` | min(0.85, match + 0.10) | high |
//! | c | tree with > 5 nodes | `standard_path` | match result if present, else 0.30 | medium |
//! | d | otherwise | `no_match` | 0.10 | low |

use crate::domain::{ContextPriority, ContextTree, PatternMatchResult, Recommendation, RecommendedAction};

const ENHANCED_CONTEXT_MIN_NODES: usize = 10;
const STANDARD_PATH_MIN_NODES: usize = 5;
const ENHANCED_CONTEXT_BOOST: f64 = 0.10;
const ENHANCED_CONTEXT_CAP: f64 = 0.85;
const STANDARD_PATH_DEFAULT_CONFIDENCE: f64 = 0.30;
const NO_MATCH_CONFIDENCE: f64 = 0.10;

const COMPLEX_INPUT_CHARS: usize = 100;
const ANALYSIS_KEYWORDS: [&str; 6] = ["analyze", "explain", "understand", "context", "why", "how"];

pub fn fuse(pattern: Option<&PatternMatchResult>, tree: Option<&ContextTree>) -> Recommendation {
    let matched = pattern.filter(|p| p.matched);
    let nodes = tree.map(|t| t.total_nodes);

    if let Some(m) = matched.filter(|m| m.should_use_fast_path) {
        return Recommendation {
            action: RecommendedAction::FastPath,
            confidence: m.confidence,
            reasoning: format!(
                "Pattern matched with confidence {:.2}; executing the matched tool directly.",
                m.confidence
            ),
            suggested_tools: m.tool_name().map(|t| vec![t.to_string()]),
            context_priority: ContextPriority::Low,
        };
    }

    if let (Some(m), Some(n)) = (matched, nodes) {
        if n > ENHANCED_CONTEXT_MIN_NODES {
            return Recommendation {
                action: RecommendedAction::EnhancedContext,
                confidence: (m.confidence + ENHANCED_CONTEXT_BOOST).min(ENHANCED_CONTEXT_CAP),
                reasoning: format!(
                    "Pattern matched with confidence {:.2}, enriched by {} context nodes.",
                    m.confidence, n
                ),
                suggested_tools: m.tool_name().map(|t| vec![t.to_string()]),
                context_priority: ContextPriority::High,
            };
        }
    }

    if let Some(n) = nodes.filter(|n| *n > STANDARD_PATH_MIN_NODES) {
        return Recommendation {
            action: RecommendedAction::StandardPath,
            confidence: pattern.map_or(STANDARD_PATH_DEFAULT_CONFIDENCE, |p| p.confidence),
            reasoning: format!("{} context nodes available; using the standard reasoning path.", n),
            suggested_tools: None,
            context_priority: ContextPriority::Medium,
        };
    }

    Recommendation {
        action: RecommendedAction::NoMatch,
        confidence: NO_MATCH_CONFIDENCE,
        reasoning: "No confident pattern match and insufficient session context.".to_string(),
        suggested_tools: None,
        context_priority: ContextPriority::Low,
    }
}

fn words(input: &str) -> impl Iterator<Item = String> + '_ {
    input
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

/// Whether `input` contains an analysis-intent keyword as a whole word.
pub fn has_analysis_intent(input: &str) -> bool {
    words(input).any(|w| ANALYSIS_KEYWORDS.contains(&w.as_str()))
}

pub fn is_complex_input(input: &str) -> bool {
    input.chars().count() > COMPLEX_INPUT_CHARS || input.contains('?') || has_analysis_intent(input)
}

/// Context is built when the match is missing or weak, or the input looks
/// complex enough to benefit from history.
pub fn should_build_context(
    input: &str,
    pattern: Option<&PatternMatchResult>,
    confidence_threshold: f64,
) -> bool {
    match pattern.filter(|p| p.matched) {
        None => true,
        Some(m) if m.confidence < confidence_threshold => true,
        Some(_) => is_complex_input(input),
    }
}

/// Per-query complexity in [0, 1].
pub fn query_complexity(input: &str) -> f64 {
    let length = (input.chars().count() as f64 / COMPLEX_INPUT_CHARS as f64).min(1.0);
    let mut score = 0.4 * length;
    if input.contains('?') {
        score += 0.3;
    }
    if has_analysis_intent(input) {
        score += 0.3;
    }
    score.min(1.0)
}
