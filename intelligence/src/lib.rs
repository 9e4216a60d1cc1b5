// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `aegis-intelligence`: Fast-Path Decision Engine
//!
//! Decides, per user utterance, whether a previously learned pattern can
//! be executed directly (`fast_path`) or whether the request needs session
//! context and a full reasoning pass. Outcomes flow back into the pattern
//! matcher so confidence tracks observed success.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | Patterns, recommendations, session/global statistics, `PatternMatcher` and `ContextTreeBuilder` contracts |
//! | [`application`] | Application | [`fuse`], `SessionTracker`, [`IntelligenceEngine`] |
//! | [`config`] | Configuration | `IntelligenceConfig` (YAML + env overrides) |
//!
//! Pattern matching and context assembly are supplied by the host through
//! the collaborator traits. Execution history persists through the
//! `aegis_memory::DurableStorage` contract.

pub mod domain;
pub mod application;
pub mod config;

pub use domain::*;
pub use application::{fuse, IntelligenceEngine, SessionTracker, DEFAULT_SESSION_ID};
pub use config::IntelligenceConfig;
