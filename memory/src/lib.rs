// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `aegis-memory`: Tiered Working Memory
//!
//! Dual-tier (short-term / long-term) key/value memory used by the
//! intelligence layer and by tool, agent and pipeline execution to persist
//! facts, observations and execution history.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `MemoryEntry`, `MemoryValue`, `MemoryTier`, queries, aggregation results, the `DurableStorage` contract |
//! | [`application`] | Application | `TieredStore`, `AggregationEngine`, `MemoryReaper`, `MemoryService` facade |
//! | [`infrastructure`] | Infrastructure | `InvertedIndex`, `InMemoryDurableStorage`, `MemoryEventBus` |
//! | [`config`] | Configuration | `MemoryConfig` (YAML + env overrides) |
//!
//! ## Key Concepts
//!
//! - **Tier**: a retention class with its own default TTL and entry cap.
//!   Writes beyond the cap evict the oldest entries of that tier.
//! - **Lazy expiry**: an expired entry is invisible to every read and is
//!   removed when a read touches it. The [`application::MemoryReaper`]
//!   sweeps the rest on an interval.
//! - **Recall**: long-term entries are tokenised into an inverted index for
//!   OR-of-tokens candidate lookup.

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod config;

pub use domain::*;
pub use application::{
    AggregationEngine, HealthStatus, MemoryHealth, MemoryReaper, MemoryService, MemoryStats, OperationalStats,
    TierStats, TieredStore,
};
pub use config::{MemoryConfig, ReaperConfig, TierPolicy};
pub use infrastructure::{InMemoryDurableStorage, InvertedIndex, MemoryEventBus};
