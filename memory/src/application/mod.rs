// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod aggregation;
pub mod memory_service;
pub mod reaper;
pub mod tiered_store;

pub use aggregation::{normalize_key, AggregationEngine};
pub use memory_service::{HealthStatus, MemoryHealth, MemoryService, OperationalStats};
pub use reaper::MemoryReaper;
pub use tiered_store::{MemoryStats, TierStats, TieredStore};
