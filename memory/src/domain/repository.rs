// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Durable Storage Contract
//!
//! The in-memory tiers are authoritative for reads; every write goes through
//! to a [`DurableStorage`] backend so state survives a restart and can be
//! hydrated on the next `initialize`.
//!
//! | Implementation | Use |
//! |----------------|-----|
//! | `InMemoryDurableStorage` | development, tests |
//!
//! Production backends implement this trait in the embedding service.

use async_trait::async_trait;
use std::time::Duration;

use super::error::StorageError;
use super::execution::ExecutionRecord;

#[async_trait]
pub trait DurableStorage: Send + Sync {
    /// Read a record, `None` if absent or expired.
    async fn get(
        &self,
        key: &str,
        namespace: Option<&str>,
    ) -> Result<Option<serde_json::Value>, StorageError>;

    /// Create or replace a record; `ttl` of `None` never expires.
    async fn set(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Option<Duration>,
        namespace: Option<&str>,
    ) -> Result<(), StorageError>;

    /// Remove a record, returning whether it existed.
    async fn delete(&self, key: &str, namespace: Option<&str>) -> Result<bool, StorageError>;

    /// Records whose key matches the glob `pattern` and, if given, whose
    /// value contains every field of the JSON object `filter`.
    async fn find(
        &self,
        pattern: &str,
        filter: Option<&serde_json::Value>,
        namespace: Option<&str>,
    ) -> Result<Vec<(String, serde_json::Value)>, StorageError>;

    /// Append to the execution history.
    async fn record_tool_execution(&self, record: &ExecutionRecord) -> Result<(), StorageError>;

    /// Most recent executions first, optionally for one session.
    async fn execution_history(
        &self,
        session_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ExecutionRecord>, StorageError>;

    async fn health_check(&self) -> Result<(), StorageError>;
}
