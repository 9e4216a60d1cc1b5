// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{Clock, DurableStorage, ExecutionRecord, KeyPattern, StorageError, SystemClock};

type RecordKey = (Option<String>, String);

#[derive(Debug, Clone)]
struct Record {
    value: serde_json::Value,
    expires_at: Option<DateTime<Utc>>,
}

impl Record {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |at| now <= at)
    }
}

/// HashMap-backed [`DurableStorage`] for development and tests.
///
/// Records live in a process-local map with per-record TTL; nothing
/// survives the process. `set_unavailable(true)` makes every call fail,
/// which lets callers exercise their degraded paths.
#[derive(Clone)]
pub struct InMemoryDurableStorage {
    records: Arc<RwLock<HashMap<RecordKey, Record>>>,
    executions: Arc<RwLock<Vec<ExecutionRecord>>>,
    clock: Arc<dyn Clock>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryDurableStorage {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            executions: Arc::new(RwLock::new(Vec::new())),
            clock,
            unavailable: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of records, including ones past their TTL.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn ensure_available(&self) -> Result<(), StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(
                "in-memory storage marked unavailable".to_string(),
            ));
        }
        Ok(())
    }

    fn record_key(key: &str, namespace: Option<&str>) -> RecordKey {
        (namespace.map(str::to_string), key.to_string())
    }
}

impl Default for InMemoryDurableStorage {
    fn default() -> Self {
        Self::new()
    }
}

/// Every field of an object `filter` must be equal in `value`; any other
/// filter must equal `value` as a whole.
fn matches_filter(value: &serde_json::Value, filter: &serde_json::Value) -> bool {
    match filter.as_object() {
        Some(fields) => fields
            .iter()
            .all(|(field, expected)| value.get(field) == Some(expected)),
        None => value == filter,
    }
}

#[async_trait]
impl DurableStorage for InMemoryDurableStorage {
    async fn get(
        &self,
        key: &str,
        namespace: Option<&str>,
    ) -> Result<Option<serde_json::Value>, StorageError> {
        self.ensure_available()?;
        let now = self.clock.now();
        let records = self.records.read();
        Ok(records
            .get(&Self::record_key(key, namespace))
            .filter(|record| record.is_live(now))
            .map(|record| record.value.clone()))
    }

    async fn set(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Option<Duration>,
        namespace: Option<&str>,
    ) -> Result<(), StorageError> {
        self.ensure_available()?;
        let expires_at = match ttl {
            Some(ttl) => {
                let ttl = chrono::Duration::from_std(ttl)
                    .map_err(|e| StorageError::Backend(format!("invalid ttl: {}", e)))?;
                Some(
                    self.clock
                        .now()
                        .checked_add_signed(ttl)
                        .unwrap_or(DateTime::<Utc>::MAX_UTC),
                )
            }
            None => None,
        };
        self.records
            .write()
            .insert(Self::record_key(key, namespace), Record { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str, namespace: Option<&str>) -> Result<bool, StorageError> {
        self.ensure_available()?;
        Ok(self
            .records
            .write()
            .remove(&Self::record_key(key, namespace))
            .is_some())
    }

    async fn find(
        &self,
        pattern: &str,
        filter: Option<&serde_json::Value>,
        namespace: Option<&str>,
    ) -> Result<Vec<(String, serde_json::Value)>, StorageError> {
        self.ensure_available()?;
        let pattern = KeyPattern::new(pattern)?;
        let now = self.clock.now();
        let records = self.records.read();

        let mut found: Vec<(String, serde_json::Value)> = records
            .iter()
            .filter(|((ns, key), record)| {
                ns.as_deref() == namespace
                    && record.is_live(now)
                    && pattern.matches(key)
                    && filter.map_or(true, |f| matches_filter(&record.value, f))
            })
            .map(|((_, key), record)| (key.clone(), record.value.clone()))
            .collect();
        found.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(found)
    }

    async fn record_tool_execution(&self, record: &ExecutionRecord) -> Result<(), StorageError> {
        self.ensure_available()?;
        self.executions.write().push(record.clone());
        Ok(())
    }

    async fn execution_history(
        &self,
        session_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ExecutionRecord>, StorageError> {
        self.ensure_available()?;
        let executions = self.executions.read();
        Ok(executions
            .iter()
            .rev()
            .filter(|record| session_id.map_or(true, |s| record.session_id == s))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn health_check(&self) -> Result<(), StorageError> {
        self.ensure_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ManualClock;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_get_delete() {
        let storage = InMemoryDurableStorage::new();
        storage.set("a", json!(1), None, None).await.unwrap();
        storage.set("a", json!(2), None, Some("ns")).await.unwrap();

        assert_eq!(storage.get("a", None).await.unwrap(), Some(json!(1)));
        assert_eq!(storage.get("a", Some("ns")).await.unwrap(), Some(json!(2)));

        assert!(storage.delete("a", None).await.unwrap());
        assert!(!storage.delete("a", None).await.unwrap());
        assert_eq!(storage.get("a", None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let clock = Arc::new(ManualClock::starting_now());
        let storage = InMemoryDurableStorage::with_clock(clock.clone());
        storage
            .set("a", json!("x"), Some(Duration::from_secs(1)), None)
            .await
            .unwrap();

        clock.advance_secs(2);
        assert_eq!(storage.get("a", None).await.unwrap(), None);
        assert!(storage.find("*", None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_ttl_saturates() {
        let storage = InMemoryDurableStorage::new();
        storage
            .set("a", json!("x"), Some(Duration::from_secs(300_000 * 365 * 86_400)), None)
            .await
            .unwrap();
        assert_eq!(storage.get("a", None).await.unwrap(), Some(json!("x")));
    }

    #[tokio::test]
    async fn test_find_with_pattern_and_filter() {
        let storage = InMemoryDurableStorage::new();
        storage
            .set("memory:long_term:*:k1", json!({"tier": "long_term", "n": 1}), None, None)
            .await
            .unwrap();
        storage
            .set("memory:short_term:*:k2", json!({"tier": "short_term", "n": 2}), None, None)
            .await
            .unwrap();

        let all = storage.find("memory:*", None, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let filter = json!({"tier": "long_term"});
        let long = storage.find("memory:*", Some(&filter), None).await.unwrap();
        assert_eq!(long.len(), 1);
        assert_eq!(long[0].0, "memory:long_term:*:k1");
    }

    #[tokio::test]
    async fn test_execution_history_newest_first() {
        let storage = InMemoryDurableStorage::new();
        for (session, tool) in [("s1", "a"), ("s2", "b"), ("s1", "c")] {
            storage
                .record_tool_execution(&ExecutionRecord::new(session, tool, true, 5))
                .await
                .unwrap();
        }

        let history = storage.execution_history(Some("s1"), 10).await.unwrap();
        let tools: Vec<_> = history.iter().map(|r| r.tool_name.as_str()).collect();
        assert_eq!(tools, vec!["c", "a"]);

        assert_eq!(storage.execution_history(None, 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unavailable() {
        let storage = InMemoryDurableStorage::new();
        storage.set_unavailable(true);
        assert!(matches!(
            storage.health_check().await,
            Err(StorageError::Unavailable(_))
        ));
        assert!(storage.set("a", json!(1), None, None).await.is_err());
    }
}
