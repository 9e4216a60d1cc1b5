// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # MemoryService
//!
//! Facade over the [`TieredStore`], [`AggregationEngine`] and
//! [`MemoryReaper`] that the rest of the SDK talks to.
//!
//! ## Failure semantics
//!
//! | Operation | Before `initialize` | On storage failure |
//! |-----------|---------------------|--------------------|
//! | `store`, `delete` | `Err(NotInitialized)` | error propagated |
//! | `retrieve`, `retrieve_entry` | `None` | `None`, logged |
//! | `search`, `recall` | empty | empty, logged |
//! | `clear` | `0` | `0`, logged |
//! | `aggregate` | empty result | n/a |
//!
//! `initialize` itself is fatal on failure: an invalid configuration or an
//! unreachable durable store is returned to the caller.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::aggregation::AggregationEngine;
use super::reaper::MemoryReaper;
use super::tiered_store::{MemoryStats, TieredStore};
use crate::config::MemoryConfig;
use crate::domain::{
    AggregationResult, Clock, DurableStorage, MemoryEntry, MemoryError, MemoryQuery, MemoryTier,
    MemoryValue, StoreOptions, SystemClock,
};
use crate::infrastructure::{MemoryEventBus, MemoryEventReceiver};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryHealth {
    pub status: HealthStatus,
    pub initialized: bool,
    pub storage_reachable: bool,
    pub total_entries: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationalStats {
    pub stores: u64,
    pub retrievals: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub searches: u64,
    pub deletes: u64,
    pub evictions: u64,
    pub reaped: u64,
    pub errors: u64,
    pub last_reap: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct Counters {
    stores: AtomicU64,
    retrievals: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    searches: AtomicU64,
    deletes: AtomicU64,
    errors: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

struct ReaperHandle {
    reaper: Arc<MemoryReaper>,
    task: JoinHandle<()>,
}

pub struct MemoryService {
    config: MemoryConfig,
    store: Arc<TieredStore>,
    durable: Arc<dyn DurableStorage>,
    aggregation: AggregationEngine,
    initialized: AtomicBool,
    counters: Counters,
    reaper: Mutex<Option<ReaperHandle>>,
    /// Serializes `initialize` so concurrent callers start one reaper
    init_lock: tokio::sync::Mutex<()>,
}

impl MemoryService {
    pub fn new(config: MemoryConfig, durable: Arc<dyn DurableStorage>) -> Self {
        Self::with_components(
            config,
            durable,
            Arc::new(SystemClock),
            MemoryEventBus::with_default_capacity(),
        )
    }

    pub fn with_components(
        config: MemoryConfig,
        durable: Arc<dyn DurableStorage>,
        clock: Arc<dyn Clock>,
        events: MemoryEventBus,
    ) -> Self {
        let store = Arc::new(TieredStore::new(
            config.clone(),
            durable.clone(),
            clock,
            events,
        ));
        Self {
            aggregation: AggregationEngine::new(config.aggregation_limit),
            config,
            store,
            durable,
            initialized: AtomicBool::new(false),
            counters: Counters::default(),
            reaper: Mutex::new(None),
            init_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn subscribe(&self) -> MemoryEventReceiver {
        self.store.events().subscribe()
    }

    pub fn tiered_store(&self) -> &Arc<TieredStore> {
        &self.store
    }

    /// Validate configuration, check durable storage, hydrate the tiers and
    /// start the reaper. Calling it again is a no-op.
    pub async fn initialize(&self) -> Result<(), MemoryError> {
        let _guard = self.init_lock.lock().await;
        if self.is_initialized() {
            return Ok(());
        }

        self.config
            .validate()
            .map_err(|e| MemoryError::InvalidConfig(e.to_string()))?;

        self.durable.health_check().await.map_err(|e| {
            error!(error = %e, "Durable storage health check failed");
            MemoryError::Initialization(format!("durable storage unreachable: {}", e))
        })?;

        let loaded = self
            .store
            .hydrate()
            .await
            .map_err(|e| MemoryError::Initialization(format!("hydration failed: {}", e)))?;

        if self.config.reaper.enabled {
            let reaper = Arc::new(MemoryReaper::new(
                self.store.clone(),
                self.config.reaper.clone(),
            ));
            let task = reaper.clone().start();
            *self.reaper.lock() = Some(ReaperHandle { reaper, task });
        }

        self.initialized.store(true, Ordering::SeqCst);
        info!(
            loaded,
            reaper_enabled = self.config.reaper.enabled,
            "Memory service initialized"
        );
        Ok(())
    }

    /// Stop the reaper and refuse further writes.
    pub async fn shutdown(&self) {
        self.initialized.store(false, Ordering::SeqCst);
        let handle = self.reaper.lock().take();
        if let Some(ReaperHandle { reaper, task }) = handle {
            reaper.shutdown_token().cancel();
            if let Err(e) = task.await {
                warn!("Memory reaper task ended abnormally: {}", e);
            }
        }
        info!("Memory service shut down");
    }

    fn ensure_writable(&self) -> Result<(), MemoryError> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(MemoryError::NotInitialized)
        }
    }

    pub async fn store(
        &self,
        key: &str,
        value: impl Into<MemoryValue>,
        tier: MemoryTier,
        options: StoreOptions,
    ) -> Result<MemoryEntry, MemoryError> {
        self.ensure_writable()?;
        Counters::bump(&self.counters.stores);

        self.store
            .put(key, value.into(), tier, options)
            .await
            .inspect_err(|_| Counters::bump(&self.counters.errors))
    }

    /// Value stored at `key`, or `None` if absent, expired or unreadable.
    pub async fn retrieve(
        &self,
        key: &str,
        tier: MemoryTier,
        namespace: Option<&str>,
    ) -> Option<MemoryValue> {
        self.retrieve_entry(key, tier, namespace)
            .await
            .map(|entry| entry.value)
    }

    /// Like [`retrieve`](Self::retrieve) but with tags, metadata and timestamps.
    pub async fn retrieve_entry(
        &self,
        key: &str,
        tier: MemoryTier,
        namespace: Option<&str>,
    ) -> Option<MemoryEntry> {
        if !self.is_initialized() {
            debug!(key, "retrieve before initialize");
            return None;
        }
        Counters::bump(&self.counters.retrievals);

        match self.store.get(key, tier, namespace).await {
            Ok(Some(entry)) => {
                Counters::bump(&self.counters.hits);
                Some(entry)
            }
            Ok(None) => {
                Counters::bump(&self.counters.misses);
                None
            }
            Err(e) => {
                Counters::bump(&self.counters.misses);
                Counters::bump(&self.counters.errors);
                warn!(key, tier = %tier, error = %e, "Memory retrieve failed");
                None
            }
        }
    }

    pub async fn search(&self, query: &MemoryQuery) -> Vec<MemoryEntry> {
        if !self.is_initialized() {
            return Vec::new();
        }
        Counters::bump(&self.counters.searches);

        if !self.config.allow_global_access && !query.is_scoped() {
            warn!("Unscoped memory search rejected: global access is disabled");
            return Vec::new();
        }

        match self.store.query(query) {
            Ok(entries) => entries,
            Err(e) => {
                Counters::bump(&self.counters.errors);
                warn!(error = %e, "Memory search failed");
                Vec::new()
            }
        }
    }

    /// Token lookup over the long-term tier.
    pub async fn recall(&self, text: &str, limit: Option<usize>) -> Vec<MemoryEntry> {
        if !self.is_initialized() {
            return Vec::new();
        }
        Counters::bump(&self.counters.searches);
        self.store.recall(text, limit)
    }

    pub async fn delete(
        &self,
        key: &str,
        tier: MemoryTier,
        namespace: Option<&str>,
    ) -> Result<bool, MemoryError> {
        self.ensure_writable()?;
        Counters::bump(&self.counters.deletes);

        self.store
            .delete(key, tier, namespace)
            .await
            .inspect_err(|_| Counters::bump(&self.counters.errors))
    }

    /// Delete every entry in `tier` / `namespace`. Returns the count removed.
    pub async fn clear(&self, tier: Option<MemoryTier>, namespace: Option<&str>) -> usize {
        if !self.is_initialized() {
            warn!("clear before initialize ignored");
            return 0;
        }

        match self.store.clear(tier, namespace).await {
            Ok(count) => count,
            Err(e) => {
                Counters::bump(&self.counters.errors);
                warn!(error = %e, "Memory clear failed");
                0
            }
        }
    }

    /// Mine the entries selected by `query`. Without an explicit limit the
    /// configured aggregation limit applies.
    pub async fn aggregate(&self, query: &MemoryQuery) -> AggregationResult {
        let now = self.store.clock().now();
        if !self.config.enable_aggregation {
            let mut result = AggregationResult::empty(now);
            result.summary = "Aggregation is disabled.".to_string();
            return result;
        }

        let mut query = query.clone();
        query.limit = Some(
            query
                .limit
                .map_or(self.aggregation.limit(), |l| l.min(self.aggregation.limit())),
        );

        let entries = self.search(&query).await;
        self.aggregation.aggregate(&entries, now)
    }

    pub fn get_stats(&self) -> MemoryStats {
        self.store.stats()
    }

    pub fn get_operational_stats(&self) -> OperationalStats {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        let hits = load(&self.counters.hits);
        let misses = load(&self.counters.misses);
        let lookups = hits + misses;

        let (reaped, last_reap) = match self.reaper.lock().as_ref() {
            Some(handle) => (handle.reaper.total_reaped(), handle.reaper.last_reap()),
            None => (0, None),
        };

        OperationalStats {
            stores: load(&self.counters.stores),
            retrievals: load(&self.counters.retrievals),
            hits,
            misses,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                hits as f64 / lookups as f64
            },
            searches: load(&self.counters.searches),
            deletes: load(&self.counters.deletes),
            evictions: self.store.evictions(),
            reaped,
            errors: load(&self.counters.errors),
            last_reap,
        }
    }

    pub async fn health_check(&self) -> MemoryHealth {
        let initialized = self.is_initialized();
        let storage_reachable = match self.durable.health_check().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Durable storage health check failed");
                false
            }
        };

        let status = match (initialized, storage_reachable) {
            (false, _) => HealthStatus::Unhealthy,
            (true, false) => HealthStatus::Degraded,
            (true, true) => HealthStatus::Healthy,
        };

        MemoryHealth {
            status,
            initialized,
            storage_reachable,
            total_entries: self.store.len(),
        }
    }
}

impl Drop for MemoryService {
    fn drop(&mut self) {
        if let Some(handle) = self.reaper.get_mut().take() {
            handle.reaper.shutdown_token().cancel();
        }
    }
}
