// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Tiered Store
//!
//! Authoritative in-memory map of [`MemoryEntry`] values, keyed by composite
//! address, with write-through to a [`DurableStorage`] backend.
//!
//! ## Expiry
//!
//! An entry is invisible once the clock passes its `expires_at`. A `get`
//! that lands on such an entry deletes it under the same write lock that
//! observed the expiry; `reap_expired` removes the rest in bulk.
//!
//! ## Eviction
//!
//! After each `put` the tier is trimmed back to `max_entries`, oldest
//! `created_at` first. Entries created at the same instant leave in insertion
//! order. The long-term inverted index is bounded by the same capacity, so a
//! key evicted from the index is evicted from the tier too.
//!
//! ## Locking
//!
//! `entries` is always taken before `index`. Neither guard is held across an
//! `.await`: durable deletes and event publication run after the guards drop.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::MemoryConfig;
use crate::domain::{
    memory_address, Clock, DurableStorage, KeyPattern, MemoryEntry, MemoryError, MemoryEvent,
    MemoryQuery, MemoryTier, MemoryValue, StoreOptions,
};
use crate::infrastructure::{InvertedIndex, MemoryEventBus};

#[derive(Debug, Clone)]
struct StoredEntry {
    entry: MemoryEntry,
    seq: u64,
}

/// Entry removed from the in-memory map whose durable copy still has to go.
#[derive(Debug)]
struct Removed {
    address: String,
    tier: MemoryTier,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl Removed {
    fn of(address: &str, entry: &MemoryEntry) -> Self {
        Self {
            address: address.to_string(),
            tier: entry.tier,
            created_at: entry.created_at,
            expires_at: entry.expires_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierStats {
    pub tier: MemoryTier,
    pub live_entries: usize,
    pub expired_entries: usize,
    pub max_entries: usize,
    #[serde(with = "humantime_serde")]
    pub default_ttl: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub short_term: TierStats,
    pub long_term: TierStats,
    pub total_entries: usize,
    pub indexed_entries: usize,
    pub indexed_tokens: usize,
    pub distinct_sessions: usize,
    pub distinct_namespaces: usize,
    pub total_size_bytes: usize,
}

pub struct TieredStore {
    config: MemoryConfig,
    durable: Arc<dyn DurableStorage>,
    clock: Arc<dyn Clock>,
    events: MemoryEventBus,
    entries: RwLock<HashMap<String, StoredEntry>>,
    index: Mutex<InvertedIndex>,
    sequence: AtomicU64,
    evictions: AtomicU64,
}

impl TieredStore {
    pub fn new(
        config: MemoryConfig,
        durable: Arc<dyn DurableStorage>,
        clock: Arc<dyn Clock>,
        events: MemoryEventBus,
    ) -> Self {
        let index = InvertedIndex::new(config.long_term.max_entries);
        Self {
            config,
            durable,
            clock,
            events,
            entries: RwLock::new(HashMap::new()),
            index: Mutex::new(index),
            sequence: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn events(&self) -> &MemoryEventBus {
        &self.events
    }

    /// Write an entry, then trim its tier back to capacity.
    pub async fn put(
        &self,
        key: &str,
        value: MemoryValue,
        tier: MemoryTier,
        options: StoreOptions,
    ) -> Result<MemoryEntry, MemoryError> {
        let now = self.clock.now();
        let ttl = options.ttl.unwrap_or(self.config.policy(tier).ttl);
        let chrono_ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| MemoryError::InvalidConfig(format!("ttl out of range: {}", e)))?;
        let expires_at = now.checked_add_signed(chrono_ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);

        let entry = MemoryEntry {
            key: key.to_string(),
            value,
            tier,
            session_id: options.session_id,
            namespace: options.namespace,
            tags: options.tags.into_iter().collect(),
            metadata: options.metadata,
            created_at: now,
            expires_at,
        };
        let address = entry.address();

        let serialized = serde_json::to_value(&entry)?;
        if let Err(e) = self.durable.set(&address, serialized, Some(ttl), None).await {
            error!(address = %address, error = %e, "Durable write failed");
            return Err(e.into());
        }

        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let evicted = {
            let mut entries = self.entries.write();
            let mut index = self.index.lock();

            let mut evicted = Vec::new();
            if tier == MemoryTier::LongTerm {
                if let Some(pushed_out) = index.add(&address, &entry.value.payload_text()) {
                    if let Some(old) = entries.remove(&pushed_out) {
                        evicted.push(Removed::of(&pushed_out, &old.entry));
                    }
                }
            }
            entries.insert(
                address.clone(),
                StoredEntry {
                    entry: entry.clone(),
                    seq,
                },
            );
            evicted.extend(self.enforce_limit(&mut entries, &mut index, tier));
            evicted
        };

        debug!(address = %address, tier = %tier, expires_at = %expires_at, "Stored memory entry");
        self.events.publish(MemoryEvent::EntryStored {
            address,
            tier,
            session_id: entry.session_id.clone(),
            timestamp: now,
        });

        if !evicted.is_empty() {
            self.evictions
                .fetch_add(evicted.len() as u64, Ordering::Relaxed);
            debug!(tier = %tier, count = evicted.len(), "Evicted oldest entries over tier limit");
        }
        for removed in evicted {
            self.purge_durable(&removed.address).await;
            self.events.publish(MemoryEvent::EntryEvicted {
                address: removed.address,
                tier: removed.tier,
                created_at: removed.created_at,
                timestamp: now,
            });
        }

        Ok(entry)
    }

    /// Remove the oldest entries of `tier` until it is back at capacity.
    fn enforce_limit(
        &self,
        entries: &mut HashMap<String, StoredEntry>,
        index: &mut InvertedIndex,
        tier: MemoryTier,
    ) -> Vec<Removed> {
        let max = self.config.policy(tier).max_entries;
        let mut in_tier: Vec<(DateTime<Utc>, u64, String)> = entries
            .iter()
            .filter(|(_, stored)| stored.entry.tier == tier)
            .map(|(address, stored)| (stored.entry.created_at, stored.seq, address.clone()))
            .collect();

        if in_tier.len() <= max {
            return Vec::new();
        }

        in_tier.sort();
        let excess = in_tier.len() - max;
        in_tier
            .into_iter()
            .take(excess)
            .filter_map(|(_, _, address)| {
                index.remove(&address);
                entries
                    .remove(&address)
                    .map(|stored| Removed::of(&address, &stored.entry))
            })
            .collect()
    }

    /// Live entry at `key`, or `None`. An expired entry is deleted on the way.
    pub async fn get(
        &self,
        key: &str,
        tier: MemoryTier,
        namespace: Option<&str>,
    ) -> Result<Option<MemoryEntry>, MemoryError> {
        let address = memory_address(tier, namespace, key);
        let now = self.clock.now();

        let expired = {
            let mut entries = self.entries.write();
            match entries.get(&address) {
                None => return Ok(None),
                Some(stored) if !stored.entry.is_expired_at(now) => {
                    return Ok(Some(stored.entry.clone()));
                }
                Some(_) => {}
            }
            let stored = entries.remove(&address);
            self.index.lock().remove(&address);
            stored.map(|s| Removed::of(&address, &s.entry))
        };

        if let Some(removed) = expired {
            debug!(address = %address, "Lazily deleted expired entry");
            self.purge_durable(&removed.address).await;
            self.events.publish(MemoryEvent::EntryExpired {
                address: removed.address,
                tier: removed.tier,
                expired_at: removed.expires_at,
                timestamp: now,
            });
        }
        Ok(None)
    }

    /// Entries matching every populated field of `query`, newest first.
    pub fn query(&self, query: &MemoryQuery) -> Result<Vec<MemoryEntry>, MemoryError> {
        let scope = KeyPattern::scope(query.tier, query.namespace.as_deref());
        let pattern = KeyPattern::new(&scope).map_err(crate::domain::StorageError::from)?;
        let needle = query.search_text.as_ref().map(|t| t.to_lowercase());
        let now = self.clock.now();

        let mut found: Vec<(u64, MemoryEntry)> = {
            let entries = self.entries.read();
            entries
                .iter()
                .filter(|(address, _)| pattern.matches(address))
                .map(|(_, stored)| stored)
                .filter(|stored| {
                    let entry = &stored.entry;
                    query.tier.map_or(true, |t| entry.tier == t)
                        && query
                            .session_id
                            .as_ref()
                            .map_or(true, |s| entry.session_id.as_ref() == Some(s))
                        && query
                            .namespace
                            .as_ref()
                            .map_or(true, |ns| entry.namespace.as_ref() == Some(ns))
                        && (query.tags.is_empty() || entry.has_any_tag(&query.tags))
                        && (query.include_expired || !entry.is_expired_at(now))
                        && needle
                            .as_ref()
                            .map_or(true, |n| entry.search_haystack().contains(n.as_str()))
                })
                .map(|stored| (stored.seq, stored.entry.clone()))
                .collect()
        };

        found.sort_by(|a, b| {
            b.1.created_at
                .cmp(&a.1.created_at)
                .then_with(|| b.0.cmp(&a.0))
        });
        let mut found: Vec<MemoryEntry> = found.into_iter().map(|(_, entry)| entry).collect();
        if let Some(limit) = query.limit {
            found.truncate(limit);
        }
        Ok(found)
    }

    /// Long-term entries sharing a token with `text`, newest first.
    pub fn recall(&self, text: &str, limit: Option<usize>) -> Vec<MemoryEntry> {
        let now = self.clock.now();
        let mut hits = {
            let entries = self.entries.read();
            let index = self.index.lock();
            index.search(text, |address| {
                entries
                    .get(address)
                    .filter(|stored| !stored.entry.is_expired_at(now))
                    .map(|stored| (stored.seq, stored.entry.clone()))
            })
        };

        hits.sort_by(|a, b| {
            b.1.created_at
                .cmp(&a.1.created_at)
                .then_with(|| b.0.cmp(&a.0))
        });
        let mut hits: Vec<MemoryEntry> = hits.into_iter().map(|(_, entry)| entry).collect();
        if let Some(limit) = limit {
            hits.truncate(limit);
        }
        hits
    }

    /// Delete one entry. Deleting an absent key returns `false`.
    pub async fn delete(
        &self,
        key: &str,
        tier: MemoryTier,
        namespace: Option<&str>,
    ) -> Result<bool, MemoryError> {
        let address = memory_address(tier, namespace, key);
        self.durable.delete(&address, None).await?;

        let removed = {
            let mut entries = self.entries.write();
            let removed = entries.remove(&address).is_some();
            if removed {
                self.index.lock().remove(&address);
            }
            removed
        };

        if removed {
            debug!(address = %address, "Deleted memory entry");
        }
        Ok(removed)
    }

    /// Delete every entry in `tier` / `namespace` (`None` widens to all).
    pub async fn clear(
        &self,
        tier: Option<MemoryTier>,
        namespace: Option<&str>,
    ) -> Result<usize, MemoryError> {
        let scope = KeyPattern::scope(tier, namespace);
        let pattern = KeyPattern::new(&scope).map_err(crate::domain::StorageError::from)?;

        let removed: Vec<String> = {
            let mut entries = self.entries.write();
            let mut index = self.index.lock();
            let targets: Vec<String> = entries
                .iter()
                .filter(|(address, stored)| {
                    pattern.matches(address)
                        && namespace.map_or(true, |ns| stored.entry.namespace.as_deref() == Some(ns))
                })
                .map(|(address, _)| address.clone())
                .collect();
            for address in &targets {
                entries.remove(address);
                index.remove(address);
            }
            targets
        };

        let mut failures = 0usize;
        for address in &removed {
            if let Err(e) = self.durable.delete(address, None).await {
                failures += 1;
                warn!(address = %address, error = %e, "Durable delete failed during clear");
            }
        }

        info!(pattern = %scope, count = removed.len(), failures, "Cleared memory entries");
        self.events.publish(MemoryEvent::EntriesCleared {
            pattern: scope,
            count: removed.len(),
            timestamp: self.clock.now(),
        });
        Ok(removed.len())
    }

    /// Remove every entry past its `expires_at`. Returns the number removed.
    pub async fn reap_expired(&self) -> usize {
        let now = self.clock.now();
        let reaped: Vec<String> = {
            let mut entries = self.entries.write();
            let mut index = self.index.lock();
            let expired: Vec<String> = entries
                .iter()
                .filter(|(_, stored)| stored.entry.is_expired_at(now))
                .map(|(address, _)| address.clone())
                .collect();
            for address in &expired {
                entries.remove(address);
                index.remove(address);
            }
            expired
        };

        for address in &reaped {
            self.purge_durable(address).await;
        }
        reaped.len()
    }

    /// Load persisted entries from durable storage, oldest first, then trim
    /// both tiers to capacity. Undecodable and expired records are skipped.
    pub async fn hydrate(&self) -> Result<usize, MemoryError> {
        let records = self
            .durable
            .find(&format!("{}:*", crate::domain::ADDRESS_PREFIX), None, None)
            .await?;
        let now = self.clock.now();

        let mut decoded: Vec<MemoryEntry> = records
            .into_iter()
            .filter_map(|(address, value)| match serde_json::from_value::<MemoryEntry>(value) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(address = %address, error = %e, "Skipping undecodable memory record");
                    None
                }
            })
            .filter(|entry| !entry.is_expired_at(now))
            .collect();
        decoded.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        let loaded = decoded.len();
        let evicted = {
            let mut entries = self.entries.write();
            let mut index = self.index.lock();
            let mut evicted = Vec::new();
            for entry in decoded {
                let address = entry.address();
                if entry.tier == MemoryTier::LongTerm {
                    if let Some(pushed_out) = index.add(&address, &entry.value.payload_text()) {
                        if let Some(old) = entries.remove(&pushed_out) {
                            evicted.push(Removed::of(&pushed_out, &old.entry));
                        }
                    }
                }
                let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
                entries.insert(address, StoredEntry { entry, seq });
            }
            for tier in MemoryTier::ALL {
                evicted.extend(self.enforce_limit(&mut entries, &mut index, tier));
            }
            evicted
        };

        for removed in &evicted {
            self.purge_durable(&removed.address).await;
        }

        info!(loaded, evicted = evicted.len(), "Hydrated memory tiers from durable storage");
        Ok(loaded.saturating_sub(evicted.len()))
    }

    async fn purge_durable(&self, address: &str) {
        if let Err(e) = self.durable.delete(address, None).await {
            warn!(address = %address, error = %e, "Durable delete failed");
        }
    }

    /// Entries physically present in `tier`, expired or not.
    pub fn tier_len(&self, tier: MemoryTier) -> usize {
        self.entries
            .read()
            .values()
            .filter(|stored| stored.entry.tier == tier)
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Total entries evicted for capacity since construction.
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn index_contains(&self, key: &str, namespace: Option<&str>) -> bool {
        self.index
            .lock()
            .contains(&memory_address(MemoryTier::LongTerm, namespace, key))
    }

    pub fn stats(&self) -> MemoryStats {
        let now = self.clock.now();
        let entries = self.entries.read();

        let mut live = [0usize; 2];
        let mut expired = [0usize; 2];
        let mut sessions = BTreeSet::new();
        let mut namespaces = BTreeSet::new();
        let mut total_size_bytes = 0usize;

        for stored in entries.values() {
            let entry = &stored.entry;
            let slot = match entry.tier {
                MemoryTier::ShortTerm => 0,
                MemoryTier::LongTerm => 1,
            };
            if entry.is_expired_at(now) {
                expired[slot] += 1;
            } else {
                live[slot] += 1;
            }
            if let Some(session) = &entry.session_id {
                sessions.insert(session.clone());
            }
            if let Some(namespace) = &entry.namespace {
                namespaces.insert(namespace.clone());
            }
            total_size_bytes += entry.serialized_size();
        }

        let (indexed_entries, indexed_tokens) = {
            let index = self.index.lock();
            (index.len(), index.token_count())
        };

        let tier_stats = |tier: MemoryTier, slot: usize| TierStats {
            tier,
            live_entries: live[slot],
            expired_entries: expired[slot],
            max_entries: self.config.policy(tier).max_entries,
            default_ttl: self.config.policy(tier).ttl,
        };

        MemoryStats {
            short_term: tier_stats(MemoryTier::ShortTerm, 0),
            long_term: tier_stats(MemoryTier::LongTerm, 1),
            total_entries: entries.len(),
            indexed_entries,
            indexed_tokens,
            distinct_sessions: sessions.len(),
            distinct_namespaces: namespaces.len(),
            total_size_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TierPolicy;
    use crate::domain::ManualClock;
    use crate::infrastructure::InMemoryDurableStorage;
    use serde_json::json;

    fn store_with(config: MemoryConfig) -> (TieredStore, Arc<ManualClock>, InMemoryDurableStorage) {
        let clock = Arc::new(ManualClock::starting_now());
        let durable = InMemoryDurableStorage::with_clock(clock.clone());
        let store = TieredStore::new(
            config,
            Arc::new(durable.clone()),
            clock.clone(),
            MemoryEventBus::new(64),
        );
        (store, clock, durable)
    }

    fn small_config(max: usize) -> MemoryConfig {
        MemoryConfig {
            short_term: TierPolicy::new(Duration::from_secs(60), max),
            long_term: TierPolicy::new(Duration::from_secs(3600), max),
            ..MemoryConfig::default()
        }
    }

    #[tokio::test]
    async fn test_put_get_round_trip_writes_through() {
        let (store, _, durable) = store_with(MemoryConfig::default());
        store
            .put("k1", MemoryValue::note("hello"), MemoryTier::ShortTerm, StoreOptions::new())
            .await
            .unwrap();

        let entry = store.get("k1", MemoryTier::ShortTerm, None).await.unwrap().unwrap();
        assert_eq!(entry.value, MemoryValue::note("hello"));
        assert_eq!(entry.expires_at - entry.created_at, chrono::Duration::seconds(3600));
        assert_eq!(durable.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_get_lazily_deletes() {
        let (store, clock, durable) = store_with(MemoryConfig::default());
        let mut events = store.events().subscribe();
        store
            .put(
                "k1",
                MemoryValue::note("x"),
                MemoryTier::ShortTerm,
                StoreOptions::new().with_ttl(Duration::from_secs(1)),
            )
            .await
            .unwrap();
        assert_eq!(events.recv().await.unwrap().event_type(), "entry_stored");

        clock.advance_secs(2);
        assert!(store.get("k1", MemoryTier::ShortTerm, None).await.unwrap().is_none());
        assert_eq!(store.len(), 0);
        assert!(durable.is_empty());
        assert_eq!(events.recv().await.unwrap().event_type(), "entry_expired");
    }

    #[tokio::test]
    async fn test_eviction_keeps_newest() {
        let (store, clock, _) = store_with(small_config(3));
        for i in 0..5 {
            store
                .put(&format!("k{}", i), json!(i).into(), MemoryTier::ShortTerm, StoreOptions::new())
                .await
                .unwrap();
            clock.advance_secs(1);
        }

        assert_eq!(store.tier_len(MemoryTier::ShortTerm), 3);
        assert_eq!(store.evictions(), 2);
        for i in 0..2 {
            assert!(store.get(&format!("k{}", i), MemoryTier::ShortTerm, None).await.unwrap().is_none());
        }
        for i in 2..5 {
            assert!(store.get(&format!("k{}", i), MemoryTier::ShortTerm, None).await.unwrap().is_some());
        }
    }

    #[tokio::test]
    async fn test_eviction_ties_leave_in_insertion_order() {
        let (store, _, _) = store_with(small_config(2));
        for key in ["a", "b", "c"] {
            store
                .put(key, MemoryValue::note(key), MemoryTier::ShortTerm, StoreOptions::new())
                .await
                .unwrap();
        }
        assert!(store.get("a", MemoryTier::ShortTerm, None).await.unwrap().is_none());
        assert!(store.get("c", MemoryTier::ShortTerm, None).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_eviction_is_per_tier() {
        let (store, _, _) = store_with(small_config(1));
        store
            .put("s", MemoryValue::note("s"), MemoryTier::ShortTerm, StoreOptions::new())
            .await
            .unwrap();
        store
            .put("l", MemoryValue::note("l"), MemoryTier::LongTerm, StoreOptions::new())
            .await
            .unwrap();
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_query_filters_and_orders() {
        let (store, clock, _) = store_with(MemoryConfig::default());
        let opts = |session: &str, ns: &str, tag: &str| {
            StoreOptions::new()
                .with_session(session)
                .with_namespace(ns)
                .with_tags([tag])
        };
        store
            .put("a", MemoryValue::note("Tokio runtime"), MemoryTier::LongTerm, opts("s1", "docs", "rust"))
            .await
            .unwrap();
        clock.advance_secs(1);
        store
            .put("b", MemoryValue::note("serde"), MemoryTier::LongTerm, opts("s1", "docs", "serde"))
            .await
            .unwrap();
        clock.advance_secs(1);
        store
            .put("c", MemoryValue::note("other"), MemoryTier::ShortTerm, opts("s2", "misc", "rust"))
            .await
            .unwrap();

        let keys = |entries: Vec<MemoryEntry>| entries.into_iter().map(|e| e.key).collect::<Vec<_>>();

        assert_eq!(keys(store.query(&MemoryQuery::new()).unwrap()), vec!["c", "b", "a"]);
        assert_eq!(keys(store.query(&MemoryQuery::new().session("s1")).unwrap()), vec!["b", "a"]);
        assert_eq!(keys(store.query(&MemoryQuery::new().namespace("misc")).unwrap()), vec!["c"]);
        assert_eq!(keys(store.query(&MemoryQuery::new().tags(["rust"])).unwrap()), vec!["c", "a"]);
        assert_eq!(keys(store.query(&MemoryQuery::new().text("TOKIO")).unwrap()), vec!["a"]);
        assert_eq!(
            keys(store.query(&MemoryQuery::new().tier(MemoryTier::LongTerm).limit(1)).unwrap()),
            vec!["b"]
        );
    }

    #[tokio::test]
    async fn test_query_include_expired() {
        let (store, clock, _) = store_with(MemoryConfig::default());
        store
            .put(
                "k",
                MemoryValue::note("x"),
                MemoryTier::ShortTerm,
                StoreOptions::new().with_ttl(Duration::from_secs(1)),
            )
            .await
            .unwrap();
        clock.advance_secs(5);

        assert!(store.query(&MemoryQuery::new()).unwrap().is_empty());
        assert_eq!(store.query(&MemoryQuery::new().include_expired(true)).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (store, _, _) = store_with(MemoryConfig::default());
        store
            .put("k", MemoryValue::note("x"), MemoryTier::LongTerm, StoreOptions::new())
            .await
            .unwrap();
        assert!(store.index_contains("k", None));

        assert!(store.delete("k", MemoryTier::LongTerm, None).await.unwrap());
        assert!(!store.index_contains("k", None));
        assert!(!store.delete("k", MemoryTier::LongTerm, None).await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_clear_by_tier_and_namespace() {
        let (store, _, durable) = store_with(MemoryConfig::default());
        for (key, tier, ns) in [
            ("a", MemoryTier::ShortTerm, "x"),
            ("b", MemoryTier::ShortTerm, "y"),
            ("c", MemoryTier::LongTerm, "x"),
        ] {
            store
                .put(key, MemoryValue::note(key), tier, StoreOptions::new().with_namespace(ns))
                .await
                .unwrap();
        }

        assert_eq!(store.clear(Some(MemoryTier::ShortTerm), Some("x")).await.unwrap(), 1);
        assert_eq!(store.clear(None, None).await.unwrap(), 2);
        assert!(store.is_empty());
        assert!(durable.is_empty());
    }

    #[tokio::test]
    async fn test_reap_expired() {
        let (store, clock, _) = store_with(MemoryConfig::default());
        store
            .put(
                "short",
                MemoryValue::note("x"),
                MemoryTier::ShortTerm,
                StoreOptions::new().with_ttl(Duration::from_secs(1)),
            )
            .await
            .unwrap();
        store
            .put("long", MemoryValue::note("y"), MemoryTier::LongTerm, StoreOptions::new())
            .await
            .unwrap();

        clock.advance_secs(10);
        assert_eq!(store.reap_expired().await, 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_put_propagates_durable_failure() {
        let (store, _, durable) = store_with(MemoryConfig::default());
        durable.set_unavailable(true);
        let result = store
            .put("k", MemoryValue::note("x"), MemoryTier::ShortTerm, StoreOptions::new())
            .await;
        assert!(matches!(result, Err(MemoryError::Storage(_))));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_put_with_oversized_ttl_never_expires() {
        let (store, clock, durable) = store_with(MemoryConfig::default());
        let entry = store
            .put(
                "k",
                MemoryValue::note("forever"),
                MemoryTier::LongTerm,
                StoreOptions::new().with_ttl(Duration::from_secs(300_000 * 365 * 86_400)),
            )
            .await
            .unwrap();
        assert_eq!(entry.expires_at, DateTime::<Utc>::MAX_UTC);
        assert_eq!(durable.len(), 1);

        clock.advance_secs(10 * 365 * 86_400);
        assert!(store.get("k", MemoryTier::LongTerm, None).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_recall_uses_long_term_index() {
        let (store, _, _) = store_with(MemoryConfig::default());
        store
            .put("a", MemoryValue::note("tokio scheduler"), MemoryTier::LongTerm, StoreOptions::new())
            .await
            .unwrap();
        store
            .put("b", MemoryValue::note("tokio in short"), MemoryTier::ShortTerm, StoreOptions::new())
            .await
            .unwrap();

        let hits = store.recall("tokio", None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].key, "a");
    }

    #[tokio::test]
    async fn test_hydrate_restores_entries() {
        let clock = Arc::new(ManualClock::starting_now());
        let durable = InMemoryDurableStorage::with_clock(clock.clone());
        let first = TieredStore::new(
            MemoryConfig::default(),
            Arc::new(durable.clone()),
            clock.clone(),
            MemoryEventBus::default(),
        );
        first
            .put("k", MemoryValue::note("persisted fact"), MemoryTier::LongTerm, StoreOptions::new())
            .await
            .unwrap();

        let second = TieredStore::new(
            MemoryConfig::default(),
            Arc::new(durable),
            clock,
            MemoryEventBus::default(),
        );
        assert_eq!(second.hydrate().await.unwrap(), 1);
        assert!(second.get("k", MemoryTier::LongTerm, None).await.unwrap().is_some());
        assert_eq!(second.recall("persisted", None).len(), 1);
    }

    #[tokio::test]
    async fn test_stats() {
        let (store, clock, _) = store_with(MemoryConfig::default());
        store
            .put(
                "a",
                MemoryValue::note("x"),
                MemoryTier::ShortTerm,
                StoreOptions::new().with_session("s1").with_ttl(Duration::from_secs(1)),
            )
            .await
            .unwrap();
        store
            .put("b", MemoryValue::note("indexed words"), MemoryTier::LongTerm, StoreOptions::new().with_namespace("ns"))
            .await
            .unwrap();
        clock.advance_secs(2);

        let stats = store.stats();
        assert_eq!(stats.short_term.expired_entries, 1);
        assert_eq!(stats.long_term.live_entries, 1);
        assert_eq!(stats.indexed_entries, 1);
        assert_eq!(stats.distinct_sessions, 1);
        assert_eq!(stats.distinct_namespaces, 1);
        assert!(stats.total_size_bytes > 0);
    }
}
