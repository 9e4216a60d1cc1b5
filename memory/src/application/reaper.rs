// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Memory Reaper - Background sweep of expired entries
//!
//! Lazy deletion only removes entries that a read happens to touch. The
//! reaper removes everything else on a fixed interval and publishes an
//! `EntriesReaped` event per cycle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::tiered_store::TieredStore;
use crate::config::ReaperConfig;
use crate::domain::MemoryEvent;

pub struct MemoryReaper {
    store: Arc<TieredStore>,
    config: ReaperConfig,
    shutdown_token: CancellationToken,
    total_reaped: AtomicU64,
    last_reap: RwLock<Option<DateTime<Utc>>>,
}

impl MemoryReaper {
    pub fn new(store: Arc<TieredStore>, config: ReaperConfig) -> Self {
        Self {
            store,
            config,
            shutdown_token: CancellationToken::new(),
            total_reaped: AtomicU64::new(0),
            last_reap: RwLock::new(None),
        }
    }

    /// Get a handle to trigger shutdown
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Start the reaper background task
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        if !self.config.enabled {
            info!("Memory reaper is disabled");
            return;
        }

        info!(
            interval = ?self.config.interval,
            "Starting memory reaper background task"
        );

        let mut tick = interval(self.config.interval);
        // First tick completes immediately
        tick.tick().await;

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    debug!("Running memory reaper cycle");
                    match self.reap_cycle().await {
                        Ok(reaped) => info!(reaped, "Memory reaper cycle completed"),
                        Err(e) => warn!("Memory reaper cycle failed: {}", e),
                    }
                }
                _ = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received, stopping memory reaper");
                    break;
                }
            }
        }

        info!("Memory reaper background task stopped");
    }

    /// Execute a single sweep
    pub async fn reap_cycle(&self) -> Result<usize> {
        let reaped = self.store.reap_expired().await;
        let now = self.store.clock().now();

        self.total_reaped.fetch_add(reaped as u64, Ordering::Relaxed);
        *self.last_reap.write() = Some(now);

        self.store.events().publish(MemoryEvent::EntriesReaped {
            count: reaped,
            timestamp: now,
        });

        Ok(reaped)
    }

    pub fn total_reaped(&self) -> u64 {
        self.total_reaped.load(Ordering::Relaxed)
    }

    pub fn last_reap(&self) -> Option<DateTime<Utc>> {
        *self.last_reap.read()
    }
}
