// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Domain events for the memory subsystem.
//! Published on the `MemoryEventBus` for observability and integration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entry::MemoryTier;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MemoryEvent {
    /// An entry was written
    EntryStored {
        address: String,
        tier: MemoryTier,
        session_id: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// An entry was removed to keep its tier within capacity
    EntryEvicted {
        address: String,
        tier: MemoryTier,
        created_at: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },

    /// A read found an expired entry and deleted it
    EntryExpired {
        address: String,
        tier: MemoryTier,
        expired_at: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },

    /// A reaper sweep finished
    EntriesReaped {
        count: usize,
        timestamp: DateTime<Utc>,
    },

    /// A bulk clear finished
    EntriesCleared {
        pattern: String,
        count: usize,
        timestamp: DateTime<Utc>,
    },
}

impl MemoryEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            MemoryEvent::EntryStored { timestamp, .. } => *timestamp,
            MemoryEvent::EntryEvicted { timestamp, .. } => *timestamp,
            MemoryEvent::EntryExpired { timestamp, .. } => *timestamp,
            MemoryEvent::EntriesReaped { timestamp, .. } => *timestamp,
            MemoryEvent::EntriesCleared { timestamp, .. } => *timestamp,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            MemoryEvent::EntryStored { .. } => "entry_stored",
            MemoryEvent::EntryEvicted { .. } => "entry_evicted",
            MemoryEvent::EntryExpired { .. } => "entry_expired",
            MemoryEvent::EntriesReaped { .. } => "entries_reaped",
            MemoryEvent::EntriesCleared { .. } => "entries_cleared",
        }
    }
}
