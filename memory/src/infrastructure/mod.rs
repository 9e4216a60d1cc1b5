// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod event_bus;
pub mod in_memory_storage;
pub mod search_index;

pub use event_bus::{EventBusError, MemoryEventBus, MemoryEventReceiver};
pub use in_memory_storage::InMemoryDurableStorage;
pub use search_index::InvertedIndex;
