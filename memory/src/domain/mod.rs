// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Memory domain types and the durable-storage contract.

pub mod clock;
pub mod entry;
pub mod events;
pub mod execution;
pub mod key_pattern;
pub mod query;
pub mod aggregation;
pub mod repository;
pub mod error;

pub use clock::*;
pub use entry::*;
pub use events::*;
pub use execution::*;
pub use key_pattern::*;
pub use query::*;
pub use aggregation::*;
pub use repository::*;
pub use error::*;
