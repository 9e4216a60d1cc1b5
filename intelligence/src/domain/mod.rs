// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod analytics;
pub mod collaborators;
pub mod context;
pub mod error;
pub mod intelligence;
pub mod pattern;
pub mod session;

pub use analytics::*;
pub use collaborators::*;
pub use context::*;
pub use error::*;
pub use intelligence::*;
pub use pattern::*;
pub use session::*;
