// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextTreeMetadata {
    pub total_tool_executions: usize,
}

/// Bounded view of a session's tool-execution history, built per call by
/// the [`crate::ContextTreeBuilder`] collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextTree {
    pub session_id: String,
    pub total_nodes: usize,
    #[serde(default)]
    pub metadata: ContextTreeMetadata,
}

impl ContextTree {
    pub fn new(session_id: impl Into<String>, total_nodes: usize) -> Self {
        Self {
            session_id: session_id.into(),
            total_nodes,
            metadata: ContextTreeMetadata::default(),
        }
    }
}
