// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use aegis_memory::StorageError;
use thiserror::Error;

use super::pattern::PatternId;

#[derive(Debug, Error)]
pub enum IntelligenceError {
    #[error("Intelligence engine not initialized")]
    NotInitialized,

    #[error("Intelligence initialization failed: {0}")]
    Initialization(String),

    #[error("Pattern not found: {0}")]
    PatternNotFound(PatternId),

    #[error("Collaborator failure: {0}")]
    Collaborator(String),

    #[error("Invalid intelligence configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl IntelligenceError {
    pub fn collaborator(err: anyhow::Error) -> Self {
        IntelligenceError::Collaborator(format!("{:#}", err))
    }
}
