// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionRecordId(pub Uuid);

impl ExecutionRecordId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ExecutionRecordId {
    fn default() -> Self {
        Self::new()
    }
}

/// One tool execution, appended to the durable execution history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: ExecutionRecordId,
    pub session_id: String,
    pub tool_name: String,
    /// Pattern that produced the tool call, if the fast path was taken.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_id: Option<String>,
    pub success: bool,
    pub execution_time_ms: u64,
    #[serde(default)]
    pub parameters: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl ExecutionRecord {
    pub fn new(
        session_id: impl Into<String>,
        tool_name: impl Into<String>,
        success: bool,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            id: ExecutionRecordId::new(),
            session_id: session_id.into(),
            tool_name: tool_name.into(),
            pattern_id: None,
            success,
            execution_time_ms,
            parameters: serde_json::Value::Null,
            result: None,
            error: None,
            recorded_at: Utc::now(),
        }
    }
}
