// src/types.rs

use std::fmt;

use serde::Serialize;

/// One update request. Immutable for the lifetime of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    pub version: String,
    pub command_id: String,
}

impl UpdateRequest {
    /// Build a request, generating a command id when none was supplied.
    pub fn new(version: impl Into<String>, command_id: Option<String>) -> Self {
        let command_id = command_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        Self {
            version: version.into(),
            command_id,
        }
    }
}

/// Status values understood by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UpdateStatus {
    Pending,
    Updating,
    Completed,
    Failed,
}

impl UpdateStatus {
    pub fn is_complete(self) -> bool {
        matches!(self, UpdateStatus::Completed | UpdateStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UpdateStatus::Pending => "PENDING",
            UpdateStatus::Updating => "UPDATING",
            UpdateStatus::Completed => "COMPLETED",
            UpdateStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for UpdateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single progress event emitted during a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    pub status: UpdateStatus,
    pub message: String,
}

impl StatusEvent {
    pub fn new(status: UpdateStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status.is_complete()
    }
}
