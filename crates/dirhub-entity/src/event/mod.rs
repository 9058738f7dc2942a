//! Directory change events.
//!
//! The envelope is the wire contract between the store-side notifier and
//! every watcher. Field names are stable; new fields must be additive.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dirhub_core::error::AppError;

use crate::directory::Directory;

/// Current envelope version.
pub const EVENT_VERSION: &str = "v1";

/// Kind of change carried by a [`DirectoryEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    /// A directory was created.
    Create,
    /// A directory was modified.
    Update,
    /// A directory was soft deleted.
    Delete,
    /// A directory was removed permanently. Reserved.
    DeleteHard,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::DeleteHard => write!(f, "deletehard"),
        }
    }
}

/// Event envelope published after a store mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEvent {
    /// Envelope version.
    pub version: String,
    /// Kind of change.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// When the event was produced (RFC 3339, UTC).
    pub time: DateTime<Utc>,
    /// Snapshot of the directory at the moment of the event.
    pub directory: Directory,
}

impl DirectoryEvent {
    /// Create an event stamped with the current time.
    pub fn new(event_type: EventType, directory: Directory) -> Self {
        Self {
            version: EVENT_VERSION.to_string(),
            event_type,
            time: Utc::now(),
            directory,
        }
    }

    /// A `create` event.
    pub fn created(directory: Directory) -> Self {
        Self::new(EventType::Create, directory)
    }

    /// A `delete` (soft) event.
    pub fn deleted(directory: Directory) -> Self {
        Self::new(EventType::Delete, directory)
    }

    /// Encode as the JSON wire form.
    pub fn to_json(&self) -> Result<String, AppError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from the JSON wire form.
    pub fn from_json(payload: &str) -> Result<Self, AppError> {
        Ok(serde_json::from_str(payload)?)
    }
}
