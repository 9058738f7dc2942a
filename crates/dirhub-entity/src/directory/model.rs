//! Directory entity model.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use dirhub_core::error::AppError;
use dirhub_core::types::DirectoryId;

/// A node of the directory forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Directory {
    /// Unique directory identifier.
    pub id: DirectoryId,
    /// Directory name, never empty.
    pub name: String,
    /// Free-form string metadata.
    #[sqlx(json)]
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Parent directory; `None` for roots.
    #[sqlx(rename = "parent_id")]
    pub parent: Option<DirectoryId>,
    /// When the directory was created.
    pub created_at: DateTime<Utc>,
    /// When the directory was last written.
    pub updated_at: DateTime<Utc>,
    /// When the directory was soft deleted.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Directory {
    /// Materialize a new live directory with a fresh identifier.
    pub fn create(data: NewDirectory, now: DateTime<Utc>) -> Self {
        Self {
            id: DirectoryId::new(),
            name: data.name,
            metadata: data.metadata,
            parent: data.parent,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Check if this is a root directory (no parent).
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Check if this directory has been soft deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Mark the directory deleted at `at`. Already deleted directories keep
    /// their original timestamp.
    pub fn mark_deleted(&mut self, at: DateTime<Utc>) -> bool {
        if self.deleted_at.is_some() {
            return false;
        }
        self.deleted_at = Some(at);
        self.updated_at = at;
        true
    }
}

/// Data required to create a directory or a root.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewDirectory {
    /// Directory name.
    pub name: String,
    /// Free-form string metadata.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Parent directory. Must be absent for roots and present otherwise.
    #[serde(default)]
    pub parent: Option<DirectoryId>,
}

impl NewDirectory {
    /// Describe a root directory.
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metadata: HashMap::new(),
            parent: None,
        }
    }

    /// Describe a child of `parent`.
    pub fn child(name: impl Into<String>, parent: DirectoryId) -> Self {
        Self {
            name: name.into(),
            metadata: HashMap::new(),
            parent: Some(parent),
        }
    }

    /// Attach one metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Check the shape of a `create_root` request.
    pub fn validate_root(&self) -> Result<(), AppError> {
        if self.parent.is_some() {
            return Err(AppError::root_with_parent());
        }
        self.validate_name()
    }

    /// Check the shape of a `create_directory` request and return its parent.
    pub fn validate_child(&self) -> Result<DirectoryId, AppError> {
        let parent = self.parent.ok_or_else(AppError::without_parent)?;
        self.validate_name()?;
        Ok(parent)
    }

    fn validate_name(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("Directory name cannot be empty"));
        }
        Ok(())
    }
}
