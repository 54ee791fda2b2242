mod gcloud;
mod memory;

pub use gcloud::GcloudSnapshots;
pub use memory::InMemorySnapshots;

use crate::error::DeletionError;
use crate::prelude::*;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub id: String,
    pub created: DateTime<FixedOffset>,
    pub labels: BTreeMap<String, String>,
}

impl Snapshot {
    pub fn new(id: impl Into<String>, created: DateTime<FixedOffset>) -> Self {
        Self {
            id: id.into(),
            created,
            labels: BTreeMap::new(),
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn is_protected(&self, label: &ProtectLabel) -> bool {
        self.labels.get(&label.key) == Some(&label.value)
    }
}

/// Label marking a snapshot as never to be deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectLabel {
    pub key: String,
    pub value: String,
}

impl Default for ProtectLabel {
    fn default() -> Self {
        Self {
            key: "delete".into(),
            value: "never".into(),
        }
    }
}

impl fmt::Display for ProtectLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Candidate query: snapshots of `project` created strictly before `created_before`
/// and not carrying the `exclude` label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub project: String,
    pub created_before: DateTime<Utc>,
    pub exclude: ProtectLabel,
}

impl ListQuery {
    pub fn admits(&self, snapshot: &Snapshot) -> bool {
        snapshot.created.with_timezone(&Utc) < self.created_before
            && !snapshot.is_protected(&self.exclude)
    }
}

pub trait SnapshotLister: Send + Sync {
    async fn list(&self, query: &ListQuery) -> Result<Vec<Snapshot>>;
}

pub trait SnapshotDeleter: Send + Sync {
    async fn delete(&self, project: &str, id: &str) -> Result<(), DeletionError>;
}
