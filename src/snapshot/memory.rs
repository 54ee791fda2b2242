use crate::error::{DeletionError, ListingError};
use crate::prelude::*;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::info;

use super::{ListQuery, Snapshot, SnapshotDeleter, SnapshotLister};

/// In-process snapshot inventory for a single project.
pub struct InMemorySnapshots {
    project: String,
    snapshots: Mutex<Vec<Snapshot>>,
    deletion_failures: Mutex<HashMap<String, DeletionError>>,
    listing_failure: Mutex<Option<String>>,
    delete_calls: Mutex<Vec<String>>,
}

impl InMemorySnapshots {
    pub fn new(project: impl Into<String>, snapshots: Vec<Snapshot>) -> Self {
        Self {
            project: project.into(),
            snapshots: Mutex::new(snapshots),
            deletion_failures: Mutex::new(HashMap::new()),
            listing_failure: Mutex::new(None),
            delete_calls: Mutex::new(Vec::new()),
        }
    }

    /// Makes every delete of `id` fail with `error` while leaving the snapshot in place.
    pub async fn fail_deletion(&self, id: impl Into<String>, error: DeletionError) {
        self.deletion_failures.lock().await.insert(id.into(), error);
    }

    pub async fn fail_listing(&self, message: impl Into<String>) {
        *self.listing_failure.lock().await = Some(message.into());
    }

    pub async fn remaining(&self) -> Vec<Snapshot> {
        self.snapshots.lock().await.clone()
    }

    /// Ids passed to `delete`, in call order, including failed attempts.
    pub async fn delete_calls(&self) -> Vec<String> {
        self.delete_calls.lock().await.clone()
    }
}

impl SnapshotLister for InMemorySnapshots {
    async fn list(&self, query: &ListQuery) -> Result<Vec<Snapshot>> {
        if let Some(message) = self.listing_failure.lock().await.clone() {
            return Err(ListingError::Unavailable(message).into());
        }
        if query.project != self.project {
            return Err(ListingError::Rejected {
                project: query.project.clone(),
                message: "unknown project".into(),
            }
            .into());
        }

        let snapshots = self.snapshots.lock().await;
        Ok(snapshots
            .iter()
            .filter(|snapshot| query.admits(snapshot))
            .cloned()
            .collect())
    }
}

impl SnapshotDeleter for InMemorySnapshots {
    async fn delete(&self, project: &str, id: &str) -> Result<(), DeletionError> {
        self.delete_calls.lock().await.push(id.to_string());

        if let Some(error) = self.deletion_failures.lock().await.get(id) {
            return Err(error.clone());
        }
        if project != self.project {
            return Err(DeletionError::NotFound(id.to_string()));
        }

        let mut snapshots = self.snapshots.lock().await;
        let before = snapshots.len();
        snapshots.retain(|snapshot| snapshot.id != id);
        if snapshots.len() == before {
            return Err(DeletionError::NotFound(id.to_string()));
        }

        info!("Removed in-memory snapshot {}", id);
        Ok(())
    }
}
