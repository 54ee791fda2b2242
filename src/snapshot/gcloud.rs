use crate::error::{DeletionError, ListingError};
use crate::prelude::*;
use crate::retention::parse_timestamp;
use chrono::SecondsFormat;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, error, info};

use super::{ListQuery, Snapshot, SnapshotDeleter, SnapshotLister};

/// Compute Engine snapshots, driven through the installed `gcloud` CLI and whatever
/// account it is logged in as.
#[derive(Debug, Clone)]
pub struct GcloudSnapshots {
    program: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotResource {
    name: String,
    creation_timestamp: String,
    #[serde(default)]
    labels: BTreeMap<String, String>,
}

impl GcloudSnapshots {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn list_args(query: &ListQuery) -> Vec<String> {
        let filter = format!(
            "creationTimestamp<'{before}' AND NOT labels.{key}={value}",
            before = query
                .created_before
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            key = query.exclude.key,
            value = query.exclude.value,
        );
        vec![
            "compute".into(),
            "snapshots".into(),
            "list".into(),
            "--project".into(),
            query.project.clone(),
            "--format=json".into(),
            format!("--filter={}", filter),
        ]
    }

    fn delete_args(project: &str, id: &str) -> Vec<String> {
        vec![
            "compute".into(),
            "snapshots".into(),
            "delete".into(),
            id.into(),
            "--project".into(),
            project.into(),
            "--quiet".into(),
        ]
    }

    fn decode(stdout: &[u8]) -> Result<Vec<Snapshot>> {
        let resources: Vec<SnapshotResource> =
            serde_json::from_slice(stdout).map_err(ListingError::Decode)?;
        resources
            .into_iter()
            .map(|resource| {
                Ok(Snapshot {
                    created: parse_timestamp(&resource.creation_timestamp)?,
                    id: resource.name,
                    labels: resource.labels,
                })
            })
            .collect()
    }
}

impl SnapshotLister for GcloudSnapshots {
    async fn list(&self, query: &ListQuery) -> Result<Vec<Snapshot>> {
        let args = Self::list_args(query);
        debug!("Running {} {}", self.program.display(), args.join(" "));

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .await
            .map_err(|e| {
                error!("Failed to execute {}: {}", self.program.display(), e);
                ListingError::Spawn {
                    program: self.program.display().to_string(),
                    source: e,
                }
            })?;

        if !output.status.success() {
            let error_message = String::from_utf8_lossy(&output.stderr);
            error!("Snapshot listing failed: {}", error_message);
            return Err(ListingError::Rejected {
                project: query.project.clone(),
                message: error_message.trim().to_string(),
            }
            .into());
        }

        let mut snapshots = Self::decode(&output.stdout)?;
        let listed = snapshots.len();
        snapshots.retain(|snapshot| query.admits(snapshot));
        info!(
            "Listed {} snapshots in project {}, {} are candidates",
            listed,
            query.project,
            snapshots.len()
        );
        Ok(snapshots)
    }
}

impl SnapshotDeleter for GcloudSnapshots {
    async fn delete(&self, project: &str, id: &str) -> Result<(), DeletionError> {
        let output = Command::new(&self.program)
            .args(Self::delete_args(project, id))
            .output()
            .await
            .map_err(|e| DeletionError::Spawn {
                program: self.program.display().to_string(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let error_message = String::from_utf8_lossy(&output.stderr);
            return Err(DeletionError::from_provider_message(id, &error_message));
        }

        info!("Deleted snapshot {} in project {}", id, project);
        Ok(())
    }
}
