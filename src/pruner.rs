use crate::config::Settings;
use crate::error::DeletionError;
use crate::prelude::*;
use crate::retention::{classify, Classification, Cutoff, RetentionPolicy};
use crate::snapshot::{ListQuery, ProtectLabel, Snapshot, SnapshotDeleter, SnapshotLister};
use chrono::{DateTime, FixedOffset, Utc};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneOptions {
    pub project: String,
    pub policy: RetentionPolicy,
    pub now: DateTime<Utc>,
    pub dry_run: bool,
    pub concurrency: usize,
    pub protect_label: ProtectLabel,
}

impl PruneOptions {
    pub fn from_settings(settings: &Settings, now: DateTime<Utc>, dry_run: bool) -> Self {
        Self {
            project: settings.project.clone(),
            policy: settings.retention,
            now,
            dry_run,
            concurrency: settings.deletion.concurrency,
            protect_label: settings.protect_label.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub snapshot_id: String,
    pub created: DateTime<FixedOffset>,
    pub classification: Classification,
}

#[derive(Debug, Clone, Default)]
pub struct PruneReport {
    /// One entry per candidate, oldest first.
    pub verdicts: Vec<Verdict>,
    pub deleted: Vec<String>,
    pub failures: Vec<DeletionError>,
    pub dry_run: bool,
}

impl PruneReport {
    pub fn lines(&self) -> Vec<String> {
        self.verdicts
            .iter()
            .map(|verdict| verdict.classification.line(&verdict.snapshot_id))
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn kept(&self) -> usize {
        self.verdicts
            .iter()
            .filter(|verdict| verdict.classification.is_keep())
            .count()
    }

    pub fn expired(&self) -> usize {
        self.verdicts.len() - self.kept()
    }
}

pub struct Pruner<L, D> {
    lister: Arc<L>,
    deleter: Arc<D>,
    options: PruneOptions,
}

impl<L: SnapshotLister, D: SnapshotDeleter> Pruner<L, D> {
    pub fn new(lister: Arc<L>, deleter: Arc<D>, options: PruneOptions) -> Self {
        Self {
            lister,
            deleter,
            options,
        }
    }

    /// Lists snapshots older than the daily window and not protected, oldest first.
    /// A listing failure is returned as is: pruning must not proceed on a partial inventory.
    pub async fn candidates(&self) -> Result<Vec<Snapshot>> {
        let created_before = match self.options.policy.daily_cutoff(self.options.now) {
            Cutoff::At(cutoff) => cutoff,
            Cutoff::Unbounded => {
                info!("Daily window covers every snapshot, nothing to prune");
                return Ok(Vec::new());
            }
        };

        let query = ListQuery {
            project: self.options.project.clone(),
            created_before,
            exclude: self.options.protect_label.clone(),
        };
        let mut snapshots = self.lister.list(&query).await.map_err(|e| {
            error!("Failed to list snapshots for {}: {}", query.project, e);
            e
        })?;

        let listed = snapshots.len();
        snapshots.retain(|snapshot| query.admits(snapshot));
        if snapshots.len() != listed {
            warn!(
                "Lister returned {} snapshots outside the candidate filter, ignoring them",
                listed - snapshots.len()
            );
        }
        snapshots.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)));
        Ok(snapshots)
    }

    pub fn classify_all(&self, candidates: &[Snapshot]) -> Vec<Verdict> {
        candidates
            .iter()
            .map(|snapshot| {
                let classification =
                    classify(&snapshot.created, self.options.now, &self.options.policy);
                if classification.is_keep() {
                    info!(
                        "Valid {} - keeping {} (created {})",
                        classification.reason(),
                        snapshot.id,
                        snapshot.created
                    );
                } else {
                    debug!("{}: {} (created {})", snapshot.id, classification, snapshot.created);
                }
                Verdict {
                    snapshot_id: snapshot.id.clone(),
                    created: snapshot.created,
                    classification,
                }
            })
            .collect()
    }

    pub async fn run(&self) -> Result<PruneReport> {
        let candidates = self.candidates().await?;
        let verdicts = self.classify_all(&candidates);

        let mut report = PruneReport {
            verdicts,
            dry_run: self.options.dry_run,
            ..PruneReport::default()
        };

        let expired: Vec<String> = report
            .verdicts
            .iter()
            .filter(|verdict| !verdict.classification.is_keep())
            .map(|verdict| verdict.snapshot_id.clone())
            .collect();

        if self.options.dry_run {
            info!("Dry run: {} snapshots would be deleted", expired.len());
            return Ok(report);
        }

        let (deleted, failures) = self.delete_all(expired).await;
        report.deleted = deleted;
        report.failures = failures;

        info!(
            "Pruned project {}: {} kept, {} deleted, {} failed",
            self.options.project,
            report.kept(),
            report.deleted.len(),
            report.failures.len()
        );
        Ok(report)
    }

    /// Deletes `ids` with at most `concurrency` requests in flight. Failures are collected,
    /// never propagated; results come back in the order of `ids`.
    async fn delete_all(&self, ids: Vec<String>) -> (Vec<String>, Vec<DeletionError>) {
        let project = self.options.project.as_str();
        let deleter = self.deleter.as_ref();

        let mut outcomes: Vec<(usize, String, Result<(), DeletionError>)> =
            stream::iter(ids.into_iter().enumerate())
                .map(|(position, id)| async move {
                    info!("Deleting {}", id);
                    let outcome = deleter.delete(project, &id).await;
                    (position, id, outcome)
                })
                .buffer_unordered(self.options.concurrency.max(1))
                .collect()
                .await;
        outcomes.sort_by_key(|(position, _, _)| *position);

        let mut deleted = Vec::new();
        let mut failures = Vec::new();
        for (_, id, outcome) in outcomes {
            match outcome {
                Ok(()) => deleted.push(id),
                Err(e) => {
                    error!("Failed to delete snapshot {}: {}", id, e);
                    failures.push(e);
                }
            }
        }
        (deleted, failures)
    }
}
