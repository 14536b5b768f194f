//! Lifecycle reconciliation
//!
//! Read-time self-healing: every listing of a scan's recommendations runs
//! this pass, so recorded status converges on the truth held by the linked
//! tracking/job/batch rows without any event plumbing. Idempotent and cheap
//! to run repeatedly; it never deletes data.

use std::collections::HashMap;

use anyhow::Result;
use tracing::info;

use crate::common::{BatchId, RecommendationId, ScanId, TrackingId};
use crate::domains::recommendation::machines::{self, LifecycleDecision};
use crate::domains::recommendation::models::{Recommendation, RecommendationStatus};
use crate::domains::tracking::models::{Batch, QueueJob, Tracking};
use crate::kernel::ServerDeps;

/// How many recommendations each pass moved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub promoted: usize,
    pub failed: usize,
    pub repaired: usize,
}

impl ReconcileSummary {
    pub fn changed(&self) -> usize {
        self.promoted + self.failed + self.repaired
    }
}

/// Reconcile all of a scan's in-lifecycle recommendations against their
/// linked tracking/job/batch state.
///
/// May race the sync worker; decisions only ever move a recommendation
/// toward a more accurate state, so a stale read at worst leaves an item
/// for the next pass.
pub async fn reconcile_scan_recommendations(
    scan_id: ScanId,
    deps: &ServerDeps,
) -> Result<ReconcileSummary> {
    let pool = deps.db_pool();

    let recommendations = Recommendation::find_in_lifecycle(scan_id, pool).await?;
    if recommendations.is_empty() {
        return Ok(ReconcileSummary::default());
    }

    // Snapshot linked state, one set-oriented query per entity.
    let tracking_ids: Vec<TrackingId> = recommendations
        .iter()
        .filter_map(|r| r.tracking_id)
        .collect();
    let trackings: HashMap<TrackingId, Tracking> = Tracking::find_by_ids(&tracking_ids, pool)
        .await?
        .into_iter()
        .map(|t| (t.id, t))
        .collect();

    let in_flight_ids: Vec<RecommendationId> = recommendations
        .iter()
        .filter(|r| r.status == RecommendationStatus::Creating)
        .map(|r| r.id)
        .collect();
    let latest_jobs: HashMap<RecommendationId, QueueJob> =
        QueueJob::find_latest_for_recommendations(&in_flight_ids, pool)
            .await?
            .into_iter()
            .map(|j| (j.recommendation_id, j))
            .collect();

    let batch_ids: Vec<BatchId> = latest_jobs.values().map(|j| j.batch_id).collect();
    let batches: HashMap<BatchId, Batch> = Batch::find_by_ids(&batch_ids, pool)
        .await?
        .into_iter()
        .map(|b| (b.id, b))
        .collect();

    // Pure decisions, grouped by target status.
    let mut to_created: Vec<RecommendationId> = Vec::new();
    let mut to_failed: Vec<RecommendationId> = Vec::new();
    let mut to_repair: Vec<RecommendationId> = Vec::new();

    for rec in &recommendations {
        let tracking = rec.tracking_id.and_then(|id| trackings.get(&id));

        let decision = match rec.status {
            RecommendationStatus::Created => machines::verify_created(tracking),
            RecommendationStatus::Creating => {
                let job = latest_jobs.get(&rec.id);
                let batch = job.and_then(|j| batches.get(&j.batch_id));
                machines::verify_creating(tracking, job, batch)
            }
            // find_in_lifecycle only returns created/creating
            _ => LifecycleDecision::Keep,
        };

        match decision {
            LifecycleDecision::Keep => {}
            LifecycleDecision::PromoteCreated => to_created.push(rec.id),
            LifecycleDecision::MarkFailed => to_failed.push(rec.id),
            LifecycleDecision::MarkRepair => to_repair.push(rec.id),
        }
    }

    let summary = ReconcileSummary {
        promoted: to_created.len(),
        failed: to_failed.len(),
        repaired: to_repair.len(),
    };
    if summary.changed() == 0 {
        return Ok(summary);
    }

    // One bulk update per target status, in one transaction.
    let mut tx = pool.begin().await?;
    Recommendation::bulk_mark_status(&to_created, RecommendationStatus::Created, &mut *tx).await?;
    Recommendation::bulk_mark_status(&to_failed, RecommendationStatus::Failed, &mut *tx).await?;
    Recommendation::bulk_mark_repair(&to_repair, &mut *tx).await?;
    tx.commit().await?;

    info!(
        scan_id = %scan_id,
        promoted = summary.promoted,
        failed = summary.failed,
        repaired = summary.repaired,
        "Recommendation lifecycle reconciled"
    );

    Ok(summary)
}
