//! Recommendation lifecycle decisions
//!
//! Pure decision logic - NO IO, only state inspection. The reconciler
//! activity fetches tracking/job/batch snapshots and applies the decisions
//! returned here as bulk updates.
//!
//! Ground rules, in priority order:
//! - a decision may only move a recommendation toward a more accurate state;
//!   an item whose sync is genuinely in progress is left untouched
//! - `failed` requires an explicit failure signal from the tracking or its
//!   latest job
//! - every ambiguous combination resolves to `repair`, never to `created`
//!   or `failed`

use crate::domains::tracking::models::{
    Batch, QueueJob, QueueJobStatus, Tracking, TrackingStatus,
};

/// Outcome of inspecting one recommendation's linked state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleDecision {
    /// Linked state matches the recorded status; do nothing.
    Keep,
    /// External sync fully succeeded; promote `creating` to `created`.
    PromoteCreated,
    /// External sync explicitly failed.
    MarkFailed,
    /// Inconsistent, orphaned, or stalled; needs an operator re-trigger.
    /// Applying this always detaches the tracking reference.
    MarkRepair,
}

/// Verify a recommendation currently recorded as `created`.
///
/// `tracking` is None when the recommendation has no tracking reference or
/// the referenced row is gone; either way the claim of `created` is
/// unsupported.
pub fn verify_created(tracking: Option<&Tracking>) -> LifecycleDecision {
    match tracking {
        Some(t) if t.is_fully_synced() => LifecycleDecision::Keep,
        // Degraded after the fact: failed, regressed, or missing required
        // external identifiers.
        Some(_) => LifecycleDecision::MarkRepair,
        None => LifecycleDecision::MarkRepair,
    }
}

/// Verify a recommendation currently recorded as `creating` (in flight).
///
/// `latest_job` is the most recent queue job linked to the recommendation;
/// `batch` is that job's batch.
pub fn verify_creating(
    tracking: Option<&Tracking>,
    latest_job: Option<&QueueJob>,
    batch: Option<&Batch>,
) -> LifecycleDecision {
    let Some(tracking) = tracking else {
        // Orphaned: accepted but no tracking reference, or the tracking row
        // is gone.
        return LifecycleDecision::MarkRepair;
    };

    match tracking.status {
        TrackingStatus::Failed => LifecycleDecision::MarkFailed,
        TrackingStatus::Active => {
            if tracking.is_fully_synced() {
                LifecycleDecision::PromoteCreated
            } else {
                // Active but missing required external identifiers.
                LifecycleDecision::MarkRepair
            }
        }
        TrackingStatus::Pending | TrackingStatus::Creating => {
            verify_in_progress(latest_job, batch)
        }
    }
}

/// The tracking itself says "still in progress"; the job and batch decide
/// whether that is credible.
fn verify_in_progress(latest_job: Option<&QueueJob>, batch: Option<&Batch>) -> LifecycleDecision {
    let Some(job) = latest_job else {
        // Accepted but no job was ever queued for it.
        return LifecycleDecision::MarkRepair;
    };

    match job.status {
        QueueJobStatus::Failed => LifecycleDecision::MarkFailed,
        // The job finished but the tracking never went active: the two
        // records disagree.
        QueueJobStatus::Completed => LifecycleDecision::MarkRepair,
        QueueJobStatus::Queued | QueueJobStatus::Processing => match batch {
            // Batch terminated while this job never completed.
            Some(b) if b.status.is_terminal() => LifecycleDecision::MarkRepair,
            Some(_) => LifecycleDecision::Keep,
            None => LifecycleDecision::MarkRepair,
        },
    }
}
