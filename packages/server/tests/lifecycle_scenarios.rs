//! End-to-end lifecycle scenarios through the public decision layer.
//!
//! These drive the same decision functions the reconciler applies after a
//! bulk-accept, simulating the sync worker's mutations on the linked
//! tracking/job/batch rows.

use chrono::Utc;
use sqlx::types::Json;

use server_core::common::{BatchId, CustomerId, QueueJobId, RecommendationId, ScanId, TrackingId};
use server_core::domains::recommendation::machines::{
    verify_created, verify_creating, LifecycleDecision,
};
use server_core::domains::tracking::models::{
    Batch, BatchStatus, DestinationChoice, QueueJob, QueueJobStatus, Tracking, TrackingStatus,
    TrackingType,
};

struct SyncedScenario {
    tracking: Tracking,
    job: QueueJob,
    batch: Batch,
}

fn scenario(
    destination: DestinationChoice,
    tracking_status: TrackingStatus,
    job_status: QueueJobStatus,
    batch_status: BatchStatus,
) -> SyncedScenario {
    let customer_id = CustomerId::new();
    let scan_id = ScanId::new();
    let tracking_id = TrackingId::new();
    let batch_id = BatchId::new();

    SyncedScenario {
        tracking: Tracking {
            id: tracking_id,
            customer_id,
            scan_id: Some(scan_id),
            name: "Track demo form".to_string(),
            tracking_type: TrackingType::FormSubmit,
            selector_config: Json(serde_json::json!({"selector": "#demo"})),
            destinations: destination.destinations(),
            event_name: "generate_lead".to_string(),
            status: tracking_status,
            gtm_tag_id: None,
            gtm_trigger_id: None,
            ads_conversion_id: None,
            ads_conversion_label: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        },
        job: QueueJob {
            id: QueueJobId::new(),
            batch_id,
            tracking_id,
            recommendation_id: RecommendationId::new(),
            status: job_status,
            error_message: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        },
        batch: Batch {
            id: batch_id,
            customer_id,
            scan_id,
            status: batch_status,
            total_jobs: 3,
            completed_jobs: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        },
    }
}

fn decide(s: &SyncedScenario) -> LifecycleDecision {
    verify_creating(Some(&s.tracking), Some(&s.job), Some(&s.batch))
}

/// Accept three recommendations to both platforms, then the worker leaves
/// one fully synced, one missing the ads label, and one failed. The next
/// reconciliation pass settles them into created / repair / failed.
#[test]
fn three_way_outcome_after_worker_pass() {
    // Tracking 1: active with complete GTM + Ads identifiers
    let mut complete = scenario(
        DestinationChoice::Both,
        TrackingStatus::Active,
        QueueJobStatus::Completed,
        BatchStatus::Completed,
    );
    complete.tracking.gtm_tag_id = Some("tag-1".into());
    complete.tracking.gtm_trigger_id = Some("trigger-1".into());
    complete.tracking.ads_conversion_id = Some("AW-111".into());
    complete.tracking.ads_conversion_label = Some("lblAAA".into());

    // Tracking 2: active but the ads conversion label never arrived
    let mut incomplete = scenario(
        DestinationChoice::Both,
        TrackingStatus::Active,
        QueueJobStatus::Completed,
        BatchStatus::Completed,
    );
    incomplete.tracking.gtm_tag_id = Some("tag-2".into());
    incomplete.tracking.gtm_trigger_id = Some("trigger-2".into());
    incomplete.tracking.ads_conversion_id = Some("AW-222".into());

    // Tracking 3: the external sync failed outright
    let mut failed = scenario(
        DestinationChoice::Both,
        TrackingStatus::Failed,
        QueueJobStatus::Failed,
        BatchStatus::Completed,
    );
    failed.job.error_message = Some("GTM API rejected the tag".into());

    assert_eq!(decide(&complete), LifecycleDecision::PromoteCreated);
    assert_eq!(decide(&incomplete), LifecycleDecision::MarkRepair);
    assert_eq!(decide(&failed), LifecycleDecision::MarkFailed);
}

/// Once promoted, a fully synced recommendation stays put; the same pass
/// run again changes nothing.
#[test]
fn reconciliation_is_idempotent_without_external_change() {
    let mut s = scenario(
        DestinationChoice::Gtm,
        TrackingStatus::Active,
        QueueJobStatus::Completed,
        BatchStatus::Completed,
    );
    s.tracking.gtm_tag_id = Some("tag-1".into());
    s.tracking.gtm_trigger_id = Some("trigger-1".into());

    // First pass promotes
    assert_eq!(decide(&s), LifecycleDecision::PromoteCreated);
    // Recommendation is now created; pass 1 keeps it there
    assert_eq!(verify_created(Some(&s.tracking)), LifecycleDecision::Keep);
    // And a re-run of pass 1 still keeps it
    assert_eq!(verify_created(Some(&s.tracking)), LifecycleDecision::Keep);
}

/// A recommendation whose sync is genuinely still running is never
/// regressed while its batch is live.
#[test]
fn in_progress_work_is_left_alone() {
    for tracking_status in [TrackingStatus::Pending, TrackingStatus::Creating] {
        for job_status in [QueueJobStatus::Queued, QueueJobStatus::Processing] {
            for batch_status in [BatchStatus::Pending, BatchStatus::Processing] {
                let s = scenario(
                    DestinationChoice::Gtm,
                    tracking_status,
                    job_status,
                    batch_status,
                );
                assert_eq!(decide(&s), LifecycleDecision::Keep);
            }
        }
    }
}

/// Cancelling the batch stops the wait: still-queued jobs resolve to
/// repair on the next read, never to failed.
#[test]
fn cancelled_batch_marks_pending_work_for_repair() {
    let s = scenario(
        DestinationChoice::Gtm,
        TrackingStatus::Pending,
        QueueJobStatus::Queued,
        BatchStatus::Cancelled,
    );
    assert_eq!(decide(&s), LifecycleDecision::MarkRepair);
}

/// A previously synced tracking that degrades (worker reset it, or an
/// identifier disappeared) pulls its recommendation back to repair.
#[test]
fn degraded_tracking_reopens_created_recommendation() {
    let mut s = scenario(
        DestinationChoice::Gtm,
        TrackingStatus::Active,
        QueueJobStatus::Completed,
        BatchStatus::Completed,
    );
    s.tracking.gtm_tag_id = Some("tag-1".into());
    s.tracking.gtm_trigger_id = Some("trigger-1".into());
    assert_eq!(verify_created(Some(&s.tracking)), LifecycleDecision::Keep);

    s.tracking.status = TrackingStatus::Failed;
    assert_eq!(
        verify_created(Some(&s.tracking)),
        LifecycleDecision::MarkRepair
    );

    s.tracking.status = TrackingStatus::Active;
    s.tracking.gtm_trigger_id = None;
    assert_eq!(
        verify_created(Some(&s.tracking)),
        LifecycleDecision::MarkRepair
    );
}

/// A tracking row that vanished entirely (or was never attached) is an
/// orphan in both passes.
#[test]
fn missing_tracking_is_always_repair() {
    assert_eq!(verify_created(None), LifecycleDecision::MarkRepair);
    assert_eq!(
        verify_creating(None, None, None),
        LifecycleDecision::MarkRepair
    );
}
