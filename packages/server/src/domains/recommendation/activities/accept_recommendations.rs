//! Bulk-accept: convert selected recommendations into trackings + sync jobs
//!
//! The whole accept is one short transaction built from set-oriented
//! statements, so its duration does not grow with the selection size.
//! External platform calls never happen here; the request context may be
//! torn down as soon as the response is sent, so sync work is queued for
//! the out-of-process worker instead.

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::common::{BatchId, CustomerId, RecommendationId, ScanId, TrackingId};
use crate::domains::customer::models::Customer;
use crate::domains::recommendation::models::{Recommendation, RecommendationStatus};
use crate::domains::scan::models::Scan;
use crate::domains::tracking::models::{
    Batch, DestinationChoice, NewTracking, QueueJob, Tracking, TrackingType,
};
use crate::kernel::ServerDeps;

#[derive(Error, Debug)]
pub enum AcceptError {
    #[error("Customer not found")]
    CustomerNotFound,

    #[error("No external account connected; connect Google Tag Manager first")]
    ExternalAccountNotConnected,

    #[error("Scan not found")]
    ScanNotFound,

    #[error("No recommendations selected")]
    NoRecommendationsSelected,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Why one selected recommendation was left out of the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "detail")]
pub enum SkipReason {
    /// Not found, or belongs to a different scan.
    UnknownRecommendation,
    /// Sync already in flight for this recommendation.
    IneligibleStatus(RecommendationStatus),
    /// The crawler's tracking-type string maps to no known tracking type.
    UnmappedTrackingType(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedRecommendation {
    pub recommendation_id: RecommendationId,
    pub reason: SkipReason,
}

/// What the accept call did: the batch it opened (None when every item was
/// skipped), the trackings it created, and the per-item skips.
#[derive(Debug, Clone, Serialize)]
pub struct AcceptOutcome {
    pub batch_id: Option<BatchId>,
    pub tracking_ids: Vec<TrackingId>,
    pub queued: usize,
    pub skipped: Vec<SkippedRecommendation>,
}

/// An accepted candidate with its resolved tracking type.
struct AcceptedCandidate {
    recommendation: Recommendation,
    tracking_type: TrackingType,
}

/// Accept a set of recommendations for a scan and queue their external sync.
pub async fn accept_recommendations(
    customer_id: CustomerId,
    scan_id: ScanId,
    recommendation_ids: &[RecommendationId],
    destination: DestinationChoice,
    deps: &ServerDeps,
) -> Result<AcceptOutcome, AcceptError> {
    let pool = deps.db_pool();

    if recommendation_ids.is_empty() {
        return Err(AcceptError::NoRecommendationsSelected);
    }

    // Preconditions, all checked before any write.
    let customer = Customer::find_by_id(customer_id, pool)
        .await?
        .ok_or(AcceptError::CustomerNotFound)?;
    if !customer.has_connected_account() {
        return Err(AcceptError::ExternalAccountNotConnected);
    }

    let scan = Scan::find_for_customer(scan_id, customer_id, pool)
        .await?
        .ok_or(AcceptError::ScanNotFound)?;

    let found = Recommendation::find_by_ids_for_scan(recommendation_ids, scan_id, pool).await?;
    let (accepted, skipped) = partition_candidates(recommendation_ids, found);

    if accepted.is_empty() {
        return Ok(AcceptOutcome {
            batch_id: None,
            tracking_ids: Vec::new(),
            queued: 0,
            skipped,
        });
    }

    let new_trackings: Vec<NewTracking> = accepted
        .iter()
        .map(|candidate| build_tracking(candidate))
        .collect();
    let destinations = destination.destinations();

    // One short transaction: batch, trackings, jobs, status flips.
    let mut tx = pool.begin().await?;

    let batch = Batch::create(customer_id, scan.id, accepted.len() as i32, &mut *tx).await?;

    let trackings =
        Tracking::bulk_insert(customer_id, scan.id, &destinations, &new_trackings, &mut *tx)
            .await?;

    let job_rows: Vec<(TrackingId, RecommendationId)> = accepted
        .iter()
        .zip(&new_trackings)
        .map(|(candidate, tracking)| (tracking.id, candidate.recommendation.id))
        .collect();
    let jobs = QueueJob::bulk_insert(batch.id, &job_rows, &mut *tx).await?;

    let creating_pairs: Vec<(RecommendationId, TrackingId)> = job_rows
        .iter()
        .map(|(tracking_id, recommendation_id)| (*recommendation_id, *tracking_id))
        .collect();
    Recommendation::bulk_mark_creating(&creating_pairs, &mut *tx).await?;

    tx.commit().await?;

    info!(
        customer_id = %customer_id,
        scan_id = %scan_id,
        batch_id = %batch.id,
        queued = jobs.len(),
        skipped = skipped.len(),
        "Recommendations accepted and sync queued"
    );

    Ok(AcceptOutcome {
        batch_id: Some(batch.id),
        tracking_ids: trackings.iter().map(|t| t.id).collect(),
        queued: jobs.len(),
        skipped,
    })
}

/// Split the requested ids into accepted candidates and reported skips.
fn partition_candidates(
    requested: &[RecommendationId],
    found: Vec<Recommendation>,
) -> (Vec<AcceptedCandidate>, Vec<SkippedRecommendation>) {
    let mut accepted = Vec::new();
    let mut skipped = Vec::new();

    let found_ids: std::collections::HashSet<RecommendationId> =
        found.iter().map(|r| r.id).collect();
    for id in requested {
        if !found_ids.contains(id) {
            skipped.push(SkippedRecommendation {
                recommendation_id: *id,
                reason: SkipReason::UnknownRecommendation,
            });
        }
    }

    for recommendation in found {
        if !recommendation.status.is_accept_eligible() {
            skipped.push(SkippedRecommendation {
                recommendation_id: recommendation.id,
                reason: SkipReason::IneligibleStatus(recommendation.status),
            });
            continue;
        }
        match recommendation.tracking_type.parse::<TrackingType>() {
            Ok(tracking_type) => accepted.push(AcceptedCandidate {
                recommendation,
                tracking_type,
            }),
            Err(_) => skipped.push(SkippedRecommendation {
                recommendation_id: recommendation.id,
                reason: SkipReason::UnmappedTrackingType(recommendation.tracking_type.clone()),
            }),
        }
    }

    (accepted, skipped)
}

/// Build the tracking row an accepted recommendation turns into.
fn build_tracking(candidate: &AcceptedCandidate) -> NewTracking {
    let rec = &candidate.recommendation;
    NewTracking {
        id: TrackingId::new(),
        name: rec.name.clone(),
        tracking_type: candidate.tracking_type,
        selector_config: serde_json::json!({
            "selector": rec.suggested_selector,
            "confidence": rec.selector_confidence,
            "page_url": rec.page_url,
        }),
        event_name: rec
            .suggested_event_name
            .clone()
            .unwrap_or_else(|| candidate.tracking_type.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::recommendation::models::Severity;
    use chrono::Utc;

    fn recommendation(
        status: RecommendationStatus,
        tracking_type: &str,
    ) -> Recommendation {
        Recommendation {
            id: RecommendationId::new(),
            scan_id: ScanId::new(),
            page_url: Some("https://shop.test/pricing".to_string()),
            name: "Track pricing CTA".to_string(),
            tracking_type: tracking_type.to_string(),
            severity: Severity::Important,
            suggested_destinations: vec!["gtm".to_string()],
            suggested_event_name: None,
            suggested_selector: Some(".cta".to_string()),
            selector_confidence: Some(0.9),
            status,
            tracking_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_partition_accepts_retriggerable_statuses() {
        let recs = vec![
            recommendation(RecommendationStatus::Pending, "button_click"),
            recommendation(RecommendationStatus::Repair, "button_click"),
            recommendation(RecommendationStatus::Failed, "button_click"),
            recommendation(RecommendationStatus::Created, "button_click"),
        ];
        let ids: Vec<RecommendationId> = recs.iter().map(|r| r.id).collect();

        let (accepted, skipped) = partition_candidates(&ids, recs);
        assert_eq!(accepted.len(), 4);
        assert!(skipped.is_empty());
    }

    #[test]
    fn test_partition_skips_in_flight_items() {
        let rec = recommendation(RecommendationStatus::Creating, "button_click");
        let id = rec.id;

        let (accepted, skipped) = partition_candidates(&[id], vec![rec]);
        assert!(accepted.is_empty());
        assert_eq!(skipped.len(), 1);
        assert_eq!(
            skipped[0].reason,
            SkipReason::IneligibleStatus(RecommendationStatus::Creating)
        );
    }

    #[test]
    fn test_partition_skips_unmapped_tracking_types() {
        let rec = recommendation(RecommendationStatus::Pending, "hologram_wave");
        let id = rec.id;

        let (accepted, skipped) = partition_candidates(&[id], vec![rec]);
        assert!(accepted.is_empty());
        assert_eq!(
            skipped[0].reason,
            SkipReason::UnmappedTrackingType("hologram_wave".to_string())
        );
    }

    #[test]
    fn test_partition_reports_unknown_ids() {
        let rec = recommendation(RecommendationStatus::Pending, "button_click");
        let known = rec.id;
        let unknown = RecommendationId::new();

        let (accepted, skipped) = partition_candidates(&[known, unknown], vec![rec]);
        assert_eq!(accepted.len(), 1);
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].recommendation_id, unknown);
        assert_eq!(skipped[0].reason, SkipReason::UnknownRecommendation);
    }

    #[test]
    fn test_built_tracking_inherits_recommendation_config() {
        let rec = recommendation(RecommendationStatus::Pending, "form_submit");
        let (accepted, _) = partition_candidates(&[rec.id], vec![rec]);
        let tracking = build_tracking(&accepted[0]);

        assert_eq!(tracking.tracking_type, TrackingType::FormSubmit);
        assert_eq!(tracking.name, "Track pricing CTA");
        // No suggested event name -> falls back to the tracking type
        assert_eq!(tracking.event_name, "form_submit");
        assert_eq!(tracking.selector_config["selector"], ".cta");
    }
}
