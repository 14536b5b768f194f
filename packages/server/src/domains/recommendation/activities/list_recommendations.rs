//! Recommendation listing
//!
//! The read path that keeps the lifecycle honest: every list runs the
//! reconciler first, so operators always see statuses derived from actual
//! tracking/job state.

use thiserror::Error;
use tracing::warn;

use crate::common::{CustomerId, ScanId};
use crate::domains::recommendation::activities::reconcile::reconcile_scan_recommendations;
use crate::domains::recommendation::models::{Recommendation, RecommendationFilters};
use crate::domains::scan::models::Scan;
use crate::kernel::ServerDeps;

#[derive(Error, Debug)]
pub enum ListError {
    #[error("Scan not found")]
    ScanNotFound,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// List a scan's recommendations with optional filters, reconciling
/// lifecycle state first.
pub async fn list_recommendations(
    customer_id: CustomerId,
    scan_id: ScanId,
    filters: &RecommendationFilters,
    deps: &ServerDeps,
) -> Result<Vec<Recommendation>, ListError> {
    let pool = deps.db_pool();

    let scan = Scan::find_for_customer(scan_id, customer_id, pool)
        .await?
        .ok_or(ListError::ScanNotFound)?;

    // Best-effort: a reconciliation failure must not break the read. Items
    // it could not settle stay as-is and get another chance next read.
    if let Err(error) = reconcile_scan_recommendations(scan.id, deps).await {
        warn!(scan_id = %scan_id, error = %error, "Reconciliation failed; listing unreconciled state");
    }

    let recommendations = Recommendation::list_filtered(scan_id, filters, pool).await?;
    Ok(recommendations)
}
