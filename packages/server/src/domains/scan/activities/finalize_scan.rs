//! Scan finalization
//!
//! Invoked once per scan after all crawl/analysis chunks are done. Runs the
//! scoring engine and is the only place a scan goes terminal.

use thiserror::Error;
use tracing::info;

use crate::common::ScanId;
use crate::domains::recommendation::models::Recommendation;
use crate::domains::scan::models::{Page, Scan, ScanStatus};
use crate::domains::scan::scoring;
use crate::kernel::ServerDeps;

#[derive(Error, Debug)]
pub enum FinalizeError {
    #[error("Scan not found")]
    ScanNotFound,

    #[error("Scan cannot be finalized from status '{actual}'")]
    ScanStateConflict { actual: ScanStatus },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Finalize a scan: score it, persist page importances and the readiness
/// summary, and mark it completed.
///
/// Precondition: the scan is in an analyzable state (`processing`, or
/// `analyzing` when a previous finalization attempt died mid-way).
pub async fn finalize_scan(scan_id: ScanId, deps: &ServerDeps) -> Result<Scan, FinalizeError> {
    let pool = deps.db_pool();

    let scan = Scan::find_by_id(scan_id, pool)
        .await?
        .ok_or(FinalizeError::ScanNotFound)?;

    if !scan.status.can_finalize() {
        return Err(FinalizeError::ScanStateConflict {
            actual: scan.status,
        });
    }

    // Guarded flip into the analyzing marker; a miss means another
    // finalization (or an upstream step) won the race.
    if !Scan::begin_analysis(scan_id, pool).await? {
        let actual = Scan::find_by_id(scan_id, pool)
            .await?
            .ok_or(FinalizeError::ScanNotFound)?
            .status;
        return Err(FinalizeError::ScanStateConflict { actual });
    }

    let pages = Page::find_for_scan(scan_id, pool).await?;
    let recommendations = Recommendation::find_for_scan(scan_id, pool).await?;
    let total = recommendations.len();

    let score = scoring::score_scan(&pages, &recommendations);

    // Persist the outcome atomically: page importances and the scan summary
    // either both land or neither does.
    let mut tx = pool.begin().await?;

    Page::bulk_update_importance(&score.page_scores, &mut *tx).await?;

    let completed = Scan::complete(
        scan_id,
        score.readiness_score,
        score.narrative,
        score.severity_counts,
        total as i32,
        &mut *tx,
    )
    .await?;

    let Some(completed) = completed else {
        // The analyzing guard moved under us between the flip and the write.
        tx.rollback().await?;
        let actual = Scan::find_by_id(scan_id, pool)
            .await?
            .ok_or(FinalizeError::ScanNotFound)?
            .status;
        return Err(FinalizeError::ScanStateConflict { actual });
    };

    tx.commit().await?;

    info!(
        scan_id = %scan_id,
        readiness_score = completed.readiness_score,
        total_recommendations = completed.total_recommendations,
        pages_scored = score.page_scores.len(),
        "Scan finalized"
    );

    Ok(completed)
}
