use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::{BatchId, CustomerId, ScanId};

/// Batch lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "batch_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    Processing,
    Completed,
    Cancelled,
}

impl BatchStatus {
    /// Terminal batches accept no further job work; the reconciler reads a
    /// terminal batch with unfinished jobs as "stop waiting".
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchStatus::Completed | BatchStatus::Cancelled)
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchStatus::Pending => write!(f, "pending"),
            BatchStatus::Processing => write!(f, "processing"),
            BatchStatus::Completed => write!(f, "completed"),
            BatchStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Batch - the unit of work grouping the trackings created from one
/// bulk-accept call.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Batch {
    pub id: BatchId,
    pub customer_id: CustomerId,
    pub scan_id: ScanId,
    pub status: BatchStatus,
    pub total_jobs: i32,
    pub completed_jobs: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// SQL Queries - ALL queries must be in models/
// =============================================================================

impl Batch {
    /// Insert the batch row for a bulk-accept call.
    ///
    /// Runs inside the accept transaction.
    pub async fn create(
        customer_id: CustomerId,
        scan_id: ScanId,
        total_jobs: i32,
        conn: &mut sqlx::PgConnection,
    ) -> Result<Self> {
        let batch = sqlx::query_as::<_, Batch>(
            r#"
            INSERT INTO tracking_batches (id, customer_id, scan_id, status, total_jobs)
            VALUES ($1, $2, $3, 'pending', $4)
            RETURNING *
            "#,
        )
        .bind(BatchId::new())
        .bind(customer_id)
        .bind(scan_id)
        .bind(total_jobs)
        .fetch_one(&mut *conn)
        .await?;
        Ok(batch)
    }

    /// Find batch by ID
    pub async fn find_by_id(id: BatchId, pool: &PgPool) -> Result<Option<Self>> {
        let batch = sqlx::query_as::<_, Batch>("SELECT * FROM tracking_batches WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(batch)
    }

    /// Fetch a set of batches in one statement
    pub async fn find_by_ids(ids: &[BatchId], pool: &PgPool) -> Result<Vec<Self>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let batches =
            sqlx::query_as::<_, Batch>("SELECT * FROM tracking_batches WHERE id = ANY($1)")
                .bind(ids)
                .fetch_all(pool)
                .await?;
        Ok(batches)
    }

    /// Mark the batch as picked up by the sync worker
    pub async fn mark_processing(id: BatchId, pool: &PgPool) -> Result<Self> {
        let batch = sqlx::query_as::<_, Batch>(
            r#"
            UPDATE tracking_batches
            SET status = 'processing', updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await?;
        Ok(batch)
    }

    /// Cancel a batch that has not yet terminated.
    ///
    /// Returns false when the batch was already terminal. In-flight external
    /// syncs are not interrupted; the reconciler marks their
    /// recommendations for repair on the next read.
    pub async fn cancel(id: BatchId, pool: &PgPool) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE tracking_batches
            SET status = 'cancelled', updated_at = NOW()
            WHERE id = $1 AND status IN ('pending', 'processing')
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Job completion accounting, invoked by the sync worker after each job
    /// terminates. Closes the batch when the last job reports in.
    pub async fn record_job_completion(id: BatchId, pool: &PgPool) -> Result<Self> {
        let batch = sqlx::query_as::<_, Batch>(
            r#"
            UPDATE tracking_batches
            SET
                completed_jobs = completed_jobs + 1,
                status = CASE
                    WHEN completed_jobs + 1 >= total_jobs AND status <> 'cancelled'
                        THEN 'completed'::batch_status
                    ELSE status
                END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await?;
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(!BatchStatus::Pending.is_terminal());
        assert!(!BatchStatus::Processing.is_terminal());
        assert!(BatchStatus::Completed.is_terminal());
        assert!(BatchStatus::Cancelled.is_terminal());
    }
}
