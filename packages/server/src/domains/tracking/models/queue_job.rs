use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::{BatchId, QueueJobId, RecommendationId, TrackingId};

/// Queue job status, mutated only by the sync worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "queue_job_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QueueJobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl QueueJobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, QueueJobStatus::Completed | QueueJobStatus::Failed)
    }
}

impl std::fmt::Display for QueueJobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueJobStatus::Queued => write!(f, "queued"),
            QueueJobStatus::Processing => write!(f, "processing"),
            QueueJobStatus::Completed => write!(f, "completed"),
            QueueJobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// QueueJob - one unit of async sync work: push one tracking to the
/// customer's external platforms.
///
/// Created by bulk-accept; claimed and resolved by the out-of-process sync
/// worker; read by the reconciler to infer recommendation health.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QueueJob {
    pub id: QueueJobId,
    pub batch_id: BatchId,
    pub tracking_id: TrackingId,
    pub recommendation_id: RecommendationId,
    pub status: QueueJobStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// SQL Queries - ALL queries must be in models/
// =============================================================================

impl QueueJob {
    /// Insert one job per tracking for a bulk-accept call, in a single
    /// set-oriented statement inside the accept transaction.
    pub async fn bulk_insert(
        batch_id: BatchId,
        rows: &[(TrackingId, RecommendationId)],
        conn: &mut sqlx::PgConnection,
    ) -> Result<Vec<Self>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids: Vec<QueueJobId> = Vec::with_capacity(rows.len());
        let mut tracking_ids: Vec<TrackingId> = Vec::with_capacity(rows.len());
        let mut recommendation_ids: Vec<RecommendationId> = Vec::with_capacity(rows.len());

        for (tracking_id, recommendation_id) in rows {
            ids.push(QueueJobId::new());
            tracking_ids.push(*tracking_id);
            recommendation_ids.push(*recommendation_id);
        }

        let jobs = sqlx::query_as::<_, QueueJob>(
            r#"
            INSERT INTO queue_jobs (id, batch_id, tracking_id, recommendation_id, status)
            SELECT t.id, $1, t.tracking_id, t.recommendation_id, 'queued'
            FROM UNNEST($2::uuid[], $3::uuid[], $4::uuid[])
                AS t(id, tracking_id, recommendation_id)
            RETURNING *
            "#,
        )
        .bind(batch_id)
        .bind(&ids)
        .bind(&tracking_ids)
        .bind(&recommendation_ids)
        .fetch_all(&mut *conn)
        .await?;
        Ok(jobs)
    }

    /// Claim up to `limit` queued jobs for the sync worker.
    ///
    /// `FOR UPDATE SKIP LOCKED` keeps concurrent workers from claiming the
    /// same rows.
    pub async fn claim_batch(limit: i64, pool: &PgPool) -> Result<Vec<Self>> {
        let jobs = sqlx::query_as::<_, QueueJob>(
            r#"
            UPDATE queue_jobs
            SET status = 'processing', updated_at = NOW()
            WHERE id IN (
                SELECT id FROM queue_jobs
                WHERE status = 'queued'
                ORDER BY created_at
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING *
            "#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(jobs)
    }

    /// Mark a job as successfully completed (sync worker)
    pub async fn mark_completed(id: QueueJobId, pool: &PgPool) -> Result<Self> {
        let job = sqlx::query_as::<_, QueueJob>(
            r#"
            UPDATE queue_jobs
            SET status = 'completed', updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await?;
        Ok(job)
    }

    /// Mark a job as permanently failed (sync worker)
    pub async fn mark_failed(id: QueueJobId, error: String, pool: &PgPool) -> Result<Self> {
        let job = sqlx::query_as::<_, QueueJob>(
            r#"
            UPDATE queue_jobs
            SET status = 'failed', error_message = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(error)
        .fetch_one(pool)
        .await?;
        Ok(job)
    }

    /// Latest job per recommendation, for the reconciler's in-flight pass.
    ///
    /// A recommendation re-accepted after a failure has several jobs; only
    /// the most recent one reflects current sync state. IDs are v7, so id
    /// order breaks created_at ties.
    pub async fn find_latest_for_recommendations(
        recommendation_ids: &[RecommendationId],
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        if recommendation_ids.is_empty() {
            return Ok(Vec::new());
        }
        let jobs = sqlx::query_as::<_, QueueJob>(
            r#"
            SELECT DISTINCT ON (recommendation_id) *
            FROM queue_jobs
            WHERE recommendation_id = ANY($1)
            ORDER BY recommendation_id, created_at DESC, id DESC
            "#,
        )
        .bind(recommendation_ids)
        .fetch_all(pool)
        .await?;
        Ok(jobs)
    }
}
