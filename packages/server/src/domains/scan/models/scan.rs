use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::common::{CustomerId, ScanId};

/// Scan status lifecycle.
///
/// The crawler moves a scan through `pending -> crawling -> processing`;
/// finalization owns `processing -> analyzing -> completed`. A scan is
/// immutable once `completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "scan_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    Pending,
    Crawling,
    Processing,
    Analyzing,
    Completed,
    Failed,
}

impl ScanStatus {
    /// States from which finalization may start.
    pub fn can_finalize(&self) -> bool {
        matches!(self, ScanStatus::Processing | ScanStatus::Analyzing)
    }
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanStatus::Pending => write!(f, "pending"),
            ScanStatus::Crawling => write!(f, "crawling"),
            ScanStatus::Processing => write!(f, "processing"),
            ScanStatus::Analyzing => write!(f, "analyzing"),
            ScanStatus::Completed => write!(f, "completed"),
            ScanStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for ScanStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(ScanStatus::Pending),
            "crawling" => Ok(ScanStatus::Crawling),
            "processing" => Ok(ScanStatus::Processing),
            "analyzing" => Ok(ScanStatus::Analyzing),
            "completed" => Ok(ScanStatus::Completed),
            "failed" => Ok(ScanStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid scan status: {}", s)),
        }
    }
}

/// Recommendation counts per severity bucket, persisted on the scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    #[serde(default)]
    pub critical: u32,
    #[serde(default)]
    pub important: u32,
    #[serde(default)]
    pub recommended: u32,
    #[serde(default)]
    pub optional: u32,
}

/// Scan - one crawl-and-analyze run for a customer's site.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Scan {
    pub id: ScanId,
    pub customer_id: CustomerId,
    pub site_url: String,
    pub status: ScanStatus,

    // Populated by finalization
    pub total_recommendations: i32,
    pub readiness_score: i32,
    pub readiness_narrative: Option<String>,
    pub severity_counts: Json<SeverityCounts>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

// =============================================================================
// SQL Queries - ALL queries must be in models/
// =============================================================================

impl Scan {
    /// Create a new scan (crawler boundary; starts as pending)
    pub async fn create(customer_id: CustomerId, site_url: String, pool: &PgPool) -> Result<Self> {
        let scan = sqlx::query_as::<_, Scan>(
            r#"
            INSERT INTO scans (id, customer_id, site_url, status)
            VALUES ($1, $2, $3, 'pending')
            RETURNING *
            "#,
        )
        .bind(ScanId::new())
        .bind(customer_id)
        .bind(site_url)
        .fetch_one(pool)
        .await?;
        Ok(scan)
    }

    /// Find scan by ID
    pub async fn find_by_id(id: ScanId, pool: &PgPool) -> Result<Option<Self>> {
        let scan = sqlx::query_as::<_, Scan>("SELECT * FROM scans WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(scan)
    }

    /// Find scan by ID scoped to its owning customer
    pub async fn find_for_customer(
        id: ScanId,
        customer_id: CustomerId,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        let scan =
            sqlx::query_as::<_, Scan>("SELECT * FROM scans WHERE id = $1 AND customer_id = $2")
                .bind(id)
                .bind(customer_id)
                .fetch_optional(pool)
                .await?;
        Ok(scan)
    }

    /// Mark scan as crawling (crawler boundary)
    pub async fn mark_crawling(id: ScanId, pool: &PgPool) -> Result<Self> {
        let scan = sqlx::query_as::<_, Scan>(
            r#"
            UPDATE scans
            SET status = 'crawling', updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await?;
        Ok(scan)
    }

    /// Mark scan as processing (crawler boundary; crawl done, analysis pending)
    pub async fn mark_processing(id: ScanId, pool: &PgPool) -> Result<Self> {
        let scan = sqlx::query_as::<_, Scan>(
            r#"
            UPDATE scans
            SET status = 'processing', updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await?;
        Ok(scan)
    }

    /// Mark scan as failed (crawler boundary)
    pub async fn mark_failed(id: ScanId, pool: &PgPool) -> Result<Self> {
        let scan = sqlx::query_as::<_, Scan>(
            r#"
            UPDATE scans
            SET status = 'failed', updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await?;
        Ok(scan)
    }

    /// Flip scan into the analyzing marker state.
    ///
    /// Guarded so only a scan still in an analyzable state moves; returns
    /// false when the guard matched no row (concurrent finalize or wrong
    /// state), letting the caller re-read and report the actual state.
    pub async fn begin_analysis(id: ScanId, pool: &PgPool) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE scans
            SET status = 'analyzing', updated_at = NOW()
            WHERE id = $1 AND status IN ('processing', 'analyzing')
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Write the analysis outcome and mark the scan completed.
    ///
    /// Runs inside the finalization transaction. Guarded on `analyzing` so a
    /// scan can never be completed twice; returns None if the guard missed.
    pub async fn complete(
        id: ScanId,
        readiness_score: i32,
        readiness_narrative: String,
        severity_counts: SeverityCounts,
        total_recommendations: i32,
        conn: &mut sqlx::PgConnection,
    ) -> Result<Option<Self>> {
        let scan = sqlx::query_as::<_, Scan>(
            r#"
            UPDATE scans
            SET
                status = 'completed',
                readiness_score = $2,
                readiness_narrative = $3,
                severity_counts = $4,
                total_recommendations = $5,
                completed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND status = 'analyzing'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(readiness_score)
        .bind(readiness_narrative)
        .bind(Json(severity_counts))
        .bind(total_recommendations)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(scan)
    }
}
