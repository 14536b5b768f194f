use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::{RecommendationId, ScanId, TrackingId};

/// Severity of a tracking gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "severity", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Important,
    Recommended,
    Optional,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "critical"),
            Severity::Important => write!(f, "important"),
            Severity::Recommended => write!(f, "recommended"),
            Severity::Optional => write!(f, "optional"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "critical" => Ok(Severity::Critical),
            "important" => Ok(Severity::Important),
            "recommended" => Ok(Severity::Recommended),
            "optional" => Ok(Severity::Optional),
            _ => Err(anyhow::anyhow!("Invalid severity: {}", s)),
        }
    }
}

/// Recommendation lifecycle status.
///
/// `pending` is the crawler-produced initial state. `creating` means an
/// accept call queued external sync work. The reconciler settles in-flight
/// items into `created`, `failed`, or `repair`; all three of those can
/// re-enter `creating` through a fresh accept call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "recommendation_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RecommendationStatus {
    Pending,
    Creating,
    Created,
    Failed,
    Repair,
}

impl RecommendationStatus {
    /// Statuses a bulk-accept call may pick up. `creating` is excluded:
    /// re-queueing an item whose sync is still in flight would race the
    /// worker on the same tracking.
    pub fn is_accept_eligible(&self) -> bool {
        matches!(
            self,
            RecommendationStatus::Pending
                | RecommendationStatus::Repair
                | RecommendationStatus::Failed
                | RecommendationStatus::Created
        )
    }
}

impl std::fmt::Display for RecommendationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecommendationStatus::Pending => write!(f, "pending"),
            RecommendationStatus::Creating => write!(f, "creating"),
            RecommendationStatus::Created => write!(f, "created"),
            RecommendationStatus::Failed => write!(f, "failed"),
            RecommendationStatus::Repair => write!(f, "repair"),
        }
    }
}

impl std::str::FromStr for RecommendationStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(RecommendationStatus::Pending),
            "creating" => Ok(RecommendationStatus::Creating),
            "created" => Ok(RecommendationStatus::Created),
            "failed" => Ok(RecommendationStatus::Failed),
            "repair" => Ok(RecommendationStatus::Repair),
            _ => Err(anyhow::anyhow!("Invalid recommendation status: {}", s)),
        }
    }
}

/// Optional filters for listing a scan's recommendations.
#[derive(Debug, Clone, Default)]
pub struct RecommendationFilters {
    pub severity: Option<Severity>,
    pub status: Option<RecommendationStatus>,
    pub tracking_type: Option<String>,
}

/// Recommendation - one candidate trackable interaction discovered during a
/// scan, optionally bound to a page URL.
///
/// `tracking_type` is the crawler's free-form string; it only becomes
/// meaningful if it maps onto `TrackingType` during accept.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Recommendation {
    pub id: RecommendationId,
    pub scan_id: ScanId,
    pub page_url: Option<String>,
    pub name: String,
    pub tracking_type: String,
    pub severity: Severity,
    pub suggested_destinations: Vec<String>,
    pub suggested_event_name: Option<String>,
    pub suggested_selector: Option<String>,
    pub selector_confidence: Option<f64>,
    pub status: RecommendationStatus,
    pub tracking_id: Option<TrackingId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// SQL Queries - ALL queries must be in models/
// =============================================================================

impl Recommendation {
    /// Insert a crawler-discovered recommendation (crawler boundary)
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        scan_id: ScanId,
        name: String,
        tracking_type: String,
        severity: Severity,
        page_url: Option<String>,
        suggested_destinations: Vec<String>,
        suggested_event_name: Option<String>,
        suggested_selector: Option<String>,
        selector_confidence: Option<f64>,
        pool: &PgPool,
    ) -> Result<Self> {
        let recommendation = sqlx::query_as::<_, Recommendation>(
            r#"
            INSERT INTO recommendations (
                id, scan_id, name, tracking_type, severity, page_url,
                suggested_destinations, suggested_event_name,
                suggested_selector, selector_confidence, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'pending')
            RETURNING *
            "#,
        )
        .bind(RecommendationId::new())
        .bind(scan_id)
        .bind(name)
        .bind(tracking_type)
        .bind(severity)
        .bind(page_url)
        .bind(suggested_destinations)
        .bind(suggested_event_name)
        .bind(suggested_selector)
        .bind(selector_confidence)
        .fetch_one(pool)
        .await?;
        Ok(recommendation)
    }

    /// Find all recommendations for a scan
    pub async fn find_for_scan(scan_id: ScanId, pool: &PgPool) -> Result<Vec<Self>> {
        let recommendations = sqlx::query_as::<_, Recommendation>(
            "SELECT * FROM recommendations WHERE scan_id = $1 ORDER BY severity, created_at",
        )
        .bind(scan_id)
        .fetch_all(pool)
        .await?;
        Ok(recommendations)
    }

    /// Fetch the requested recommendations that actually belong to the scan.
    ///
    /// IDs from other scans (or unknown ids) are simply absent from the
    /// result; the accept activity reports them as skipped.
    pub async fn find_by_ids_for_scan(
        ids: &[RecommendationId],
        scan_id: ScanId,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let recommendations = sqlx::query_as::<_, Recommendation>(
            "SELECT * FROM recommendations WHERE id = ANY($1) AND scan_id = $2",
        )
        .bind(ids)
        .bind(scan_id)
        .fetch_all(pool)
        .await?;
        Ok(recommendations)
    }

    /// All recommendations of a scan currently in a lifecycle state the
    /// reconciler cares about (`created` or `creating`).
    pub async fn find_in_lifecycle(scan_id: ScanId, pool: &PgPool) -> Result<Vec<Self>> {
        let recommendations = sqlx::query_as::<_, Recommendation>(
            r#"
            SELECT * FROM recommendations
            WHERE scan_id = $1 AND status IN ('created', 'creating')
            "#,
        )
        .bind(scan_id)
        .fetch_all(pool)
        .await?;
        Ok(recommendations)
    }

    /// List a scan's recommendations with optional severity/status/type
    /// filters, in one statement with null-tolerant predicates.
    pub async fn list_filtered(
        scan_id: ScanId,
        filters: &RecommendationFilters,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        let recommendations = sqlx::query_as::<_, Recommendation>(
            r#"
            SELECT * FROM recommendations
            WHERE scan_id = $1
              AND ($2::severity IS NULL OR severity = $2)
              AND ($3::recommendation_status IS NULL OR status = $3)
              AND ($4::text IS NULL OR tracking_type = $4)
            ORDER BY severity, created_at
            "#,
        )
        .bind(scan_id)
        .bind(filters.severity)
        .bind(filters.status)
        .bind(filters.tracking_type.as_deref())
        .fetch_all(pool)
        .await?;
        Ok(recommendations)
    }

    /// Flip all accepted recommendations to `creating` and attach each one's
    /// new tracking id, as a single set-based update.
    ///
    /// One statement keyed by id keeps the accept transaction short
    /// regardless of batch size.
    pub async fn bulk_mark_creating(
        pairs: &[(RecommendationId, TrackingId)],
        conn: &mut sqlx::PgConnection,
    ) -> Result<u64> {
        if pairs.is_empty() {
            return Ok(0);
        }

        let (ids, tracking_ids): (Vec<RecommendationId>, Vec<TrackingId>) =
            pairs.iter().copied().unzip();

        let result = sqlx::query(
            r#"
            UPDATE recommendations AS r
            SET status = 'creating', tracking_id = v.tracking_id, updated_at = NOW()
            FROM (
                SELECT * FROM UNNEST($1::uuid[], $2::uuid[]) AS t(rec_id, tracking_id)
            ) AS v
            WHERE r.id = v.rec_id
            "#,
        )
        .bind(&ids)
        .bind(&tracking_ids)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }

    /// Move a set of recommendations to a new status in one statement
    /// (reconciler: `created` and `failed` groups).
    pub async fn bulk_mark_status(
        ids: &[RecommendationId],
        status: RecommendationStatus,
        conn: &mut sqlx::PgConnection,
    ) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            r#"
            UPDATE recommendations
            SET status = $2, updated_at = NOW()
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .bind(status)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }

    /// Move a set of recommendations to `repair`, detaching the tracking
    /// reference so a future accept creates a fresh tracking instead of
    /// reusing a broken one.
    pub async fn bulk_mark_repair(
        ids: &[RecommendationId],
        conn: &mut sqlx::PgConnection,
    ) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            r#"
            UPDATE recommendations
            SET status = 'repair', tracking_id = NULL, updated_at = NOW()
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }
}
