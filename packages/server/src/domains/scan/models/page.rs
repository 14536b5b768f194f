use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::{PageId, ScanId};

/// Page-type classification assigned by the crawler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "page_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PageType {
    Homepage,
    Landing,
    Product,
    Category,
    Pricing,
    Cart,
    Checkout,
    Contact,
    About,
    Blog,
    Faq,
    Legal,
    Unknown,
}

impl std::fmt::Display for PageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageType::Homepage => write!(f, "homepage"),
            PageType::Landing => write!(f, "landing"),
            PageType::Product => write!(f, "product"),
            PageType::Category => write!(f, "category"),
            PageType::Pricing => write!(f, "pricing"),
            PageType::Cart => write!(f, "cart"),
            PageType::Checkout => write!(f, "checkout"),
            PageType::Contact => write!(f, "contact"),
            PageType::About => write!(f, "about"),
            PageType::Blog => write!(f, "blog"),
            PageType::Faq => write!(f, "faq"),
            PageType::Legal => write!(f, "legal"),
            PageType::Unknown => write!(f, "unknown"),
        }
    }
}

impl std::str::FromStr for PageType {
    type Err = std::convert::Infallible;

    /// Lenient: classifications this service does not know fall back to
    /// `Unknown` rather than rejecting the crawler's row.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "homepage" => PageType::Homepage,
            "landing" => PageType::Landing,
            "product" => PageType::Product,
            "category" => PageType::Category,
            "pricing" => PageType::Pricing,
            "cart" => PageType::Cart,
            "checkout" => PageType::Checkout,
            "contact" => PageType::Contact,
            "about" => PageType::About,
            "blog" => PageType::Blog,
            "faq" => PageType::Faq,
            "legal" => PageType::Legal,
            _ => PageType::Unknown,
        })
    }
}

/// Page - one crawled URL belonging to a scan.
///
/// Created by the crawler; `importance_score` is the only field this
/// subsystem mutates.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Page {
    pub id: PageId,
    pub scan_id: ScanId,
    pub url: String,
    pub page_type: PageType,
    pub link_depth: i32,
    pub has_form: bool,
    pub has_cta: bool,
    pub has_phone_link: bool,
    pub has_email_link: bool,
    pub importance_score: Option<f64>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// SQL Queries - ALL queries must be in models/
// =============================================================================

impl Page {
    /// Insert a crawled page (crawler boundary)
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        scan_id: ScanId,
        url: String,
        page_type: PageType,
        link_depth: i32,
        has_form: bool,
        has_cta: bool,
        has_phone_link: bool,
        has_email_link: bool,
        pool: &PgPool,
    ) -> Result<Self> {
        let page = sqlx::query_as::<_, Page>(
            r#"
            INSERT INTO pages (
                id, scan_id, url, page_type, link_depth,
                has_form, has_cta, has_phone_link, has_email_link
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(PageId::new())
        .bind(scan_id)
        .bind(url)
        .bind(page_type)
        .bind(link_depth)
        .bind(has_form)
        .bind(has_cta)
        .bind(has_phone_link)
        .bind(has_email_link)
        .fetch_one(pool)
        .await?;
        Ok(page)
    }

    /// Find all pages for a scan
    pub async fn find_for_scan(scan_id: ScanId, pool: &PgPool) -> Result<Vec<Self>> {
        let pages =
            sqlx::query_as::<_, Page>("SELECT * FROM pages WHERE scan_id = $1 ORDER BY link_depth, url")
                .bind(scan_id)
                .fetch_all(pool)
                .await?;
        Ok(pages)
    }

    /// Write computed importance scores for many pages in one statement.
    ///
    /// Runs inside the finalization transaction; a per-row loop here would
    /// stretch the transaction with the page count.
    pub async fn bulk_update_importance(
        scores: &[(PageId, f64)],
        conn: &mut sqlx::PgConnection,
    ) -> Result<u64> {
        if scores.is_empty() {
            return Ok(0);
        }

        let (ids, values): (Vec<PageId>, Vec<f64>) = scores.iter().copied().unzip();

        let result = sqlx::query(
            r#"
            UPDATE pages AS p
            SET importance_score = v.importance
            FROM (
                SELECT * FROM UNNEST($1::uuid[], $2::float8[]) AS t(page_id, importance)
            ) AS v
            WHERE p.id = v.page_id
            "#,
        )
        .bind(&ids)
        .bind(&values)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }
}
