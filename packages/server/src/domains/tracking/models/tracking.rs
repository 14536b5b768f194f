use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::common::{CustomerId, ScanId, TrackingId};

/// The fixed enumeration of trackable interaction kinds.
///
/// Crawler recommendations carry a free-form type string; only strings that
/// parse into one of these variants can become a live tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "tracking_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TrackingType {
    ButtonClick,
    LinkClick,
    FormSubmit,
    FormStart,
    PhoneCall,
    EmailClick,
    Download,
    VideoEngagement,
    ScrollDepth,
    Purchase,
    AddToCart,
    BeginCheckout,
    Signup,
    PageView,
}

impl std::fmt::Display for TrackingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TrackingType::ButtonClick => "button_click",
            TrackingType::LinkClick => "link_click",
            TrackingType::FormSubmit => "form_submit",
            TrackingType::FormStart => "form_start",
            TrackingType::PhoneCall => "phone_call",
            TrackingType::EmailClick => "email_click",
            TrackingType::Download => "download",
            TrackingType::VideoEngagement => "video_engagement",
            TrackingType::ScrollDepth => "scroll_depth",
            TrackingType::Purchase => "purchase",
            TrackingType::AddToCart => "add_to_cart",
            TrackingType::BeginCheckout => "begin_checkout",
            TrackingType::Signup => "signup",
            TrackingType::PageView => "page_view",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for TrackingType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "button_click" => Ok(TrackingType::ButtonClick),
            "link_click" => Ok(TrackingType::LinkClick),
            "form_submit" => Ok(TrackingType::FormSubmit),
            "form_start" => Ok(TrackingType::FormStart),
            "phone_call" => Ok(TrackingType::PhoneCall),
            "email_click" => Ok(TrackingType::EmailClick),
            "download" => Ok(TrackingType::Download),
            "video_engagement" => Ok(TrackingType::VideoEngagement),
            "scroll_depth" => Ok(TrackingType::ScrollDepth),
            "purchase" => Ok(TrackingType::Purchase),
            "add_to_cart" => Ok(TrackingType::AddToCart),
            "begin_checkout" => Ok(TrackingType::BeginCheckout),
            "signup" => Ok(TrackingType::Signup),
            "page_view" => Ok(TrackingType::PageView),
            _ => Err(anyhow::anyhow!("Unknown tracking type: {}", s)),
        }
    }
}

/// External sync status of a tracking configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "tracking_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TrackingStatus {
    Pending,
    Creating,
    Active,
    Failed,
}

/// Sync destination platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    Gtm,
    GoogleAds,
}

impl Destination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::Gtm => "gtm",
            Destination::GoogleAds => "google_ads",
        }
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Operator-facing destination selection for a bulk-accept call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationChoice {
    Gtm,
    GoogleAds,
    Both,
}

impl DestinationChoice {
    /// Expand the choice into the destination set stored on each tracking.
    pub fn destinations(&self) -> Vec<String> {
        match self {
            DestinationChoice::Gtm => vec![Destination::Gtm.as_str().to_string()],
            DestinationChoice::GoogleAds => vec![Destination::GoogleAds.as_str().to_string()],
            DestinationChoice::Both => vec![
                Destination::Gtm.as_str().to_string(),
                Destination::GoogleAds.as_str().to_string(),
            ],
        }
    }
}

/// Tracking - an operator-approved, externally-synced tracking configuration.
///
/// Created once per accepted recommendation; after creation the row is owned
/// by the sync worker, which flips the status and fills in the external
/// resource identifiers as platform calls succeed.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tracking {
    pub id: TrackingId,
    pub customer_id: CustomerId,
    pub scan_id: Option<ScanId>,
    pub name: String,
    pub tracking_type: TrackingType,
    pub selector_config: Json<serde_json::Value>,
    pub destinations: Vec<String>,
    pub event_name: String,
    pub status: TrackingStatus,

    // External resource identifiers, populated by the sync worker
    pub gtm_tag_id: Option<String>,
    pub gtm_trigger_id: Option<String>,
    pub ads_conversion_id: Option<String>,
    pub ads_conversion_label: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tracking {
    /// Whether the destination set includes the ads platform.
    pub fn requires_google_ads(&self) -> bool {
        self.destinations
            .iter()
            .any(|d| d == Destination::GoogleAds.as_str())
    }

    /// Completeness rule: active, tag and trigger present, and when the ads
    /// platform is a destination, both ads-side identifiers present too.
    pub fn is_fully_synced(&self) -> bool {
        if self.status != TrackingStatus::Active {
            return false;
        }
        if self.gtm_tag_id.is_none() || self.gtm_trigger_id.is_none() {
            return false;
        }
        if self.requires_google_ads()
            && (self.ads_conversion_id.is_none() || self.ads_conversion_label.is_none())
        {
            return false;
        }
        true
    }
}

/// Row data for the bulk tracking insert, built from an accepted
/// recommendation before the transaction opens.
#[derive(Debug, Clone)]
pub struct NewTracking {
    pub id: TrackingId,
    pub name: String,
    pub tracking_type: TrackingType,
    pub selector_config: serde_json::Value,
    pub event_name: String,
}

// =============================================================================
// SQL Queries - ALL queries must be in models/
// =============================================================================

impl Tracking {
    /// Find tracking by ID
    pub async fn find_by_id(id: TrackingId, pool: &PgPool) -> Result<Option<Self>> {
        let tracking = sqlx::query_as::<_, Tracking>("SELECT * FROM trackings WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(tracking)
    }

    /// Fetch a set of trackings in one statement
    pub async fn find_by_ids(ids: &[TrackingId], pool: &PgPool) -> Result<Vec<Self>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let trackings =
            sqlx::query_as::<_, Tracking>("SELECT * FROM trackings WHERE id = ANY($1)")
                .bind(ids)
                .fetch_all(pool)
                .await?;
        Ok(trackings)
    }

    /// Insert all trackings for one bulk-accept call in a single set-oriented
    /// statement. Runs inside the accept transaction; one statement keeps the
    /// transaction short no matter how many recommendations were selected.
    ///
    /// Every row shares the caller's destination set and starts pending.
    pub async fn bulk_insert(
        customer_id: CustomerId,
        scan_id: ScanId,
        destinations: &[String],
        rows: &[NewTracking],
        conn: &mut sqlx::PgConnection,
    ) -> Result<Vec<Self>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids: Vec<TrackingId> = Vec::with_capacity(rows.len());
        let mut names: Vec<String> = Vec::with_capacity(rows.len());
        let mut types: Vec<String> = Vec::with_capacity(rows.len());
        let mut configs: Vec<serde_json::Value> = Vec::with_capacity(rows.len());
        let mut event_names: Vec<String> = Vec::with_capacity(rows.len());

        for row in rows {
            ids.push(row.id);
            names.push(row.name.clone());
            types.push(row.tracking_type.to_string());
            configs.push(row.selector_config.clone());
            event_names.push(row.event_name.clone());
        }

        let trackings = sqlx::query_as::<_, Tracking>(
            r#"
            INSERT INTO trackings (
                id, customer_id, scan_id, name, tracking_type,
                selector_config, destinations, event_name, status
            )
            SELECT t.id, $1, $2, t.name, t.tracking_type, t.selector_config, $3, t.event_name, 'pending'
            FROM UNNEST(
                $4::uuid[],
                $5::text[],
                $6::tracking_type[],
                $7::jsonb[],
                $8::text[]
            ) AS t(id, name, tracking_type, selector_config, event_name)
            RETURNING *
            "#,
        )
        .bind(customer_id)
        .bind(scan_id)
        .bind(destinations)
        .bind(&ids)
        .bind(&names)
        .bind(&types)
        .bind(&configs)
        .bind(&event_names)
        .fetch_all(&mut *conn)
        .await?;
        Ok(trackings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn tracking(status: TrackingStatus, destinations: Vec<&str>) -> Tracking {
        Tracking {
            id: TrackingId::new(),
            customer_id: CustomerId::new(),
            scan_id: Some(ScanId::new()),
            name: "Request a demo".to_string(),
            tracking_type: TrackingType::FormSubmit,
            selector_config: Json(serde_json::json!({"selector": "#demo-form"})),
            destinations: destinations.into_iter().map(String::from).collect(),
            event_name: "generate_lead".to_string(),
            status,
            gtm_tag_id: None,
            gtm_trigger_id: None,
            ads_conversion_id: None,
            ads_conversion_label: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_tracking_type_parse_rejects_unknown() {
        assert_eq!(
            TrackingType::from_str("form_submit").unwrap(),
            TrackingType::FormSubmit
        );
        assert!(TrackingType::from_str("hover").is_err());
    }

    #[test]
    fn test_fully_synced_requires_active_status() {
        let mut t = tracking(TrackingStatus::Pending, vec!["gtm"]);
        t.gtm_tag_id = Some("tag-1".into());
        t.gtm_trigger_id = Some("trigger-1".into());
        assert!(!t.is_fully_synced());

        t.status = TrackingStatus::Active;
        assert!(t.is_fully_synced());
    }

    #[test]
    fn test_fully_synced_requires_gtm_identifiers() {
        let mut t = tracking(TrackingStatus::Active, vec!["gtm"]);
        assert!(!t.is_fully_synced());

        t.gtm_tag_id = Some("tag-1".into());
        assert!(!t.is_fully_synced());

        t.gtm_trigger_id = Some("trigger-1".into());
        assert!(t.is_fully_synced());
    }

    #[test]
    fn test_fully_synced_requires_ads_identifiers_when_ads_targeted() {
        let mut t = tracking(TrackingStatus::Active, vec!["gtm", "google_ads"]);
        t.gtm_tag_id = Some("tag-1".into());
        t.gtm_trigger_id = Some("trigger-1".into());
        assert!(!t.is_fully_synced());

        t.ads_conversion_id = Some("AW-123".into());
        assert!(!t.is_fully_synced());

        t.ads_conversion_label = Some("abcDEF".into());
        assert!(t.is_fully_synced());
    }

    #[test]
    fn test_destination_choice_expansion() {
        assert_eq!(DestinationChoice::Gtm.destinations(), vec!["gtm"]);
        assert_eq!(DestinationChoice::GoogleAds.destinations(), vec!["google_ads"]);
        assert_eq!(
            DestinationChoice::Both.destinations(),
            vec!["gtm", "google_ads"]
        );
    }
}
