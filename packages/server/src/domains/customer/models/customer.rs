use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::CustomerId;

/// Customer - a tenant account on the platform.
///
/// Tenant resolution and authentication live upstream; this model carries
/// only what the tracking lifecycle needs, which is the external platform
/// connection state checked before a bulk-accept is allowed to write.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub email: String,

    // External platform connection (Google OAuth + tag manager + ads)
    pub google_refresh_token: Option<String>,
    pub gtm_account_id: Option<String>,
    pub gtm_container_id: Option<String>,
    pub google_ads_customer_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// A customer can sync trackings only once OAuth is granted and a GTM
    /// container is linked.
    pub fn has_connected_account(&self) -> bool {
        self.google_refresh_token.is_some() && self.gtm_container_id.is_some()
    }

    /// Find customer by ID
    pub async fn find_by_id(id: CustomerId, pool: &PgPool) -> Result<Option<Self>> {
        let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(customer)
    }

    /// Create a customer account
    pub async fn create(name: String, email: String, pool: &PgPool) -> Result<Self> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (id, name, email)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(CustomerId::new())
        .bind(name)
        .bind(email)
        .fetch_one(pool)
        .await?;
        Ok(customer)
    }

    /// Store the external connection details after the OAuth flow completes
    pub async fn connect_google_account(
        id: CustomerId,
        refresh_token: String,
        gtm_account_id: String,
        gtm_container_id: String,
        google_ads_customer_id: Option<String>,
        pool: &PgPool,
    ) -> Result<Self> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            UPDATE customers
            SET
                google_refresh_token = $2,
                gtm_account_id = $3,
                gtm_container_id = $4,
                google_ads_customer_id = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(refresh_token)
        .bind(gtm_account_id)
        .bind(gtm_container_id)
        .bind(google_ads_customer_id)
        .fetch_one(pool)
        .await?;
        Ok(customer)
    }

    /// Drop the external connection (token revoked or unlinked by operator)
    pub async fn disconnect_google_account(id: CustomerId, pool: &PgPool) -> Result<Self> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            UPDATE customers
            SET
                google_refresh_token = NULL,
                gtm_account_id = NULL,
                gtm_container_id = NULL,
                google_ads_customer_id = NULL,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await?;
        Ok(customer)
    }
}
