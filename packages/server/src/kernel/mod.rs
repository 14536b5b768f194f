//! Shared runtime dependencies handed to activities.

use sqlx::PgPool;

/// Dependency container for activity entry points.
///
/// Activities take `&ServerDeps` rather than a bare pool so new shared
/// resources can be added without touching every call site.
#[derive(Clone)]
pub struct ServerDeps {
    pub db_pool: PgPool,
}

impl ServerDeps {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub fn db_pool(&self) -> &PgPool {
        &self.db_pool
    }
}
