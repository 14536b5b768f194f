//! Typed ID definitions for all domain entities.
//!
//! One alias per entity, backed by `Id<T>`, so IDs of different entities
//! are incompatible at compile time.

pub use super::id::Id;

// ============================================================================
// Entity marker types
// ============================================================================

/// Marker type for Customer entities (tenants).
pub struct Customer;

/// Marker type for Scan entities (one crawl-and-analyze run).
pub struct Scan;

/// Marker type for Page entities (crawled URLs).
pub struct Page;

/// Marker type for Recommendation entities (candidate trackables).
pub struct Recommendation;

/// Marker type for Tracking entities (live tracking configurations).
pub struct Tracking;

/// Marker type for Batch entities (one bulk-accept unit of work).
pub struct Batch;

/// Marker type for QueueJob entities (async sync work items).
pub struct QueueJob;

// ============================================================================
// Type aliases - the primary API
// ============================================================================

/// Typed ID for Customer entities.
pub type CustomerId = Id<Customer>;

/// Typed ID for Scan entities.
pub type ScanId = Id<Scan>;

/// Typed ID for Page entities.
pub type PageId = Id<Page>;

/// Typed ID for Recommendation entities.
pub type RecommendationId = Id<Recommendation>;

/// Typed ID for Tracking entities.
pub type TrackingId = Id<Tracking>;

/// Typed ID for Batch entities.
pub type BatchId = Id<Batch>;

/// Typed ID for QueueJob entities.
pub type QueueJobId = Id<QueueJob>;
