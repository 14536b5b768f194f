//! Recommendation domain - candidate trackables and their lifecycle
//!
//! A recommendation's status and tracking reference are mutated only by the
//! bulk-accept activity and the reconciler, never directly by operators or
//! the crawler after creation.

pub mod activities;
pub mod machines;
pub mod models;

pub use models::{Recommendation, RecommendationStatus, Severity};
