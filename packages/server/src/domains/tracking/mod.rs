//! Tracking domain - live tracking configurations, sync batches, and queue jobs

pub mod models;

pub use models::{
    Batch, BatchStatus, Destination, DestinationChoice, NewTracking, QueueJob, QueueJobStatus,
    Tracking, TrackingStatus, TrackingType,
};
