pub mod batch;
pub mod queue_job;
pub mod tracking;

pub use batch::{Batch, BatchStatus};
pub use queue_job::{QueueJob, QueueJobStatus};
pub use tracking::{Destination, DestinationChoice, NewTracking, Tracking, TrackingStatus, TrackingType};
