pub mod accept_recommendations;
pub mod list_recommendations;
pub mod reconcile;

pub use accept_recommendations::{
    accept_recommendations, AcceptError, AcceptOutcome, SkipReason, SkippedRecommendation,
};
pub use list_recommendations::{list_recommendations, ListError};
pub use reconcile::{reconcile_scan_recommendations, ReconcileSummary};
