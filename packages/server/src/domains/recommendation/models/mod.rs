pub mod recommendation;

pub use recommendation::{Recommendation, RecommendationFilters, RecommendationStatus, Severity};
