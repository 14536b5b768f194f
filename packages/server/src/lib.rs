// Leadlight - API Core
//
// Backend core for the lead-capture and tag-management platform. This crate
// implements the site-scan tracking lifecycle: scoring a crawled site's
// tracking readiness, bulk-converting accepted recommendations into tracking
// configurations plus async sync jobs, and reconciling recorded state against
// what actually happened in the external tag/ads platforms.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;

pub use config::*;
