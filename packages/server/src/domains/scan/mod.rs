//! Scan domain - crawl runs, their pages, and tracking-readiness scoring

pub mod activities;
pub mod models;
pub mod scoring;

pub use models::{Page, PageType, Scan, ScanStatus, SeverityCounts};
