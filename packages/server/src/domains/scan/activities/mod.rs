pub mod finalize_scan;

pub use finalize_scan::{finalize_scan, FinalizeError};
