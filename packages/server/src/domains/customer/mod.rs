//! Customer domain - tenant accounts and their external platform connections

pub mod models;

pub use models::Customer;
