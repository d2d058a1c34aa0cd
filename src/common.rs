pub mod collections;
pub mod config;
pub mod epsilon;
pub mod error;
