//! Ingestion: fetch the sensor feed and append it to the cache

pub mod service;
pub mod source;

pub use service::*;
pub use source::*;
