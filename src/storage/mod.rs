//! Storage layer: segment files and the rotating sample cache

pub mod cache_store;
pub mod segment;

pub use cache_store::*;
pub use segment::*;
