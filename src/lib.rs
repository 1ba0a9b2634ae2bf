//! Home-Station: sensor feed ingestion and rotating sample cache
//!
//! Periodically pulls timestamped CO2 (and optionally temperature and
//! humidity) readings from a LAN sensor, appends them to an append-only cache
//! that rotates into archival segments once it grows large, and reads them
//! back as time-ordered series for the dashboard.
//!
//! # Core Concepts
//!
//! - **Samples**: validated readings anchored to the canonical time zone
//! - **Segments**: the active cache file plus immutable archival files
//! - **Ingestion**: fetch, parse (skipping bad lines), append, rotate
//! - **Queries**: the recent series or the merged full history
//!
//! # Example
//!
//! ```no_run
//! use home_station::prelude::*;
//! use std::time::Duration;
//!
//! # async fn example() -> home_station::error::Result<()> {
//! let store = CacheStore::new("/var/cache/home_station");
//! let identity = CacheIdentity::default();
//!
//! let source = HttpFeedSource::new("http://esp32.local/", Duration::from_secs(10))?;
//! let ingest = IngestionService::new(store.clone(), source, DEFAULT_ROTATION_THRESHOLD);
//! let report = ingest.refresh(&identity).await?;
//! println!("appended {} samples", report.appended);
//!
//! let history = QueryService::new(store).all_history(&identity)?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod ingest;
pub mod query;
pub mod storage;
pub mod ventilation;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::core::*;
    pub use crate::error::{Error, Result};
    pub use crate::ingest::{FeedSource, HttpFeedSource, IngestionService, RefreshReport};
    pub use crate::query::{latest, within, QueryService};
    pub use crate::storage::*;
}
