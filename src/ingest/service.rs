//! One refresh cycle: fetch, parse, append, rotate

use crate::core::parser::parse_in;
use crate::core::sample::Sample;
use crate::core::temporal::CanonicalZone;
use crate::error::Result;
use crate::ingest::source::FeedSource;
use crate::storage::{CacheIdentity, CacheStore};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Outcome of a refresh cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RefreshReport {
    /// Samples written to the active segment
    pub appended: usize,
    /// Non-blank feed lines the parser rejected
    pub rejected: usize,
    /// Archival segment created by this cycle's rotation, if any
    pub rotated: Option<PathBuf>,
    /// Why the feed could not be fetched; the cache was left untouched
    pub fetch_error: Option<String>,
}

/// Pulls the sensor feed into a [`CacheStore`].
pub struct IngestionService<S> {
    store: CacheStore,
    source: S,
    rotation_threshold: u64,
}

impl<S: FeedSource> IngestionService<S> {
    pub fn new(store: CacheStore, source: S, rotation_threshold: u64) -> Self {
        Self {
            store,
            source,
            rotation_threshold,
        }
    }

    /// Run one refresh cycle for `identity`.
    ///
    /// A failed fetch is reported, not returned as an error. Storage failures
    /// abort the cycle; samples appended before a failed rotation stay on disk
    /// and rotation is retried by the next cycle.
    pub async fn refresh(&self, identity: &CacheIdentity) -> Result<RefreshReport> {
        let blob = match self.source.fetch().await {
            Ok(blob) => blob,
            Err(e) => {
                warn!(identity = %identity, error = %e, "Feed fetch failed, cache unchanged");
                return Ok(RefreshReport {
                    fetch_error: Some(e.to_string()),
                    ..RefreshReport::default()
                });
            }
        };

        let (samples, rejected) = parse_feed(&blob, self.store.zone());
        let appended = self.store.append(identity, &samples)?;
        let rotated = self
            .store
            .rotate_if_oversized(identity, self.rotation_threshold)?
            .map(|segment| segment.path().to_path_buf());

        info!(identity = %identity, appended, rejected, "Refreshed sample cache");
        Ok(RefreshReport {
            appended,
            rejected,
            rotated,
            fetch_error: None,
        })
    }
}

/// Parse a raw feed blob whose wall clocks run in `zone`, keeping feed order.
///
/// Returns the valid samples and the number of rejected non-blank lines.
pub fn parse_feed(blob: &[u8], zone: CanonicalZone) -> (Vec<Sample>, usize) {
    let mut samples = Vec::new();
    let mut rejected = 0;
    for raw in blob.split(|b| *b == b'\n') {
        let line = String::from_utf8_lossy(raw);
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_in(line, zone) {
            Ok(sample) => samples.push(sample),
            Err(e) => {
                debug!(line, error = %e, "Rejected feed line");
                rejected += 1;
            }
        }
    }
    (samples, rejected)
}
