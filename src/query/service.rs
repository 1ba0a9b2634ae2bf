//! Read side of the cache: recent and full-history sample series

use crate::core::parser::parse_in;
use crate::core::sample::Sample;
use crate::error::Result;
use crate::storage::{CacheIdentity, CacheStore, SegmentHandle};
use tracing::{debug, warn};

/// Stateless reader producing time-ordered sample series.
#[derive(Debug, Clone)]
pub struct QueryService {
    store: CacheStore,
}

impl QueryService {
    pub fn new(store: CacheStore) -> Self {
        Self { store }
    }

    /// Samples from the active segment only, ascending by timestamp.
    ///
    /// An identity with no active segment yet has an empty series.
    pub fn recent(&self, identity: &CacheIdentity) -> Result<Vec<Sample>> {
        let active = self.store.active_segment(identity);
        let mut samples = self.read_segment(&active)?;
        sort_chronologically(&mut samples);
        Ok(samples)
    }

    /// Samples from every segment merged, ascending by timestamp.
    ///
    /// Duplicates across segments are kept. An unreadable archival segment is
    /// left out of the result rather than failing the whole query.
    pub fn all_history(&self, identity: &CacheIdentity) -> Result<Vec<Sample>> {
        let mut samples = Vec::new();
        for segment in self.store.list_segments(identity)? {
            match self.read_segment(&segment) {
                Ok(segment_samples) => samples.extend(segment_samples),
                Err(e) if !segment.is_active() => {
                    warn!(segment = %segment, error = %e, "Skipping unreadable archival segment");
                }
                Err(e) => return Err(e),
            }
        }
        sort_chronologically(&mut samples);
        Ok(samples)
    }

    /// Parse one segment, skipping lines that do not parse.
    fn read_segment(&self, segment: &SegmentHandle) -> Result<Vec<Sample>> {
        let mut samples = Vec::new();
        let mut rejected = 0usize;
        for line in self.store.read_lines(segment)? {
            match parse_in(&line?, self.store.zone()) {
                Ok(sample) => samples.push(sample),
                Err(_) => rejected += 1,
            }
        }
        if rejected > 0 {
            debug!(
                segment = %segment,
                accepted = samples.len(),
                rejected,
                "Skipped unparsable cache lines"
            );
        }
        Ok(samples)
    }
}

/// Stable, so equal timestamps keep their read order.
fn sort_chronologically(samples: &mut [Sample]) {
    samples.sort_by_key(|s| s.timestamp());
}
