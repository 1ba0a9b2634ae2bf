//! Append-only, rotating on-disk sample cache.
//!
//! Each cache identity lives in a single directory as one active segment
//! plus the archival segments rotation has produced. Nothing in this module
//! deletes or truncates a segment: rotation is a rename followed by the
//! creation of a fresh, empty active segment.

use crate::core::parser::serialize_in;
use crate::core::sample::Sample;
use crate::core::temporal::{CanonicalZone, Timestamp, DEFAULT_CANONICAL_ZONE};
use crate::error::{Result, StorageError};
use crate::storage::segment::{CacheIdentity, SegmentHandle, SegmentKind, SegmentLines};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default rotation threshold (5 MiB)
pub const DEFAULT_ROTATION_THRESHOLD: u64 = 5 * 1024 * 1024;

/// Digits of the suffix that tells same-second rotations apart
const COLLISION_SUFFIX_WIDTH: usize = 4;

/// Durable storage for the segments of every identity under one directory.
///
/// Assumes a single writer per identity; readers may run concurrently and
/// must tolerate a briefly missing active segment during rotation.
#[derive(Debug, Clone)]
pub struct CacheStore {
    /// Directory where segment files are stored.
    dir: PathBuf,
    /// Zone of the wall clocks written to segments and of rotation stamps.
    zone: CanonicalZone,
}

impl CacheStore {
    /// Create a store rooted at `dir`. The directory is created lazily.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            zone: DEFAULT_CANONICAL_ZONE,
        }
    }

    /// Use `zone` instead of [`DEFAULT_CANONICAL_ZONE`]
    pub fn with_zone(mut self, zone: CanonicalZone) -> Self {
        self.zone = zone;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn zone(&self) -> CanonicalZone {
        self.zone
    }

    /// Handle of the active segment, whether or not it exists yet
    pub fn active_segment(&self, identity: &CacheIdentity) -> SegmentHandle {
        SegmentHandle::new(self.dir.join(identity.as_str()), SegmentKind::Active)
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|source| StorageError::DirectoryUnavailable {
            path: self.dir.clone(),
            source,
        })?;
        Ok(())
    }

    /// Create an empty active segment if there is none. Idempotent.
    pub fn ensure_active_segment_exists(&self, identity: &CacheIdentity) -> Result<SegmentHandle> {
        self.ensure_dir()?;
        let active = self.active_segment(identity);
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(active.path())
            .map_err(|source| unwritable(&active, source))?;
        Ok(active)
    }

    /// Append samples to the active segment, one line each, in the given order.
    ///
    /// Returns the number of samples written.
    pub fn append(&self, identity: &CacheIdentity, samples: &[Sample]) -> Result<usize> {
        let active = self.ensure_active_segment_exists(identity)?;
        if samples.is_empty() {
            return Ok(0);
        }

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(active.path())
            .map_err(|source| unwritable(&active, source))?;

        let mut buf = String::new();
        // A crash mid-write can leave a torn last line; start on a fresh one.
        if !ends_with_newline(&mut file).map_err(|source| unwritable(&active, source))? {
            debug!(segment = %active, "Active segment ends mid-line, terminating it");
            buf.push('\n');
        }
        for sample in samples {
            buf.push_str(&serialize_in(sample, self.zone));
            buf.push('\n');
        }

        file.write_all(buf.as_bytes())
            .and_then(|()| file.sync_data())
            .map_err(|source| unwritable(&active, source))?;

        debug!(segment = %active, count = samples.len(), "Appended samples");
        Ok(samples.len())
    }

    /// Rotate the active segment once it has reached `threshold_bytes`.
    ///
    /// Returns the archival segment the old content now lives in.
    pub fn rotate_if_oversized(
        &self,
        identity: &CacheIdentity,
        threshold_bytes: u64,
    ) -> Result<Option<SegmentHandle>> {
        self.rotate_at(identity, threshold_bytes, Timestamp::now())
    }

    pub(crate) fn rotate_at(
        &self,
        identity: &CacheIdentity,
        threshold_bytes: u64,
        now: Timestamp,
    ) -> Result<Option<SegmentHandle>> {
        let active = self.active_segment(identity);
        let size = match fs::metadata(active.path()) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StorageError::SegmentUnreadable {
                    path: active.path().to_path_buf(),
                    source,
                }
                .into())
            }
        };
        if size == 0 || size < threshold_bytes {
            return Ok(None);
        }

        let archived = self.next_archival_segment(identity, now);
        fs::rename(active.path(), archived.path()).map_err(|source| {
            StorageError::RenameFailed {
                from: active.path().to_path_buf(),
                to: archived.path().to_path_buf(),
                source,
            }
        })?;
        self.ensure_active_segment_exists(identity)?;

        info!(
            identity = %identity,
            archived = %archived,
            size_bytes = size,
            "Rotated active segment"
        );
        Ok(Some(archived))
    }

    /// First free archival name for `now`. Same-second rotations get a
    /// zero-padded `-NNNN` suffix so names keep sorting in creation order.
    fn next_archival_segment(&self, identity: &CacheIdentity, now: Timestamp) -> SegmentHandle {
        let stamp = now.to_rotation_stamp(self.zone);
        let mut candidate = stamp.clone();
        let mut attempt = 0u32;
        loop {
            let path = self.dir.join(format!("{identity}.{candidate}"));
            if !path.exists() {
                return SegmentHandle::new(path, SegmentKind::Archival { stamp: candidate });
            }
            attempt += 1;
            candidate = format!("{stamp}-{attempt:0width$}", width = COLLISION_SUFFIX_WIDTH);
        }
    }

    /// All segments of `identity`: archival ones sorted by name, then the
    /// active segment (listed even if it does not exist yet).
    pub fn list_segments(&self, identity: &CacheIdentity) -> Result<Vec<SegmentHandle>> {
        let active = self.active_segment(identity);
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(vec![active]),
            Err(source) => {
                return Err(StorageError::DirectoryUnavailable {
                    path: self.dir.clone(),
                    source,
                }
                .into())
            }
        };

        let mut segments = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StorageError::DirectoryUnavailable {
                path: self.dir.clone(),
                source,
            })?;
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if let Some(kind @ SegmentKind::Archival { .. }) = identity.classify(name) {
                segments.push(SegmentHandle::new(entry.path(), kind));
            }
        }

        segments.sort_by(|a, b| a.path().cmp(b.path()));
        segments.push(active);
        Ok(segments)
    }

    /// Lazily read the raw lines of a segment. Each call re-opens the file.
    pub fn read_lines(&self, segment: &SegmentHandle) -> Result<SegmentLines> {
        SegmentLines::open(segment.path())
    }
}

fn unwritable(segment: &SegmentHandle, source: io::Error) -> StorageError {
    StorageError::SegmentUnwritable {
        path: segment.path().to_path_buf(),
        source,
    }
}

fn ends_with_newline(file: &mut File) -> io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}
