//! Segment: one on-disk text file of a cache identity
//!
//! An identity `co2_ppm_samples` owns the active segment `co2_ppm_samples`
//! and any number of archival segments `co2_ppm_samples.<stamp>`.

use crate::error::{Error, Result, StorageError};
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Identity used when none is configured
pub const DEFAULT_IDENTITY: &str = "co2_ppm_samples";

/// Logical name of one time series
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheIdentity(String);

impl CacheIdentity {
    /// Validate a name; it becomes a file name, so separators are refused
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let bad_char = |c: char| c == '/' || c == '\\' || c == '\0';
        if name.is_empty() || name == "." || name == ".." || name.contains(bad_char) {
            return Err(Error::Configuration(format!(
                "invalid cache identity `{name}`"
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Which segment of this identity `file_name` is, if any
    pub fn classify(&self, file_name: &str) -> Option<SegmentKind> {
        if file_name == self.0 {
            return Some(SegmentKind::Active);
        }
        file_name
            .strip_prefix(self.0.as_str())?
            .strip_prefix('.')
            .filter(|stamp| !stamp.is_empty())
            .map(|stamp| SegmentKind::Archival {
                stamp: stamp.to_string(),
            })
    }
}

impl Default for CacheIdentity {
    fn default() -> Self {
        Self(DEFAULT_IDENTITY.to_string())
    }
}

impl fmt::Display for CacheIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CacheIdentity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// Lifecycle state of a segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentKind {
    /// Current append target
    Active,
    /// Rotated out; never written again
    Archival { stamp: String },
}

/// Location and kind of one segment file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentHandle {
    path: PathBuf,
    kind: SegmentKind,
}

impl SegmentHandle {
    pub(crate) fn new(path: PathBuf, kind: SegmentKind) -> Self {
        Self { path, kind }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> &SegmentKind {
        &self.kind
    }

    pub fn is_active(&self) -> bool {
        self.kind == SegmentKind::Active
    }
}

impl fmt::Display for SegmentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Lazy line iterator over a segment.
///
/// Bytes are decoded lossily so a corrupt line only spoils itself. A segment
/// that does not exist yields no lines.
pub struct SegmentLines {
    inner: Option<io::Split<BufReader<File>>>,
}

impl SegmentLines {
    /// Open `path` for reading
    pub(crate) fn open(path: &Path) -> Result<Self> {
        match File::open(path) {
            Ok(file) => Ok(Self {
                inner: Some(BufReader::new(file).split(b'\n')),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self { inner: None }),
            Err(source) => Err(StorageError::SegmentUnreadable {
                path: path.to_path_buf(),
                source,
            }
            .into()),
        }
    }
}

impl Iterator for SegmentLines {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = self.inner.as_mut()?.next()?;
        Some(line.map(|mut bytes| {
            if bytes.last() == Some(&b'\r') {
                bytes.pop();
            }
            String::from_utf8_lossy(&bytes).into_owned()
        }))
    }
}
