//! Per-key scan range tracking.
//!
//! Every wallet key remembers the contiguous span of block heights that has
//! been confirmed scanned for it. Ranges only grow, and only by adjacency:
//! a height extends a range when it is exactly one above the top or one
//! below the bottom. Anything else leaves the range untouched, so a range
//! never claims a height that was not actually seen.

use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::types::BlockHeight;

/// Inclusive span of scanned heights. Both bounds are at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanRange {
    min: BlockHeight,
    max: BlockHeight,
}

impl ScanRange {
    fn starting_at(height: BlockHeight) -> Self {
        Self {
            min: height,
            max: height,
        }
    }

    pub fn min(&self) -> BlockHeight {
        self.min
    }

    pub fn max(&self) -> BlockHeight {
        self.max
    }

    pub fn contains(&self, height: BlockHeight) -> bool {
        (self.min..=self.max).contains(&height)
    }

    /// Number of heights covered.
    pub fn height_count(&self) -> u32 {
        self.max - self.min + 1
    }
}

/// A wallet key under scan.
///
/// Persisted as `{ id, min_check, max_check }` where `0/0` means the key has
/// not been scanned yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PersistedScanKey", into = "PersistedScanKey")]
pub struct ScanKey {
    id: String,
    range: Option<ScanRange>,
}

impl ScanKey {
    /// A key that has not been scanned yet.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            range: None,
        }
    }

    /// Rebuild a key from its persisted checks.
    ///
    /// `0/0` yields an unstarted key. Mixed zero/non-zero checks or
    /// `min_check > max_check` are rejected.
    pub fn from_checks(
        id: impl Into<String>,
        min_check: BlockHeight,
        max_check: BlockHeight,
    ) -> Result<Self, SyncError> {
        let id = id.into();
        let range = match (min_check, max_check) {
            (0, 0) => None,
            (min, max) if min != 0 && min <= max => Some(ScanRange {
                min,
                max,
            }),
            _ => {
                return Err(SyncError::InvalidScanRange {
                    key: id,
                    min_check,
                    max_check,
                })
            }
        };
        Ok(Self {
            id,
            range,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn range(&self) -> Option<ScanRange> {
        self.range
    }

    pub fn is_started(&self) -> bool {
        self.range.is_some()
    }

    /// Lowest confirmed height, `0` when unstarted.
    pub fn min_check(&self) -> BlockHeight {
        self.range.map_or(0, |r| r.min)
    }

    /// Highest confirmed height, `0` when unstarted.
    pub fn max_check(&self) -> BlockHeight {
        self.range.map_or(0, |r| r.max)
    }

    /// Record a confirmed height. Returns whether the range changed.
    ///
    /// Height 0 is never applied.
    pub fn apply_height(&mut self, height: BlockHeight) -> bool {
        if height == 0 {
            return false;
        }
        match self.range.as_mut() {
            None => {
                self.range = Some(ScanRange::starting_at(height));
                true
            }
            Some(range) if range.max.checked_add(1) == Some(height) => {
                range.max = height;
                true
            }
            Some(range) if range.min.checked_sub(1) == Some(height) => {
                range.min = height;
                true
            }
            Some(_) => false,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct PersistedScanKey {
    id: String,
    min_check: BlockHeight,
    max_check: BlockHeight,
}

impl TryFrom<PersistedScanKey> for ScanKey {
    type Error = SyncError;

    fn try_from(value: PersistedScanKey) -> Result<Self, Self::Error> {
        ScanKey::from_checks(value.id, value.min_check, value.max_check)
    }
}

impl From<ScanKey> for PersistedScanKey {
    fn from(key: ScanKey) -> Self {
        Self {
            min_check: key.min_check(),
            max_check: key.max_check(),
            id: key.id,
        }
    }
}

/// Scan ranges for every key tracked by one sync session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanRangeTracker {
    keys: Vec<ScanKey>,
}

impl ScanRangeTracker {
    pub fn new(keys: Vec<ScanKey>) -> Self {
        Self {
            keys,
        }
    }

    pub fn keys(&self) -> &[ScanKey] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Replace the tracked keys, e.g. after reloading them from storage.
    pub fn set_keys(&mut self, keys: Vec<ScanKey>) {
        self.keys = keys;
    }

    /// Apply a confirmed height to every key. Returns how many ranges changed.
    pub fn apply_height(&mut self, height: BlockHeight) -> usize {
        self.keys.iter_mut().map(|key| key.apply_height(height)).filter(|changed| *changed).count()
    }

    /// Highest `min_check` across all keys.
    ///
    /// This is the lowest height every key has been scanned down to. Returns
    /// 0 when there are no keys or any key is unstarted.
    pub fn min_height_checked(&self) -> BlockHeight {
        self.keys
            .iter()
            .map(|key| key.range().map(|r| r.min()))
            .try_fold(0, |acc, min| min.map(|min| acc.max(min)))
            .unwrap_or(0)
    }

    /// Lowest `max_check` across all keys.
    ///
    /// This is the highest height every key has been scanned up to. Returns
    /// 0 when there are no keys or any key is unstarted.
    pub fn max_height_checked(&self) -> BlockHeight {
        // `None < Some(_)`, so one unstarted key makes the minimum `None`.
        self.keys.iter().map(|key| key.range().map(|r| r.max())).min().flatten().unwrap_or(0)
    }
}
