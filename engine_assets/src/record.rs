//! Handles and per-asset bookkeeping records.

use std::fmt;
use std::num::NonZeroU32;

use crate::asset::{Asset, AssetKindTag};

/// Opaque identity of a loaded resource.
///
/// Always non-zero; the raw value `0` is the "invalid handle" sentinel and
/// maps to `None` in [`ResourceHandle::from_raw`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceHandle(NonZeroU32);

impl ResourceHandle {
    /// Raw value used to signal "no handle" across untyped boundaries.
    pub const INVALID_RAW: u32 = 0;

    /// Converts a raw value, rejecting the invalid sentinel.
    pub fn from_raw(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    pub fn as_u32(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Bookkeeping entry for one currently loaded asset.
///
/// A record only exists while `ref_count > 0`; the manager removes it in the
/// same call that drops the count to zero.
#[derive(Debug)]
pub struct ManagedResource {
    pub(crate) handle: ResourceHandle,
    pub(crate) path: String,
    pub(crate) extension: String,
    pub(crate) ref_count: u32,
    pub(crate) payload: Asset,
}

impl ManagedResource {
    pub(crate) fn new(handle: ResourceHandle, path: String, extension: String, payload: Asset) -> Self {
        Self {
            handle,
            path,
            extension,
            ref_count: 1,
            payload,
        }
    }

    /// Read-only summary, detached from the table.
    pub(crate) fn info(&self) -> ResourceInfo {
        ResourceInfo {
            handle: self.handle,
            path: self.path.clone(),
            extension: self.extension.clone(),
            ref_count: self.ref_count,
            kind: self.payload.kind(),
        }
    }
}

/// Snapshot of a record, as returned by `ResourceManager::records`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceInfo {
    pub handle: ResourceHandle,
    pub path: String,
    pub extension: String,
    pub ref_count: u32,
    pub kind: AssetKindTag,
}
