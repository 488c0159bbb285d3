// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Global identifiers for participants, data writers and data readers.

use crate::error::{Error, Result};
use std::fmt;

/// Size of the GID payload carried on the wire (RTPS GUID prefix + entity id).
pub const RMW_GID_STORAGE_SIZE: usize = 16;

/// Opaque discovery identifier.
///
/// Ordering is lexicographic over the raw bytes, which is also the iteration
/// order of every GID-keyed map in the graph cache.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Gid([u8; RMW_GID_STORAGE_SIZE]);

impl Gid {
    #[must_use]
    pub const fn new(data: [u8; RMW_GID_STORAGE_SIZE]) -> Self {
        Self(data)
    }

    /// Build a GID from a byte slice.
    ///
    /// Longer slices are truncated to [`RMW_GID_STORAGE_SIZE`] and shorter
    /// ones are zero padded, mirroring how vendor handles are copied into
    /// rmw GID storage. An empty slice is rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::InvalidArgument("empty gid".into()));
        }
        let mut data = [0u8; RMW_GID_STORAGE_SIZE];
        let len = bytes.len().min(RMW_GID_STORAGE_SIZE);
        data[..len].copy_from_slice(&bytes[..len]);
        Ok(Self(data))
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; RMW_GID_STORAGE_SIZE] {
        &self.0
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl From<[u8; RMW_GID_STORAGE_SIZE]> for Gid {
    fn from(data: [u8; RMW_GID_STORAGE_SIZE]) -> Self {
        Self(data)
    }
}

impl AsRef<[u8]> for Gid {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Gid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (last, head) = self.0.split_last().ok_or(fmt::Error)?;
        for byte in head {
            write!(f, "{:x}.", byte)?;
        }
        write!(f, "{:x}", last)
    }
}

impl fmt::Debug for Gid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Gid({})", self)
    }
}
