// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error type shared by the graph cache, QoS engines and codecs.

use crate::gid::Gid;
use std::path::PathBuf;
use thiserror::Error;

/// Errors emitted by `hdds-rmw-common`.
///
/// Removing or dissociating something that is absent is never an error:
/// those operations report "no change" instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed input rejected before any state was touched.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Local-construction call referenced a participant the cache does not know.
    #[error("participant {0} not found in graph cache")]
    ParticipantNotFound(Gid),

    /// Local-construction call referenced a node missing from its participant.
    #[error("node '{name}' in namespace '{namespace}' not found")]
    NodeNotFound { name: String, namespace: String },

    /// Introspection by node name found no matching node anywhere.
    #[error("node name non existent: '{name}' in namespace '{namespace}'")]
    NodeNameNonExistent { name: String, namespace: String },

    /// Reserving an output container failed.
    #[error("failed to allocate output")]
    BadAlloc,

    /// A RIHS type hash string could not be parsed.
    #[error("invalid type hash: {0}")]
    InvalidTypeHash(String),

    /// CDR encoding or decoding of a wire message failed.
    #[error("serialization failed at offset {offset}: {reason}")]
    Serialization { offset: usize, reason: String },

    /// A required security artifact is missing from the enclave directory.
    #[error("missing security file: {}", .0.display())]
    MissingSecurityFile(PathBuf),

    /// The participant snapshot publisher rejected a message.
    #[error("failed to publish participant entities info: {0}")]
    Publish(String),

    /// Unanticipated internal failure (formatting, bookkeeping).
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl From<std::collections::TryReserveError> for Error {
    fn from(_: std::collections::TryReserveError) -> Self {
        Error::BadAlloc
    }
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
