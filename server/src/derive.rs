//! Derived binary fields.
//!
//! Every write of a binary, insert or update, goes through
//! [`derive_fields`] before it reaches the database. The steps run in
//! order:
//!
//! 1. `modified` is stamped with the time of the write.
//! 2. `checksum` is derived from the file at `path`.
//!
//! A failure in any step aborts the write. Nothing here touches the
//! database, so the artifact is read without holding a connection or
//! any row locks.

use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::binary::PendingBinary;
use crate::error::ServerResult;
use chacra::binary::{ArtifactPath, BinaryAttrs};
use chacra::checksum::Checksum;
use chacra::error::ChacraResult;

/// The stage of a binary write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStage {
    /// The write has been requested.
    Pending,

    /// The artifact file is being hashed.
    Checksumming,

    /// The write was committed.
    Committed,

    /// The write was abandoned and nothing was persisted.
    Aborted,
}

/// The result of checksum derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChecksumUpdate {
    /// The binary has no path, so it has no checksum.
    Cleared,

    /// The path is empty, so the previous checksum is kept.
    Retained,

    /// The artifact was hashed.
    Computed(Checksum),
}

impl ChecksumUpdate {
    /// Applies the update to a stored checksum.
    pub fn apply(self, checksum: &mut Option<String>) {
        match self {
            Self::Cleared => *checksum = None,
            Self::Retained => {}
            Self::Computed(c) => *checksum = Some(c.to_hex()),
        }
    }
}

/// Returns the `modified` timestamp for a write happening at `now`.
///
/// The result never precedes `created`, even if the clock went backwards.
pub fn stamp_modified(created: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    now.max(created)
}

/// Derives the checksum of a binary from its path.
pub async fn derive_checksum(attrs: &BinaryAttrs) -> ChacraResult<ChecksumUpdate> {
    match attrs.artifact_path() {
        ArtifactPath::Unset => Ok(ChecksumUpdate::Cleared),

        // FIXME: Binaries without a usable path shouldn't be accepted at
        // all. Until uploads stop sending empty paths, keep whatever
        // checksum the binary already had.
        ArtifactPath::Empty => Ok(ChecksumUpdate::Retained),

        ArtifactPath::Path(path) => {
            let checksum = Checksum::from_path(Path::new(path)).await?;
            Ok(ChecksumUpdate::Computed(checksum))
        }
    }
}

/// Runs all derivation steps on a pending write happening at `now`.
#[instrument(skip_all, fields(name = %pending.name))]
pub async fn derive_fields(pending: &mut PendingBinary, now: DateTime<Utc>) -> ServerResult<()> {
    pending.modified = stamp_modified(pending.created, now);

    tracing::debug!(stage = ?WriteStage::Checksumming, path = ?pending.attrs.path);

    match derive_checksum(&pending.attrs).await {
        Ok(update) => {
            update.apply(&mut pending.checksum);
            Ok(())
        }
        Err(e) => {
            tracing::warn!(stage = ?WriteStage::Aborted, "Checksum derivation failed: {}", e);
            Err(e.into())
        }
    }
}
