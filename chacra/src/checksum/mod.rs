//! Artifact checksums.
//!
//! Every binary with a file on disk carries the SHA-512 digest of
//! that file, stored in the database as lowercase hexadecimal.

#[cfg(test)]
mod tests;

use std::fmt;
use std::io;
use std::path::Path;

use sha2::{Digest, Sha512};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::error::{ChacraError, ChacraResult};
use crate::io::HashReader;

/// Size of the chunks artifact files are read in.
pub const CHUNK_SIZE: usize = 4096;

/// Length of a SHA-512 digest in bytes.
const DIGEST_LEN: usize = 64;

/// The SHA-512 checksum of an artifact.
#[derive(Clone, PartialEq, Eq)]
pub struct Checksum([u8; DIGEST_LEN]);

impl Checksum {
    /// Computes the checksum of a slice.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha512::new();
        hasher.update(bytes);
        Self::from_digest(&hasher.finalize())
    }

    /// Computes the checksum of the file at `path`.
    ///
    /// The file is streamed in [`CHUNK_SIZE`] chunks so that large
    /// artifacts are never held in memory. Any failure to open or read
    /// the file is reported as [`ChacraError::FileUnreadable`].
    pub async fn from_path(path: &Path) -> ChacraResult<Self> {
        let unreadable = |error: io::Error| ChacraError::FileUnreadable {
            path: path.to_owned(),
            error,
        };

        let file = File::open(path).await.map_err(unreadable)?;
        let mut reader = HashReader::new(file, Sha512::new());

        let mut buf = vec![0u8; CHUNK_SIZE];
        while reader.read(&mut buf).await.map_err(unreadable)? != 0 {}

        let digest = reader.finish().ok_or_else(|| {
            unreadable(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "file was not read to the end",
            ))
        })?;

        Ok(Self::from_digest(&digest))
    }

    fn from_digest(digest: &[u8]) -> Self {
        let mut data = [0u8; DIGEST_LEN];
        data.copy_from_slice(digest);
        Self(data)
    }

    /// Returns the checksum in lowercase hexadecimal.
    ///
    /// This is the representation stored in the database.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Checksum({})", self.to_hex())
    }
}
