//! Sessions and the binaries loaded through them.

use std::fmt;
use std::sync::{Arc, Weak};

use sea_orm::DatabaseConnection;

use super::ChacraDatabase;
use crate::database::entity::binary::BinaryModel;
use crate::error::{ServerError, ServerResult};

/// A unit of work against the database.
///
/// Binaries loaded through a session are only usable while the session
/// is open.
#[derive(Debug)]
pub struct Session {
    database: DatabaseConnection,
    alive: Arc<()>,
}

/// A binary loaded through a [`Session`].
#[derive(Debug, Clone)]
pub struct BinaryHandle {
    binary: BinaryModel,
    session: Weak<()>,
}

impl Session {
    pub fn new(database: DatabaseConnection) -> Self {
        Self {
            database,
            alive: Arc::new(()),
        }
    }

    /// Loads a binary.
    pub async fn find_binary(&self, binary_id: i64) -> ServerResult<BinaryHandle> {
        let binary = self.database.find_binary(binary_id).await?;

        Ok(BinaryHandle {
            binary,
            session: Arc::downgrade(&self.alive),
        })
    }

    /// Ends the session, detaching all binaries loaded through it.
    pub fn close(self) {}
}

impl BinaryHandle {
    /// Returns whether the session this binary was loaded through is open.
    pub fn is_attached(&self) -> bool {
        self.session.strong_count() > 0
    }

    /// Returns the binary.
    ///
    /// Fails with [`ServerError::DetachedRecordAccess`] once the session
    /// has been closed.
    pub fn get(&self) -> ServerResult<&BinaryModel> {
        if self.is_attached() {
            Ok(&self.binary)
        } else {
            Err(ServerError::DetachedRecordAccess)
        }
    }
}

impl fmt::Display for BinaryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Ok(binary) => write!(f, "<Binary {:?}>", binary.name),
            Err(_) => f.write_str("<Binary detached>"),
        }
    }
}
