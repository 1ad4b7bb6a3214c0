//! The Chacra Server.
//!
//! Tracks metadata of built binaries, grouped into repos per project,
//! ref and distro release.

#![deny(
    asm_sub_register,
    deprecated,
    missing_abi,
    unsafe_code,
    unused_macros,
    unused_must_use,
    unused_unsafe
)]
#![deny(clippy::from_over_into, clippy::needless_question_mark)]
#![cfg_attr(
    not(debug_assertions),
    deny(unused_imports, unused_mut, unused_variables,)
)]

pub mod binary;
pub mod config;
pub mod database;
pub mod derive;
pub mod error;
pub mod grouping;

use std::sync::Arc;

use anyhow::Result;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tokio::sync::OnceCell;

use config::Config;
use database::migration::{Migrator, MigratorTrait};
use error::{ServerError, ServerResult};

pub type State = Arc<StateInner>;

/// Global server state.
#[derive(Debug)]
pub struct StateInner {
    /// The Chacra Server configuration.
    config: Config,

    /// Handle to the database.
    database: OnceCell<DatabaseConnection>,
}

impl StateInner {
    pub fn new(config: Config) -> State {
        Arc::new(Self {
            config,
            database: OnceCell::new(),
        })
    }

    /// Returns a handle to the database.
    pub async fn database(&self) -> ServerResult<&DatabaseConnection> {
        self.database
            .get_or_try_init(|| async {
                let mut options = ConnectOptions::new(self.config.database.url.to_owned());
                if let Some(max_connections) = self.config.database.max_connections {
                    options.max_connections(max_connections);
                }

                Database::connect(options)
                    .await
                    .map_err(ServerError::database_error)
            })
            .await
    }
}

/// Runs database migrations.
pub async fn run_migrations(config: Config) -> Result<()> {
    eprintln!("Running migrations...");

    let state = StateInner::new(config);
    let db = state.database().await?;
    Migrator::up(db, None).await?;

    Ok(())
}
