//! Binary lifecycle.
//!
//! Binaries are created with [`create_binary`] and changed with
//! [`update_binary`]. Both run the derivation pipeline in
//! [`crate::derive`] before writing, so `modified` and `checksum` are
//! always current once a write is visible.
//!
//! Writes that lose a race against another writer are repeated a few
//! times before [`ServerError::is_transient`] errors reach the caller.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::{DatabaseConnection, QueryFilter, TransactionTrait};
use tracing::instrument;

use crate::database::entity::binary::{self, BinaryModel, Entity as Binary};
use crate::database::entity::project::ProjectModel;
use crate::database::entity::repo::RepoModel;
use crate::database::ChacraDatabase;
use crate::derive::{derive_fields, WriteStage};
use crate::error::{ServerError, ServerResult};
use crate::grouping::{find_or_create_repo, GroupingKey};
use chacra::api::v1::binary::BinaryFields;
use chacra::binary::BinaryAttrs;

/// How many times a write that lost a race is attempted.
const MAX_WRITE_ATTEMPTS: u32 = 8;

/// A request to create a binary.
#[derive(Debug, Clone)]
pub struct NewBinary {
    name: String,
    project_id: i64,
    repo: Option<RepoModel>,
    fields: BinaryFields,
}

/// A binary about to be written.
///
/// This is the in-memory form the derivation pipeline works on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingBinary {
    pub name: String,
    pub project_id: i64,
    pub attrs: BinaryAttrs,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub signed: bool,
    pub checksum: Option<String>,
}

impl NewBinary {
    pub fn new(name: impl Into<String>, project: &ProjectModel, fields: BinaryFields) -> Self {
        Self {
            name: name.into(),
            project_id: project.id,
            repo: None,
            fields,
        }
    }

    /// Places the binary in a specific repo instead of resolving one.
    pub fn with_repo(mut self, repo: RepoModel) -> Self {
        self.repo = Some(repo);
        self
    }
}

impl PendingBinary {
    /// Creates a pending binary stamped with `now`.
    fn create(name: String, project_id: i64, attrs: BinaryAttrs, now: DateTime<Utc>) -> Self {
        Self {
            name,
            project_id,
            attrs,
            created: now,
            modified: now,
            signed: false,
            checksum: None,
        }
    }

    fn from_model(model: BinaryModel) -> Self {
        Self {
            attrs: model.attrs(),
            name: model.name,
            project_id: model.project_id,
            created: model.created,
            modified: model.modified,
            signed: model.signed,
            checksum: model.checksum,
        }
    }

    fn into_active_model(self, repo_id: i64) -> binary::ActiveModel {
        let BinaryAttrs {
            path,
            distro,
            distro_version,
            arch,
            git_ref,
            built_by,
            size,
        } = self.attrs;

        binary::ActiveModel {
            id: NotSet,
            name: Set(self.name),
            path: Set(path),
            git_ref: Set(git_ref),
            distro: Set(distro),
            distro_version: Set(distro_version),
            arch: Set(arch),
            built_by: Set(built_by),
            created: Set(self.created),
            modified: Set(self.modified),
            signed: Set(self.signed),
            size: Set(size),
            checksum: Set(self.checksum),
            project_id: Set(self.project_id),
            repo_id: Set(repo_id),
        }
    }
}

/// Creates a binary.
///
/// Unless a repo was supplied, the binary is placed in the repo for its
/// `(project, ref, distro, distro_version)`, which is created if needed.
/// The repo and the binary are committed in the same transaction.
#[instrument(skip_all, fields(name = %new.name, project_id = new.project_id))]
pub async fn create_binary(
    database: &DatabaseConnection,
    new: NewBinary,
) -> ServerResult<BinaryModel> {
    let NewBinary {
        name,
        project_id,
        repo,
        fields,
    } = new;

    let attrs = BinaryAttrs::from_fields(fields);
    attrs.validate(&name)?;

    if let Some(repo) = &repo {
        if repo.project_id != project_id {
            return Err(ServerError::RepoProjectMismatch);
        }
    }

    let mut pending = PendingBinary::create(name, project_id, attrs, Utc::now());
    tracing::debug!(stage = ?WriteStage::Pending);

    // A new binary is modified at the instant it is created
    let created = pending.created;
    derive_fields(&mut pending, created).await?;

    let repo_id = repo.map(|repo| repo.id);
    let mut attempt = 1;
    loop {
        match insert_binary(database, pending.clone(), repo_id).await {
            Ok(binary) => {
                tracing::info!(
                    stage = ?WriteStage::Committed,
                    binary_id = binary.id,
                    repo_id = binary.repo_id,
                    "Created binary"
                );
                return Ok(binary);
            }
            Err(e) if e.is_transient() && attempt < MAX_WRITE_ATTEMPTS => {
                tracing::debug!(attempt, "Retrying insert: {}", e);
                backoff(attempt).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::warn!(stage = ?WriteStage::Aborted, "Could not create binary: {}", e);
                return Err(e);
            }
        }
    }
}

/// Writes a new binary and, if needed, its repo in one transaction.
async fn insert_binary(
    database: &DatabaseConnection,
    pending: PendingBinary,
    repo_id: Option<i64>,
) -> ServerResult<BinaryModel> {
    let txn = database
        .begin()
        .await
        .map_err(ServerError::database_error)?;

    let repo_id = match repo_id {
        Some(repo_id) => repo_id,
        None => {
            let key = GroupingKey::for_binary(pending.project_id, &pending.attrs);
            find_or_create_repo(&txn, &key).await?.id
        }
    };

    let binary = pending
        .into_active_model(repo_id)
        .insert(&txn)
        .await
        .map_err(|e| ServerError::write_error(e, ServerError::WriteConflict))?;

    txn.commit()
        .await
        .map_err(|e| ServerError::write_error(e, ServerError::WriteConflict))?;

    Ok(binary)
}

/// Updates a binary from a client payload.
///
/// Only the fields present in `fields` change. The repo of a binary is
/// fixed at creation and is not re-resolved.
///
/// If another writer changes the binary in the meantime, the payload is
/// applied again on top of its version. Nothing the other writer set
/// is lost.
#[instrument(skip(database, fields))]
pub async fn update_binary(
    database: &DatabaseConnection,
    binary_id: i64,
    fields: BinaryFields,
) -> ServerResult<BinaryModel> {
    let mut attempt = 1;
    loop {
        let existing = database.find_binary(binary_id).await?;

        match try_update_binary(database, existing, fields.clone()).await {
            Ok(Some(binary)) => {
                tracing::info!(stage = ?WriteStage::Committed, "Updated binary");
                return Ok(binary);
            }
            Ok(None) => {
                tracing::debug!(attempt, "Binary was modified concurrently");
            }
            Err(e) if e.is_transient() => {
                tracing::debug!(attempt, "Retrying update: {}", e);
            }
            Err(e) => return Err(e),
        }

        if attempt >= MAX_WRITE_ATTEMPTS {
            tracing::warn!(stage = ?WriteStage::Aborted, "Giving up on contended binary");
            return Err(ServerError::WriteConflict);
        }

        backoff(attempt).await;
        attempt += 1;
    }
}

/// Applies `fields` to `existing` and writes the result.
///
/// The write only goes through if the stored binary is still the one
/// that was read. Returns `None` if it changed in the meantime.
pub(crate) async fn try_update_binary(
    database: &DatabaseConnection,
    existing: BinaryModel,
    fields: BinaryFields,
) -> ServerResult<Option<BinaryModel>> {
    let binary_id = existing.id;
    let repo_id = existing.repo_id;
    let read_modified = existing.modified;

    let mut pending = PendingBinary::from_model(existing);
    pending.attrs.apply(fields);
    pending.attrs.validate(&pending.name)?;
    tracing::debug!(stage = ?WriteStage::Pending);

    // Every write must move `modified` forward, or the guard below
    // would let a second stale writer through
    let now = Utc::now().max(read_modified + TimeDelta::microseconds(1));
    derive_fields(&mut pending, now).await?;

    let txn = database
        .begin()
        .await
        .map_err(ServerError::database_error)?;

    let result = Binary::update_many()
        .set(pending.into_active_model(repo_id))
        .filter(binary::Column::Id.eq(binary_id))
        .filter(binary::Column::Modified.eq(read_modified))
        .exec(&txn)
        .await
        .map_err(|e| ServerError::write_error(e, ServerError::WriteConflict))?;

    if result.rows_affected == 0 {
        return Ok(None);
    }

    let binary = Binary::find_by_id(binary_id)
        .one(&txn)
        .await
        .map_err(ServerError::database_error)?
        .ok_or(ServerError::NoSuchBinary)?;

    txn.commit()
        .await
        .map_err(|e| ServerError::write_error(e, ServerError::WriteConflict))?;

    Ok(Some(binary))
}

async fn backoff(attempt: u32) {
    tokio::time::sleep(Duration::from_millis(10 * u64::from(attempt))).await;
}
