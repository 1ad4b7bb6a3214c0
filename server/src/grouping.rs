//! Repo resolution for new binaries.
//!
//! Binaries are grouped into repos by `(project, ref, distro,
//! distro_version)`. Repos are created lazily the first time a binary
//! needs one.
//!
//! Two uploads for a brand new grouping may race. The unique index on
//! the grouping tuple settles it: the losing insert does nothing and
//! both writers read back the same row. Any lock contention on the way
//! is reported as [`ServerError::GroupingConflict`] so the caller can
//! retry the whole write.

use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::OnConflict;
use sea_orm::ActiveValue::Set;
use sea_orm::ConnectionTrait;
use tracing::instrument;

use crate::database::entity::repo::{self, Entity as Repo, RepoModel};
use crate::error::{ServerError, ServerResult};
use chacra::binary::BinaryAttrs;

/// The identity of a repo.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupingKey {
    pub project_id: i64,

    /// The ref, or an empty string for binaries without one.
    pub git_ref: String,

    pub distro: String,

    pub distro_version: String,
}

impl GroupingKey {
    /// Returns the grouping a binary with `attrs` belongs to.
    pub fn for_binary(project_id: i64, attrs: &BinaryAttrs) -> Self {
        Self {
            project_id,
            git_ref: attrs.grouping_ref().unwrap_or_default().to_owned(),
            distro: attrs.distro.clone(),
            distro_version: attrs.distro_version.clone(),
        }
    }
}

/// Finds the repo identified by `key`.
pub async fn find_repo_by_key<C>(conn: &C, key: &GroupingKey) -> ServerResult<Option<RepoModel>>
where
    C: ConnectionTrait,
{
    Repo::find()
        .filter(repo::Column::ProjectId.eq(key.project_id))
        .filter(repo::Column::GitRef.eq(key.git_ref.as_str()))
        .filter(repo::Column::Distro.eq(key.distro.as_str()))
        .filter(repo::Column::DistroVersion.eq(key.distro_version.as_str()))
        .one(conn)
        .await
        .map_err(ServerError::database_error)
}

/// Finds the repo identified by `key`, creating it if it doesn't exist.
///
/// Call this with the transaction that writes the binary so that a
/// new repo is only persisted together with it.
#[instrument(skip(conn))]
pub async fn find_or_create_repo<C>(conn: &C, key: &GroupingKey) -> ServerResult<RepoModel>
where
    C: ConnectionTrait,
{
    if let Some(existing) = find_repo_by_key(conn, key).await? {
        tracing::debug!(repo_id = existing.id, "Found existing repo");
        return Ok(existing);
    }

    let num_inserted = Repo::insert(repo::ActiveModel {
        project_id: Set(key.project_id),
        git_ref: Set(key.git_ref.clone()),
        distro: Set(key.distro.clone()),
        distro_version: Set(key.distro_version.clone()),
        created_at: Set(Utc::now()),
        ..Default::default()
    })
    .on_conflict(
        OnConflict::columns([
            repo::Column::ProjectId,
            repo::Column::GitRef,
            repo::Column::Distro,
            repo::Column::DistroVersion,
        ])
        .do_nothing()
        .to_owned(),
    )
    .exec_without_returning(conn)
    .await
    .map_err(|e| ServerError::write_error(e, ServerError::GroupingConflict))?;

    if num_inserted == 0 {
        tracing::debug!("Repo was created concurrently");
    }

    // Whoever won the insert, the row must be visible now. If it isn't,
    // the other writer rolled back after we tried to insert.
    match find_repo_by_key(conn, key).await? {
        Some(repo) => {
            tracing::debug!(repo_id = repo.id, "Using new repo");
            Ok(repo)
        }
        None => Err(ServerError::GroupingConflict),
    }
}
