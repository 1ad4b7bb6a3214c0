pub mod entity;
pub mod migration;
mod session;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::query::QueryOrder;
use sea_orm::sea_query::OnConflict;
use sea_orm::ActiveValue::Set;
use sea_orm::DatabaseConnection;

use crate::error::{ServerError, ServerResult};
use entity::binary::{self, BinaryModel, Entity as Binary};
use entity::project::{self, Entity as Project, ProjectModel};
use entity::repo::{Entity as Repo, RepoModel};

pub use session::{BinaryHandle, Session};

#[async_trait]
pub trait ChacraDatabase: Send + Sync {
    /// Retrieves a project by name.
    async fn find_project(&self, name: &str) -> ServerResult<ProjectModel>;

    /// Retrieves a project by name, creating it if it doesn't exist.
    async fn find_or_create_project(&self, name: &str) -> ServerResult<ProjectModel>;

    /// Retrieves a repo.
    async fn find_repo(&self, repo_id: i64) -> ServerResult<RepoModel>;

    /// Retrieves a binary.
    async fn find_binary(&self, binary_id: i64) -> ServerResult<BinaryModel>;

    /// Lists the binaries grouped under a repo, oldest first.
    async fn list_binaries_for_repo(&self, repo_id: i64) -> ServerResult<Vec<BinaryModel>>;

    /// Lists the binaries of a project, oldest first.
    async fn list_binaries_for_project(&self, project_id: i64) -> ServerResult<Vec<BinaryModel>>;
}

#[async_trait]
impl ChacraDatabase for DatabaseConnection {
    async fn find_project(&self, name: &str) -> ServerResult<ProjectModel> {
        Project::find()
            .filter(project::Column::Name.eq(name))
            .one(self)
            .await
            .map_err(ServerError::database_error)?
            .ok_or(ServerError::NoSuchProject)
    }

    async fn find_or_create_project(&self, name: &str) -> ServerResult<ProjectModel> {
        Project::insert(project::ActiveModel {
            name: Set(name.to_owned()),
            created_at: Set(Utc::now()),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::column(project::Column::Name)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(self)
        .await
        .map_err(ServerError::database_error)?;

        self.find_project(name).await
    }

    async fn find_repo(&self, repo_id: i64) -> ServerResult<RepoModel> {
        Repo::find_by_id(repo_id)
            .one(self)
            .await
            .map_err(ServerError::database_error)?
            .ok_or(ServerError::NoSuchRepo)
    }

    async fn find_binary(&self, binary_id: i64) -> ServerResult<BinaryModel> {
        Binary::find_by_id(binary_id)
            .one(self)
            .await
            .map_err(ServerError::database_error)?
            .ok_or(ServerError::NoSuchBinary)
    }

    async fn list_binaries_for_repo(&self, repo_id: i64) -> ServerResult<Vec<BinaryModel>> {
        Binary::find()
            .filter(binary::Column::RepoId.eq(repo_id))
            .order_by_asc(binary::Column::Id)
            .all(self)
            .await
            .map_err(ServerError::database_error)
    }

    async fn list_binaries_for_project(&self, project_id: i64) -> ServerResult<Vec<BinaryModel>> {
        Binary::find()
            .filter(binary::Column::ProjectId.eq(project_id))
            .order_by_asc(binary::Column::Id)
            .all(self)
            .await
            .map_err(ServerError::database_error)
    }
}
