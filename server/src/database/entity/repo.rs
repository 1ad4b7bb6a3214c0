//! A repo grouping binaries of a project.

use sea_orm::entity::prelude::*;

pub type RepoModel = Model;

/// A repo.
///
/// Binaries of the same project built from the same ref for the same
/// distro release share one repo. At most one repo exists for each
/// `(project_id, ref, distro, distro_version)` tuple, which is enforced
/// by a unique index.
#[derive(Debug, Clone, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "repo")]
pub struct Model {
    /// Unique numeric ID of the repo.
    #[sea_orm(primary_key)]
    pub id: i64,

    /// ID of the project the repo belongs to.
    #[sea_orm(indexed)]
    pub project_id: i64,

    /// The source revision of the binaries.
    ///
    /// This is an empty string for binaries without a ref. SQL unique
    /// indices consider NULLs distinct, so NULL can't be used here.
    #[sea_orm(column_name = "ref", column_type = "String(StringLen::N(256))")]
    pub git_ref: String,

    /// The distro the binaries are built for.
    #[sea_orm(column_type = "String(StringLen::N(256))")]
    pub distro: String,

    /// The distro version the binaries are built for.
    #[sea_orm(column_type = "String(StringLen::N(256))")]
    pub distro_version: String,

    /// Timestamp when the repo is created.
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id"
    )]
    Project,

    #[sea_orm(has_many = "super::binary::Entity")]
    Binary,
}

impl Model {
    /// Returns the ref of the repo, if any.
    pub fn git_ref(&self) -> Option<&str> {
        if self.git_ref.is_empty() {
            None
        } else {
            Some(&self.git_ref)
        }
    }
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl Related<super::binary::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Binary.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
