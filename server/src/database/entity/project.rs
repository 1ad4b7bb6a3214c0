//! A project that produces binaries.

use sea_orm::entity::prelude::*;

pub type ProjectModel = Model;

/// A project.
///
/// Only the identity of a project matters to binaries and repos.
#[derive(Debug, Clone, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "project")]
pub struct Model {
    /// Unique numeric ID of the project.
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Unique name of the project.
    #[sea_orm(column_type = "String(StringLen::N(256))", unique, indexed)]
    pub name: String,

    /// Timestamp when the project is created.
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::repo::Entity")]
    Repo,

    #[sea_orm(has_many = "super::binary::Entity")]
    Binary,
}

impl Related<super::repo::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Repo.def()
    }
}

impl Related<super::binary::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Binary.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
