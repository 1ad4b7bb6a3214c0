//! A built binary artifact.

use sea_orm::entity::prelude::*;

use chacra::api::v1::binary::BinaryInfo;
use chacra::binary::BinaryAttrs;
use chacra::util::last_seen;

pub type BinaryModel = Model;

/// A built binary artifact.
///
/// `modified` and `checksum` are maintained by the server on every
/// write and are never taken from clients.
#[derive(Debug, Clone, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "binary")]
pub struct Model {
    /// Unique numeric ID of the binary.
    #[sea_orm(primary_key)]
    pub id: i64,

    /// File name of the binary.
    #[sea_orm(column_type = "String(StringLen::N(256))", indexed)]
    pub name: String,

    /// Location of the artifact on disk.
    #[sea_orm(column_type = "String(StringLen::N(256))", nullable)]
    pub path: Option<String>,

    /// The source revision the binary was built from.
    #[sea_orm(
        column_name = "ref",
        column_type = "String(StringLen::N(256))",
        nullable,
        indexed
    )]
    pub git_ref: Option<String>,

    #[sea_orm(column_type = "String(StringLen::N(256))", indexed)]
    pub distro: String,

    #[sea_orm(column_type = "String(StringLen::N(256))", indexed)]
    pub distro_version: String,

    #[sea_orm(column_type = "String(StringLen::N(256))", indexed)]
    pub arch: String,

    /// Identity of the builder.
    #[sea_orm(column_type = "String(StringLen::N(256))", nullable)]
    pub built_by: Option<String>,

    /// Timestamp when the binary is created.
    #[sea_orm(indexed)]
    pub created: ChronoDateTimeUtc,

    /// Timestamp of the last write to the binary.
    ///
    /// Always at least `created`.
    #[sea_orm(indexed)]
    pub modified: ChronoDateTimeUtc,

    /// Whether the binary has been signed.
    pub signed: bool,

    /// Size of the binary in bytes.
    pub size: i64,

    /// Hexadecimal SHA-512 of the file at `path`.
    #[sea_orm(column_type = "String(StringLen::N(256))", nullable)]
    pub checksum: Option<String>,

    /// ID of the project the binary belongs to.
    #[sea_orm(indexed)]
    pub project_id: i64,

    /// ID of the repo the binary is grouped under.
    #[sea_orm(indexed)]
    pub repo_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id"
    )]
    Project,

    #[sea_orm(
        belongs_to = "super::repo::Entity",
        from = "Column::RepoId",
        to = "super::repo::Column::Id"
    )]
    Repo,
}

impl Model {
    /// Returns the client-settable attributes of this binary.
    pub fn attrs(&self) -> BinaryAttrs {
        BinaryAttrs {
            path: self.path.clone(),
            distro: self.distro.clone(),
            distro_version: self.distro_version.clone(),
            arch: self.arch.clone(),
            git_ref: self.git_ref.clone(),
            built_by: self.built_by.clone(),
            size: self.size,
        }
    }

    /// Returns the later of the creation and modification timestamps.
    pub fn last_changed_at(&self) -> ChronoDateTimeUtc {
        self.modified.max(self.created)
    }

    /// Returns a human-readable rendering of when the binary last changed.
    pub fn last_changed(&self) -> String {
        last_seen(self.last_changed_at())
    }

    /// Converts this binary to its public representation.
    pub fn to_binary_info(&self) -> BinaryInfo {
        BinaryInfo {
            name: self.name.clone(),
            created: self.created,
            modified: self.modified,
            signed: self.signed,
            size: self.size,
            path: self.path.clone(),
            last_changed: self.last_changed(),
            built_by: self.built_by.clone(),
            distro: self.distro.clone(),
            distro_version: self.distro_version.clone(),
            checksum: self.checksum.clone(),
            arch: self.arch.clone(),
            git_ref: self.git_ref.clone(),
        }
    }
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl Related<super::repo::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Repo.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
