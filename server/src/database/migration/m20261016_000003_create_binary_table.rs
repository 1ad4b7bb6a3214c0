use sea_orm_migration::prelude::*;

use crate::database::entity::binary::*;
use crate::database::entity::project;
use crate::database::entity::repo;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20261016_000003_create_binary_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Column::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Column::Name).string_len(256).not_null())
                    .col(ColumnDef::new(Column::Path).string_len(256).null())
                    .col(ColumnDef::new(Column::GitRef).string_len(256).null())
                    .col(ColumnDef::new(Column::Distro).string_len(256).not_null())
                    .col(
                        ColumnDef::new(Column::DistroVersion)
                            .string_len(256)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Column::Arch).string_len(256).not_null())
                    .col(ColumnDef::new(Column::BuiltBy).string_len(256).null())
                    .col(
                        ColumnDef::new(Column::Created)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Column::Modified)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Column::Signed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Column::Size)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Column::Checksum).string_len(256).null())
                    .col(ColumnDef::new(Column::ProjectId).big_integer().not_null())
                    .col(ColumnDef::new(Column::RepoId).big_integer().not_null())
                    .foreign_key(
                        ForeignKeyCreateStatement::new()
                            .name("fk_binary_project")
                            .from_tbl(Entity)
                            .from_col(Column::ProjectId)
                            .to_tbl(project::Entity)
                            .to_col(project::Column::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKeyCreateStatement::new()
                            .name("fk_binary_repo")
                            .from_tbl(Entity)
                            .from_col(Column::RepoId)
                            .to_tbl(repo::Entity)
                            .to_col(repo::Column::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        for (name, column) in [
            ("idx-binary-name", Column::Name),
            ("idx-binary-ref", Column::GitRef),
            ("idx-binary-distro", Column::Distro),
            ("idx-binary-distro-version", Column::DistroVersion),
            ("idx-binary-arch", Column::Arch),
            ("idx-binary-created", Column::Created),
            ("idx-binary-modified", Column::Modified),
            ("idx-binary-project", Column::ProjectId),
            ("idx-binary-repo", Column::RepoId),
        ] {
            manager
                .create_index(
                    Index::create()
                        .name(name)
                        .table(Entity)
                        .col(column)
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }
}
