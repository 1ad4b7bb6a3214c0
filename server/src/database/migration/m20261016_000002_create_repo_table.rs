use sea_orm_migration::prelude::*;

use crate::database::entity::project;
use crate::database::entity::repo::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20261016_000002_create_repo_table"
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
                    .col(ColumnDef::new(Column::ProjectId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Column::GitRef)
                            .string_len(256)
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Column::Distro).string_len(256).not_null())
                    .col(
                        ColumnDef::new(Column::DistroVersion)
                            .string_len(256)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Column::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKeyCreateStatement::new()
                            .name("fk_repo_project")
                            .from_tbl(Entity)
                            .from_col(Column::ProjectId)
                            .to_tbl(project::Entity)
                            .to_col(project::Column::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Grouping resolution relies on this to settle concurrent inserts
        manager
            .create_index(
                Index::create()
                    .name("idx-repo-grouping")
                    .table(Entity)
                    .col(Column::ProjectId)
                    .col(Column::GitRef)
                    .col(Column::Distro)
                    .col(Column::DistroVersion)
                    .unique()
                    .to_owned(),
            )
            .await
    }
}
