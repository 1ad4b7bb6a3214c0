//! Database migrations.

pub use sea_orm_migration::*;

mod m20261016_000001_create_project_table;
mod m20261016_000002_create_repo_table;
mod m20261016_000003_create_binary_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261016_000001_create_project_table::Migration),
            Box::new(m20261016_000002_create_repo_table::Migration),
            Box::new(m20261016_000003_create_binary_table::Migration),
        ]
    }
}
