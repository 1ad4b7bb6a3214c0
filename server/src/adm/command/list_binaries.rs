use anyhow::Result;
use clap::Parser;

use chacra_server::config::Config;
use chacra_server::database::ChacraDatabase;
use chacra_server::StateInner;

/// List binaries of a repo or a project.
#[derive(Debug, Parser)]
#[clap(group(clap::ArgGroup::new("owner").required(true)))]
pub struct ListBinaries {
    /// ID of the repo.
    #[clap(long, group = "owner")]
    repo: Option<i64>,

    /// Name of the project.
    #[clap(long, group = "owner")]
    project: Option<String>,
}

pub async fn run(config: Config, sub: ListBinaries) -> Result<()> {
    let state = StateInner::new(config);
    let database = state.database().await?;

    let binaries = match (sub.repo, sub.project) {
        (Some(repo_id), _) => {
            let repo = database.find_repo(repo_id).await?;
            database.list_binaries_for_repo(repo.id).await?
        }
        (None, Some(project)) => {
            let project = database.find_project(&project).await?;
            database.list_binaries_for_project(project.id).await?
        }
        (None, None) => unreachable!("clap requires one of --repo and --project"),
    };

    let infos: Vec<_> = binaries.iter().map(|b| b.to_binary_info()).collect();
    println!("{}", serde_json::to_string_pretty(&infos)?);

    Ok(())
}
