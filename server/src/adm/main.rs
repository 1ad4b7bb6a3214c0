mod command;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use chacra_server::config;
use command::add_binary::{self, AddBinary};
use command::list_binaries::{self, ListBinaries};
use command::show_binary::{self, ShowBinary};
use command::update_binary::{self, UpdateBinary};

/// Chacra server administration utilities.
#[derive(Debug, Parser)]
#[clap(version)]
#[clap(propagate_version = true)]
pub struct Opts {
    /// Path to the config file.
    #[clap(short = 'f', long)]
    config: Option<PathBuf>,

    /// The sub-command.
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    AddBinary(AddBinary),
    UpdateBinary(UpdateBinary),
    ListBinaries(ListBinaries),
    ShowBinary(ShowBinary),
}

#[tokio::main]
async fn main() -> Result<()> {
    let opts = Opts::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = config::load_config(opts.config.as_deref())?;

    match opts.command {
        Command::AddBinary(sub) => add_binary::run(config, sub).await?,
        Command::UpdateBinary(sub) => update_binary::run(config, sub).await?,
        Command::ListBinaries(sub) => list_binaries::run(config, sub).await?,
        Command::ShowBinary(sub) => show_binary::run(config, sub).await?,
    }

    Ok(())
}
