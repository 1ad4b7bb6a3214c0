use anyhow::Result;
use clap::Parser;

use chacra_server::config::Config;
use chacra_server::database::Session;
use chacra_server::StateInner;

/// Show a binary.
///
/// Prints the binary as JSON, and when it last changed to stderr.
#[derive(Debug, Parser)]
pub struct ShowBinary {
    /// ID of the binary.
    id: i64,
}

pub async fn run(config: Config, sub: ShowBinary) -> Result<()> {
    let state = StateInner::new(config);
    let session = Session::new(state.database().await?.clone());

    let handle = session.find_binary(sub.id).await?;
    let binary = handle.get()?;

    eprintln!("{} last changed {}", handle, binary.last_changed());
    println!("{}", serde_json::to_string_pretty(&binary.to_binary_info())?);

    session.close();

    Ok(())
}
