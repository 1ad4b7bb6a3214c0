use anyhow::{Context, Result};
use clap::Parser;

use chacra::api::v1::binary::BinaryFields;
use chacra_server::binary::update_binary;
use chacra_server::config::Config;
use chacra_server::StateInner;

/// Update the metadata of a binary.
///
/// The payload is a JSON object. Only `path`, `distro`,
/// `distro_version`, `arch`, `ref`, `built_by` and `size` are
/// recognized, other keys are ignored. For example:
///
/// $ chacraadm update-binary 42 '{"path": "/srv/ceph-2.deb", "size": 1024}'
#[derive(Debug, Parser)]
pub struct UpdateBinary {
    /// ID of the binary.
    id: i64,

    /// The JSON payload.
    payload: String,
}

pub async fn run(config: Config, sub: UpdateBinary) -> Result<()> {
    let fields: BinaryFields =
        serde_json::from_str(&sub.payload).context("Invalid JSON payload")?;

    let state = StateInner::new(config);
    let database = state.database().await?;

    let binary = update_binary(database, sub.id, fields).await?;

    println!("{}", serde_json::to_string_pretty(&binary.to_binary_info())?);

    Ok(())
}
