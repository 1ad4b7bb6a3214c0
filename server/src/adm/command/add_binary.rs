use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;

use chacra::api::v1::binary::BinaryFields;
use chacra_server::binary::{create_binary, NewBinary};
use chacra_server::config::Config;
use chacra_server::database::ChacraDatabase;
use chacra_server::StateInner;

/// Register a built binary.
///
/// The binary is placed in the repo for its project, ref and distro
/// release, which is created if needed. For example:
///
/// $ chacraadm add-binary --project ceph --distro ubuntu --distro-version 20.04 --arch amd64 --path /srv/ceph.deb ceph.deb
#[derive(Debug, Parser)]
pub struct AddBinary {
    /// File name of the binary.
    name: String,

    /// The project the binary belongs to.
    ///
    /// The project is created if it doesn't exist.
    #[clap(long)]
    project: String,

    #[clap(long)]
    distro: String,

    #[clap(long)]
    distro_version: String,

    #[clap(long)]
    arch: String,

    /// Location of the artifact on disk.
    #[clap(long)]
    path: Option<PathBuf>,

    /// The source revision the binary was built from.
    #[clap(long = "ref")]
    git_ref: Option<String>,

    /// Identity of the builder.
    #[clap(long)]
    built_by: Option<String>,

    /// Size of the binary in bytes.
    #[clap(long)]
    size: Option<i64>,
}

pub async fn run(config: Config, sub: AddBinary) -> Result<()> {
    let path = sub.path.map(path_to_string).transpose()?;

    let state = StateInner::new(config);
    let database = state.database().await?;

    let project = database.find_or_create_project(&sub.project).await?;

    let fields = BinaryFields {
        path,
        distro: Some(sub.distro),
        distro_version: Some(sub.distro_version),
        arch: Some(sub.arch),
        git_ref: sub.git_ref,
        built_by: sub.built_by,
        size: sub.size,
    };

    let binary = create_binary(database, NewBinary::new(sub.name, &project, fields)).await?;

    println!("{}", serde_json::to_string_pretty(&binary.to_binary_info())?);

    Ok(())
}

/// Converts a path for storage, refusing ones that aren't valid UTF-8.
///
/// A lossy conversion would store a different path than the one that
/// gets checksummed.
fn path_to_string(path: PathBuf) -> Result<String> {
    path.into_os_string()
        .into_string()
        .map_err(|path| anyhow!("Path {:?} is not valid UTF-8", path))
}
