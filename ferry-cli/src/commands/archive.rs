//! Archive the working-state index

use crate::config::Config;
use anyhow::{bail, Context, Result};
use chrono::Utc;
use ferry_cluster::{backup_path, perform_archive};
use ferry_coordinator::{working_state_index, DeploymentStatus, ShardStatusDeriver};
use std::path::Path;

pub async fn run(
    config: &Config,
    session: &str,
    dir: Option<&Path>,
    file: Option<&str>,
) -> Result<()> {
    let Some(client) = config.cluster_client()? else {
        bail!("archive requires FERRY_TARGET_HOST to be configured");
    };

    // Refuse while unfinished shards remain; a worker could still pick them
    // up and write into the index we are about to delete.
    let deriver = ShardStatusDeriver::new(client.clone());
    if !deriver.all_shards_finished(session).await? {
        bail!("shards are still unfinished; refusing to archive the working state index");
    }

    let index = working_state_index(session);
    let backup = backup_path(dir, file, Utc::now());
    perform_archive(&client, &DeploymentStatus::default(), &index, &backup)
        .await
        .with_context(|| format!("failed to archive {}", index))?;

    println!("{}", backup.display());
    Ok(())
}
