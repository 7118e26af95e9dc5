//! Working-state index archive
//!
//! Once a backfill has drained, the working-state index is backed up to a
//! local JSON file and deleted from the cluster. Archiving while any worker
//! is still scheduled is refused: a live worker could write a claim into the
//! index between the backup and the delete.

use crate::client::ClusterClient;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use ferry_coordinator::DeploymentStatus;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::info;

const SCROLL_KEEP_ALIVE: &str = "1m";
const SCROLL_PAGE_SIZE: u64 = 1000;

/// Destination path for a working-state backup. Defaults to
/// `$SHARED_LOGS_DIR_PATH/backfill_working_state` or
/// `./backfill_working_state`, with a timestamped file name.
pub fn backup_path(
    archive_dir: Option<&Path>,
    archive_file: Option<&str>,
    now: DateTime<Utc>,
) -> PathBuf {
    let dir = match archive_dir {
        Some(dir) => dir.to_path_buf(),
        None => match std::env::var("SHARED_LOGS_DIR_PATH") {
            Ok(shared) => Path::new(&shared).join("backfill_working_state"),
            Err(_) => PathBuf::from("./backfill_working_state"),
        },
    };
    let file = match archive_file {
        Some(file) => file.to_string(),
        None => format!("working_state_backup_{}.json", now.format("%Y%m%d%H%M%S")),
    };
    dir.join(file)
}

/// Fetch every document in `index` via the scroll API.
pub async fn fetch_all_documents(client: &ClusterClient, index: &str) -> Result<Vec<Value>> {
    let body = json!({ "size": SCROLL_PAGE_SIZE, "query": { "match_all": {} } });
    let mut response = client
        .search_with_params(index, &[("scroll", SCROLL_KEEP_ALIVE)], &body)
        .await?;

    let mut documents = Vec::new();
    loop {
        let hits = response["hits"]["hits"].as_array().cloned().unwrap_or_default();
        if hits.is_empty() {
            break;
        }
        documents.extend(hits);

        let Some(scroll_id) = response["_scroll_id"].as_str().map(str::to_owned) else {
            break;
        };
        response = client.scroll(&scroll_id, SCROLL_KEEP_ALIVE).await?;
    }
    Ok(documents)
}

/// Back up the working-state index to `backup` and delete it from the
/// cluster. Refuses with [`Error::WorkersInProgress`] while the deployment
/// still has desired, running or pending workers, and with
/// [`Error::IndexNotFound`] when there is nothing to archive.
pub async fn perform_archive(
    client: &ClusterClient,
    deployment: &DeploymentStatus,
    index: &str,
    backup: &Path,
) -> Result<()> {
    if deployment.workers_in_progress() {
        return Err(Error::WorkersInProgress);
    }
    if !client.index_exists(index).await? {
        return Err(Error::IndexNotFound(index.to_string()));
    }

    let documents = fetch_all_documents(client, index).await?;
    info!(
        index,
        documents = documents.len(),
        backup = %backup.display(),
        "backing up working state index"
    );

    if let Some(parent) = backup.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(backup, serde_json::to_vec_pretty(&documents)?)?;

    client.delete_index(index).await?;
    info!(index, "working state index deleted");
    Ok(())
}
