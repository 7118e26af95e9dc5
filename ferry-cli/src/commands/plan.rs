//! Batch-create work items from a shard manifest
//!
//! The manifest is a JSON array of shard descriptors:
//!
//! ```json
//! [
//!   { "work_item_id": "logs__0", "index_name": "logs", "shard_number": 0,
//!     "document_count": 120000, "total_size_bytes": 734003200 }
//! ]
//! ```

use crate::config::Config;
use anyhow::{Context, Result};
use ferry_storage::NewWorkItem;
use std::path::Path;
use tracing::info;

pub async fn run(config: &Config, session: &str, manifest: &Path) -> Result<()> {
    let bytes = std::fs::read(manifest)
        .with_context(|| format!("failed to read manifest {}", manifest.display()))?;
    let shards: Vec<NewWorkItem> = serde_json::from_slice(&bytes)
        .with_context(|| format!("manifest {} is not a shard array", manifest.display()))?;

    info!(session, shards = shards.len(), "planning work items");
    let (coordinator, _) = config.open_coordinator()?;
    let outcome = coordinator.create_work_items(session, shards).await?;

    println!(
        "created {} work items, {} failed",
        outcome.created.len(),
        outcome.failed.len()
    );
    for failure in &outcome.failed {
        println!("  {}: {}", failure.work_item_id, failure.reason);
    }
    Ok(())
}
