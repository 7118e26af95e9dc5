//! Serve the coordination HTTP API

use crate::config::Config;
use anyhow::Result;
use ferry_api::AppState;
use ferry_coordinator::ShardStatusDeriver;
use std::sync::Arc;
use tracing::info;

pub async fn run(config: &Config, port: u16) -> Result<()> {
    let (coordinator, sessions) = config.open_coordinator()?;

    // Deep status is only served when a target cluster is configured.
    let deriver = config
        .cluster_client()?
        .map(|client| Arc::new(ShardStatusDeriver::new(client)));
    if deriver.is_none() {
        info!("no target cluster configured; deep status checks disabled");
    }

    let state = AppState {
        coordinator,
        sessions,
        deriver,
    };
    ferry_api::serve(state, port).await?;
    Ok(())
}
