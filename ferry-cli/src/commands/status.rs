//! Queue and deep status reporting

use crate::config::Config;
use anyhow::{bail, Result};
use ferry_coordinator::{BackfillOverallStatus, BackfillStatusSource, ShardStatusDeriver};

pub async fn run(
    config: &Config,
    session: &str,
    deep: bool,
    active_workers: bool,
    json: bool,
) -> Result<()> {
    let status = if deep {
        let Some(client) = config.cluster_client()? else {
            bail!("deep status requires FERRY_TARGET_HOST to be configured");
        };
        let deriver = ShardStatusDeriver::new(client);
        deriver.overall_status(session, active_workers).await?
    } else {
        let (coordinator, _) = config.open_coordinator()?;
        coordinator.overall_status(session, active_workers).await?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }
    print_status(&status);
    Ok(())
}

fn print_status(status: &BackfillOverallStatus) {
    println!("Status:      {:?}", status.status);
    println!("Progress:    {:.1}%", status.percentage_completed);
    println!(
        "Shards:      {}/{} complete, {} in progress, {} waiting",
        status.shard_complete, status.shard_total, status.shard_in_progress, status.shard_waiting
    );
    if let Some(eta_ms) = status.eta_ms {
        println!("ETA:         {}", format_eta(eta_ms));
    }
    if let Some(started) = status.started {
        println!("Started:     {}", started.format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(finished) = status.finished {
        println!("Finished:    {}", finished.format("%Y-%m-%d %H:%M:%S"));
    }
}

fn format_eta(eta_ms: f64) -> String {
    let total_secs = (eta_ms / 1000.0).round() as i64;
    if total_secs < 60 {
        format!("{}s", total_secs)
    } else if total_secs < 3600 {
        format!("{}m {}s", total_secs / 60, total_secs % 60)
    } else {
        format!("{}h {}m", total_secs / 3600, (total_secs % 3600) / 60)
    }
}
