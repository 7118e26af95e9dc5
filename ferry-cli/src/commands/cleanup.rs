//! Reclaim expired leases

use crate::config::Config;
use anyhow::Result;

pub async fn run(config: &Config, session: &str) -> Result<()> {
    let (coordinator, _) = config.open_coordinator()?;
    let reclaimed = coordinator.cleanup_expired_leases(session).await?;
    println!("reclaimed {} expired leases", reclaimed);
    Ok(())
}
