//! Session registry commands

use crate::config::Config;
use anyhow::Result;
use chrono::Utc;
use ferry_storage::Session;

pub async fn create(config: &Config, name: &str) -> Result<()> {
    let sessions = config.open_session_store()?;
    sessions.create(Session::new(name, Utc::now())).await?;
    println!("{}", name);
    Ok(())
}

pub async fn list(config: &Config) -> Result<()> {
    let sessions = config.open_session_store()?;
    for session in sessions.list().await? {
        println!(
            "{}\t{}",
            session.name,
            session.created.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

pub async fn delete(config: &Config, name: &str) -> Result<()> {
    let sessions = config.open_session_store()?;
    sessions.delete(name).await?;
    println!("deleted {}", name);
    Ok(())
}
