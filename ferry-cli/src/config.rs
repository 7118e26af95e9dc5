//! CLI configuration

use anyhow::Result;
use ferry_cluster::{ClusterClient, ClusterConfig};
use ferry_coordinator::LeaseCoordinator;
use ferry_storage::{JsonFileSessionStore, JsonFileWorkItemStore, SessionStore, WorkItemStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Resolved CLI configuration: store locations plus optional target-cluster
/// connection settings from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub work_items_path: PathBuf,
    pub sessions_path: PathBuf,
    pub target_host: Option<String>,
    pub target_username: Option<String>,
    pub target_password: Option<String>,
    pub target_insecure: bool,
}

impl Config {
    pub fn load(store_dir: &Path) -> Result<Self> {
        Ok(Self {
            work_items_path: store_dir.join("work_items.json"),
            sessions_path: store_dir.join("sessions.json"),
            target_host: std::env::var("FERRY_TARGET_HOST").ok(),
            target_username: std::env::var("FERRY_TARGET_USERNAME").ok(),
            target_password: std::env::var("FERRY_TARGET_PASSWORD").ok(),
            target_insecure: std::env::var("FERRY_TARGET_INSECURE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        })
    }

    pub fn open_session_store(&self) -> Result<Arc<dyn SessionStore>> {
        Ok(Arc::new(JsonFileSessionStore::open(&self.sessions_path)?))
    }

    pub fn open_work_item_store(&self) -> Result<Arc<dyn WorkItemStore>> {
        Ok(Arc::new(JsonFileWorkItemStore::open(&self.work_items_path)?))
    }

    pub fn open_coordinator(&self) -> Result<(Arc<LeaseCoordinator>, Arc<dyn SessionStore>)> {
        let sessions = self.open_session_store()?;
        let coordinator = Arc::new(LeaseCoordinator::new(
            sessions.clone(),
            self.open_work_item_store()?,
        ));
        Ok((coordinator, sessions))
    }

    /// Client for the target cluster, when `FERRY_TARGET_HOST` is set.
    pub fn cluster_client(&self) -> Result<Option<Arc<ClusterClient>>> {
        let Some(host) = &self.target_host else {
            return Ok(None);
        };
        let mut cluster = ClusterConfig::new(host.clone());
        if let (Some(username), Some(password)) = (&self.target_username, &self.target_password) {
            cluster = cluster.with_basic_auth(username, password);
        }
        cluster.allow_insecure = self.target_insecure;
        Ok(Some(Arc::new(ClusterClient::new(cluster)?)))
    }
}
