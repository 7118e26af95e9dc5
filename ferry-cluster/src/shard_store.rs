//! [`ShardStateStore`] implementation over the cluster search API

use crate::client::ClusterClient;
use crate::queries;
use async_trait::async_trait;
use ferry_coordinator::{Error as CoordinatorError, ShardFilter, ShardStateStore};

fn search_err(err: crate::Error) -> CoordinatorError {
    CoordinatorError::Search(err.to_string())
}

#[async_trait]
impl ShardStateStore for ClusterClient {
    async fn index_exists(&self, index: &str) -> ferry_coordinator::Result<bool> {
        ClusterClient::index_exists(self, index)
            .await
            .map_err(search_err)
    }

    async fn count_unique_shards(
        &self,
        index: &str,
        filter: ShardFilter,
    ) -> ferry_coordinator::Result<u64> {
        let body = queries::unique_shard_count_query(&filter);
        let response = self.search(index, &body).await.map_err(search_err)?;
        Ok(queries::parse_unique_count(&response).unwrap_or(0))
    }

    async fn setup_marker_completed_epoch(
        &self,
        index: &str,
    ) -> ferry_coordinator::Result<Option<i64>> {
        let source = self
            .get_doc_source(index, "shard_setup")
            .await
            .map_err(search_err)?;
        Ok(source
            .and_then(|doc| doc.get("completedAt").and_then(|v| v.as_f64()))
            .filter(|epoch| *epoch > 0.0)
            .map(|epoch| epoch as i64))
    }

    async fn max_completed_epoch(&self, index: &str) -> ferry_coordinator::Result<Option<i64>> {
        let response = self
            .search(index, &queries::max_completed_query())
            .await
            .map_err(search_err)?;
        Ok(queries::parse_max_completed(&response))
    }
}
