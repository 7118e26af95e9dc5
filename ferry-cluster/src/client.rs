//! Thin HTTP client for the target cluster's search API

use crate::{Error, Result};
use reqwest::{Method, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Connection settings for the target cluster.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Base endpoint, e.g. `https://target:9200`
    pub endpoint: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Accept self-signed certificates (test clusters only)
    pub allow_insecure: bool,
    pub timeout_secs: u64,
}

impl ClusterConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            username: None,
            password: None,
            allow_insecure: false,
            timeout_secs: 30,
        }
    }

    pub fn with_basic_auth(mut self, username: &str, password: &str) -> Self {
        self.username = Some(username.to_string());
        self.password = Some(password.to_string());
        self
    }
}

/// HTTP client for the target cluster.
pub struct ClusterClient {
    config: ClusterConfig,
    http: reqwest::Client,
}

impl ClusterClient {
    pub fn new(config: ClusterConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.allow_insecure)
            .build()?;
        Ok(Self { config, http })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.endpoint.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<Response> {
        let mut request = self.http.request(method.clone(), self.url(path));
        if let Some(username) = &self.config.username {
            request = request.basic_auth(username, self.config.password.as_deref());
        }
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        debug!(%method, path, "cluster request");
        Ok(request.send().await?)
    }

    async fn expect_ok(&self, response: Response, path: &str) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::UnexpectedStatus {
                status: status.as_u16(),
                path: path.to_string(),
                body,
            });
        }
        Ok(response.json().await?)
    }

    /// Whether `index` exists on the cluster. A 404 is a distinct "not
    /// there yet" answer, not a failure.
    pub async fn index_exists(&self, index: &str) -> Result<bool> {
        let response = self.request(Method::GET, index, &[], None).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(Error::UnexpectedStatus {
                    status: status.as_u16(),
                    path: index.to_string(),
                    body,
                })
            }
        }
    }

    /// `POST /{index}/_search` with a JSON body.
    pub async fn search(&self, index: &str, body: &Value) -> Result<Value> {
        let path = format!("{}/_search", index);
        let response = self.request(Method::POST, &path, &[], Some(body)).await?;
        self.expect_ok(response, &path).await
    }

    /// `POST /{index}/_search` with query-string parameters (scroll etc.).
    pub async fn search_with_params(
        &self,
        index: &str,
        query: &[(&str, &str)],
        body: &Value,
    ) -> Result<Value> {
        let path = format!("{}/_search", index);
        let response = self.request(Method::POST, &path, query, Some(body)).await?;
        self.expect_ok(response, &path).await
    }

    /// `POST /_search/scroll` to continue a scroll cursor.
    pub async fn scroll(&self, scroll_id: &str, keep_alive: &str) -> Result<Value> {
        let body = serde_json::json!({ "scroll": keep_alive, "scroll_id": scroll_id });
        let response = self
            .request(Method::POST, "_search/scroll", &[], Some(&body))
            .await?;
        self.expect_ok(response, "_search/scroll").await
    }

    /// Source of a single document, or `None` when the document (or the
    /// whole index) is absent.
    pub async fn get_doc_source(&self, index: &str, id: &str) -> Result<Option<Value>> {
        let path = format!("{}/_doc/{}", index, id);
        let response = self.request(Method::GET, &path, &[], None).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = self.expect_ok(response, &path).await?;
        Ok(body.get("_source").cloned())
    }

    /// Delete `index`. Fails [`Error::IndexNotFound`] when it is absent.
    pub async fn delete_index(&self, index: &str) -> Result<()> {
        let response = self.request(Method::DELETE, index, &[], None).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(Error::IndexNotFound(index.to_string())),
            status if status.is_success() => Ok(()),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(Error::UnexpectedStatus {
                    status: status.as_u16(),
                    path: index.to_string(),
                    body,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let client =
            ClusterClient::new(ClusterConfig::new("http://target:9200/")).unwrap();
        assert_eq!(
            client.url("/.migrations_working_state/_search"),
            "http://target:9200/.migrations_working_state/_search"
        );
    }

    #[test]
    fn test_config_builder() {
        let config = ClusterConfig::new("https://target:9200").with_basic_auth("admin", "secret");
        assert_eq!(config.username.as_deref(), Some("admin"));
        assert_eq!(config.timeout_secs, 30);
        assert!(!config.allow_insecure);
    }
}
