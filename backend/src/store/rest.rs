//! PostgREST-style HTTP store.
//!
//! Talks to the managed database through its REST gateway:
//!
//! | Call         | Request                                                         |
//! |--------------|-----------------------------------------------------------------|
//! | `select_all` | `GET /rest/v1/{table}?select=..&col=op.value&order=..&limit=..` |
//! | `upsert`     | `POST /rest/v1/{table}?on_conflict=..` with `Prefer` headers     |
//! | `count`      | `GET /rest/v1/{table}?select=id&limit=1`, `Prefer: count=exact` |
//!
//! Failed calls are returned as-is; retrying is the caller's decision.

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::env;

use super::{ConflictKey, Filter, Record, Store};
use crate::error::{StoreError, StoreResult};

/// Environment variable holding the store base URL
pub const URL_ENV: &str = "SEED_STORE_URL";

/// Environment variable holding the service key
pub const KEY_ENV: &str = "SEED_STORE_KEY";

/// Connection settings for [`RestStore`]
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Base URL, e.g. `https://xyz.example.co`
    pub base_url: String,
    /// Service API key, sent as `apikey` and bearer token
    pub api_key: String,
    /// Path prefix of the REST gateway
    pub rest_path: String,
}

impl RestConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            rest_path: "rest/v1".to_string(),
        }
    }

    /// Read `SEED_STORE_URL` and `SEED_STORE_KEY`.
    ///
    /// Missing or blank values are reported as [`StoreError::Unconfigured`].
    pub fn from_env() -> StoreResult<Self> {
        let _ = dotenvy::dotenv();

        let read = |name: &str| {
            env::var(name)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| StoreError::Unconfigured(format!("{} not set", name)))
        };

        Ok(Self::new(read(URL_ENV)?, read(KEY_ENV)?))
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.rest_path, table)
    }
}

/// Error body returned by the gateway
#[derive(Debug, Deserialize)]
struct GatewayError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: Option<String>,
}

/// HTTP implementation of [`Store`]
#[derive(Clone)]
pub struct RestStore {
    config: RestConfig,
    client: reqwest::Client,
}

impl RestStore {
    pub fn new(config: RestConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Build a store from the environment
    pub fn from_env() -> StoreResult<Self> {
        Ok(Self::new(RestConfig::from_env()?))
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.config.api_key)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
    }

    async fn send(&self, builder: RequestBuilder, table: &str) -> StoreResult<Response> {
        let response = self
            .authorized(builder)
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<GatewayError>(&body) {
            Ok(err) => match err.details {
                Some(details) => format!("{} ({})", err.message, details),
                None => err.message,
            },
            Err(_) => body,
        };

        if status == StatusCode::CONFLICT {
            return Err(StoreError::Conflict {
                table: table.to_string(),
                key: message,
            });
        }
        Err(StoreError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

/// Render a JSON value the way the gateway expects it in a query string
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Query parameters for a select
pub fn select_params(columns: &[&str], filter: Option<&Filter>) -> Vec<(String, String)> {
    let select = if columns.is_empty() {
        "*".to_string()
    } else {
        columns.join(",")
    };
    let mut params = vec![("select".to_string(), select)];

    if let Some(filter) = filter {
        for condition in &filter.conditions {
            let expr = if condition.value.is_null() {
                match condition.op {
                    super::FilterOp::Neq => "not.is.null".to_string(),
                    _ => "is.null".to_string(),
                }
            } else {
                format!("{}.{}", condition.op.as_str(), render_value(&condition.value))
            };
            params.push((condition.column.clone(), expr));
        }
        if let Some(ref column) = filter.order_by {
            params.push(("order".to_string(), format!("{}.asc", column)));
        }
        if let Some(limit) = filter.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
    }

    params
}

/// Total from a `Content-Range` header such as `0-24/3573` or `*/0`
pub fn parse_content_range(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

#[async_trait]
impl Store for RestStore {
    async fn ping(&self) -> StoreResult<()> {
        let url = format!("{}/{}/", self.config.base_url, self.config.rest_path);
        self.send(self.client.get(url), "").await?;
        Ok(())
    }

    async fn select_all(
        &self,
        table: &str,
        columns: &[&str],
        filter: Option<&Filter>,
    ) -> StoreResult<Vec<Record>> {
        let request = self
            .client
            .get(self.config.table_url(table))
            .query(&select_params(columns, filter));

        let response = self.send(request, table).await?;
        response
            .json::<Vec<Record>>()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))
    }

    async fn upsert(
        &self,
        table: &str,
        records: Vec<Record>,
        conflict_key: Option<&ConflictKey>,
    ) -> StoreResult<Vec<Record>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = self.client.post(self.config.table_url(table)).json(&records);
        request = match conflict_key {
            Some(key) => request
                .query(&[("on_conflict", key.joined())])
                .header("Prefer", "resolution=merge-duplicates,return=representation"),
            None => request.header("Prefer", "return=representation"),
        };

        let response = self.send(request, table).await?;
        response
            .json::<Vec<Record>>()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))
    }

    async fn count(&self, table: &str, filter: Option<&Filter>) -> StoreResult<u64> {
        let mut params = select_params(&["id"], filter);
        params.retain(|(name, _)| name != "limit" && name != "order");
        params.push(("limit".to_string(), "1".to_string()));

        let request = self
            .client
            .get(self.config.table_url(table))
            .query(&params)
            .header("Prefer", "count=exact");

        let response = self.send(request, table).await?;
        let range = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| StoreError::InvalidResponse("missing Content-Range header".into()))?;

        parse_content_range(range)
            .ok_or_else(|| StoreError::InvalidResponse(format!("bad Content-Range '{}'", range)))
    }
}
