//! The record store REST client.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{RecordError, RecordResult};
use crate::query::TableQuery;

/// Summarizes a response body for logs without reproducing its contents.
fn body_summary(body: &str) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("len={},digest={:016x}", body.len(), hasher.finish())
}

/// Extracts the total from a `Content-Range` header value such as
/// `0-24/57` or `*/57`.
pub(crate) fn content_range_total(value: &str) -> Option<u64> {
    value.rsplit('/').next()?.parse().ok()
}

/// REST client for the record store's tables.
#[derive(Clone)]
pub struct RecordClient {
    http_client: reqwest::Client,
    api_url: String,
    anon_key: String,
}

impl RecordClient {
    /// Create a new record store client.
    ///
    /// # Arguments
    /// * `api_url` - The project API URL (e.g. `https://xyz.example.co`)
    /// * `anon_key` - The publishable API key sent as `apikey`
    pub fn new(api_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_url: api_url.into(),
            anon_key: anon_key.into(),
        }
    }

    /// Build the REST API URL for a table.
    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.api_url, table)
    }

    fn table_url(&self, table: &str, query: &TableQuery) -> String {
        let qs = query.to_query_string();
        if qs.is_empty() {
            self.rest_url(table)
        } else {
            format!("{}?{}", self.rest_url(table), qs)
        }
    }

    async fn reject(
        operation: &'static str,
        table: &str,
        response: reqwest::Response,
    ) -> RecordError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let summary = body_summary(&body);
        tracing::error!(
            operation,
            table,
            status = %status,
            body_summary = %summary,
            "record store request failed"
        );
        RecordError::Api {
            operation,
            table: table.to_string(),
            status,
            body_summary: summary,
        }
    }

    /// Fetch rows from a table, decoded into `T`.
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &TableQuery,
        access_token: &str,
    ) -> RecordResult<Vec<T>> {
        let url = self.table_url(table, query);
        tracing::debug!(table, url = %url, "selecting rows");

        let response = self
            .http_client
            .get(&url)
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", access_token))
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::reject("select", table, response).await);
        }

        let rows: Vec<T> = response.json().await?;
        tracing::debug!(table, count = rows.len(), "selected rows");
        Ok(rows)
    }

    /// Insert a row into a table.
    pub async fn insert<T: Serialize>(
        &self,
        table: &str,
        row: &T,
        access_token: &str,
    ) -> RecordResult<()> {
        let url = self.rest_url(table);
        tracing::debug!(table, "inserting row");

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", access_token))
            .header("Content-Type", "application/json")
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::reject("insert", table, response).await);
        }

        tracing::debug!(table, "row inserted");
        Ok(())
    }

    /// Patch the rows matched by `query` with a partial document.
    pub async fn update(
        &self,
        table: &str,
        query: &TableQuery,
        patch: &serde_json::Value,
        access_token: &str,
    ) -> RecordResult<()> {
        let url = self.table_url(table, query);
        tracing::debug!(table, url = %url, "updating rows");

        let response = self
            .http_client
            .patch(&url)
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", access_token))
            .header("Content-Type", "application/json")
            .header("Prefer", "return=minimal")
            .json(patch)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::reject("update", table, response).await);
        }

        tracing::debug!(table, "rows updated");
        Ok(())
    }

    /// Exact count of the rows matched by `query`.
    ///
    /// Issues a HEAD request with `Prefer: count=exact`; the total rides in
    /// the `Content-Range` header.
    pub async fn count(
        &self,
        table: &str,
        query: &TableQuery,
        access_token: &str,
    ) -> RecordResult<u64> {
        let url = self.table_url(table, query);
        tracing::debug!(table, url = %url, "counting rows");

        let response = self
            .http_client
            .head(&url)
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", access_token))
            .header("Prefer", "count=exact")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::reject("count", table, response).await);
        }

        let total = response
            .headers()
            .get("content-range")
            .and_then(|value| value.to_str().ok())
            .and_then(content_range_total)
            .ok_or_else(|| RecordError::MissingCount {
                table: table.to_string(),
            })?;

        tracing::debug!(table, total, "counted rows");
        Ok(total)
    }
}
