//! Supabase-backed record store.
//!
//! Inserts go through the PostgREST endpoint: `POST {url}/rest/v1/{table}`
//! with the service-role key in both the `apikey` and `Authorization`
//! headers. Row-level security is bypassed by the service role, so the
//! gateway is the only writer.

use async_trait::async_trait;
use serde_json::Value;

use super::{RecordStore, StoreError};

/// Record store backed by a Supabase project.
#[derive(Debug, Clone)]
pub struct SupabaseStore {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl SupabaseStore {
    /// Create a store for the given project URL and service-role key.
    pub fn new(base_url: &str, service_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }
}

#[async_trait]
impl RecordStore for SupabaseStore {
    async fn insert(&self, table: &str, record: &Value) -> Result<(), StoreError> {
        let response = self
            .client
            .post(self.table_url(table))
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            tracing::info!(table, "Record stored");
            Ok(())
        } else {
            let mut body = response.text().await.unwrap_or_default();
            body.truncate(512);
            Err(StoreError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}
