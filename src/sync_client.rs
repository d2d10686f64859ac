use chrono::Utc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::Config;
use crate::errors::AppError;
use crate::fallback;
use crate::mapping::{self, MappingContext, NestedCollections};
use crate::models::Dataset;
use crate::sync_models::{RawSyncPayload, RecordCounts, SyncOutcome, SyncReport, SyncStatus};

/// Label used when the payload does not name its source.
pub const LIVE_LABEL: &str = "Sincronizado via Drive";

/// Label of fallback data substituted after a failed sync.
pub const OFFLINE_LABEL: &str = "Modo Demonstração (Offline)";

/// Client for the legacy export backend.
///
/// Every call issues one independent GET; there is no de-duplication,
/// retry or cancellation. Failures never escape [`SyncAdapter::sync`]:
/// they are logged and replaced by demo data.
#[derive(Clone)]
pub struct SyncAdapter {
    client: reqwest::Client,
    endpoint: String,
    nested: NestedCollections,
}

impl SyncAdapter {
    /// Creates a new `SyncAdapter`.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Full URL of the sync endpoint.
    /// * `timeout` - Transport timeout for the whole request.
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                AppError::InternalError(format!("Failed to create sync client: {}", e))
            })?;

        Ok(Self {
            client,
            endpoint,
            nested: NestedCollections::Skip,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let nested = if config.map_nested_collections {
            NestedCollections::FromRecord
        } else {
            NestedCollections::Skip
        };

        Ok(Self::new(
            config.sync_endpoint_url.clone(),
            Duration::from_secs(config.sync_timeout_secs),
        )?
        .with_nested(nested))
    }

    pub fn with_nested(mut self, nested: NestedCollections) -> Self {
        self.nested = nested;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetches the raw payload.
    ///
    /// # Returns
    ///
    /// * `Result<RawSyncPayload, AppError>` - The payload, or the transport,
    ///   status, decode or source-reported failure.
    pub async fn fetch_payload(&self) -> Result<RawSyncPayload, AppError> {
        tracing::info!("Fetching sync payload: {}", self.endpoint);

        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Sync request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let payload: RawSyncPayload = serde_json::from_str(&body)
            .map_err(|e| AppError::DecodeError(e.to_string()))?;

        if let Some(reported) = payload.reported_error() {
            return Err(AppError::SourceReported(reported.to_string()));
        }

        Ok(payload)
    }

    /// Runs one sync cycle and returns the dataset only.
    pub async fn sync(&self) -> Dataset {
        self.sync_with_report().await.dataset
    }

    /// Runs one sync cycle.
    ///
    /// On success the four collections are mapped independently and the
    /// dataset is labelled from the payload. On any failure the demo
    /// dataset is returned under [`OFFLINE_LABEL`] and the report carries
    /// the reason.
    pub async fn sync_with_report(&self) -> SyncOutcome {
        let sync_id = Uuid::new_v4();
        let started_at = Utc::now();
        tracing::info!("Starting sync {}", sync_id);

        let (dataset, status) = match self.fetch_payload().await {
            Ok(payload) => {
                let ctx = MappingContext::at(started_at).with_nested(self.nested);
                let mut dataset = mapping::map_dataset(&payload, &ctx);
                dataset.filename = Some(live_label(payload.filename.as_deref()));
                (dataset, SyncStatus::Live)
            }
            Err(e) => {
                tracing::warn!("Sync {} failed, using demo data: {}", sync_id, e);
                let mut dataset = fallback::generate_at(started_at);
                dataset.filename = Some(OFFLINE_LABEL.to_string());
                let status = SyncStatus::Fallback {
                    kind: e.fallback_kind(),
                    reason: e.to_string(),
                };
                (dataset, status)
            }
        };

        let report = SyncReport {
            sync_id,
            started_at,
            finished_at: Utc::now(),
            source_label: dataset.filename.clone().unwrap_or_default(),
            counts: RecordCounts::of(&dataset),
            derived_identities: mapping::derived_identity_count(&dataset),
            status,
        };

        tracing::info!(
            "Sync {} finished ({}): {} records from '{}'",
            sync_id,
            if report.status.is_fallback() { "fallback" } else { "live" },
            dataset.record_count(),
            report.source_label
        );
        if report.derived_identities > 0 {
            tracing::warn!(
                "Sync {}: {} records had no key, identities derived from content",
                sync_id,
                report.derived_identities
            );
        }

        SyncOutcome { dataset, report }
    }
}

/// Source label for a live dataset. Never collides with the demo labels.
fn live_label(filename: Option<&str>) -> String {
    filename
        .map(str::trim)
        .filter(|name| {
            !name.is_empty() && *name != OFFLINE_LABEL && *name != fallback::DEMO_LABEL
        })
        .unwrap_or(LIVE_LABEL)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_creation() {
        let adapter = SyncAdapter::new(
            "https://example.com/api/sync".to_string(),
            Duration::from_secs(5),
        );
        assert!(adapter.is_ok());
        assert_eq!(adapter.unwrap().endpoint(), "https://example.com/api/sync");
    }

    #[test]
    fn test_live_label() {
        assert_eq!(live_label(Some("Backup.mdb")), "Backup.mdb");
        assert_eq!(live_label(Some("  ")), LIVE_LABEL);
        assert_eq!(live_label(None), LIVE_LABEL);
        assert_eq!(live_label(Some(OFFLINE_LABEL)), LIVE_LABEL);
        assert_eq!(live_label(Some(fallback::DEMO_LABEL)), LIVE_LABEL);
    }
}
