use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::Dataset;

/// Raw sync payload as produced by the legacy export backend.
///
/// Record collections are kept as raw JSON so a single malformed record
/// never aborts deserialization of the whole batch.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawSyncPayload {
    /// CLIENTES table rows
    #[serde(default)]
    pub clientes: Option<Vec<Value>>,

    /// SEGUROS table rows
    #[serde(default)]
    pub seguros: Option<Vec<Value>>,

    /// CABSINISTRO table rows
    #[serde(default)]
    pub sinistros: Option<Vec<Value>>,

    /// FINANCEIRO table rows
    #[serde(default)]
    pub producao: Option<Vec<Value>>,

    /// Source label, e.g. "Sincronizado via Drive"
    #[serde(default)]
    pub filename: Option<String>,

    /// Set by the backend when the export failed
    #[serde(default)]
    pub error: Option<String>,
}

impl RawSyncPayload {
    /// Source-reported failure, if any. Blank messages are ignored.
    pub fn reported_error(&self) -> Option<&str> {
        self.error
            .as_deref()
            .map(str::trim)
            .filter(|msg| !msg.is_empty())
    }
}

/// Why a sync cycle fell back to demo data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackKind {
    /// Network unreachable, connection refused, timeout.
    Transport,
    /// Non-2xx response.
    Status,
    /// Body was not a valid sync payload.
    Decode,
    /// Payload carried an explicit `error` field.
    SourceReported,
}

/// Result of one sync cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncStatus {
    Live,
    Fallback { kind: FallbackKind, reason: String },
}

impl SyncStatus {
    pub fn is_fallback(&self) -> bool {
        matches!(self, SyncStatus::Fallback { .. })
    }
}

/// Per-collection record counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecordCounts {
    pub clientes: usize,
    pub seguros: usize,
    pub sinistros: usize,
    pub producao: usize,
}

impl RecordCounts {
    pub fn of(dataset: &Dataset) -> Self {
        Self {
            clientes: dataset.clientes.len(),
            seguros: dataset.seguros.len(),
            sinistros: dataset.sinistros.len(),
            producao: dataset.producao.len(),
        }
    }
}

/// Structured report surfaced next to the dataset so a status indicator
/// can tell live data from demo data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub sync_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(flatten)]
    pub status: SyncStatus,
    pub source_label: String,
    pub counts: RecordCounts,
    /// Records whose identity was derived from content instead of a key.
    pub derived_identities: usize,
}

/// Dataset plus the report describing how it was obtained.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub dataset: Dataset,
    pub report: SyncReport,
}
