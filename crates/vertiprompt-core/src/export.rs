//! Session snapshots, the versioned export document and text renderings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::DEFAULT_MODEL;
use crate::errors::ImportFormatError;
use crate::run::RunOutcome;
use crate::slice::Slice;

/// The only export schema version this crate reads or writes.
pub const SCHEMA_VERSION: &str = "1.0";
/// Import payloads larger than this are rejected before parsing.
pub const MAX_IMPORT_BYTES: usize = 200 * 1024;

/// The last run (generated or imported), as persisted by the session store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    #[serde(default = "Utc::now")]
    pub run_date: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub slices: Vec<Slice>,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

impl SessionSnapshot {
    pub fn new(description: impl Into<String>, model: impl Into<String>, slices: Vec<Slice>) -> Self {
        Self {
            run_date: Utc::now(),
            description: description.into(),
            model: model.into(),
            slices,
        }
    }

    /// Snapshot of everything a run collected, including halted runs.
    pub fn from_outcome(description: impl Into<String>, model: impl Into<String>, outcome: &RunOutcome) -> Self {
        Self::new(description, model, outcome.slices.clone())
    }

    /// Export document stamped with `run_date`.
    pub fn to_export(&self, run_date: DateTime<Utc>) -> ExportDocument {
        ExportDocument {
            schema_version: SCHEMA_VERSION.to_string(),
            run_date,
            description: self.description.clone(),
            model: self.model.clone(),
            slices: self.slices.clone(),
        }
    }
}

/// `{schemaVersion, runDate, description, model, slices}` export file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub schema_version: String,
    pub run_date: DateTime<Utc>,
    pub description: String,
    pub model: String,
    pub slices: Vec<Slice>,
}

impl ExportDocument {
    /// Pretty-printed JSON, two-space indented.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Validates an export file and turns it into a session snapshot.
///
/// Rejects oversized payloads, invalid JSON, a `schemaVersion` other than
/// `"1.0"`, non-array `slices`, and slices that are not `{title, prompt}`.
/// Missing `description` becomes empty and a missing `model` becomes
/// `default_model`. The snapshot is stamped with the import time.
pub fn import_document(raw: &str, default_model: &str) -> Result<SessionSnapshot, ImportFormatError> {
    if raw.len() > MAX_IMPORT_BYTES {
        return Err(ImportFormatError::TooLarge {
            size: raw.len(),
            limit: MAX_IMPORT_BYTES,
        });
    }
    let value: Value =
        serde_json::from_str(raw).map_err(|err| ImportFormatError::InvalidJson(err.to_string()))?;

    let version = value.get("schemaVersion");
    if version.and_then(Value::as_str) != Some(SCHEMA_VERSION) {
        return Err(ImportFormatError::UnsupportedSchemaVersion {
            found: version.map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_string)),
        });
    }

    let slices = value
        .get("slices")
        .and_then(Value::as_array)
        .ok_or(ImportFormatError::SlicesNotArray)?
        .iter()
        .enumerate()
        .map(|(index, item)| {
            Slice::deserialize(item).map_err(|err| ImportFormatError::InvalidSlice {
                index,
                reason: err.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let description = value
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let model = value
        .get("model")
        .and_then(Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or(default_model);

    Ok(SessionSnapshot::new(description, model, slices))
}

/// "Copy all" text: each slice under a heading with a plain fence, separated
/// by horizontal rules.
pub fn render_copy_text(slices: &[Slice]) -> String {
    slices
        .iter()
        .enumerate()
        .map(|(i, s)| format!("## Slice {} — {}\n\n```\n{}\n```", i + 1, s.title, s.prompt))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

/// Markdown download: each slice under a heading with a `prompt` fence.
pub fn render_markdown(slices: &[Slice]) -> String {
    slices
        .iter()
        .enumerate()
        .map(|(i, s)| format!("## Slice {} — {}\n\n```prompt\n{}\n```", i + 1, s.title, s.prompt))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn format_cost(total_cost: f64) -> String {
    format!("Estimated Cost: ${total_cost:.6}")
}
