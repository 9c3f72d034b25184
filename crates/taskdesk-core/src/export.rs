use anyhow::Context;
use chrono::NaiveDate;
use serde_json::Value;

pub const EXPORT_PREFIX: &str = "task-app-backup";
pub const EXPORT_MIME: &str = "application/json";

/// A downloadable backup of the storage snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub mime: &'static str,
    pub body: String,
}

impl ExportArtifact {
    pub fn from_snapshot(snapshot: &Value, date: NaiveDate) -> anyhow::Result<Self> {
        let body =
            serde_json::to_string_pretty(snapshot).context("failed serializing snapshot")?;
        Ok(Self {
            file_name: file_name_for(date),
            mime: EXPORT_MIME,
            body,
        })
    }
}

pub fn file_name_for(date: NaiveDate) -> String {
    format!("{EXPORT_PREFIX}-{}.json", date.format("%Y-%m-%d"))
}
