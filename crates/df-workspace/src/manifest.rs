use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Launch description persisted once per workspace at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub handle: Uuid,
    pub name: String,
    pub command: String,
    pub arguments: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub working_directory: PathBuf,
}

impl Manifest {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
