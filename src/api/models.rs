use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{FileStatus, Report, UrlEntry};

/// Response from `GET /api/urls`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UrlListResponse {
    pub urls: Vec<UrlEntry>,
}

/// Response from `POST /api/download`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StartDownloadResponse {
    pub session_id: String,
    #[serde(default)]
    pub file_count: Option<usize>,
}

/// Response from `GET /api/download/status/{session_id}`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunStatusResponse {
    pub session_id: String,
    #[serde(default)]
    pub files: HashMap<String, FileStatusEntry>,
}

/// Backend-side bookkeeping for one file of a run.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FileStatusEntry {
    pub file_id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub status: FileStatus,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub error: Option<String>,
}

/// Response from `GET /api/reports`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReportListResponse {
    #[serde(default)]
    pub reports: Vec<StoredReport>,
}

/// A report file the backend kept from an earlier run.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoredReport {
    pub filename: String,
    pub session_id: String,
    pub data: Report,
}

/// Configuration for the API client
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Backend origin, e.g. `http://localhost:3000`. The `/api/...` paths are
    /// appended to it.
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
        }
    }
}
