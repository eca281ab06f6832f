use serde::{Deserialize, Deserializer, Serialize};

/// One downloadable item as listed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UrlEntry {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    #[default]
    Pending,
    Downloading,
    Completed,
    Failed,
    /// Reported by the backend when a file made no progress for too long.
    Stalled,
}

impl FileStatus {
    pub fn label(self) -> &'static str {
        match self {
            FileStatus::Pending => "Pending",
            FileStatus::Downloading => "Downloading",
            FileStatus::Completed => "Completed",
            FileStatus::Failed => "Failed",
            FileStatus::Stalled => "Stalled",
        }
    }

    /// Completed and failed files get no further updates.
    pub fn is_terminal(self) -> bool {
        matches!(self, FileStatus::Completed | FileStatus::Failed)
    }
}

/// Live view of a single file in the current run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadState {
    pub file_id: String,
    pub status: FileStatus,
    /// Percent in 0..=100.
    pub progress: u8,
    pub size: u64,
    pub total_size: u64,
    pub error: Option<String>,
    pub message: Option<String>,
}

impl DownloadState {
    pub fn pending(file_id: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            status: FileStatus::Pending,
            progress: 0,
            size: 0,
            total_size: 0,
            error: None,
            message: None,
        }
    }

    /// Merge the fields carried by `event`; everything it leaves out keeps
    /// its current value.
    pub fn merge(&mut self, event: &ProgressEvent) {
        if let Some(status) = event.status {
            self.status = status;
        }
        if let Some(progress) = event.progress {
            self.progress = clamp_percent(progress);
        }
        if let Some(size) = event.size {
            self.size = size;
        }
        if let Some(total_size) = event.total_size {
            self.total_size = total_size;
        }
        if let Some(error) = &event.error {
            self.error = error.clone();
        }
        if let Some(message) = &event.message {
            self.message = message.clone();
        }
    }

    /// Failed files render their error instead of a progress bar.
    pub fn shows_progress(&self) -> bool {
        self.status != FileStatus::Failed
    }

    pub fn size_line(&self) -> String {
        let size = crate::utils::format_bytes(self.size);
        if self.total_size > 0 {
            format!("{} / {}", size, crate::utils::format_bytes(self.total_size))
        } else {
            size
        }
    }
}

fn clamp_percent(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, 100.0).round() as u8
}

/// Incremental per-file update pushed by the backend. Only the fields that
/// are present get applied.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ProgressEvent {
    #[serde(default)]
    pub session_id: Option<String>,
    pub file_id: String,
    #[serde(default)]
    pub status: Option<FileStatus>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub total_size: Option<u64>,
    /// `None` when absent, `Some(None)` when sent as `null`.
    #[serde(default, deserialize_with = "present")]
    pub error: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub message: Option<Option<String>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Terminal summary of a run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct Report {
    #[serde(default)]
    pub completed_files: Vec<String>,
    #[serde(default)]
    pub deleted_files: Vec<String>,
    #[serde(default)]
    pub pending_files: Vec<String>,
}

impl Report {
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            completed: self.completed_files.len(),
            deleted: self.deleted_files.len(),
            pending: self.pending_files.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportSummary {
    pub completed: usize,
    pub deleted: usize,
    pub pending: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Error,
    #[default]
    Disconnected,
}

impl ConnectionState {
    pub fn label(self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Error => "error",
            ConnectionState::Disconnected => "disconnected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPhase {
    #[default]
    Idle,
    Starting,
    Active,
    Finished,
}
