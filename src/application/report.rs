use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::io::AsyncWriteExt;

use crate::api::ApiClient;
use crate::domain::{AppError, Report, ReportSummary};
use crate::utils::sanitize_filename;

/// A backend file ready to be handed to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifact {
    file_name: String,
    bytes: Bytes,
}

impl ReportArtifact {
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Write the artifact into `dir` under its own name.
    pub async fn save_to(&self, dir: &Path) -> Result<PathBuf, AppError> {
        let path = dir.join(&self.file_name);
        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| AppError::Io(format!("Failed to create file: {}", e)))?;
        file.write_all(&self.bytes)
            .await
            .map_err(|e| AppError::Io(format!("Write error: {}", e)))?;
        file.sync_all()
            .await
            .map_err(|e| AppError::Io(format!("Failed to sync file: {}", e)))?;

        tracing::info!(path = %path.display(), bytes = self.bytes.len(), "artifact saved");
        Ok(path)
    }
}

pub fn report_file_name(session_id: &str) -> String {
    format!("download_report_{}.json", sanitize_filename(session_id))
}

pub fn deleted_urls_file_name(session_id: &str) -> String {
    format!("deleted_urls_{}.txt", sanitize_filename(session_id))
}

/// Holds the terminal report of the current run.
#[derive(Debug, Default)]
pub struct ReportFinalizer {
    report: Option<Report>,
}

impl ReportFinalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `report` as the run's final report. A later report for the same
    /// run replaces it.
    pub fn on_report(&mut self, report: Report) -> ReportSummary {
        if self.report.is_some() {
            tracing::warn!("report received twice for the same run, keeping the latest");
        }
        let summary = report.summary();
        tracing::info!(
            completed = summary.completed,
            deleted = summary.deleted,
            pending = summary.pending,
            "run report received"
        );
        self.report = Some(report);
        summary
    }

    pub fn report(&self) -> Option<&Report> {
        self.report.as_ref()
    }

    pub fn summary(&self) -> Option<ReportSummary> {
        self.report.as_ref().map(Report::summary)
    }

    pub fn reset(&mut self) {
        self.report = None;
    }
}

/// Fetch the report file of `session_id` from the backend. Without a session
/// no request is made.
pub async fn export_report(
    api: &ApiClient,
    session_id: Option<&str>,
) -> Result<ReportArtifact, AppError> {
    let session_id = session_id.ok_or(AppError::NoSession)?;
    tracing::debug!(session_id, "exporting report");

    let bytes = api.fetch_report(session_id).await?;
    Ok(ReportArtifact {
        file_name: report_file_name(session_id),
        bytes,
    })
}

/// Fetch the list of URLs whose downloads the backend deleted after a stall.
pub async fn export_deleted_urls(
    api: &ApiClient,
    session_id: Option<&str>,
) -> Result<ReportArtifact, AppError> {
    let session_id = session_id.ok_or(AppError::NoSession)?;
    tracing::debug!(session_id, "exporting deleted urls");

    let bytes = api.fetch_deleted_urls(session_id).await?;
    Ok(ReportArtifact {
        file_name: deleted_urls_file_name(session_id),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiConfig;

    fn client_for(server: &mockito::ServerGuard) -> ApiClient {
        ApiClient::new(ApiConfig {
            base_url: server.url(),
        })
    }

    #[test]
    fn test_report_file_name() {
        assert_eq!(
            report_file_name("session_1700000000"),
            "download_report_session_1700000000.json"
        );
        assert_eq!(report_file_name("a/b"), "download_report_a_b.json");
        assert_eq!(deleted_urls_file_name("s1"), "deleted_urls_s1.txt");
    }

    #[test]
    fn test_finalizer_counts() {
        let mut finalizer = ReportFinalizer::new();
        assert!(finalizer.summary().is_none());

        let summary = finalizer.on_report(Report {
            completed_files: vec!["f1".into()],
            deleted_files: vec![],
            pending_files: vec!["f2".into()],
        });
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.deleted, 0);
        assert_eq!(summary.pending, 1);

        finalizer.reset();
        assert!(finalizer.report().is_none());
    }

    #[tokio::test]
    async fn test_export_without_session_makes_no_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let err = export_report(&client_for(&server), None).await.unwrap_err();
        assert_eq!(err, AppError::NoSession);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_export_report() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"{"completed_files":["f1"],"deleted_files":[],"pending_files":[]}"#;
        let mock = server
            .mock("GET", "/api/report/session_1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let artifact = export_report(&client_for(&server), Some("session_1"))
            .await
            .unwrap();
        assert_eq!(artifact.file_name(), "download_report_session_1.json");
        assert_eq!(artifact.bytes().as_ref(), body.as_bytes());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_export_empty_report_is_refused() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/report/session_1")
            .with_status(200)
            .create_async()
            .await;

        let err = export_report(&client_for(&server), Some("session_1"))
            .await
            .unwrap_err();
        assert_eq!(err, AppError::EmptyArtifact);
    }

    #[tokio::test]
    async fn test_export_report_missing() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/report/session_1")
            .with_status(404)
            .with_body(r#"{"detail":"Report not found"}"#)
            .create_async()
            .await;

        let err = export_report(&client_for(&server), Some("session_1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Request(_)));
    }

    #[tokio::test]
    async fn test_export_deleted_urls_and_save() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/deleted-urls/session_1")
            .with_status(200)
            .with_header("content-type", "text/plain")
            .with_body("https://example.com/6\n")
            .create_async()
            .await;

        let artifact = export_deleted_urls(&client_for(&server), Some("session_1"))
            .await
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = artifact.save_to(dir.path()).await.unwrap();
        assert_eq!(path, dir.path().join("deleted_urls_session_1.txt"));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "https://example.com/6\n"
        );
    }
}
