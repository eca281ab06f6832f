use bytes::Bytes;
use reqwest::{Client, Response};
use thiserror::Error;
use url::Url;

use super::models::{
    ApiConfig, ReportListResponse, RunStatusResponse, StartDownloadResponse, StoredReport,
    UrlListResponse,
};
use crate::domain::{AppError, UrlEntry};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Response body was empty")]
    EmptyBody,

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// True when no HTTP response was obtained at all (refused, unreachable,
    /// timed out). A non-success status is never network-class.
    pub fn is_network(&self) -> bool {
        match self {
            ApiError::RequestError(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            _ => false,
        }
    }
}

impl From<ApiError> for AppError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::EmptyBody => AppError::EmptyArtifact,
            other => AppError::Request(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Clone)]
pub struct ApiClient {
    config: ApiConfig,
    http: Client,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", self.config.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.config.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }
        Ok(response)
    }

    /// `GET /api/urls`
    pub async fn list_urls(&self) -> Result<Vec<UrlEntry>> {
        let url = self.endpoint(&["api", "urls"])?;
        let response = Self::check_status(self.http.get(url).send().await?)?;

        let json: UrlListResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("JSON decode error: {}", e)))?;

        Ok(json.urls)
    }

    /// `POST /api/download` (no body). The backend starts the run and answers
    /// with its session id.
    pub async fn start_download(&self) -> Result<StartDownloadResponse> {
        let url = self.endpoint(&["api", "download"])?;
        let response = Self::check_status(self.http.post(url).send().await?)?;

        let json: StartDownloadResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("JSON decode error: {}", e)))?;

        if json.session_id.is_empty() {
            return Err(ApiError::InvalidResponse("empty session_id".to_string()));
        }

        Ok(json)
    }

    /// `GET /api/report/{session_id}`, raw payload.
    pub async fn fetch_report(&self, session_id: &str) -> Result<Bytes> {
        self.fetch_artifact(&["api", "report", session_id]).await
    }

    /// `GET /api/deleted-urls/{session_id}`, raw payload.
    pub async fn fetch_deleted_urls(&self, session_id: &str) -> Result<Bytes> {
        self.fetch_artifact(&["api", "deleted-urls", session_id]).await
    }

    /// `GET /api/download/status/{session_id}`
    pub async fn fetch_status(&self, session_id: &str) -> Result<RunStatusResponse> {
        let url = self.endpoint(&["api", "download", "status", session_id])?;
        let response = Self::check_status(self.http.get(url).send().await?)?;

        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("JSON decode error: {}", e)))
    }

    /// Reports the backend still has on disk, one per past run.
    pub async fn list_reports(&self) -> Result<Vec<StoredReport>> {
        let url = self.endpoint(&["api", "reports"])?;
        let response = Self::check_status(self.http.get(url).send().await?)?;

        let list: ReportListResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("JSON decode error: {}", e)))?;
        Ok(list.reports)
    }

    async fn fetch_artifact(&self, segments: &[&str]) -> Result<Bytes> {
        let url = self.endpoint(segments)?;
        let response = Self::check_status(self.http.get(url).send().await?)?;

        let body = response.bytes().await?;
        tracing::debug!(len = body.len(), "artifact downloaded");
        if body.is_empty() {
            return Err(ApiError::EmptyBody);
        }
        Ok(body)
    }
}
