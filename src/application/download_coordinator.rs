use std::future::Future;

use crate::{
    api::{self, ApiClient, StartDownloadResponse},
    domain::{AppError, UrlEntry},
};

/// How a run got its session id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// The id came from the backend, either pushed or in the start response.
    Started { session_id: String },
    /// The start request never got an answer but the channel is up; the id
    /// was made up locally and may not match the backend's session.
    Degraded { session_id: String },
}

impl StartOutcome {
    pub fn session_id(&self) -> &str {
        match self {
            StartOutcome::Started { session_id } | StartOutcome::Degraded { session_id } => {
                session_id
            }
        }
    }
}

/// Owns the URL list and issues the run-start request.
#[derive(Clone)]
pub struct DownloadCoordinator {
    api_client: ApiClient,
    urls: Vec<UrlEntry>,
}

impl DownloadCoordinator {
    pub fn new(api_client: ApiClient) -> Self {
        Self {
            api_client,
            urls: Vec::new(),
        }
    }

    /// Coordinator with an already known URL list.
    pub fn with_urls(api_client: ApiClient, urls: Vec<UrlEntry>) -> Self {
        Self { api_client, urls }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api_client
    }

    /// Fetch the URL list once. On failure the list stays as it was, so a
    /// run still cannot start.
    pub async fn load_urls(&mut self) -> Result<&[UrlEntry], AppError> {
        match self.api_client.list_urls().await {
            Ok(urls) => {
                tracing::info!(count = urls.len(), "URL list loaded");
                self.urls = urls;
                Ok(&self.urls)
            }
            Err(e) => {
                tracing::error!(error = %e, "could not load URL list");
                Err(e.into())
            }
        }
    }

    pub fn urls(&self) -> &[UrlEntry] {
        &self.urls
    }

    /// The URL list, or `NotReady` while it has not loaded.
    pub fn ready_urls(&self) -> Result<&[UrlEntry], AppError> {
        if self.urls.is_empty() {
            return Err(AppError::NotReady);
        }
        Ok(&self.urls)
    }

    /// The run-start request, detached from `self` so it can be polled while
    /// other events are handled.
    pub fn start_request(
        &self,
    ) -> impl Future<Output = api::Result<StartDownloadResponse>> + Send + 'static {
        let api_client = self.api_client.clone();
        async move { api_client.start_download().await }
    }
}
