use std::collections::VecDeque;

use super::aggregator::ProgressAggregator;
use super::download_coordinator::{DownloadCoordinator, StartOutcome};
use super::report::{self, ReportArtifact, ReportFinalizer};
use super::session::{SessionIdentity, SessionResolver, SessionSource};
use crate::api::{ApiClient, ApiConfig, RunStatusResponse};
use crate::channel::{ChannelConfig, ChannelUpdate, ConnectionManager, InboundMessage};
use crate::config::ClientConfig;
use crate::domain::{
    AppError, ConnectionState, DownloadState, Report, ReportSummary, RunPhase, UrlEntry,
};

/// A change the client applied, for whoever renders it.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncUpdate {
    Connection(ConnectionState),
    /// The file's state after the merge.
    Progress(DownloadState),
    /// The run's final report arrived.
    Finished(ReportSummary),
}

/// Everything a run mutates. Only touched from the task that drives the
/// owning [`SyncClient`].
#[derive(Debug, Default)]
pub struct RunState {
    phase: RunPhase,
    session: SessionResolver,
    progress: ProgressAggregator,
    report: ReportFinalizer,
}

impl RunState {
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn session(&self) -> Option<&SessionIdentity> {
        self.session.current()
    }

    pub fn progress(&self) -> &ProgressAggregator {
        &self.progress
    }

    pub fn report(&self) -> Option<&Report> {
        self.report.report()
    }

    fn begin_run(&mut self, urls: &[UrlEntry]) {
        self.phase = RunPhase::Starting;
        self.report.reset();
        self.session.reset();
        self.progress.seed_pending(urls);
    }

    /// Apply one inbound message. Frames are not checked against the current
    /// run, so a late frame from an earlier run lands here too.
    pub fn apply_message(&mut self, message: InboundMessage) -> Option<SyncUpdate> {
        if let Some(session_id) = message.session_id() {
            self.session.resolve(session_id, SessionSource::Pushed);
        }

        match message {
            InboundMessage::Progress(event) => {
                let state = self.progress.apply(&event);
                tracing::debug!(
                    file_id = %state.file_id,
                    status = state.status.label(),
                    progress = state.progress,
                    "progress"
                );
                Some(SyncUpdate::Progress(state.clone()))
            }
            InboundMessage::Report(frame) => {
                let summary = self.report.on_report(frame.report);
                self.phase = RunPhase::Finished;
                Some(SyncUpdate::Finished(summary))
            }
            InboundMessage::Pong => None,
            InboundMessage::Unknown => {
                tracing::debug!("ignoring message of unknown type");
                None
            }
        }
    }
}

/// The client's single state context: the push channel, the URL list and
/// the current run. Driven by one task through `&mut self`.
pub struct SyncClient {
    coordinator: DownloadCoordinator,
    connection: ConnectionManager,
    state: RunState,
    backlog: VecDeque<SyncUpdate>,
}

impl SyncClient {
    pub fn new(api: ApiConfig, channel: ChannelConfig) -> Self {
        Self {
            coordinator: DownloadCoordinator::new(ApiClient::new(api)),
            connection: ConnectionManager::new(channel),
            state: RunState::default(),
            backlog: VecDeque::new(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.api(), config.channel())
    }

    /// Open the push channel. It reconnects on its own from then on.
    pub fn connect(&mut self) {
        self.connection.connect();
    }

    /// Close the push channel and stop its timers.
    pub fn shutdown(&mut self) {
        self.connection.shutdown();
    }

    pub async fn load_urls(&mut self) -> Result<&[UrlEntry], AppError> {
        self.coordinator.load_urls().await
    }

    /// Start a new run. Channel events that arrive while the request is in
    /// flight are applied right away and queued for [`Self::next_update`].
    pub async fn start_run(&mut self) -> Result<StartOutcome, AppError> {
        let urls = match self.coordinator.ready_urls() {
            Ok(urls) => urls.to_vec(),
            Err(e) => {
                tracing::warn!("run requested before the URL list loaded");
                return Err(e);
            }
        };

        self.state.begin_run(&urls);
        tracing::info!(files = urls.len(), "starting run");

        let request = self.coordinator.start_request();
        tokio::pin!(request);
        let result = loop {
            tokio::select! {
                result = &mut request => break result,
                Some(update) = self.connection.recv() => {
                    if let Some(update) = self.apply_channel_update(update) {
                        self.backlog.push_back(update);
                    }
                }
            }
        };

        match result {
            Ok(response) => {
                self.state
                    .session
                    .resolve(&response.session_id, SessionSource::StartResponse);
                self.mark_active();
                let session_id = self
                    .state
                    .session
                    .session_id()
                    .unwrap_or(response.session_id.as_str())
                    .to_string();
                Ok(StartOutcome::Started { session_id })
            }
            Err(e) if e.is_network() => {
                // Apply queued channel events before reading the channel state.
                self.drain_ready();
                let fallback = self
                    .state
                    .session
                    .degraded_fallback(self.connection.state())
                    .cloned();
                match fallback {
                    Some(identity) => {
                        self.mark_active();
                        let session_id = identity.value().to_string();
                        if identity.is_degraded() {
                            Ok(StartOutcome::Degraded { session_id })
                        } else {
                            Ok(StartOutcome::Started { session_id })
                        }
                    }
                    None => {
                        tracing::error!(error = %e, "run-start failed and push channel is down");
                        self.state.phase = RunPhase::Idle;
                        Err(e.into())
                    }
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "run-start request failed");
                self.state.phase = RunPhase::Idle;
                Err(e.into())
            }
        }
    }

    /// Wait for the next change and apply it. Pongs and unknown message
    /// kinds are consumed silently.
    pub async fn next_update(&mut self) -> Option<SyncUpdate> {
        if let Some(update) = self.backlog.pop_front() {
            return Some(update);
        }
        loop {
            let update = self.connection.recv().await?;
            if let Some(update) = self.apply_channel_update(update) {
                return Some(update);
            }
        }
    }

    pub async fn export_report(&self) -> Result<ReportArtifact, AppError> {
        report::export_report(self.coordinator.api(), self.session_id()).await
    }

    pub async fn export_deleted_urls(&self) -> Result<ReportArtifact, AppError> {
        report::export_deleted_urls(self.coordinator.api(), self.session_id()).await
    }

    /// Backend-side status of the current run.
    pub async fn fetch_status(&self) -> Result<RunStatusResponse, AppError> {
        let session_id = self.session_id().ok_or(AppError::NoSession)?;
        Ok(self.coordinator.api().fetch_status(session_id).await?)
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn phase(&self) -> RunPhase {
        self.state.phase
    }

    pub fn is_downloading(&self) -> bool {
        matches!(self.state.phase, RunPhase::Starting | RunPhase::Active)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.state.session.session_id()
    }

    pub fn downloads(&self) -> impl Iterator<Item = &DownloadState> {
        self.state.progress.iter()
    }

    pub fn report(&self) -> Option<&Report> {
        self.state.report()
    }

    pub fn urls(&self) -> &[UrlEntry] {
        self.coordinator.urls()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn live_heartbeats(&self) -> usize {
        self.connection.live_heartbeats()
    }

    fn apply_channel_update(&mut self, update: ChannelUpdate) -> Option<SyncUpdate> {
        match update {
            ChannelUpdate::State(state) => Some(SyncUpdate::Connection(state)),
            ChannelUpdate::Message(message) => self.state.apply_message(message),
        }
    }

    fn drain_ready(&mut self) {
        while let Some(update) = self.connection.try_recv() {
            if let Some(update) = self.apply_channel_update(update) {
                self.backlog.push_back(update);
            }
        }
    }

    fn mark_active(&mut self) {
        // A report may already have finished the run during the request.
        if self.state.phase == RunPhase::Starting {
            self.state.phase = RunPhase::Active;
        }
    }
}
