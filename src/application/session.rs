use crate::domain::ConnectionState;
use crate::utils::get_timestamp_millis;

/// Where a session id came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSource {
    /// Carried by a progress or report frame on the push channel.
    Pushed,
    /// Returned by the run-start request.
    StartResponse,
    /// Made up locally because the run-start request never got an answer
    /// while the push channel was up. May not match the backend's session.
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    value: String,
    source: SessionSource,
}

impl SessionIdentity {
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn source(&self) -> SessionSource {
        self.source
    }

    pub fn is_degraded(&self) -> bool {
        self.source == SessionSource::Degraded
    }
}

/// Set-once session id for the current run. The first source to report wins.
#[derive(Debug, Default)]
pub struct SessionResolver {
    identity: Option<SessionIdentity>,
}

impl SessionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when `candidate` became the session id.
    pub fn resolve(&mut self, candidate: &str, source: SessionSource) -> bool {
        if self.identity.is_some() || candidate.is_empty() {
            return false;
        }

        tracing::info!(session_id = candidate, ?source, "session resolved");
        self.identity = Some(SessionIdentity {
            value: candidate.to_string(),
            source,
        });
        true
    }

    /// Fallback for a run-start request that failed at the network level.
    /// Only taken while the push channel is connected; an id that is
    /// already known is kept.
    pub fn degraded_fallback(&mut self, connection: ConnectionState) -> Option<&SessionIdentity> {
        if connection != ConnectionState::Connected {
            return None;
        }
        if self.identity.is_none() {
            let synthesized = synthesize_session_id();
            tracing::warn!(
                session_id = %synthesized,
                "run-start request failed but channel is up, using a local session id"
            );
            self.identity = Some(SessionIdentity {
                value: synthesized,
                source: SessionSource::Degraded,
            });
        }
        self.identity.as_ref()
    }

    pub fn current(&self) -> Option<&SessionIdentity> {
        self.identity.as_ref()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.identity.as_ref().map(SessionIdentity::value)
    }

    /// Forget the previous run's session.
    pub fn reset(&mut self) {
        self.identity = None;
    }
}

fn synthesize_session_id() -> String {
    format!("session_{}", get_timestamp_millis())
}
