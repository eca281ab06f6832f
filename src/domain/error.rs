use thiserror::Error;

/// Failures surfaced to the user of the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("URL list is still loading, please wait")]
    NotReady,

    #[error("no session for this run yet")]
    NoSession,

    #[error("request failed: {0}")]
    Request(String),

    #[error("backend returned an empty file")]
    EmptyArtifact,

    #[error("I/O error: {0}")]
    Io(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Push channel failures. These are logged and healed by the connection
/// manager, never shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed frame: {0}")]
    Parse(String),
}
