//! Client side of a download-orchestration backend: follows a run over the
//! push channel, keeps its session id, merges per-file progress and exposes
//! the final report.

pub mod api;
pub mod application;
pub mod channel;
pub mod config;
pub mod domain;
pub mod logging;
pub mod utils;

pub use application::{StartOutcome, SyncClient, SyncUpdate};
pub use config::ClientConfig;
pub use domain::AppError;
