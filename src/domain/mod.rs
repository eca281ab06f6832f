pub mod error;
pub mod model;

pub use error::{AppError, ChannelError};
pub use model::{
    ConnectionState, DownloadState, FileStatus, ProgressEvent, Report, ReportSummary, RunPhase,
    UrlEntry,
};
