pub mod aggregator;
pub mod download_coordinator;
pub mod report;
pub mod session;
pub mod sync_client;

pub use aggregator::ProgressAggregator;
pub use download_coordinator::{DownloadCoordinator, StartOutcome};
pub use report::{ReportArtifact, ReportFinalizer};
pub use session::{SessionIdentity, SessionResolver, SessionSource};
pub use sync_client::{RunState, SyncClient, SyncUpdate};
