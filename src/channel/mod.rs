pub mod connection;
pub mod protocol;

pub use connection::{ChannelConfig, ChannelUpdate, ConnectionManager};
pub use protocol::{InboundMessage, ReportFrame};
