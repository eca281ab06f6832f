//! Wire format of the push channel.
//!
//! Inbound frames are JSON objects tagged by `type`. Outbound traffic is only
//! the plain-text heartbeat token.

use serde::Deserialize;

use crate::domain::{ChannelError, ProgressEvent, Report};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReportFrame {
    #[serde(default)]
    pub session_id: Option<String>,
    pub report: Report,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InboundMessage {
    Progress(ProgressEvent),
    Report(ReportFrame),
    /// Backend answer to the heartbeat.
    Pong,
    /// Any kind this client does not know yet.
    #[serde(other)]
    Unknown,
}

impl InboundMessage {
    pub fn parse(text: &str) -> Result<Self, ChannelError> {
        serde_json::from_str(text).map_err(|e| ChannelError::Parse(e.to_string()))
    }

    pub fn session_id(&self) -> Option<&str> {
        match self {
            InboundMessage::Progress(event) => event.session_id.as_deref(),
            InboundMessage::Report(frame) => frame.session_id.as_deref(),
            InboundMessage::Pong | InboundMessage::Unknown => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FileStatus;

    #[test]
    fn test_parse_progress() {
        let msg = InboundMessage::parse(
            r#"{"type":"progress","session_id":"s1","file_id":"f1","status":"downloading","progress":20,"size":100,"total_size":500}"#,
        )
        .unwrap();

        match &msg {
            InboundMessage::Progress(event) => {
                assert_eq!(event.file_id, "f1");
                assert_eq!(event.status, Some(FileStatus::Downloading));
                assert_eq!(event.progress, Some(20.0));
                assert_eq!(event.size, Some(100));
                assert_eq!(event.total_size, Some(500));
                assert_eq!(event.error, None);
            }
            other => panic!("unexpected message: {other:?}"),
        }
        assert_eq!(msg.session_id(), Some("s1"));
    }

    #[test]
    fn test_parse_report() {
        let msg = InboundMessage::parse(
            r#"{"type":"report","session_id":"s1","report":{"completed_files":["f1"],"deleted_files":[],"pending_files":["f2"],"timestamp":"2024-01-01T00:00:00"}}"#,
        )
        .unwrap();

        let InboundMessage::Report(frame) = msg else {
            panic!("expected report");
        };
        assert_eq!(frame.session_id.as_deref(), Some("s1"));
        assert_eq!(frame.report.completed_files, vec!["f1".to_string()]);
        assert_eq!(frame.report.pending_files, vec!["f2".to_string()]);
    }

    #[test]
    fn test_parse_pong_and_unknown_kinds() {
        assert_eq!(
            InboundMessage::parse(r#"{"type":"pong"}"#).unwrap(),
            InboundMessage::Pong
        );
        assert_eq!(
            InboundMessage::parse(r#"{"type":"eta","file_id":"f1","seconds":3}"#).unwrap(),
            InboundMessage::Unknown
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            InboundMessage::parse("not json"),
            Err(ChannelError::Parse(_))
        ));
        assert!(matches!(
            InboundMessage::parse(r#"{"file_id":"f1"}"#),
            Err(ChannelError::Parse(_))
        ));
        assert!(matches!(
            InboundMessage::parse(r#"{"type":"progress","file_id":"f1","size":-4}"#),
            Err(ChannelError::Parse(_))
        ));
    }
}
