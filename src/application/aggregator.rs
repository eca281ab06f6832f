use std::collections::HashMap;

use crate::domain::{DownloadState, ProgressEvent, UrlEntry};

/// Per-file view of the current run. Entries are only ever added during a
/// run; `seed_pending` replaces the whole map when a new run starts.
#[derive(Debug, Default)]
pub struct ProgressAggregator {
    entries: HashMap<String, DownloadState>,
    // first-seen order, for display
    order: Vec<String>,
}

impl ProgressAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_pending(&mut self, urls: &[UrlEntry]) {
        self.entries.clear();
        self.order.clear();
        for entry in urls {
            self.insert(DownloadState::pending(entry.id.clone()));
        }
        tracing::debug!(files = self.order.len(), "seeded pending downloads");
    }

    /// Merge `event` into its file's entry, creating the entry when the file
    /// was not seeded.
    pub fn apply(&mut self, event: &ProgressEvent) -> &DownloadState {
        if !self.entries.contains_key(&event.file_id) {
            tracing::debug!(file_id = %event.file_id, "progress for unseeded file");
            self.order.push(event.file_id.clone());
        }

        let state = self
            .entries
            .entry(event.file_id.clone())
            .or_insert_with(|| DownloadState::pending(event.file_id.clone()));
        state.merge(event);
        state
    }

    pub fn get(&self, file_id: &str) -> Option<&DownloadState> {
        self.entries.get(file_id)
    }

    /// Entries in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &DownloadState> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, state: DownloadState) {
        if !self.entries.contains_key(&state.file_id) {
            self.order.push(state.file_id.clone());
        }
        self.entries.insert(state.file_id.clone(), state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FileStatus;

    fn urls(ids: &[&str]) -> Vec<UrlEntry> {
        ids.iter()
            .map(|id| UrlEntry {
                id: id.to_string(),
                url: format!("https://example.com/{id}"),
            })
            .collect()
    }

    fn event(json: &str) -> ProgressEvent {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_seed_pending() {
        let mut aggregator = ProgressAggregator::new();
        aggregator.seed_pending(&urls(&["u1", "u2"]));

        assert_eq!(aggregator.len(), 2);
        for id in ["u1", "u2"] {
            let state = aggregator.get(id).unwrap();
            assert_eq!(state.status, FileStatus::Pending);
            assert_eq!(state.progress, 0);
            assert_eq!(state.size, 0);
            assert_eq!(state.total_size, 0);
        }
        let order: Vec<_> = aggregator.iter().map(|s| s.file_id.as_str()).collect();
        assert_eq!(order, ["u1", "u2"]);
    }

    #[test]
    fn test_seed_replaces_previous_run() {
        let mut aggregator = ProgressAggregator::new();
        aggregator.seed_pending(&urls(&["old"]));
        aggregator.apply(&event(r#"{"file_id":"old","status":"completed"}"#));

        aggregator.seed_pending(&urls(&["new"]));
        assert!(aggregator.get("old").is_none());
        assert_eq!(aggregator.len(), 1);
    }

    #[test]
    fn test_events_merge_in_arrival_order() {
        let mut aggregator = ProgressAggregator::new();
        aggregator.seed_pending(&urls(&["f1"]));

        let events = [
            event(r#"{"file_id":"f1","status":"downloading","progress":0,"size":0,"total_size":2048}"#),
            event(r#"{"file_id":"f1","status":"downloading","progress":50,"size":1024}"#),
            event(r#"{"file_id":"f1","status":"completed","progress":100,"size":2048}"#),
        ];
        for e in &events {
            aggregator.apply(e);
        }

        let state = aggregator.get("f1").unwrap().clone();
        assert_eq!(state.status, FileStatus::Completed);
        assert_eq!(state.progress, 100);
        assert_eq!(state.size, 2048);
        assert_eq!(state.total_size, 2048);

        let again = aggregator.apply(&events[2]).clone();
        assert_eq!(again, state);
    }

    #[test]
    fn test_unknown_file_is_added() {
        let mut aggregator = ProgressAggregator::new();
        aggregator.seed_pending(&urls(&["f1"]));
        aggregator.apply(&event(
            r#"{"file_id":"f9","status":"stalled","message":"no progress"}"#,
        ));

        let state = aggregator.get("f9").unwrap();
        assert_eq!(state.status, FileStatus::Stalled);
        assert_eq!(state.message.as_deref(), Some("no progress"));
        let order: Vec<_> = aggregator.iter().map(|s| s.file_id.as_str()).collect();
        assert_eq!(order, ["f1", "f9"]);
    }
}
