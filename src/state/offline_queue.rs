use crate::models::QueuedWrite;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// FIFO of writes made while offline.
///
/// Entries leave the queue only through [`OfflineQueue::confirm_front`], after
/// the backend has accepted them.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct OfflineQueue {
    entries: VecDeque<QueuedWrite>,
}

impl OfflineQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = QueuedWrite>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn enqueue(&mut self, write: QueuedWrite) {
        self.entries.push_back(write);
    }

    pub fn front(&self) -> Option<&QueuedWrite> {
        self.entries.front()
    }

    /// Drops the head after the backend confirmed `confirmed`. Returns false
    /// (and leaves the queue alone) if the head is no longer that entry.
    pub fn confirm_front(&mut self, confirmed: &QueuedWrite) -> bool {
        if self.entries.front() == Some(confirmed) {
            self.entries.pop_front();
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueuedWrite> {
        self.entries.iter()
    }
}

/// Durable copy of the offline queue.
pub(crate) trait QueueJournal {
    fn load(&self) -> OfflineQueue;

    fn store(&self, queue: &OfflineQueue);
}

/// Keeps nothing; the queue lives only as long as the page.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct NoJournal;

impl QueueJournal for NoJournal {
    fn load(&self) -> OfflineQueue {
        OfflineQueue::new()
    }

    fn store(&self, _queue: &OfflineQueue) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};

    fn ts(offset_secs: i64) -> DateTime<Utc> {
        let base: DateTime<Utc> = "2024-03-01T10:00:00Z".parse().expect("valid timestamp");
        base + Duration::seconds(offset_secs)
    }

    fn edit(content: &str, at: i64) -> QueuedWrite {
        QueuedWrite {
            content: content.to_string(),
            timestamp: ts(at),
            is_clear: false,
        }
    }

    #[test]
    fn test_enqueue_preserves_insertion_order() {
        let mut q = OfflineQueue::new();
        q.enqueue(edit("first", 0));
        q.enqueue(QueuedWrite::clear(ts(1)));
        q.enqueue(edit("third", 2));

        let contents: Vec<_> = q.iter().map(|w| w.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "", "third"]);
        assert_eq!(q.front().map(|w| w.content.as_str()), Some("first"));
    }

    #[test]
    fn test_identical_writes_are_kept_separately() {
        let mut q = OfflineQueue::new();
        q.enqueue(QueuedWrite::clear(ts(0)));
        q.enqueue(QueuedWrite::clear(ts(1)));
        assert_eq!(q.len(), 2);
        assert_eq!(q.iter().last().map(|w| w.timestamp), Some(ts(1)));
    }

    #[test]
    fn test_confirm_front_only_removes_matching_head() {
        let mut q = OfflineQueue::from_entries([edit("a", 0), edit("b", 1)]);

        assert!(!q.confirm_front(&edit("b", 1)));
        assert_eq!(q.len(), 2);

        assert!(q.confirm_front(&edit("a", 0)));
        assert_eq!(q.len(), 1);
        assert_eq!(q.front().map(|w| w.content.as_str()), Some("b"));
    }

    #[test]
    fn test_queue_json_roundtrip_keeps_order() {
        let q = OfflineQueue::from_entries([edit("a", 0), QueuedWrite::clear(ts(5))]);
        let json = serde_json::to_string(&q).expect("should serialize");
        let back: OfflineQueue = serde_json::from_str(&json).expect("should parse");
        assert_eq!(back, q);
    }

    #[test]
    fn test_no_journal_loads_empty() {
        NoJournal.store(&OfflineQueue::from_entries([edit("a", 0)]));
        assert!(NoJournal.load().is_empty());
    }
}
