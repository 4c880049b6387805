use crate::config::parse_flag;
use crate::models::QueuedWrite;
use crate::state::{OfflineQueue, QueueJournal};
use crate::util::now_ms;
use serde::{Deserialize, Serialize};

pub(crate) const AUTOSAVE_ENABLED_KEY: &str = "engagement_notes_autosave_enabled";

fn queue_key(resource_id: &str) -> String {
    format!("engagement_notes_queue::{resource_id}")
}

fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window().and_then(|w| w.local_storage().ok().flatten())
}

pub(crate) fn load_json_from_storage<T: for<'de> Deserialize<'de>>(key: &str) -> Option<T> {
    let storage = local_storage()?;
    let json = storage.get_item(key).ok().flatten()?;
    serde_json::from_str(&json).ok()
}

pub(crate) fn save_json_to_storage<T: Serialize>(key: &str, value: &T) {
    if let Ok(json) = serde_json::to_string(value) {
        if let Some(storage) = local_storage() {
            if let Err(e) = storage.set_item(key, &json) {
                leptos::logging::warn!("notes: localStorage write failed for {key}: {e:?}");
            }
        }
    }
}

pub(crate) fn remove_from_storage(key: &str) {
    if let Some(storage) = local_storage() {
        let _ = storage.remove_item(key);
    }
}

pub(crate) fn load_autosave_enabled() -> Option<bool> {
    let storage = local_storage()?;
    storage
        .get_item(AUTOSAVE_ENABLED_KEY)
        .ok()
        .flatten()
        .and_then(|v| parse_flag(&v))
}

pub(crate) fn save_autosave_enabled(enabled: bool) {
    if let Some(storage) = local_storage() {
        let _ = storage.set_item(AUTOSAVE_ENABLED_KEY, if enabled { "1" } else { "0" });
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
struct QueueSnapshot {
    saved_ms: i64,
    resource_id: String,
    entries: Vec<QueuedWrite>,
}

/// Offline queue journal in `localStorage`, one key per resource.
#[derive(Clone, Debug)]
pub(crate) struct LocalStorageJournal {
    resource_id: String,
}

impl LocalStorageJournal {
    pub fn new(resource_id: &str) -> Self {
        Self {
            resource_id: resource_id.to_string(),
        }
    }
}

impl QueueJournal for LocalStorageJournal {
    fn load(&self) -> OfflineQueue {
        if self.resource_id.trim().is_empty() {
            return OfflineQueue::new();
        }
        load_json_from_storage::<QueueSnapshot>(&queue_key(&self.resource_id))
            .filter(|snap| snap.resource_id == self.resource_id)
            .map(|snap| OfflineQueue::from_entries(snap.entries))
            .unwrap_or_default()
    }

    fn store(&self, queue: &OfflineQueue) {
        if self.resource_id.trim().is_empty() {
            return;
        }
        let key = queue_key(&self.resource_id);
        if queue.is_empty() {
            remove_from_storage(&key);
            return;
        }

        let snap = QueueSnapshot {
            saved_ms: now_ms(),
            resource_id: self.resource_id.clone(),
            entries: queue.iter().cloned().collect(),
        };
        save_json_to_storage(&key, &snap);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_key_is_per_resource() {
        assert_eq!(queue_key("2"), "engagement_notes_queue::2");
        assert_ne!(queue_key("2"), queue_key("3"));
    }

    #[test]
    fn test_empty_resource_journal_is_inert() {
        // Never touches the browser for a blank id.
        let j = LocalStorageJournal::new("  ");
        assert!(j.load().is_empty());
        j.store(&OfflineQueue::new());
    }
}
