use crate::api::{ApiError, RemoteStore};
use crate::models::{Note, QueuedWrite, SaveState};
use crate::state::offline_queue::{NoJournal, OfflineQueue, QueueJournal};
use crate::state::status::{StatusLevel, StatusReporter};
use crate::util::now;
use chrono::{DateTime, Utc};
use std::cell::{Cell, RefCell};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum SaveOutcome {
    /// The backend confirmed the write at this instant.
    Saved(DateTime<Utc>),
    /// Offline; appended to the queue.
    Queued,
    /// Another write was in flight; nothing was sent.
    Busy,
    /// Automatic trigger with nothing worth saving.
    Skipped,
    Failed(ApiError),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct FlushReport {
    pub flushed: usize,
    pub remaining: usize,
    pub error: Option<ApiError>,
    /// A write was in flight; the flush runs when it settles.
    pub deferred: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum TeardownOutcome {
    Clean,
    Busy,
    /// Offline, or older writes still queued; the note went into the queue
    /// journal instead.
    Queued,
    Written,
    Failed(ApiError),
}

/// Holds the single in-flight slot; released on drop so an abandoned future
/// cannot wedge the pipeline.
struct InFlight<'a>(&'a Cell<bool>);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            None
        } else {
            Some(Self(flag))
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Local-first autosave for one note.
///
/// Responsibilities:
/// - at most one remote write at a time (saves and queue flushes share the slot)
/// - direct write when online, offline queue otherwise
/// - ordered replay of the queue when connectivity returns
/// - blocking final write at teardown
///
/// Everything runs on one thread; borrows are never held across an `.await`.
pub(crate) struct AutosavePipeline<S, R, J = NoJournal> {
    resource_id: String,
    store: S,
    reporter: R,
    journal: J,

    online: Cell<bool>,
    in_flight: Cell<bool>,
    flush_pending: Cell<bool>,
    auto_save: Cell<bool>,

    /// Edits not yet handed to a write path (sent or queued).
    dirty: Cell<bool>,
    /// Bumped on every local edit; lets a finishing write tell whether it
    /// still covers the latest content.
    revision: Cell<u64>,
    state: Cell<SaveState>,
    content: RefCell<String>,
    last_saved: Cell<Option<DateTime<Utc>>>,
    queue: RefCell<OfflineQueue>,
}

impl<S, R> AutosavePipeline<S, R>
where
    S: RemoteStore,
    R: StatusReporter,
{
    pub fn new(resource_id: impl Into<String>, store: S, reporter: R) -> Self {
        Self {
            resource_id: resource_id.into(),
            store,
            reporter,
            journal: NoJournal,
            online: Cell::new(true),
            in_flight: Cell::new(false),
            flush_pending: Cell::new(false),
            auto_save: Cell::new(true),
            dirty: Cell::new(false),
            revision: Cell::new(0),
            state: Cell::new(SaveState::Idle),
            content: RefCell::new(String::new()),
            last_saved: Cell::new(None),
            queue: RefCell::new(OfflineQueue::new()),
        }
    }
}

impl<S, R, J> AutosavePipeline<S, R, J>
where
    S: RemoteStore,
    R: StatusReporter,
    J: QueueJournal,
{
    /// Swaps in a durable journal and restores whatever it holds.
    pub fn with_journal<J2: QueueJournal>(self, journal: J2) -> AutosavePipeline<S, R, J2> {
        let restored = journal.load();
        if !restored.is_empty() {
            leptos::logging::log!(
                "notes: restored {} queued write(s) for resource {}",
                restored.len(),
                self.resource_id
            );
        }

        AutosavePipeline {
            resource_id: self.resource_id,
            store: self.store,
            reporter: self.reporter,
            journal,
            online: self.online,
            in_flight: self.in_flight,
            flush_pending: self.flush_pending,
            auto_save: self.auto_save,
            dirty: self.dirty,
            revision: self.revision,
            state: self.state,
            content: self.content,
            last_saved: self.last_saved,
            queue: RefCell::new(restored),
        }
    }

    /// Initial connectivity, without reporting or flushing.
    pub fn with_online(self, online: bool) -> Self {
        self.online.set(online);
        self
    }

    pub fn with_auto_save(self, enabled: bool) -> Self {
        self.auto_save.set(enabled);
        self
    }

    pub fn state(&self) -> SaveState {
        self.state.get()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub fn is_saving(&self) -> bool {
        self.in_flight.get()
    }

    pub fn is_online(&self) -> bool {
        self.online.get()
    }

    pub fn auto_save_enabled(&self) -> bool {
        self.auto_save.get()
    }

    pub fn content(&self) -> String {
        self.content.borrow().clone()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.borrow().len()
    }

    fn set_state(&self, next: SaveState) {
        if self.state.replace(next) != next {
            self.reporter.state_changed(next);
        }
    }

    /// Records a local edit.
    pub fn note_changed(&self, content: &str) {
        {
            let mut current = self.content.borrow_mut();
            if *current == content {
                return;
            }
            content.clone_into(&mut current);
        }
        self.revision.set(self.revision.get().wrapping_add(1));
        self.dirty.set(true);
        if !self.in_flight.get() {
            self.set_state(SaveState::Dirty);
        }
    }

    pub fn set_auto_save(&self, enabled: bool) {
        self.auto_save.set(enabled);
        if enabled {
            self.reporter.message(StatusLevel::Success, "Auto-save enabled");
        } else {
            self.reporter.message(StatusLevel::Warning, "Auto-save disabled");
        }
    }

    fn enqueue(&self, write: QueuedWrite) {
        let mut queue = self.queue.borrow_mut();
        queue.enqueue(write);
        self.journal.store(&queue);
    }

    fn confirm(&self, revision: u64, at: DateTime<Utc>) {
        self.last_saved.set(Some(at));
        self.reporter.saved_at(at);
        if self.revision.get() == revision {
            self.dirty.set(false);
            self.set_state(SaveState::Saved);
        } else {
            self.set_state(SaveState::Dirty);
        }
    }

    async fn run_pending_flush(&self) {
        if self.flush_pending.replace(false) {
            self.flush().await;
        }
    }

    /// Routes one write: queue when offline, behind the queue when older
    /// writes are still waiting, straight to the backend otherwise.
    async fn dispatch(
        &self,
        guard: InFlight<'_>,
        write: QueuedWrite,
        revision: u64,
        manual: bool,
    ) -> SaveOutcome {
        if !self.online.get() {
            self.enqueue(write);
            self.dirty.set(false);
            self.set_state(SaveState::Dirty);
            self.reporter.message(
                StatusLevel::Warning,
                "Offline - changes will sync when back online",
            );
            return SaveOutcome::Queued;
        }

        let behind_queue = !self.queue.borrow().is_empty();
        if behind_queue {
            let is_clear = write.is_clear;
            if manual && !is_clear {
                self.reporter.message(StatusLevel::Saving, "Saving...");
            }
            self.enqueue(write);
            self.dirty.set(false);
            drop(guard);
            let report = self.flush().await;
            return match report.error {
                Some(e) => {
                    self.set_state(SaveState::Failed);
                    if manual {
                        let text = if is_clear {
                            format!("Failed to clear notes: {e}")
                        } else {
                            format!("Save failed: {e}")
                        };
                        self.reporter.message(StatusLevel::Error, &text);
                    }
                    SaveOutcome::Failed(e)
                }
                None if report.deferred => SaveOutcome::Queued,
                None => {
                    if is_clear {
                        self.reporter.message(StatusLevel::Success, "Notes cleared");
                    } else if manual {
                        self.reporter
                            .message(StatusLevel::Success, "Notes saved successfully!");
                    }
                    SaveOutcome::Saved(self.last_saved.get().unwrap_or_else(now))
                }
            };
        }

        self.set_state(SaveState::Saving);
        if manual && !write.is_clear {
            self.reporter.message(StatusLevel::Saving, "Saving...");
        }

        let outcome = match self
            .store
            .write(&self.resource_id, &write.content, write.timestamp)
            .await
        {
            Ok(at) => {
                self.confirm(revision, at);
                if write.is_clear {
                    self.reporter.message(StatusLevel::Success, "Notes cleared");
                } else if manual {
                    self.reporter
                        .message(StatusLevel::Success, "Notes saved successfully!");
                }
                SaveOutcome::Saved(at)
            }
            Err(e) => {
                leptos::logging::error!("notes: save failed for {}: {e}", self.resource_id);
                self.set_state(SaveState::Failed);
                let text = if write.is_clear {
                    format!("Failed to clear notes: {e}")
                } else {
                    format!("Save failed: {e}")
                };
                self.reporter.message(StatusLevel::Error, &text);
                SaveOutcome::Failed(e)
            }
        };

        drop(guard);
        self.run_pending_flush().await;
        outcome
    }

    /// Saves `content` now (`manual`) or on behalf of a timer.
    ///
    /// Automatic requests are dropped silently while another write is in
    /// flight, and skipped when auto-save is off or the note is blank.
    pub async fn submit(&self, content: &str, manual: bool) -> SaveOutcome {
        let trimmed = content.trim().to_string();
        if !manual && (!self.auto_save.get() || trimmed.is_empty()) {
            return SaveOutcome::Skipped;
        }

        let Some(guard) = InFlight::acquire(&self.in_flight) else {
            if manual {
                self.reporter.message(StatusLevel::Info, "Saving in progress...");
            }
            return SaveOutcome::Busy;
        };

        if *self.content.borrow() != content {
            self.note_changed(content);
        }
        let revision = self.revision.get();
        let write = QueuedWrite::edit(Note {
            content: trimmed,
            timestamp: now(),
        });

        self.dispatch(guard, write, revision, manual).await
    }

    /// Periodic/blur fallback: saves the current content if it has unsent
    /// edits.
    pub async fn autosave(&self) -> SaveOutcome {
        if !self.dirty.get() {
            return SaveOutcome::Skipped;
        }
        let content = self.content();
        self.submit(&content, false).await
    }

    /// Empties the note locally and on the backend (or queues the clear).
    pub async fn clear(&self) -> SaveOutcome {
        let Some(guard) = InFlight::acquire(&self.in_flight) else {
            self.reporter.message(StatusLevel::Info, "Saving in progress...");
            return SaveOutcome::Busy;
        };

        self.reporter.message(StatusLevel::Warning, "Clearing notes...");
        self.content.borrow_mut().clear();
        self.revision.set(self.revision.get().wrapping_add(1));
        self.dirty.set(true);
        let revision = self.revision.get();

        self.dispatch(guard, QueuedWrite::clear(now()), revision, true)
            .await
    }

    /// Fetches the stored note and returns what the editor should show.
    ///
    /// Queued writes restored from the journal are newer than the backend, so
    /// the queue tail wins over the fetched content. Edits made while the
    /// request was pending win over both.
    pub async fn load(&self) -> Result<String, ApiError> {
        self.reporter.message(StatusLevel::Info, "Loading notes...");
        let revision = self.revision.get();

        let stored = match self.store.read(&self.resource_id).await {
            Ok(stored) => stored,
            Err(e) => {
                leptos::logging::error!("notes: load failed for {}: {e}", self.resource_id);
                self.reporter
                    .message(StatusLevel::Error, "Failed to load notes");
                return Err(e);
            }
        };

        if let Some(at) = stored.last_updated {
            self.last_saved.set(Some(at));
            self.reporter.saved_at(at);
        }

        if self.revision.get() != revision {
            leptos::logging::warn!("notes: edited while loading; keeping local content");
            return Ok(self.content());
        }

        let queued_tail = self.queue.borrow().iter().last().map(|w| w.content.clone());
        if let Some(tail) = queued_tail {
            *self.content.borrow_mut() = tail.clone();
            self.dirty.set(false);
            self.set_state(SaveState::Dirty);
            self.reporter.message(
                StatusLevel::Warning,
                "Restored unsynced changes from this device",
            );
            return Ok(tail);
        }

        *self.content.borrow_mut() = stored.content.clone();
        self.dirty.set(false);
        self.set_state(SaveState::Idle);
        if stored.content.trim().is_empty() {
            self.reporter
                .message(StatusLevel::Info, "Start taking notes...");
        } else {
            self.reporter.message(StatusLevel::Success, "Notes loaded");
        }
        Ok(stored.content)
    }

    /// Connectivity signal from the host. Flushes the queue once per
    /// offline -> online transition.
    pub async fn connectivity_changed(&self, online: bool) -> Option<FlushReport> {
        if self.online.replace(online) == online {
            return None;
        }

        if !online {
            self.reporter.message(
                StatusLevel::Warning,
                "Offline - changes will save when back online",
            );
            return None;
        }

        self.reporter
            .message(StatusLevel::Success, "Back online. Syncing changes...");
        Some(self.flush().await)
    }

    /// Replays the offline queue in insertion order, one write at a time.
    /// Stops at the first failure; the failed entry and everything after it
    /// stay queued.
    ///
    /// A reconnect that arrives while a pass is running is not lost: if that
    /// pass fails, the queue is replayed once more right away.
    pub async fn flush(&self) -> FlushReport {
        loop {
            let report = self.flush_pass().await;
            let retry = report.error.is_some()
                && self.online.get()
                && self.flush_pending.replace(false);
            if !retry {
                return report;
            }
            leptos::logging::log!(
                "notes: reconnected during a failed sync; retrying {} write(s)",
                report.remaining
            );
        }
    }

    async fn flush_pass(&self) -> FlushReport {
        let remaining = self.queue_len();
        if remaining == 0 || !self.online.get() {
            return FlushReport {
                remaining,
                ..Default::default()
            };
        }

        let Some(guard) = InFlight::acquire(&self.in_flight) else {
            self.flush_pending.set(true);
            return FlushReport {
                remaining,
                deferred: true,
                ..Default::default()
            };
        };

        // Only transitions seen from here on count for this pass.
        self.flush_pending.set(false);
        self.set_state(SaveState::Saving);
        self.reporter
            .message(StatusLevel::Info, "Syncing offline changes...");

        let mut flushed = 0;
        let mut last: Option<(QueuedWrite, DateTime<Utc>)> = None;
        loop {
            let next = self.queue.borrow().front().cloned();
            let Some(next) = next else {
                break;
            };

            match self
                .store
                .write(&self.resource_id, &next.content, next.timestamp)
                .await
            {
                Ok(at) => {
                    {
                        let mut queue = self.queue.borrow_mut();
                        queue.confirm_front(&next);
                        self.journal.store(&queue);
                    }
                    flushed += 1;
                    last = Some((next, at));
                }
                Err(e) => {
                    leptos::logging::error!(
                        "notes: sync stopped after {flushed} write(s) for {}: {e}",
                        self.resource_id
                    );
                    self.set_state(SaveState::Dirty);
                    self.reporter
                        .message(StatusLevel::Error, "Error syncing some changes");
                    return FlushReport {
                        flushed,
                        remaining: self.queue_len(),
                        error: Some(e),
                        deferred: false,
                    };
                }
            }
        }

        drop(guard);
        self.flush_pending.set(false);
        self.reporter.message(StatusLevel::Success, "All changes synced!");

        if let Some((write, at)) = last {
            let up_to_date =
                !self.dirty.get() && self.content.borrow().trim() == write.content;
            self.last_saved.set(Some(at));
            self.reporter.saved_at(at);
            self.set_state(if up_to_date {
                SaveState::Saved
            } else {
                SaveState::Dirty
            });
        }

        FlushReport {
            flushed,
            remaining: 0,
            error: None,
            deferred: false,
        }
    }

    /// Last-chance write while the page goes away. Synchronous: async requests
    /// issued now may never leave the browser.
    pub fn flush_on_exit(&self) -> TeardownOutcome {
        if self.in_flight.get() {
            return TeardownOutcome::Busy;
        }
        let content = self.content.borrow().trim().to_string();
        if !self.dirty.get() || content.is_empty() {
            return TeardownOutcome::Clean;
        }

        let at = now();
        // Older queued writes have to land first; leave this one to the
        // next visit's replay.
        let behind_queue = !self.queue.borrow().is_empty();
        if !self.online.get() || behind_queue {
            self.enqueue(QueuedWrite::edit(Note {
                content,
                timestamp: at,
            }));
            self.dirty.set(false);
            return TeardownOutcome::Queued;
        }

        match self.store.write_blocking(&self.resource_id, &content, at) {
            Ok(()) => {
                self.dirty.set(false);
                self.last_saved.set(Some(at));
                self.reporter.saved_at(at);
                self.set_state(SaveState::Saved);
                TeardownOutcome::Written
            }
            Err(e) => {
                leptos::logging::warn!("notes: failed to save on unload: {e}");
                // Journal it so the next visit can replay it.
                self.enqueue(QueuedWrite::edit(Note {
                    content,
                    timestamp: at,
                }));
                TeardownOutcome::Failed(e)
            }
        }
    }
}
