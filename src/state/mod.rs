mod autosave;
mod input_watcher;
mod offline_queue;
mod status;

pub(crate) use autosave::{AutosavePipeline, SaveOutcome, TeardownOutcome};
pub(crate) use input_watcher::InputWatcher;
pub(crate) use offline_queue::{OfflineQueue, QueueJournal};
pub(crate) use status::{LogReporter, StatusLevel, StatusReporter};
