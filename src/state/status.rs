use crate::models::SaveState;
use chrono::{DateTime, Utc};

/// Severity of a status message. The lowercase name doubles as the CSS
/// suffix of the page's status banner (`alert-success`, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum StatusLevel {
    Info,
    Success,
    Warning,
    Error,
    Saving,
}

impl StatusLevel {
    /// Messages at these levels stay until replaced.
    pub fn is_sticky(self) -> bool {
        matches!(self, StatusLevel::Error | StatusLevel::Saving)
    }
}

/// Sink for everything the pipeline wants a human to see.
pub(crate) trait StatusReporter {
    fn state_changed(&self, state: SaveState);

    fn message(&self, level: StatusLevel, text: &str);

    /// The instant the backend confirmed (or the load reported).
    fn saved_at(&self, _at: DateTime<Utc>) {}
}

/// Reports to the console only. Used when the page has no status element.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct LogReporter;

impl StatusReporter for LogReporter {
    fn state_changed(&self, state: SaveState) {
        leptos::logging::log!("notes: state -> {state}");
    }

    fn message(&self, level: StatusLevel, text: &str) {
        match level {
            StatusLevel::Error => leptos::logging::error!("notes: {text}"),
            StatusLevel::Warning => leptos::logging::warn!("notes: {text}"),
            _ => leptos::logging::log!("notes: [{level}] {text}"),
        }
    }

    fn saved_at(&self, at: DateTime<Utc>) {
        leptos::logging::log!("notes: last saved {}", at.to_rfc3339());
    }
}

impl<T: StatusReporter + ?Sized> StatusReporter for std::rc::Rc<T> {
    fn state_changed(&self, state: SaveState) {
        (**self).state_changed(state)
    }

    fn message(&self, level: StatusLevel, text: &str) {
        (**self).message(level, text)
    }

    fn saved_at(&self, at: DateTime<Utc>) {
        (**self).saved_at(at)
    }
}
