use crate::state::StatusLevel;

pub(crate) const EDITOR_ID: &str = "notesTextarea";
pub(crate) const SAVE_BUTTON_ID: &str = "saveNotesBtn";
pub(crate) const CLEAR_BUTTON_ID: &str = "clearNotesBtn";
pub(crate) const QUICK_SAVE_BUTTON_ID: &str = "quickSaveBtn";
pub(crate) const AUTOSAVE_TOGGLE_ID: &str = "autoSaveToggle";
pub(crate) const STATUS_ID: &str = "statusMessage";
pub(crate) const TIMESTAMP_ID: &str = "notesTimestamp";
pub(crate) const WORD_COUNT_ID: &str = "wordCount";
pub(crate) const CHAR_COUNT_ID: &str = "charCount";

pub(crate) const HIDDEN_BANNER_CLASS: &str = "d-none";
pub(crate) const BANNER_HIDE_MS: i32 = 3_000;

pub(crate) const CLEAR_CONFIRM: &str =
    "Are you sure you want to clear all notes? This cannot be undone.";

pub(crate) fn banner_class(level: StatusLevel) -> String {
    format!("alert alert-{level} d-flex align-items-center")
}

pub(crate) fn level_icon(level: StatusLevel) -> &'static str {
    match level {
        StatusLevel::Success => "check-circle",
        StatusLevel::Error => "exclamation-triangle",
        StatusLevel::Warning => "exclamation-circle",
        StatusLevel::Info => "info-circle",
        StatusLevel::Saving => "spinner fa-spin",
    }
}

/// Enabled/visible flags for the note's buttons.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ButtonStates {
    pub save_enabled: bool,
    pub clear_enabled: bool,
    pub quick_save_visible: bool,
    pub quick_save_enabled: bool,
}

impl ButtonStates {
    pub fn compute(has_content: bool, saving: bool, dirty: bool) -> Self {
        Self {
            save_enabled: has_content && !saving,
            clear_enabled: has_content && !saving,
            quick_save_visible: has_content && dirty,
            quick_save_enabled: !saving,
        }
    }

    pub fn save_class(&self) -> &'static str {
        if self.save_enabled {
            "btn btn-sm btn-primary"
        } else {
            "btn btn-sm btn-outline-secondary"
        }
    }

    pub fn clear_class(&self) -> &'static str {
        if self.clear_enabled {
            "btn btn-sm btn-outline-danger"
        } else {
            "btn btn-sm btn-outline-secondary"
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Shortcut {
    Save,
    Clear,
}

/// Ctrl+S / Ctrl+N, or Cmd on macOS.
pub(crate) fn shortcut(key: &str, ctrl: bool, meta: bool, is_mac: bool) -> Option<Shortcut> {
    let modifier = if is_mac { meta } else { ctrl };
    if !modifier {
        return None;
    }
    if key.eq_ignore_ascii_case("s") {
        Some(Shortcut::Save)
    } else if key.eq_ignore_ascii_case("n") {
        Some(Shortcut::Clear)
    } else {
        None
    }
}

pub(crate) fn is_mac_platform(platform: &str) -> bool {
    platform.to_uppercase().contains("MAC")
}
