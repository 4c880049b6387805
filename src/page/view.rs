use crate::models::{NoteStats, SaveState};
use crate::page::controls::{
    banner_class, level_icon, ButtonStates, AUTOSAVE_TOGGLE_ID, BANNER_HIDE_MS, CHAR_COUNT_ID,
    CLEAR_BUTTON_ID, HIDDEN_BANNER_CLASS, QUICK_SAVE_BUTTON_ID, SAVE_BUTTON_ID, STATUS_ID,
    TIMESTAMP_ID, WORD_COUNT_ID,
};
use crate::state::{LogReporter, StatusLevel, StatusReporter};
use crate::util::last_saved_label;
use chrono::{DateTime, Utc};
use std::cell::Cell;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlButtonElement, HtmlElement, HtmlInputElement, HtmlTextAreaElement};

fn by_id<T: JsCast>(document: &Document, id: &str) -> Option<T> {
    document
        .get_element_by_id(id)
        .and_then(|el| el.dyn_into::<T>().ok())
}

/// The page elements around the editor. Every one of them is optional; a
/// page without a status banner still autosaves.
pub(crate) struct PageView {
    editor: HtmlTextAreaElement,
    banner: Option<HtmlElement>,
    timestamp: Option<Element>,
    word_count: Option<Element>,
    char_count: Option<Element>,
    save_btn: Option<HtmlButtonElement>,
    clear_btn: Option<HtmlButtonElement>,
    quick_save_btn: Option<HtmlButtonElement>,
    auto_save_toggle: Option<HtmlInputElement>,

    state: Cell<SaveState>,
    hide_timer: Cell<Option<i32>>,
}

impl PageView {
    pub fn attach(document: &Document, editor: HtmlTextAreaElement) -> Self {
        Self {
            editor,
            banner: by_id(document, STATUS_ID),
            timestamp: document.get_element_by_id(TIMESTAMP_ID),
            word_count: document.get_element_by_id(WORD_COUNT_ID),
            char_count: document.get_element_by_id(CHAR_COUNT_ID),
            save_btn: by_id(document, SAVE_BUTTON_ID),
            clear_btn: by_id(document, CLEAR_BUTTON_ID),
            quick_save_btn: by_id(document, QUICK_SAVE_BUTTON_ID),
            auto_save_toggle: by_id(document, AUTOSAVE_TOGGLE_ID),
            state: Cell::new(SaveState::Idle),
            hide_timer: Cell::new(None),
        }
    }

    pub fn editor(&self) -> &HtmlTextAreaElement {
        &self.editor
    }

    pub fn save_button(&self) -> Option<&HtmlButtonElement> {
        self.save_btn.as_ref()
    }

    pub fn clear_button(&self) -> Option<&HtmlButtonElement> {
        self.clear_btn.as_ref()
    }

    pub fn quick_save_button(&self) -> Option<&HtmlButtonElement> {
        self.quick_save_btn.as_ref()
    }

    pub fn auto_save_toggle(&self) -> Option<&HtmlInputElement> {
        self.auto_save_toggle.as_ref()
    }

    /// Replaces the editor value without firing `input`.
    pub fn set_editor_value(&self, content: &str) {
        self.editor.set_value(content);
        self.show_counts();
        self.refresh_controls();
    }

    pub fn show_counts(&self) {
        let stats = NoteStats::of(&self.editor.value());
        if let Some(el) = &self.word_count {
            el.set_text_content(Some(&stats.words.to_string()));
        }
        if let Some(el) = &self.char_count {
            el.set_text_content(Some(&stats.chars.to_string()));
        }
    }

    pub fn refresh_controls(&self) {
        let state = self.state.get();
        let buttons = ButtonStates::compute(
            !self.editor.value().trim().is_empty(),
            state == SaveState::Saving,
            matches!(state, SaveState::Dirty | SaveState::Failed),
        );

        if let Some(btn) = &self.save_btn {
            btn.set_disabled(!buttons.save_enabled);
            btn.set_class_name(buttons.save_class());
        }
        if let Some(btn) = &self.clear_btn {
            btn.set_disabled(!buttons.clear_enabled);
            btn.set_class_name(buttons.clear_class());
        }
        if let Some(btn) = &self.quick_save_btn {
            let display = if buttons.quick_save_visible { "block" } else { "none" };
            let _ = btn.style().set_property("display", display);
            btn.set_disabled(!buttons.quick_save_enabled);
        }
    }

    fn render_banner(&self, banner: &HtmlElement, level: StatusLevel, text: &str) {
        banner.set_inner_html("");
        if let Some(document) = banner.owner_document() {
            if let Ok(icon) = document.create_element("i") {
                icon.set_class_name(&format!("fas {} me-2", level_icon(level)));
                let _ = banner.append_child(&icon);
            }
            if let Ok(span) = document.create_element("span") {
                span.set_text_content(Some(text));
                let _ = banner.append_child(&span);
            }
        } else {
            banner.set_text_content(Some(text));
        }
        banner.set_class_name(&banner_class(level));
    }

    fn schedule_hide(&self, banner: &HtmlElement) {
        let Some(win) = web_sys::window() else {
            return;
        };

        let banner = banner.clone();
        let cb = wasm_bindgen::closure::Closure::once_into_js(move || {
            banner.set_class_name(HIDDEN_BANNER_CLASS);
        });
        let tid = win
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                cb.as_ref().unchecked_ref(),
                BANNER_HIDE_MS,
            )
            .ok();
        self.hide_timer.set(tid);
    }

    fn cancel_hide(&self) {
        if let Some(tid) = self.hide_timer.take() {
            if let Some(win) = web_sys::window() {
                win.clear_timeout_with_handle(tid);
            }
        }
    }

    pub fn close(&self) {
        self.cancel_hide();
    }
}

impl StatusReporter for PageView {
    fn state_changed(&self, state: SaveState) {
        LogReporter.state_changed(state);
        self.state.set(state);
        let _ = self.editor.set_attribute("data-save-state", state.as_ref());
        self.refresh_controls();
    }

    fn message(&self, level: StatusLevel, text: &str) {
        LogReporter.message(level, text);
        let Some(banner) = &self.banner else {
            return;
        };

        // A newer message owns the banner; the old one's hide timer must not
        // blank it.
        self.cancel_hide();
        self.render_banner(banner, level, text);
        if !level.is_sticky() {
            self.schedule_hide(banner);
        }
    }

    fn saved_at(&self, at: DateTime<Utc>) {
        if let Some(el) = &self.timestamp {
            el.set_text_content(Some(&last_saved_label(at)));
        }
    }
}
