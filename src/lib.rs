mod api;
mod config;
mod models;
mod page;
mod state;
mod storage;
mod util;

use crate::config::EnvConfig;
use crate::page::NotesPage;
use wasm_bindgen::JsCast;

// Needed for `#[wasm_bindgen(start)]` on the wasm entrypoint.
#[cfg(all(target_arch = "wasm32", not(test)))]
use wasm_bindgen::prelude::wasm_bindgen;

fn start_session() {
    let config = EnvConfig::new();
    match NotesPage::mount(config) {
        Ok(page) => leptos::logging::log!("notes: ready ({})", page.state()),
        Err(e) => leptos::logging::error!("notes: not started: {e}"),
    }
}

// WASM-only tests (run with `cargo test --target wasm32-unknown-unknown` + wasm-bindgen-test-runner)
#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use crate::models::{Note, QueuedWrite};
    use crate::state::{OfflineQueue, QueueJournal};
    use crate::storage::{load_autosave_enabled, save_autosave_enabled, LocalStorageJournal};
    use crate::util::now;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_queue_journal_roundtrip() {
        let journal = LocalStorageJournal::new("wasm-test-resource");
        let queue = OfflineQueue::from_entries([
            QueuedWrite::edit(Note {
                content: "offline draft".to_string(),
                timestamp: now(),
            }),
            QueuedWrite::clear(now()),
        ]);
        journal.store(&queue);

        let restored = journal.load();
        assert_eq!(restored, queue);

        // Other resources don't see it.
        assert!(LocalStorageJournal::new("another-resource").load().is_empty());

        journal.store(&OfflineQueue::new());
        assert!(journal.load().is_empty());
    }

    #[wasm_bindgen_test]
    fn test_autosave_flag_roundtrip() {
        save_autosave_enabled(false);
        assert_eq!(load_autosave_enabled(), Some(false));
        save_autosave_enabled(true);
        assert_eq!(load_autosave_enabled(), Some(true));
    }

    #[wasm_bindgen_test]
    fn test_mount_without_editor_is_an_error() {
        let mut cfg = crate::config::EnvConfig::new();
        cfg.resource_id = Some("2".to_string());
        let err = crate::page::NotesPage::mount(cfg).err();
        assert_eq!(
            err,
            Some(crate::page::SessionError::MissingElement("notesTextarea"))
        );
    }

    fn dispatch(target: &web_sys::EventTarget, event: &web_sys::Event) {
        target.dispatch_event(event).expect("dispatch");
    }

    fn type_into(editor: &web_sys::HtmlTextAreaElement, text: &str) {
        editor.set_value(text);
        dispatch(editor, &web_sys::Event::new("input").expect("input event"));
    }

    #[wasm_bindgen_test]
    fn test_session_keeps_autosaving_after_bfcache_hide_and_cancelled_unload() {
        use wasm_bindgen::JsCast;

        let window = web_sys::window().expect("window");
        let document = window.document().expect("document");
        let editor: web_sys::HtmlTextAreaElement = document
            .create_element("textarea")
            .expect("textarea")
            .dyn_into()
            .expect("textarea element");
        editor.set_id("notesTextarea");
        document
            .body()
            .expect("body")
            .append_child(&editor)
            .expect("append");

        save_autosave_enabled(true);
        let mut cfg = crate::config::EnvConfig::new();
        cfg.resource_id = Some("wasm-bfcache".to_string());
        let page = crate::page::NotesPage::mount(cfg).expect("mounts");

        // Page frozen into the back/forward cache, then restored.
        let init = web_sys::PageTransitionEventInit::new();
        init.set_persisted(true);
        let hide = web_sys::PageTransitionEvent::new_with_event_init_dict("pagehide", &init)
            .expect("pagehide event");
        dispatch(&window, &hide);
        assert!(!page.is_closed());

        type_into(&editor, "typed after restore");
        assert!(page.autosave_scheduled());

        // Blank the note so the unload write below has nothing to send.
        type_into(&editor, "");

        // Navigation started, then cancelled by the user.
        dispatch(
            &window,
            &web_sys::Event::new("beforeunload").expect("beforeunload event"),
        );
        assert!(!page.is_closed());
        assert!(!page.autosave_scheduled());

        type_into(&editor, "");
        assert!(page.autosave_scheduled());

        page.close();
        assert!(page.is_closed());
        assert!(!page.autosave_scheduled());
        editor.remove();
    }
}

// Only register the WASM start function for normal builds (not for tests),
// otherwise wasm-bindgen-test will end up with multiple entry symbols.
#[cfg_attr(all(target_arch = "wasm32", not(test)), wasm_bindgen(start))]
pub fn main() {
    console_error_panic_hook::set_once();

    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        leptos::logging::error!("notes: no document");
        return;
    };

    if document.ready_state() != "loading" {
        start_session();
        return;
    }

    let cb = wasm_bindgen::closure::Closure::once_into_js(start_session);
    if let Err(e) =
        document.add_event_listener_with_callback("DOMContentLoaded", cb.as_ref().unchecked_ref())
    {
        leptos::logging::error!("notes: cannot wait for DOMContentLoaded: {e:?}");
    }
}
