mod controls;
mod view;

use crate::api::ApiClient;
use crate::config::{AutosaveConfig, EnvConfig};
use crate::models::SaveState;
use crate::state::{
    AutosavePipeline, InputWatcher, SaveOutcome, StatusLevel, StatusReporter, TeardownOutcome,
};
use crate::storage::{load_autosave_enabled, save_autosave_enabled, LocalStorageJournal};
use controls::{is_mac_platform, shortcut, Shortcut, CLEAR_CONFIRM, EDITOR_ID};
use leptos::ev;
use leptos::prelude::{window_event_listener, WindowListenerHandle};
use leptos::task::spawn_local;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use view::PageView;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{EventTarget, HtmlTextAreaElement};

type Pipeline = AutosavePipeline<ApiClient, Rc<PageView>, LocalStorageJournal>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum SessionError {
    NoWindow,
    NoDocument,
    MissingElement(&'static str),
    MissingResourceId,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::NoWindow => write!(f, "no window"),
            SessionError::NoDocument => write!(f, "no document"),
            SessionError::MissingElement(id) => write!(f, "missing element #{id}"),
            SessionError::MissingResourceId => write!(f, "no resource id on the page"),
        }
    }
}

impl std::error::Error for SessionError {}

/// An element listener that can be taken off again.
struct DomListener {
    target: EventTarget,
    event: &'static str,
    callback: Closure<dyn FnMut(web_sys::Event)>,
}

impl DomListener {
    fn attach(
        target: &EventTarget,
        event: &'static str,
        handler: impl FnMut(web_sys::Event) + 'static,
    ) -> Option<Self> {
        let callback = Closure::wrap(Box::new(handler) as Box<dyn FnMut(web_sys::Event)>);
        target
            .add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())
            .ok()?;
        Some(Self {
            target: target.clone(),
            event,
            callback,
        })
    }

    fn detach(&self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.event, self.callback.as_ref().unchecked_ref());
    }
}

/// One notes session: the editor already on the page wired to an
/// [`AutosavePipeline`].
///
/// Owns every listener and timer it installs. The teardown listeners hold the
/// only strong references, so the session lives until a non-persisted
/// `pagehide` or an explicit [`NotesPage::close`].
pub(crate) struct NotesPage {
    pipeline: Pipeline,
    view: Rc<PageView>,
    watcher: InputWatcher,
    timing: AutosaveConfig,

    debounce_timer: Cell<Option<i32>>,
    periodic: RefCell<Option<(i32, Closure<dyn FnMut()>)>>,
    listeners: RefCell<Vec<DomListener>>,
    window_handles: RefCell<Vec<WindowListenerHandle>>,
    closed: Cell<bool>,
}

impl NotesPage {
    pub fn mount(config: EnvConfig) -> Result<Rc<Self>, SessionError> {
        let window = web_sys::window().ok_or(SessionError::NoWindow)?;
        let document = window.document().ok_or(SessionError::NoDocument)?;
        let resource_id = config
            .resource_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .ok_or(SessionError::MissingResourceId)?;
        let editor = document
            .get_element_by_id(EDITOR_ID)
            .and_then(|el| el.dyn_into::<HtmlTextAreaElement>().ok())
            .ok_or(SessionError::MissingElement(EDITOR_ID))?;

        let view = Rc::new(PageView::attach(&document, editor));
        let auto_save = load_autosave_enabled().unwrap_or(config.autosave.enabled);
        if let Some(toggle) = view.auto_save_toggle() {
            toggle.set_checked(auto_save);
        }
        let online = window.navigator().on_line();

        let pipeline = AutosavePipeline::new(
            resource_id.clone(),
            ApiClient::from_config(&config),
            view.clone(),
        )
        .with_online(online)
        .with_auto_save(auto_save)
        .with_journal(LocalStorageJournal::new(&resource_id));

        leptos::logging::log!(
            "notes: session for resource {resource_id} (online: {online}, auto-save: {auto_save})"
        );

        let page = Rc::new(Self {
            pipeline,
            view,
            watcher: InputWatcher::new(),
            timing: config.autosave,
            debounce_timer: Cell::new(None),
            periodic: RefCell::new(None),
            listeners: RefCell::new(Vec::new()),
            window_handles: RefCell::new(Vec::new()),
            closed: Cell::new(false),
        });

        page.attach_editor_listeners();
        page.attach_window_listeners();
        page.start_periodic_save();
        page.view.show_counts();
        page.view.refresh_controls();

        let p2 = page.clone();
        spawn_local(async move {
            p2.load().await;
        });

        Ok(page)
    }

    async fn load(&self) {
        if let Ok(content) = self.pipeline.load().await {
            // Keep what the user typed while the request was pending.
            if self.view.editor().value() != content {
                self.view.set_editor_value(&content);
            }
            self.watcher.reset(&content);
        }

        if self.pipeline.is_online() && self.pipeline.queue_len() > 0 {
            let report = self.pipeline.flush().await;
            leptos::logging::log!(
                "notes: replayed {} restored write(s), {} left",
                report.flushed,
                report.remaining
            );
        }
    }

    fn attach_editor_listeners(self: &Rc<Self>) {
        let mut listeners = Vec::new();
        let editor: &EventTarget = self.view.editor().as_ref();

        let weak = Rc::downgrade(self);
        listeners.extend(DomListener::attach(editor, "input", move |_ev| {
            if let Some(page) = weak.upgrade() {
                page.on_input();
            }
        }));

        let weak = Rc::downgrade(self);
        listeners.extend(DomListener::attach(editor, "blur", move |_ev| {
            if let Some(page) = weak.upgrade() {
                page.on_blur();
            }
        }));

        let save_buttons = [self.view.save_button(), self.view.quick_save_button()];
        for btn in save_buttons.into_iter().flatten() {
            let weak = Rc::downgrade(self);
            listeners.extend(DomListener::attach(btn.as_ref(), "click", move |ev| {
                ev.prevent_default();
                if let Some(page) = weak.upgrade() {
                    page.save_now();
                }
            }));
        }

        if let Some(btn) = self.view.clear_button() {
            let weak = Rc::downgrade(self);
            listeners.extend(DomListener::attach(btn.as_ref(), "click", move |ev| {
                ev.prevent_default();
                if let Some(page) = weak.upgrade() {
                    page.clear_with_confirm();
                }
            }));
        }

        if let Some(toggle) = self.view.auto_save_toggle() {
            let weak = Rc::downgrade(self);
            listeners.extend(DomListener::attach(toggle.as_ref(), "change", move |_ev| {
                if let Some(page) = weak.upgrade() {
                    page.on_toggle();
                }
            }));
        }

        self.listeners.borrow_mut().extend(listeners);
    }

    fn attach_window_listeners(self: &Rc<Self>) {
        let mut handles = Vec::new();

        let weak = Rc::downgrade(self);
        handles.push(window_event_listener(ev::online, move |_ev: web_sys::Event| {
            if let Some(page) = weak.upgrade() {
                page.on_connectivity(true);
            }
        }));

        let weak = Rc::downgrade(self);
        handles.push(window_event_listener(ev::offline, move |_ev: web_sys::Event| {
            if let Some(page) = weak.upgrade() {
                page.on_connectivity(false);
            }
        }));

        let weak = Rc::downgrade(self);
        let is_mac = web_sys::window()
            .and_then(|w| w.navigator().platform().ok())
            .is_some_and(|p| is_mac_platform(&p));
        handles.push(window_event_listener(
            ev::keydown,
            move |ev: web_sys::KeyboardEvent| {
                let Some(action) = shortcut(&ev.key(), ev.ctrl_key(), ev.meta_key(), is_mac) else {
                    return;
                };
                ev.prevent_default();
                if let Some(page) = weak.upgrade() {
                    match action {
                        Shortcut::Save => page.save_now(),
                        Shortcut::Clear => page.clear_with_confirm(),
                    }
                }
            },
        ));

        // A persisted pagehide may come back from the back/forward cache, so
        // only a final one tears the session down.
        let p2 = self.clone();
        handles.push(window_event_listener(
            ev::pagehide,
            move |ev: web_sys::PageTransitionEvent| {
                p2.flush_before_exit();
                if !ev.persisted() {
                    p2.close();
                }
            },
        ));

        // Some browsers skip pagehide on a plain tab close. The navigation
        // can still be cancelled here, so the session stays wired.
        let p3 = self.clone();
        handles.push(window_event_listener(
            ev::beforeunload,
            move |_ev: web_sys::BeforeUnloadEvent| {
                p3.flush_before_exit();
            },
        ));

        let weak = Rc::downgrade(self);
        handles.push(window_event_listener(
            ev::pageshow,
            move |ev: web_sys::PageTransitionEvent| {
                if !ev.persisted() {
                    return;
                }
                if let Some(page) = weak.upgrade() {
                    let online = web_sys::window().is_some_and(|w| w.navigator().on_line());
                    page.on_connectivity(online);
                }
            },
        ));

        self.window_handles.borrow_mut().extend(handles);
    }

    fn start_periodic_save(self: &Rc<Self>) {
        let Some(win) = web_sys::window() else {
            return;
        };

        let weak = Rc::downgrade(self);
        let cb = Closure::wrap(Box::new(move || {
            let Some(page) = weak.upgrade() else {
                return;
            };
            spawn_local(async move {
                page.pipeline.autosave().await;
            });
        }) as Box<dyn FnMut()>);

        match win.set_interval_with_callback_and_timeout_and_arguments_0(
            cb.as_ref().unchecked_ref(),
            self.timing.periodic_ms(),
        ) {
            Ok(tid) => *self.periodic.borrow_mut() = Some((tid, cb)),
            Err(e) => leptos::logging::warn!("notes: periodic save not started: {e:?}"),
        }
    }

    fn on_input(self: &Rc<Self>) {
        let value = self.view.editor().value();
        self.pipeline.note_changed(&value);
        self.view.show_counts();
        self.view.refresh_controls();

        if self.pipeline.auto_save_enabled() {
            self.schedule_autosave(&value);
        }
    }

    fn schedule_autosave(self: &Rc<Self>, value: &str) {
        let Some(win) = web_sys::window() else {
            return;
        };

        self.cancel_debounce_timer();
        let ticket = self.watcher.on_input(value);
        self.view.message(StatusLevel::Info, "Auto-saving soon...");

        let weak = Rc::downgrade(self);
        let cb = Closure::once_into_js(move || {
            let Some(page) = weak.upgrade() else {
                return;
            };
            page.debounce_timer.set(None);
            if let Some(content) = page.watcher.on_timer(ticket) {
                spawn_local(async move {
                    page.pipeline.submit(&content, false).await;
                });
            }
        });

        let tid = win
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                cb.as_ref().unchecked_ref(),
                self.timing.debounce_ms(),
            )
            .ok();
        self.debounce_timer.set(tid);
    }

    fn cancel_debounce_timer(&self) {
        if let Some(tid) = self.debounce_timer.take() {
            if let Some(win) = web_sys::window() {
                win.clear_timeout_with_handle(tid);
            }
        }
    }

    /// Drops any pending debounce in favour of a save happening now.
    fn settle_debounce(&self) {
        self.cancel_debounce_timer();
        self.watcher.reset(&self.view.editor().value());
    }

    fn on_blur(self: &Rc<Self>) {
        if !self.pipeline.is_dirty() {
            return;
        }
        self.settle_debounce();
        let page = self.clone();
        spawn_local(async move {
            page.pipeline.autosave().await;
        });
    }

    pub fn save_now(self: &Rc<Self>) {
        self.settle_debounce();
        let content = self.view.editor().value();
        let page = self.clone();
        spawn_local(async move {
            page.pipeline.submit(&content, true).await;
        });
    }

    fn clear_with_confirm(self: &Rc<Self>) {
        let confirmed = web_sys::window()
            .and_then(|w| w.confirm_with_message(CLEAR_CONFIRM).ok())
            .unwrap_or(false);
        if !confirmed {
            return;
        }
        if self.pipeline.is_saving() {
            self.view.message(StatusLevel::Info, "Saving in progress...");
            return;
        }

        self.settle_debounce();
        self.view.set_editor_value("");
        self.watcher.reset("");

        let page = self.clone();
        spawn_local(async move {
            if page.pipeline.clear().await == SaveOutcome::Busy {
                // A save started before this ran; the editor goes back to
                // what the pipeline still holds.
                page.view.set_editor_value(&page.pipeline.content());
            }
        });
    }

    fn on_toggle(&self) {
        let Some(enabled) = self.view.auto_save_toggle().map(|t| t.checked()) else {
            return;
        };
        self.pipeline.set_auto_save(enabled);
        save_autosave_enabled(enabled);
        if !enabled {
            self.settle_debounce();
        }
    }

    fn on_connectivity(self: &Rc<Self>, online: bool) {
        let page = self.clone();
        spawn_local(async move {
            if let Some(report) = page.pipeline.connectivity_changed(online).await {
                if let Some(e) = &report.error {
                    leptos::logging::warn!(
                        "notes: {} queued write(s) left after sync error: {e}",
                        report.remaining
                    );
                }
            }
        });
    }

    pub fn state(&self) -> SaveState {
        self.pipeline.state()
    }

    /// Blocking last-chance write. Leaves every listener in place.
    fn flush_before_exit(&self) {
        self.settle_debounce();
        match self.pipeline.flush_on_exit() {
            TeardownOutcome::Failed(e) => {
                leptos::logging::warn!("notes: unsaved changes kept for next visit: {e}")
            }
            outcome => leptos::logging::log!("notes: teardown {outcome:?}"),
        }
    }

    /// Final write plus removal of every listener and timer. Idempotent.
    pub fn close(&self) {
        if self.closed.replace(true) {
            return;
        }

        self.flush_before_exit();

        if let Some((tid, _cb)) = self.periodic.borrow_mut().take() {
            if let Some(win) = web_sys::window() {
                win.clear_interval_with_handle(tid);
            }
        }
        for listener in self.listeners.borrow_mut().drain(..) {
            listener.detach();
        }
        for handle in self.window_handles.borrow_mut().drain(..) {
            handle.remove();
        }
        self.view.close();
    }

    #[cfg(all(test, target_arch = "wasm32"))]
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.get()
    }

    #[cfg(all(test, target_arch = "wasm32"))]
    pub(crate) fn autosave_scheduled(&self) -> bool {
        self.debounce_timer.get().is_some()
    }
}
