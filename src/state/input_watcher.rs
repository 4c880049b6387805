use std::cell::{Cell, RefCell};

/// Identifies one arming of a [`Debouncer`]. Only the most recent ticket can
/// fire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct DebounceTicket(u64);

/// Timer-agnostic debounce: the host runs the actual timer and hands the
/// ticket back when it elapses.
#[derive(Debug, Default)]
pub(crate) struct Debouncer {
    generation: Cell<u64>,
    armed: Cell<bool>,
}

impl Debouncer {
    /// Restarts the window. Any ticket handed out earlier is now stale.
    pub fn arm(&self) -> DebounceTicket {
        let next = self.generation.get().wrapping_add(1);
        self.generation.set(next);
        self.armed.set(true);
        DebounceTicket(next)
    }

    /// True exactly once, for the latest ticket, if not cancelled.
    pub fn fire(&self, ticket: DebounceTicket) -> bool {
        if self.armed.get() && ticket.0 == self.generation.get() {
            self.armed.set(false);
            true
        } else {
            false
        }
    }

    pub fn cancel(&self) {
        self.armed.set(false);
    }
}

/// Tracks the editor value between edits and decides which timer expiry is
/// allowed to trigger an autosave.
#[derive(Debug, Default)]
pub(crate) struct InputWatcher {
    latest: RefCell<String>,
    debouncer: Debouncer,
}

impl InputWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_input(&self, content: &str) -> DebounceTicket {
        content.clone_into(&mut self.latest.borrow_mut());
        self.debouncer.arm()
    }

    /// The content to autosave if `ticket` is still the latest edit.
    pub fn on_timer(&self, ticket: DebounceTicket) -> Option<String> {
        self.debouncer
            .fire(ticket)
            .then(|| self.latest.borrow().clone())
    }

    /// Replaces the tracked value without arming (load, clear).
    pub fn reset(&self, content: &str) {
        self.debouncer.cancel();
        content.clone_into(&mut self.latest.borrow_mut());
    }
}
