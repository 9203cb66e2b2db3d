// Ticketed request guard
//
// Each request class owns a counter. A dispatch bumps the counter and hands out the new
// value; a completion may only touch the session while its ticket is still the live value.
// Superseded completions are dropped silently; in-flight calls are never aborted.

use log::debug;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestClass {
    Releases,
    PasswordValidation,
    ImportPreview,
}

impl RequestClass {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestClass::Releases => "releases",
            RequestClass::PasswordValidation => "password-validation",
            RequestClass::ImportPreview => "import-preview",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestTicket {
    pub class: RequestClass,
    pub value: u64,
}

#[derive(Debug, Default)]
pub struct RequestGuard {
    releases: AtomicU64,
    password_validation: AtomicU64,
    import_preview: AtomicU64,
}

impl RequestGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatch(&self, class: RequestClass) -> RequestTicket {
        let value = self.counter(class).fetch_add(1, Ordering::SeqCst) + 1;
        RequestTicket { class, value }
    }

    /// Supersede whatever is in flight for `class` without starting a new request.
    pub fn invalidate(&self, class: RequestClass) {
        let ticket = self.dispatch(class);
        debug!(
            "[PHASE: wizard] [STEP: request_guard] {} invalidated at ticket {}",
            class.as_str(),
            ticket.value
        );
    }

    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        self.counter(ticket.class).load(Ordering::SeqCst) == ticket.value
    }

    fn counter(&self, class: RequestClass) -> &AtomicU64 {
        match class {
            RequestClass::Releases => &self.releases,
            RequestClass::PasswordValidation => &self.password_validation,
            RequestClass::ImportPreview => &self.import_preview,
        }
    }
}
