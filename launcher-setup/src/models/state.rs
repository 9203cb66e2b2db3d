// Session store (in-memory)
//
// NOTE: This is NOT persisted. It holds the one `InstallSession` of the running wizard.
// `SetupWizard` is the only writer; everything else reads clones via `read`.

use crate::models::session::{InstallSession, Locale};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct SessionStore {
    inner: Mutex<InstallSession>,
}

impl SessionStore {
    pub fn new(session: InstallSession) -> Self {
        Self {
            inner: Mutex::new(session),
        }
    }

    /// Clone of the current session.
    pub async fn read(&self) -> InstallSession {
        self.inner.lock().await.clone()
    }

    /// Apply one mutation under the lock and return whatever the closure returns.
    /// The closure must not block; the lock is never held across an await.
    pub async fn update<R>(&self, apply: impl FnOnce(&mut InstallSession) -> R) -> R {
        let mut inner = self.inner.lock().await;
        apply(&mut inner)
    }

    /// Drop every field of the session, keeping only the chosen locale.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        let locale: Locale = inner.locale;
        *inner = InstallSession::new(locale);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::session::WizardStep;

    #[tokio::test]
    async fn update_returns_closure_value_and_persists_mutation() {
        let store = SessionStore::new(InstallSession::new(Locale::En));
        let previous = store
            .update(|s| {
                let prev = s.step;
                s.step = WizardStep::Version;
                prev
            })
            .await;
        assert_eq!(previous, WizardStep::Welcome);
        assert_eq!(store.read().await.step, WizardStep::Version);
    }

    #[tokio::test]
    async fn reset_keeps_locale_only() {
        let store = SessionStore::new(InstallSession::new(Locale::En));
        store
            .update(|s| {
                s.install_path = "/games/among-us".to_string();
                s.step = WizardStep::Complete;
            })
            .await;
        store.reset().await;

        let session = store.read().await;
        assert_eq!(session.locale, Locale::En);
        assert_eq!(session.step, WizardStep::Welcome);
        assert!(session.install_path.is_empty());
    }
}
