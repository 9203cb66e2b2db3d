// Backend event channel
//
// The backend pushes install progress and lifecycle events (login results) through an
// `EventHub`. Consumers hold a `Subscription` and must `dispose` it exactly once; the
// handle is consumed by `dispose`, and dropping an undisposed handle disposes it too.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

pub const EVENT_INSTALL_PROGRESS: &str = "install-progress";
pub const EVENT_LOGIN: &str = "login";

const HUB_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallProgressEvent {
    pub stage: String,
    /// 0-100 for the whole base install.
    pub progress: f64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloaded: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries_total: Option<usize>,
}

impl InstallProgressEvent {
    pub fn new(stage: &str, progress: f64, message: impl Into<String>) -> Self {
        Self {
            stage: stage.to_string(),
            progress,
            message: message.into(),
            downloaded: None,
            total: None,
            current: None,
            entries_total: None,
        }
    }

    pub fn with_bytes(mut self, downloaded: u64, total: Option<u64>) -> Self {
        self.downloaded = Some(downloaded);
        self.total = total;
        self
    }

    pub fn with_entries(mut self, current: usize, entries_total: Option<usize>) -> Self {
        self.current = Some(current);
        self.entries_total = entries_total;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "detail")]
pub enum LoginEvent {
    Succeeded,
    Failed(String),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "event", content = "payload")]
pub enum BackendEvent {
    InstallProgress(InstallProgressEvent),
    Login(LoginEvent),
}

impl BackendEvent {
    pub fn name(&self) -> &'static str {
        match self {
            BackendEvent::InstallProgress(_) => EVENT_INSTALL_PROGRESS,
            BackendEvent::Login(_) => EVENT_LOGIN,
        }
    }
}

pub type ProgressEmitter = Arc<dyn Fn(InstallProgressEvent) + Send + Sync>;

#[derive(Debug)]
struct HubShared {
    active: AtomicUsize,
    next_id: AtomicU64,
}

#[derive(Debug, Clone)]
pub struct EventHub {
    tx: broadcast::Sender<BackendEvent>,
    shared: Arc<HubShared>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(HUB_CAPACITY);
        Self {
            tx,
            shared: Arc::new(HubShared {
                active: AtomicUsize::new(0),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Publish to every live subscription. Publishing with no listener is not an error.
    pub fn publish(&self, event: BackendEvent) {
        let name = event.name();
        if self.tx.send(event).is_err() {
            debug!(
                "[PHASE: events] [STEP: publish] No subscribers for '{}' event",
                name
            );
        }
    }

    /// Emitter handed to the backend's install call.
    pub fn progress_emitter(&self) -> ProgressEmitter {
        let hub = self.clone();
        Arc::new(move |event: InstallProgressEvent| {
            hub.publish(BackendEvent::InstallProgress(event));
        })
    }

    pub fn subscribe(&self) -> Subscription {
        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst);
        self.shared.active.fetch_add(1, Ordering::SeqCst);
        debug!(
            "[PHASE: events] [STEP: subscribe] Subscription {} opened",
            id
        );
        Subscription {
            id,
            rx: Some(self.tx.subscribe()),
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn active_subscriptions(&self) -> usize {
        self.shared.active.load(Ordering::SeqCst)
    }
}

/// Live listener on an `EventHub`.
pub struct Subscription {
    id: u64,
    rx: Option<broadcast::Receiver<BackendEvent>>,
    shared: Arc<HubShared>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the next event. Returns `None` once the hub is gone.
    /// Lagged events are dropped with a warning; the newest ones still arrive.
    pub async fn recv(&mut self) -> Option<BackendEvent> {
        let rx = self.rx.as_mut()?;
        loop {
            match rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(
                        "[PHASE: events] [STEP: recv] Subscription {} lagged; {} event(s) dropped",
                        self.id, skipped
                    );
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking drain helper used after the producer has finished.
    pub fn try_recv(&mut self) -> Option<BackendEvent> {
        let rx = self.rx.as_mut()?;
        loop {
            match rx.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }

    pub fn dispose(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.rx.take().is_some() {
            self.shared.active.fetch_sub(1, Ordering::SeqCst);
            debug!(
                "[PHASE: events] [STEP: dispose] Subscription {} disposed",
                self.id
            );
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
