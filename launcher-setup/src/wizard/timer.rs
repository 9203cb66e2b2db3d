// Cancellable scheduled-callback slot
//
// One slot holds at most one pending callback. Scheduling always cancels the previous one
// first, so a burst of schedules leaves exactly one live timer.

use log::debug;
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub struct ScheduledSlot {
    name: &'static str,
    pending: Mutex<Option<CancellationToken>>,
}

impl ScheduledSlot {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            pending: Mutex::new(None),
        }
    }

    /// Run `callback` after `delay` unless cancelled or superseded first.
    /// Must be called from inside a tokio runtime.
    pub fn schedule<F>(&self, delay: Duration, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let token = CancellationToken::new();
        let previous = self.lock().replace(token.clone());
        if let Some(previous) = previous {
            previous.cancel();
            debug!(
                "[PHASE: wizard] [STEP: timer] Slot '{}' superseded a pending callback",
                self.name
            );
        }

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    if !token.is_cancelled() {
                        callback();
                    }
                }
            }
        });
    }

    /// Cancel the most recent schedule. Returns false when nothing was scheduled or it was
    /// already cancelled.
    pub fn cancel(&self) -> bool {
        match self.lock().take() {
            Some(token) => {
                let was_live = !token.is_cancelled();
                token.cancel();
                was_live
            }
            None => false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        // A poisoned slot only means a callback panicked; the token itself is still usable.
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for ScheduledSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn callback_fires_after_delay() {
        let slot = ScheduledSlot::new("test");
        let fired = Arc::new(AtomicU32::new(0));
        let f = Arc::clone(&fired);
        slot.schedule(Duration::from_millis(100), move || {
            f.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_cancels_previous_callback() {
        let slot = ScheduledSlot::new("test");
        let fired = Arc::new(AtomicU32::new(0));

        for _ in 0..5 {
            let f = Arc::clone(&fired);
            slot.schedule(Duration::from_millis(100), move || {
                f.fetch_add(1, Ordering::SeqCst);
            });
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_callback() {
        let slot = ScheduledSlot::new("test");
        let fired = Arc::new(AtomicU32::new(0));
        let f = Arc::clone(&fired);
        slot.schedule(Duration::from_millis(100), move || {
            f.fetch_add(1, Ordering::SeqCst);
        });

        assert!(slot.cancel());
        assert!(!slot.cancel());
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
