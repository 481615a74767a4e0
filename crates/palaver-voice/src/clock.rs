//! Timeout primitive underlying recording-session expiry.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Arms one-shot timers for voice sessions. Exactly one timer exists per
/// capture session.
pub struct SessionClock;

impl SessionClock {
    /// Arm a timer that invokes `on_expire` after `duration` unless it is
    /// disarmed first.
    pub fn arm<F>(duration: Duration, on_expire: F) -> ArmedClock
    where
        F: FnOnce() + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancel_rx => {}
                _ = tokio::time::sleep(duration) => on_expire(),
            }
        });
        ArmedClock {
            cancel: Some(cancel_tx),
            task,
        }
    }
}

/// Handle to an armed timer.
///
/// Firing is idempotent with cancellation: if [`ArmedClock::disarm`] runs
/// before the timer fires, `on_expire` never runs. Dropping the handle also
/// disarms it.
#[derive(Debug)]
pub struct ArmedClock {
    cancel: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ArmedClock {
    /// Disarm the timer.
    pub fn disarm(mut self) {
        if let Some(cancel) = self.cancel.take() {
            // A failed send means the timer already fired; nothing to do.
            let _ = cancel.send(());
        }
        self.task.abort();
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_duration() {
        let (tx, rx) = oneshot::channel::<()>();
        let _clock = SessionClock::arm(Duration::from_secs(30), move || {
            let _ = tx.send(());
        });

        let fired = tokio::time::timeout(Duration::from_secs(60), rx).await;
        assert!(fired.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarm_before_expiry_suppresses_callback() {
        let flag = Arc::new(AtomicBool::new(false));
        let flag_clone = Arc::clone(&flag);
        let clock = SessionClock::arm(Duration::from_secs(30), move || {
            flag_clone.store(true, Ordering::SeqCst);
        });

        clock.disarm();

        // Advance well past the armed duration; the callback must never run.
        tokio::time::sleep(Duration::from_secs(120)).await;
        tokio::task::yield_now().await;
        assert!(!flag.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_disarms() {
        let flag = Arc::new(AtomicBool::new(false));
        let flag_clone = Arc::clone(&flag);
        {
            let _clock = SessionClock::arm(Duration::from_secs(30), move || {
                flag_clone.store(true, Ordering::SeqCst);
            });
        }

        tokio::time::sleep(Duration::from_secs(120)).await;
        tokio::task::yield_now().await;
        assert!(!flag.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarm_after_firing_is_harmless() {
        let (tx, rx) = oneshot::channel::<()>();
        let clock = SessionClock::arm(Duration::from_millis(10), move || {
            let _ = tx.send(());
        });

        tokio::time::timeout(Duration::from_secs(1), rx)
            .await
            .expect("timer should fire")
            .expect("callback should send");
        clock.disarm();
    }
}
