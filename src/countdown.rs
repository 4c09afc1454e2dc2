//! Redirect countdown shown after a successful payment

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::navigation::Navigator;
use crate::types::Destination;

const TICK: Duration = Duration::from_secs(1);

/// Ticks once per second from `seconds` down to zero, then navigates to the
/// destination.
///
/// Dropping the countdown cancels it; no navigation happens afterwards.
pub struct Countdown {
    remaining: watch::Receiver<u32>,
    handle: JoinHandle<()>,
}

impl Countdown {
    /// Start the countdown. Must be called from within a tokio runtime.
    pub fn start(seconds: u32, destination: Destination, navigator: Arc<dyn Navigator>) -> Self {
        let (tx, remaining) = watch::channel(seconds);

        let handle = tokio::spawn(async move {
            let mut left = seconds;
            while left > 0 {
                tokio::time::sleep(TICK).await;
                left -= 1;
                let _ = tx.send(left);
            }
            tracing::debug!("Countdown finished, navigating to {}", destination.path());
            navigator.navigate(destination);
        });

        Self { remaining, handle }
    }

    /// Seconds left before the automatic navigation.
    pub fn remaining(&self) -> u32 {
        *self.remaining.borrow()
    }

    /// Watch the remaining seconds as they tick.
    pub fn subscribe(&self) -> watch::Receiver<u32> {
        self.remaining.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait until the countdown has navigated.
    pub async fn finished(&mut self) {
        if self.handle.is_finished() {
            return;
        }
        let _ = (&mut self.handle).await;
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl std::fmt::Debug for Countdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Countdown")
            .field("remaining", &self.remaining())
            .field("finished", &self.is_finished())
            .finish()
    }
}
