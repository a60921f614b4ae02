//! Cooperative cancellation.
//!
//! Loops wait between ticks with [`ShutdownSignal::wait`], which returns early
//! as soon as cancellation is requested. Cancellation is never observed in the
//! middle of a sensor read.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Cloneable cancellation flag with an interruptible wait.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    triggered: Arc<AtomicBool>,
    sender: Sender<()>,
    receiver: Receiver<()>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (sender, receiver) = bounded(1);
        Self {
            triggered: Arc::new(AtomicBool::new(false)),
            sender,
            receiver,
        }
    }

    /// Request cancellation. Safe to call repeatedly and from any thread.
    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
        // A full channel already holds a wake-up.
        let _ = self.sender.try_send(());
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Sleep for up to `timeout`.
    ///
    /// Returns `true` if cancellation was requested before or during the wait.
    pub fn wait(&self, timeout: Duration) -> bool {
        if self.is_triggered() {
            return true;
        }
        match self.receiver.recv_timeout(timeout) {
            Ok(()) => true,
            Err(RecvTimeoutError::Timeout) => self.is_triggered(),
            Err(RecvTimeoutError::Disconnected) => true,
        }
    }

    /// Trigger this signal on Ctrl+C.
    pub fn install_ctrlc_handler(&self) -> Result<(), ctrlc::Error> {
        let signal = self.clone();
        ctrlc::set_handler(move || {
            signal.trigger();
        })
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}
