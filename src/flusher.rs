//! Background group commit.
//!
//! Mutations land in the active segment's write buffer; durability comes
//! from a background task that wakes on a fixed cadence and performs
//! flush-then-fsync under the engine's exclusive lock, coalescing many
//! small writes into one fsync.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex, RwLock};

use crate::store::StoreInner;

/// Handle to the background flush-then-fsync thread.
///
/// The thread wakes every `interval`, or immediately when signalled to
/// stop; on every wake it performs one group commit. On stop it commits
/// one final time and exits.
pub(crate) struct Flusher {
    /// Stop flag plus the condvar the thread parks on between ticks.
    signal: Arc<(Mutex<bool>, Condvar)>,
    /// Background thread handle.
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Flusher {
    /// Spawn the background thread.
    pub fn start(inner: Arc<RwLock<StoreInner>>, interval: Duration) -> Flusher {
        let signal = Arc::new((Mutex::new(false), Condvar::new()));
        let thread_signal = Arc::clone(&signal);

        let handle = thread::Builder::new()
            .name("firkin-sync".to_string())
            .spawn(move || loop {
                let stopping = {
                    let (lock, cond) = &*thread_signal;
                    let mut stop = lock.lock();
                    if !*stop {
                        cond.wait_for(&mut stop, interval);
                    }
                    *stop
                };

                inner.write().background_sync();

                if stopping {
                    break;
                }
            })
            .expect("Failed to spawn sync thread");

        Flusher {
            signal,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Signal the thread to stop and wait for it to exit.
    ///
    /// The thread performs a final group commit before exiting. Safe to
    /// call more than once.
    pub fn stop(&self) {
        {
            let (lock, cond) = &*self.signal;
            let mut stop = lock.lock();
            *stop = true;
            cond.notify_all();
        }

        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Flusher {
    fn drop(&mut self) {
        self.stop();
    }
}
