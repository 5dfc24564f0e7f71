//! UI-owning execution context.
//!
//! View-bound state (surface bindings, visibility flags, the overlay set) is
//! owned by exactly one thread. Other threads never touch it; they post tasks
//! through a `UiHandle`, and the owning thread runs them in order by draining
//! its `UiQueue`.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};

/// Work posted to the UI context. Runs with exclusive access to the state.
pub type UiTask<S> = Box<dyn FnOnce(&mut S) + Send>;

/// Receiving side, held by the thread that owns `S`.
pub struct UiQueue<S> {
    tx: Sender<UiTask<S>>,
    rx: Receiver<UiTask<S>>,
}

impl<S> UiQueue<S> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    /// Posting handle for other threads.
    pub fn handle(&self) -> UiHandle<S> {
        UiHandle {
            tx: self.tx.clone(),
        }
    }

    /// Run every task already queued, without waiting. Returns how many ran.
    pub fn run_pending(&self, state: &mut S) -> usize {
        let mut ran = 0;
        loop {
            match self.rx.try_recv() {
                Ok(task) => {
                    task(state);
                    ran += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return ran,
            }
        }
    }

    /// Run tasks as they arrive until `deadline`. Returns how many ran.
    pub fn run_until(&self, state: &mut S, deadline: Instant) -> usize {
        let mut ran = 0;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return ran + self.run_pending(state);
            }
            match self.rx.recv_timeout(deadline - now) {
                Ok(task) => {
                    task(state);
                    ran += 1;
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return ran;
                }
            }
        }
    }

    /// Run tasks as they arrive for `duration`.
    pub fn run_for(&self, state: &mut S, duration: Duration) -> usize {
        self.run_until(state, Instant::now() + duration)
    }
}

impl<S> Default for UiQueue<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Sending side. Cheap to clone and safe to use from any thread.
pub struct UiHandle<S> {
    tx: Sender<UiTask<S>>,
}

impl<S> UiHandle<S> {
    /// Queue `task` for the UI context. Never runs it inline.
    ///
    /// Fails only once the owning `UiQueue` has been dropped.
    pub fn post<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        self.tx
            .send(Box::new(task))
            .map_err(|_| anyhow!("ui context is gone"))
    }
}

impl<S> Clone for UiHandle<S> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}
