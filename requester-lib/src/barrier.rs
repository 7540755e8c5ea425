//! Completion barrier for outstanding requests.
//!
//! The submitting side calls [`CompletionBarrier::add`] once per accepted
//! request; the worker holding that request releases it exactly once through
//! a [`CompletionGuard`]. [`CompletionBarrier::wait`] resolves whenever the
//! count is zero.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::error;

/// Counter of enqueued-but-not-completed requests that callers can wait on.
#[derive(Debug, Default)]
pub struct CompletionBarrier {
    outstanding: AtomicUsize,
    notify: Notify,
}

impl CompletionBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `count` more outstanding requests.
    pub fn add(&self, count: usize) {
        self.outstanding.fetch_add(count, Ordering::AcqRel);
    }

    /// Release one outstanding request, waking waiters when the count hits zero.
    pub fn done(&self) {
        let previous = self
            .outstanding
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));

        match previous {
            Ok(1) => self.notify.notify_waiters(),
            Ok(_) => {}
            Err(_) => error!("completion barrier released more times than it was acquired"),
        }
    }

    /// Current number of outstanding requests.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Wait until no requests are outstanding.
    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // register before checking so a release in between is not missed
            notified.as_mut().enable();

            if self.outstanding() == 0 {
                return;
            }

            notified.await;
        }
    }

    /// Guard that calls [`done`](Self::done) when dropped.
    pub fn guard(self: &Arc<Self>) -> CompletionGuard {
        CompletionGuard {
            barrier: Arc::clone(self),
        }
    }
}

/// Releases one outstanding request on drop, on every exit path.
#[must_use = "dropping the guard immediately releases the request"]
pub struct CompletionGuard {
    barrier: Arc<CompletionBarrier>,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.barrier.done();
    }
}
