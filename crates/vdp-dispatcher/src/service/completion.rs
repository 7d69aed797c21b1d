//! # Completion Registrar
//!
//! Bridges a deferred result to the "build and send the response" step.
//!
//! ```text
//! [PENDING] ──first completion──→ [COMPLETED]
//!                                      │
//!                                      └── later signals: no-op
//! ```
//!
//! The callback runs on whichever thread completes the deferred result, or
//! immediately on the registering thread if the result is already there.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use vdp_telemetry::DEFERRED_PENDING;

use crate::domain::deferred::{Completion, Deferred};

const PENDING: u8 = 0;
const COMPLETED: u8 = 1;

/// State of a registered completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionState {
    /// Waiting for the result.
    Pending,
    /// Callback has run.
    Completed,
}

/// Observes one registered completion.
#[derive(Debug, Clone)]
pub struct CompletionHandle {
    state: Arc<AtomicU8>,
}

impl CompletionHandle {
    /// Current state.
    pub fn state(&self) -> CompletionState {
        match self.state.load(Ordering::Acquire) {
            PENDING => CompletionState::Pending,
            _ => CompletionState::Completed,
        }
    }

    /// Returns true once the callback has run.
    pub fn is_completed(&self) -> bool {
        self.state() == CompletionState::Completed
    }
}

/// Registers exactly-once completion callbacks.
#[derive(Debug, Clone, Default)]
pub struct CompletionRegistrar {
    pending: Arc<AtomicUsize>,
}

impl CompletionRegistrar {
    /// Create a registrar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `callback` once when `deferred` completes.
    pub fn register<F>(&self, deferred: Deferred, callback: F) -> CompletionHandle
    where
        F: FnOnce(Completion) + Send + 'static,
    {
        let state = Arc::new(AtomicU8::new(PENDING));
        let handle = CompletionHandle {
            state: Arc::clone(&state),
        };

        self.pending.fetch_add(1, Ordering::SeqCst);
        DEFERRED_PENDING.inc();

        let pending = Arc::clone(&self.pending);
        deferred.on_complete(move |completion| {
            if state
                .compare_exchange(PENDING, COMPLETED, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return;
            }
            pending.fetch_sub(1, Ordering::SeqCst);
            DEFERRED_PENDING.dec();
            callback(completion);
        });

        handle
    }

    /// Registered completions whose callback has not run yet.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fault::ServiceFault;
    use parking_lot::Mutex;
    use shared_types::Value;

    #[test]
    fn test_pending_until_completed() {
        let registrar = CompletionRegistrar::new();
        let (deferred, completer) = Deferred::pending();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let handle = registrar.register(deferred, move |c| sink.lock().push(c));
        assert_eq!(handle.state(), CompletionState::Pending);
        assert_eq!(registrar.pending(), 1);

        completer.succeed("rows");
        assert_eq!(handle.state(), CompletionState::Completed);
        assert_eq!(registrar.pending(), 0);
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_second_signal_produces_nothing() {
        let registrar = CompletionRegistrar::new();
        let (deferred, completer) = Deferred::pending();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        registrar.register(deferred, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(completer.succeed(1));
        assert!(!completer.fail(ServiceFault::system("again")));
        drop(completer);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(registrar.pending(), 0);
    }

    #[test]
    fn test_already_completed_runs_inline() {
        let registrar = CompletionRegistrar::new();
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);

        let handle = registrar.register(Deferred::ready(Value::Bool(true)), move |c| {
            *sink.lock() = Some(c);
        });
        assert!(handle.is_completed());
        assert!(matches!(*seen.lock(), Some(Ok(Value::Bool(true)))));
    }

    #[test]
    fn test_waiter_woken_on_completion() {
        let registrar = CompletionRegistrar::new();
        let (deferred, completer) = Deferred::pending();
        let (tx, rx) = tokio::sync::oneshot::channel();
        registrar.register(deferred, move |c| {
            let _ = tx.send(c);
        });

        let mut waiter = tokio_test::task::spawn(rx);
        tokio_test::assert_pending!(waiter.poll());

        completer.succeed("done");
        assert!(waiter.is_woken());
        let completion = tokio_test::assert_ready_ok!(waiter.poll());
        assert_eq!(completion.unwrap(), Value::from("done"));
    }

    #[tokio::test]
    async fn test_completion_from_another_task() {
        let registrar = CompletionRegistrar::new();
        let (deferred, completer) = Deferred::pending();
        let (tx, rx) = tokio::sync::oneshot::channel();

        let handle = registrar.register(deferred, move |c| {
            let _ = tx.send(c);
        });
        tokio::spawn(async move {
            completer.succeed(7);
        });

        assert_eq!(rx.await.unwrap().unwrap(), Value::Int(7));
        assert!(handle.is_completed());
    }
}
