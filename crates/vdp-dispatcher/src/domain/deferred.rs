//! # Deferred Results
//!
//! A handle to a result that becomes available later, and the `Completer`
//! that supplies it.
//!
//! ## State Machine
//!
//! ```text
//!            complete                  on_complete
//! [Empty] ───────────→ [Ready] ─────────────────────→ [Delivered]
//!    │                                                     ↑
//!    └── on_complete ──→ [Listening] ──── complete ────────┘
//! ```
//!
//! The first completion wins. Later completions return `false` and are
//! discarded. The listener runs exactly once, outside the lock, on whichever
//! thread delivered the result.

use futures::FutureExt;
use parking_lot::Mutex;
use shared_types::Value;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use super::fault::ServiceFault;

/// Outcome carried by a deferred result.
pub type Completion = Result<Value, ServiceFault>;

type Listener = Box<dyn FnOnce(Completion) + Send + 'static>;

/// Message of the fault delivered when a completer is dropped unused.
pub const ABANDONED: &str = "deferred result abandoned";

enum State {
    Empty,
    Listening(Listener),
    Ready(Completion),
    Delivered,
}

struct Shared {
    state: Mutex<State>,
}

impl Shared {
    fn complete(&self, completion: Completion) -> bool {
        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, State::Delivered) {
            State::Empty => {
                *state = State::Ready(completion);
                true
            }
            State::Listening(listener) => {
                drop(state);
                listener(completion);
                true
            }
            previous @ (State::Ready(_) | State::Delivered) => {
                *state = previous;
                false
            }
        }
    }

    fn is_completed(&self) -> bool {
        matches!(*self.state.lock(), State::Ready(_) | State::Delivered)
    }
}

/// A result that will be available later.
pub struct Deferred {
    shared: Arc<Shared>,
}

/// Supplies the result of a `Deferred`.
///
/// Dropping a completer that never completed delivers a system fault
/// ([`ABANDONED`]).
pub struct Completer {
    shared: Arc<Shared>,
}

impl Deferred {
    /// Create an unresolved result and its completer.
    pub fn pending() -> (Deferred, Completer) {
        let shared = Arc::new(Shared {
            state: Mutex::new(State::Empty),
        });
        (
            Deferred {
                shared: Arc::clone(&shared),
            },
            Completer { shared },
        )
    }

    /// An already-completed successful result.
    pub fn ready(value: impl Into<Value>) -> Deferred {
        Self::completed(Ok(value.into()))
    }

    /// An already-completed failed result.
    pub fn failed(fault: ServiceFault) -> Deferred {
        Self::completed(Err(fault))
    }

    fn completed(completion: Completion) -> Deferred {
        Deferred {
            shared: Arc::new(Shared {
                state: Mutex::new(State::Ready(completion)),
            }),
        }
    }

    /// Run `future` on the current tokio runtime and complete with its output.
    ///
    /// A panic inside the future completes with a system fault. Outside a
    /// runtime the result fails immediately.
    #[track_caller]
    pub fn spawn<F>(future: F) -> Deferred
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                return Deferred::failed(ServiceFault::system(format!(
                    "no async runtime for deferred result: {e}"
                )))
            }
        };

        let (deferred, completer) = Deferred::pending();
        handle.spawn(async move {
            let completion = match AssertUnwindSafe(future).catch_unwind().await {
                Ok(completion) => completion,
                Err(panic) => Err(ServiceFault::system(format!(
                    "deferred computation panicked: {}",
                    panic_message(panic.as_ref())
                ))),
            };
            completer.complete(completion);
        });
        deferred
    }

    /// Returns true once a result is available.
    pub fn is_completed(&self) -> bool {
        self.shared.is_completed()
    }

    /// Register the single listener. Runs immediately if already completed.
    pub fn on_complete<F>(self, listener: F)
    where
        F: FnOnce(Completion) + Send + 'static,
    {
        let mut state = self.shared.state.lock();
        match std::mem::replace(&mut *state, State::Delivered) {
            State::Ready(completion) => {
                drop(state);
                listener(completion);
            }
            State::Empty => *state = State::Listening(Box::new(listener)),
            // `self` is consumed, so a second listener cannot exist.
            previous @ (State::Listening(_) | State::Delivered) => *state = previous,
        }
    }
}

impl std::fmt::Debug for Deferred {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deferred")
            .field("completed", &self.is_completed())
            .finish()
    }
}

impl Completer {
    /// Supply the result. Returns `false` if a result was already supplied.
    pub fn complete(&self, completion: Completion) -> bool {
        self.shared.complete(completion)
    }

    /// Supply a successful value.
    pub fn succeed(&self, value: impl Into<Value>) -> bool {
        self.complete(Ok(value.into()))
    }

    /// Supply a failure.
    pub fn fail(&self, fault: ServiceFault) -> bool {
        self.complete(Err(fault))
    }

    /// Returns true once a result was supplied.
    pub fn is_completed(&self) -> bool {
        self.shared.is_completed()
    }
}

impl Drop for Completer {
    fn drop(&mut self) {
        if !self.shared.is_completed() {
            self.shared.complete(Err(ServiceFault::system(ABANDONED)));
        }
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
