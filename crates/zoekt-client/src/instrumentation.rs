//! Request-scoped instrumentation.
//!
//! A caller wraps the handling of one incoming request in
//! [`RequestStore::scope`]; every node call made inside it is recorded with
//! its duration, method, path and body. Outside a scope, recording does
//! nothing.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::trace;

tokio::task_local! {
    static STORE: Arc<Mutex<Store>>;
}

/// One recorded node call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallDetails {
    pub duration: Duration,
    pub method: String,
    pub path: String,
    pub body: String,
}

#[derive(Debug, Default)]
struct Store {
    request_count: usize,
    total_duration: Duration,
    calls: Vec<CallDetails>,
}

/// Access to the task-local call store.
pub struct RequestStore;

impl RequestStore {
    /// Run `future` with a fresh, active store.
    pub async fn scope<F: Future>(future: F) -> F::Output {
        STORE
            .scope(Arc::new(Mutex::new(Store::default())), future)
            .await
    }

    /// Whether the current task runs inside [`RequestStore::scope`].
    pub fn is_active() -> bool {
        STORE.try_with(|_| ()).is_ok()
    }

    /// Record a call. No-op when no scope is active.
    pub fn record(details: CallDetails) {
        let recorded = STORE.try_with(|store| {
            if let Ok(mut store) = store.lock() {
                store.request_count += 1;
                store.total_duration += details.duration;
                store.calls.push(details);
            }
        });

        if recorded.is_err() {
            trace!("Request store inactive, call not recorded");
        }
    }

    /// Number of calls recorded in the current scope.
    pub fn request_count() -> usize {
        Self::read(|s| s.request_count).unwrap_or(0)
    }

    /// Summed duration of the calls recorded in the current scope.
    pub fn total_duration() -> Duration {
        Self::read(|s| s.total_duration).unwrap_or_default()
    }

    /// Snapshot of the calls recorded in the current scope.
    pub fn calls() -> Vec<CallDetails> {
        Self::read(|s| s.calls.clone()).unwrap_or_default()
    }

    fn read<T>(f: impl FnOnce(&Store) -> T) -> Option<T> {
        STORE
            .try_with(|store| store.lock().ok().map(|s| f(&s)))
            .ok()
            .flatten()
    }
}

/// Records one POST when dropped.
///
/// Created at the start of a node call; the call is recorded whether it
/// returns, fails, or is dropped by the caller mid-flight.
pub(crate) struct CallGuard {
    started: Instant,
    path: &'static str,
    pub(crate) body: String,
}

impl CallGuard {
    pub(crate) fn start(path: &'static str) -> Self {
        Self {
            started: Instant::now(),
            path,
            body: String::new(),
        }
    }
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        RequestStore::record(CallDetails {
            duration: self.started.elapsed(),
            method: "POST".to_string(),
            path: self.path.to_string(),
            body: std::mem::take(&mut self.body),
        });
    }
}
