//! Cancellable in-flight calls.
//!
//! Every network call an attempt makes runs through a [`Teardown`] handle.
//! Firing the handle aborts whatever call is outstanding and makes every
//! later call fail fast, so a torn-down component never receives a late
//! response and never writes state after teardown.
//!
//! The handle also carries the busy flag: clones held outside the owning
//! component see which [`Activity`] is outstanding while the owner is
//! suspended on it.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{AbortHandle, Abortable};

use crate::error::Cancelled;

/// What kind of call is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Loading,
    Submitting,
}

impl Activity {
    pub fn label(&self) -> &'static str {
        match self {
            Activity::Loading => "loading",
            Activity::Submitting => "submitting",
        }
    }
}

#[derive(Default)]
struct Inner {
    torn_down: bool,
    in_flight: Option<(Activity, AbortHandle)>,
}

/// Shared teardown signal for one component's outstanding work.
#[derive(Clone, Default)]
pub struct Teardown {
    inner: Arc<Mutex<Inner>>,
}

impl Teardown {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock only means another holder panicked between two
        // field writes; both fields stay individually valid.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Abort the outstanding call, if any, and refuse all future ones.
    pub fn fire(&self) {
        let mut inner = self.lock();
        inner.torn_down = true;
        if let Some((activity, handle)) = inner.in_flight.take() {
            tracing::debug!(activity = activity.label(), "aborting in-flight request on teardown");
            handle.abort();
        }
    }

    pub fn is_torn_down(&self) -> bool {
        self.lock().torn_down
    }

    /// Whether a call is currently outstanding.
    pub fn is_busy(&self) -> bool {
        self.lock().in_flight.is_some()
    }

    /// The outstanding call, if any.
    pub fn activity(&self) -> Option<Activity> {
        self.lock().in_flight.as_ref().map(|(activity, _)| *activity)
    }

    /// Drive `fut` to completion unless teardown fires first. `activity`
    /// is reported by [`activity`](Self::activity) until it settles.
    pub async fn run<F: Future>(&self, activity: Activity, fut: F) -> Result<F::Output, Cancelled> {
        let registration = {
            let mut inner = self.lock();
            if inner.torn_down {
                return Err(Cancelled);
            }
            let (handle, registration) = AbortHandle::new_pair();
            inner.in_flight = Some((activity, handle));
            registration
        };

        let outcome = Abortable::new(fut, registration).await;

        let mut inner = self.lock();
        inner.in_flight = None;
        match outcome {
            Ok(value) if !inner.torn_down => Ok(value),
            _ => Err(Cancelled),
        }
    }
}
