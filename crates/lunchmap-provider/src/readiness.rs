//! One await-able readiness gate for the places provider.
//!
//! Mapping SDKs finish initialising asynchronously. Rather than polling at
//! every call site, callers await [`ReadinessGate::wait`], which polls
//! [`PlacesProvider::is_ready`] on a fixed interval until a single timeout.
//!
//! Callers that overlap share one attempt and all receive its outcome,
//! failure included. Success is memoised for the lifetime of the gate. A
//! failed attempt is forgotten once it settles, so the next caller starts a
//! fresh one.

use std::{
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::{sync::watch, time::Instant};
use tracing::{debug, error, info, instrument};

use crate::{PlacesProvider, ProviderError, Result};

pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Settled result of one attempt, broadcast to everyone waiting on it.
#[derive(Debug, Clone, Copy)]
enum Outcome {
    Ready,
    TimedOut { waited_ms: u128 },
}

impl From<Outcome> for Result<()> {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Ready => Ok(()),
            Outcome::TimedOut { waited_ms } => Err(ProviderError::NotReady { waited_ms }),
        }
    }
}

#[derive(Debug)]
enum GateState {
    Idle,
    Polling(watch::Receiver<Option<Outcome>>),
    Ready,
}

enum Role {
    Done(Outcome),
    Follow(watch::Receiver<Option<Outcome>>),
    Lead(watch::Sender<Option<Outcome>>),
}

#[derive(Debug)]
pub struct ReadinessGate {
    state: Mutex<GateState>,
    timeout: Duration,
    poll_interval: Duration,
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new(DEFAULT_READY_TIMEOUT, DEFAULT_POLL_INTERVAL)
    }
}

impl ReadinessGate {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            state: Mutex::new(GateState::Idle),
            timeout,
            poll_interval: poll_interval.max(Duration::from_millis(1)),
        }
    }

    /// True once some caller has observed the provider ready.
    pub fn is_open(&self) -> bool {
        matches!(*self.lock(), GateState::Ready)
    }

    /// Wait until the provider reports ready, or fail after the timeout.
    ///
    /// Joins the attempt in progress if there is one. If the caller driving
    /// that attempt is dropped, a waiter takes over with a fresh attempt.
    pub async fn wait<P: PlacesProvider + ?Sized>(&self, provider: &P) -> Result<()> {
        loop {
            match self.role() {
                Role::Done(outcome) => return outcome.into(),
                Role::Follow(mut rx) => {
                    let settled = rx.wait_for(Option::is_some).await.ok().and_then(|o| *o);
                    if let Some(outcome) = settled {
                        return outcome.into();
                    }
                    debug!("Readiness attempt abandoned, retrying");
                }
                Role::Lead(tx) => {
                    let outcome = self.poll(provider).await;
                    *self.lock() = match outcome {
                        Outcome::Ready => GateState::Ready,
                        Outcome::TimedOut { .. } => GateState::Idle,
                    };
                    tx.send_replace(Some(outcome));
                    return outcome.into();
                }
            }
        }
    }

    fn role(&self) -> Role {
        let mut state = self.lock();
        match &*state {
            GateState::Ready => return Role::Done(Outcome::Ready),
            // A closed channel means the leading caller was dropped mid-poll.
            GateState::Polling(rx) if rx.has_changed().is_ok() => {
                return Role::Follow(rx.clone());
            }
            GateState::Polling(_) | GateState::Idle => {}
        }
        let (tx, rx) = watch::channel(None);
        *state = GateState::Polling(rx);
        Role::Lead(tx)
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[instrument(name = "Await provider readiness", level = "debug", skip_all)]
    async fn poll<P: PlacesProvider + ?Sized>(&self, provider: &P) -> Outcome {
        let started = Instant::now();
        let mut ticker = tokio::time::interval(self.poll_interval);

        let outcome = tokio::time::timeout(self.timeout, async {
            loop {
                ticker.tick().await;
                if provider.is_ready() {
                    break;
                }
            }
        })
        .await;

        match outcome {
            Ok(()) => {
                info!(elapsed = ?started.elapsed(), "Places provider ready");
                Outcome::Ready
            }
            Err(_) => {
                let waited_ms = started.elapsed().as_millis();
                error!(waited_ms, "Places provider did not become ready");
                Outcome::TimedOut { waited_ms }
            }
        }
    }
}
