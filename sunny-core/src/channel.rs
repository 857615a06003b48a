//! Single-slot, latest-wins publication of fetch outcomes.
//!
//! A [`ResultChannel`] belongs to one consumer scope (a screen, a command).
//! Each [`ResultChannel::launch`] supersedes the previous fetch: the old task
//! is aborted, and should it still finish first its result is dropped because
//! its generation is no longer current. Subscribers only ever see the newest
//! accepted [`Emission`].

use std::{future::Future, sync::Arc};

use parking_lot::Mutex;
use tokio::{sync::watch, task::JoinHandle};

use crate::model::FetchResult;

/// A published outcome, tagged with the request that produced it.
#[derive(Debug)]
pub struct Emission<P, T> {
    pub generation: u64,
    pub request: P,
    pub result: FetchResult<T>,
}

pub type Slot<P, T> = Option<Arc<Emission<P, T>>>;

#[derive(Debug, Default)]
struct State {
    generation: u64,
    in_flight: Option<JoinHandle<()>>,
}

#[derive(Debug)]
struct Shared<P, T> {
    state: Mutex<State>,
    tx: watch::Sender<Slot<P, T>>,
}

impl<P, T> Shared<P, T> {
    /// Publish only if `generation` is still the latest launch.
    fn publish(&self, generation: u64, request: P, result: FetchResult<T>) -> bool {
        let mut state = self.state.lock();
        if state.generation != generation {
            tracing::debug!(
                generation,
                current = state.generation,
                "discarding stale fetch result"
            );
            return false;
        }

        state.in_flight = None;
        let emission = Emission {
            generation,
            request,
            result,
        };
        self.tx.send_replace(Some(Arc::new(emission)));
        true
    }
}

#[derive(Debug)]
pub struct ResultChannel<P, T> {
    shared: Arc<Shared<P, T>>,
}

impl<P, T> Default for ResultChannel<P, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, T> ResultChannel<P, T> {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        let shared = Shared {
            state: Mutex::new(State::default()),
            tx,
        };

        Self {
            shared: Arc::new(shared),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Slot<P, T>> {
        self.shared.tx.subscribe()
    }

    /// Latest accepted emission, if any fetch has completed yet.
    pub fn latest(&self) -> Slot<P, T> {
        self.shared.tx.borrow().clone()
    }

    /// Generation of the most recent launch (0 before the first one).
    pub fn generation(&self) -> u64 {
        self.shared.state.lock().generation
    }

    /// Abort the in-flight fetch, if any. Its result will never be published.
    pub fn cancel(&self) {
        let mut state = self.shared.state.lock();
        state.generation += 1;
        if let Some(task) = state.in_flight.take() {
            task.abort();
            tracing::debug!("in-flight fetch cancelled");
        }
    }
}

impl<P, T> ResultChannel<P, T>
where
    P: Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    /// Start `fetch` for `request` on the runtime, superseding any earlier launch.
    ///
    /// Returns the generation assigned to this launch. Must be called from
    /// within a tokio runtime.
    pub fn launch<F>(&self, request: P, fetch: F) -> u64
    where
        F: Future<Output = FetchResult<T>> + Send + 'static,
    {
        let mut state = self.shared.state.lock();
        state.generation += 1;
        let generation = state.generation;

        if let Some(previous) = state.in_flight.take() {
            previous.abort();
            tracing::debug!(generation, "superseded in-flight fetch");
        }

        let shared = Arc::clone(&self.shared);
        state.in_flight = Some(tokio::spawn(async move {
            let result = fetch.await;
            shared.publish(generation, request, result);
        }));

        generation
    }

    /// Wait until an emission from `generation` or a later launch is published.
    ///
    /// Never resolves if that launch is cancelled and nothing newer follows.
    pub async fn wait_for(&self, generation: u64) -> Slot<P, T> {
        let mut rx = self.subscribe();
        let seen = rx
            .wait_for(|slot| matches!(slot, Some(e) if e.generation >= generation))
            .await
            .ok()?;

        seen.clone()
    }
}

impl<P, T> Drop for ResultChannel<P, T> {
    fn drop(&mut self) {
        self.cancel();
    }
}
