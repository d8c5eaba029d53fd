use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::observability;

use super::actions::Action;
use super::reducer::reduce;
use super::stock::AppState;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("dispatch called re-entrantly from a reducer or subscriber")]
    ReentrantDispatch,
}

pub type SubscriptionId = u64;

type Subscriber = Arc<dyn Fn(&AppState) + Send + Sync>;

/// Holds the single immutable state tree. `dispatch` reduces
/// synchronously and notifies subscribers in registration order; all
/// transitions are serialized because every caller routes through the
/// store pump.
pub struct Store {
    state: Mutex<Arc<AppState>>,
    subscribers: Mutex<Vec<(SubscriptionId, Subscriber)>>,
    next_subscription: AtomicU64,
    dispatching: AtomicBool,
}

impl Store {
    pub fn new(initial: AppState) -> Self {
        Self {
            state: Mutex::new(Arc::new(initial)),
            subscribers: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
            dispatching: AtomicBool::new(false),
        }
    }

    /// Current state. The returned `Arc` stays the same allocation until
    /// the next dispatch.
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state.lock().expect("state lock poisoned"))
    }

    pub fn subscribe(&self, listener: impl Fn(&AppState) + Send + Sync + 'static) -> SubscriptionId {
        let id = self.next_subscription.fetch_add(1, Ordering::Relaxed);
        let listener: Subscriber = Arc::new(listener);
        self.subscribers
            .lock()
            .expect("subscriber lock poisoned")
            .push((id, listener));
        id
    }

    /// Takes effect from the next dispatch; an in-progress notification
    /// pass still sees the subscriber.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers
            .lock()
            .expect("subscriber lock poisoned")
            .retain(|(existing, _)| *existing != id);
    }

    pub fn dispatch(&self, action: &Action) -> Result<(), StoreError> {
        if self.dispatching.swap(true, Ordering::AcqRel) {
            return Err(StoreError::ReentrantDispatch);
        }

        let next = {
            let mut current = self.state.lock().expect("state lock poisoned");
            let next = Arc::new(reduce(&current, action));
            *current = Arc::clone(&next);
            next
        };

        // Snapshot the registry so unsubscribing from inside a callback
        // cannot alter the in-progress pass.
        let pass: Vec<Subscriber> = self
            .subscribers
            .lock()
            .expect("subscriber lock poisoned")
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in &pass {
            listener(&next);
        }

        self.dispatching.store(false, Ordering::Release);
        Ok(())
    }
}

/// Cloneable entry point for queueing actions from effect tasks and UI
/// consumers. Queued actions are reduced strictly in arrival order.
#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::UnboundedSender<Action>,
}

impl StoreHandle {
    pub fn send(&self, action: Action) {
        if self.tx.send(action).is_err() {
            warn!("store inbox closed, action dropped");
        }
    }
}

pub fn channel() -> (StoreHandle, mpsc::UnboundedReceiver<Action>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (StoreHandle { tx }, rx)
}

/// Drains the inbox, reduces each action, and forwards it to the effect
/// runner. The single consumer guarantees that two actions are never
/// reduced concurrently.
pub async fn run_store(
    store: Arc<Store>,
    mut inbox: mpsc::UnboundedReceiver<Action>,
    effects_tx: mpsc::UnboundedSender<Action>,
    mut shutdown: watch::Receiver<bool>,
) {
    info!("store pump started");
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            maybe_action = inbox.recv() => {
                let Some(action) = maybe_action else { break };
                observability::record_action(action.kind());
                if let Err(err) = store.dispatch(&action) {
                    warn!(error = %err, kind = action.kind(), "dispatch rejected");
                    continue;
                }
                let _ = effects_tx.send(action);
            }
        }
    }
    info!("store pump stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn state_reference_is_stable_between_dispatches() {
        let store = Store::new(AppState::initial());
        assert!(Arc::ptr_eq(&store.state(), &store.state()));

        store
            .dispatch(&Action::SetSearchQuery("AAPL".to_string()))
            .unwrap();
        let after = store.state();
        assert_eq!(after.stocks.search_query, "AAPL");
        assert!(Arc::ptr_eq(&after, &store.state()));
    }

    #[test]
    fn subscribers_run_in_registration_order() {
        let store = Store::new(AppState::initial());
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let seen = Arc::clone(&seen);
            store.subscribe(move |_| seen.lock().unwrap().push(tag));
        }

        store.dispatch(&Action::LoadStocks).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn unsubscribe_during_notification_spares_the_current_pass() {
        let store = Arc::new(Store::new(AppState::initial()));
        let calls = Arc::new(AtomicUsize::new(0));

        let late_id = Arc::new(Mutex::new(None::<SubscriptionId>));
        {
            let store = Arc::clone(&store);
            let late_id = Arc::clone(&late_id);
            store.clone().subscribe(move |_| {
                if let Some(id) = *late_id.lock().unwrap() {
                    store.unsubscribe(id);
                }
            });
        }
        {
            let calls = Arc::clone(&calls);
            let id = store.subscribe(move |_| {
                calls.fetch_add(1, Ordering::Relaxed);
            });
            *late_id.lock().unwrap() = Some(id);
        }

        // First pass: the removal happens mid-pass and must not apply yet.
        store.dispatch(&Action::LoadStocks).unwrap();
        assert_eq!(calls.load(Ordering::Relaxed), 1);

        // Second pass: the unsubscribe has taken effect.
        store.dispatch(&Action::LoadStocks).unwrap();
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn reentrant_dispatch_fails_instead_of_looping() {
        let store = Arc::new(Store::new(AppState::initial()));
        let result = Arc::new(Mutex::new(None));

        {
            let store = Arc::clone(&store);
            let result = Arc::clone(&result);
            store.clone().subscribe(move |_| {
                *result.lock().unwrap() = Some(store.dispatch(&Action::LoadStocks));
            });
        }

        store.dispatch(&Action::LoadPortfolio).unwrap();
        assert_eq!(
            result.lock().unwrap().take(),
            Some(Err(StoreError::ReentrantDispatch))
        );
        // The store stays usable afterwards.
        store.dispatch(&Action::LoadTrending).unwrap();
    }

    #[tokio::test]
    async fn pump_serializes_and_forwards_actions() {
        let store = Arc::new(Store::new(AppState::initial()));
        let (handle, inbox) = channel();
        let (effects_tx, mut effects_rx) = mpsc::unbounded_channel();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let pump = tokio::spawn(run_store(
            Arc::clone(&store),
            inbox,
            effects_tx,
            shutdown_rx,
        ));

        handle.send(Action::SetSearchQuery("AA".to_string()));
        handle.send(Action::SetSearchQuery("AAPL".to_string()));
        drop(handle);

        let first = effects_rx.recv().await.unwrap();
        let second = effects_rx.recv().await.unwrap();
        assert_eq!(first.kind(), "set_search_query");
        assert_eq!(second.kind(), "set_search_query");
        assert_eq!(store.state().stocks.search_query, "AAPL");

        pump.await.unwrap();
    }
}
