use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

pub type ChangeListener = Arc<dyn Fn(Value) + Send + Sync>;

#[async_trait]
pub trait RemoteStateBridge: Send + Sync {
    async fn load(&self) -> Result<Option<Value>, InfraError>;

    async fn save(&self, document: Value) -> Result<(), InfraError>;

    /// Registers `listener` for every committed document, including echoes of this
    /// client's own saves. Fires immediately when a document already exists.
    fn subscribe(&self, listener: ChangeListener) -> Result<Subscription, InfraError>;
}

pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

type ListenerMap = Mutex<BTreeMap<u64, ChangeListener>>;

#[derive(Default)]
pub struct ListenerRegistry {
    listeners: Arc<ListenerMap>,
    next_id: AtomicU64,
}

impl ListenerRegistry {
    pub fn register(&self, listener: ChangeListener) -> Result<Subscription, InfraError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock_listeners(&self.listeners)?.insert(id, listener);

        let listeners: Weak<ListenerMap> = Arc::downgrade(&self.listeners);
        Ok(Subscription::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                if let Ok(mut listeners) = listeners.lock() {
                    listeners.remove(&id);
                }
            }
        }))
    }

    // Listeners run outside the registry lock so they may drop their own subscription.
    pub fn notify(&self, document: &Value) -> Result<(), InfraError> {
        let listeners = lock_listeners(&self.listeners)?
            .values()
            .cloned()
            .collect::<Vec<_>>();
        for listener in listeners {
            listener(document.clone());
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.listeners.lock().map(|listeners| listeners.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock_listeners(
    listeners: &ListenerMap,
) -> Result<MutexGuard<'_, BTreeMap<u64, ChangeListener>>, InfraError> {
    listeners
        .lock()
        .map_err(|error| InfraError::StatePoisoned(format!("listener registry lock poisoned: {error}")))
}

#[derive(Default)]
pub struct InMemoryRemoteStateBridge {
    document: Mutex<Option<Value>>,
    listeners: ListenerRegistry,
}

impl InMemoryRemoteStateBridge {
    pub fn with_document(document: Value) -> Self {
        Self {
            document: Mutex::new(Some(document)),
            listeners: ListenerRegistry::default(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }

    fn current(&self) -> Result<Option<Value>, InfraError> {
        Ok(self.lock_document()?.clone())
    }

    // Held across fan-out so deliveries follow save order.
    fn lock_document(&self) -> Result<MutexGuard<'_, Option<Value>>, InfraError> {
        self.document
            .lock()
            .map_err(|error| InfraError::StatePoisoned(format!("document lock poisoned: {error}")))
    }
}

#[async_trait]
impl RemoteStateBridge for InMemoryRemoteStateBridge {
    async fn load(&self) -> Result<Option<Value>, InfraError> {
        self.current()
    }

    async fn save(&self, document: Value) -> Result<(), InfraError> {
        let mut current = self.lock_document()?;
        *current = Some(document.clone());
        self.listeners.notify(&document)
    }

    fn subscribe(&self, listener: ChangeListener) -> Result<Subscription, InfraError> {
        let current = self.lock_document()?;
        let subscription = self.listeners.register(Arc::clone(&listener))?;
        if let Some(document) = current.as_ref() {
            listener(document.clone());
        }
        Ok(subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn recording_listener() -> (ChangeListener, Arc<Mutex<Vec<Value>>>) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        let listener: ChangeListener = Arc::new(move |document| {
            sink.lock().expect("sink lock").push(document);
        });
        (listener, received)
    }

    #[tokio::test]
    async fn load_returns_none_before_first_save() {
        let bridge = InMemoryRemoteStateBridge::default();
        assert!(bridge.load().await.expect("load").is_none());

        bridge.save(json!({"year": 2025})).await.expect("save");
        assert_eq!(bridge.load().await.expect("load"), Some(json!({"year": 2025})));
    }

    #[tokio::test]
    async fn subscribe_fires_immediately_and_on_every_save() {
        let bridge = InMemoryRemoteStateBridge::with_document(json!({"rev": 0}));
        let (listener, received) = recording_listener();

        let _subscription = bridge.subscribe(listener).expect("subscribe");
        bridge.save(json!({"rev": 1})).await.expect("save 1");
        bridge.save(json!({"rev": 2})).await.expect("save 2");

        let received = received.lock().expect("received lock").clone();
        assert_eq!(received, vec![json!({"rev": 0}), json!({"rev": 1}), json!({"rev": 2})]);
    }

    #[tokio::test]
    async fn subscribe_without_document_waits_for_first_save() {
        let bridge = InMemoryRemoteStateBridge::default();
        let (listener, received) = recording_listener();

        let _subscription = bridge.subscribe(listener).expect("subscribe");
        assert!(received.lock().expect("received lock").is_empty());

        bridge.save(json!({"rev": 1})).await.expect("save");
        assert_eq!(received.lock().expect("received lock").len(), 1);
    }

    #[tokio::test]
    async fn dropping_subscription_stops_delivery() {
        let bridge = InMemoryRemoteStateBridge::default();
        let (first, first_received) = recording_listener();
        let (second, second_received) = recording_listener();

        let first_subscription = bridge.subscribe(first).expect("subscribe first");
        let second_subscription = bridge.subscribe(second).expect("subscribe second");
        assert_eq!(bridge.subscriber_count(), 2);

        drop(first_subscription);
        bridge.save(json!({"rev": 1})).await.expect("save");
        second_subscription.unsubscribe();
        bridge.save(json!({"rev": 2})).await.expect("save");

        assert!(first_received.lock().expect("lock").is_empty());
        assert_eq!(second_received.lock().expect("lock").clone(), vec![json!({"rev": 1})]);
        assert_eq!(bridge.subscriber_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_saves_deliver_the_stored_document_last() {
        let bridge = Arc::new(InMemoryRemoteStateBridge::default());
        let (listener, received) = recording_listener();
        let _subscription = bridge.subscribe(listener).expect("subscribe");

        let writers: Vec<_> = (0..4)
            .map(|writer| {
                let bridge = Arc::clone(&bridge);
                tokio::spawn(async move {
                    for n in 0..50 {
                        bridge.save(json!({"writer": writer, "n": n})).await.expect("save");
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.await.expect("writer task");
        }

        let stored = bridge.load().await.expect("load");
        let received = received.lock().expect("lock");
        assert_eq!(received.len(), 200);
        assert_eq!(received.last(), stored.as_ref());
    }
}
