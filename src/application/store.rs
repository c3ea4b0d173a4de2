use crate::domain::migration::{decode_document, encode_document};
use crate::domain::models::CalendarState;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::remote_bridge::{ChangeListener, RemoteStateBridge, Subscription};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

pub struct SchedulingStore<B>
where
    B: RemoteStateBridge,
{
    bridge: Arc<B>,
    state: Mutex<CalendarState>,
    subscription: Mutex<Option<Subscription>>,
}

impl<B> SchedulingStore<B>
where
    B: RemoteStateBridge + 'static,
{
    pub async fn open(bridge: Arc<B>, initial: CalendarState) -> Result<Arc<Self>, InfraError> {
        let state = match bridge.load().await? {
            Some(document) => decode_document(document)?,
            None => {
                tracing::info!(
                    year = initial.year,
                    month = initial.month,
                    "no calendar document found; creating one"
                );
                bridge.save(encode_document(&initial)?).await?;
                initial
            }
        };

        let store = Arc::new(Self {
            bridge,
            state: Mutex::new(state),
            subscription: Mutex::new(None),
        });
        store.attach()?;
        Ok(store)
    }

    fn attach(self: &Arc<Self>) -> Result<(), InfraError> {
        let store: Weak<Self> = Arc::downgrade(self);
        let listener: ChangeListener = Arc::new(move |document| {
            if let Some(store) = store.upgrade() {
                store.replace_document(document);
            }
        });
        let subscription = self.bridge.subscribe(listener)?;
        *self
            .subscription
            .lock()
            .map_err(|error| InfraError::StatePoisoned(format!("subscription lock poisoned: {error}")))? =
            Some(subscription);
        Ok(())
    }

    pub fn detach(&self) -> Result<(), InfraError> {
        let subscription = self
            .subscription
            .lock()
            .map_err(|error| InfraError::StatePoisoned(format!("subscription lock poisoned: {error}")))?
            .take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }
        Ok(())
    }

    pub fn bridge(&self) -> &Arc<B> {
        &self.bridge
    }

    pub fn snapshot(&self) -> Result<CalendarState, InfraError> {
        Ok(self.lock_state()?.clone())
    }

    pub fn replace_state(&self, state: CalendarState) -> Result<(), InfraError> {
        *self.lock_state()? = state;
        Ok(())
    }

    pub fn replace_document(&self, document: Value) -> bool {
        let state = match decode_document(document) {
            Ok(state) => state,
            Err(error) => {
                tracing::warn!(%error, "ignoring undecodable calendar document");
                return false;
            }
        };
        match self.replace_state(state) {
            Ok(()) => true,
            Err(error) => {
                tracing::error!(%error, "failed to install calendar document");
                false
            }
        }
    }

    /// Applies `transform` to the current state and writes the result remotely.
    ///
    /// The new state is visible locally before the save completes and stays in place
    /// if the save fails; the error is still returned. A transform that changes
    /// nothing skips the write.
    pub async fn mutate<F>(&self, transform: F) -> Result<CalendarState, InfraError>
    where
        F: FnOnce(&CalendarState) -> CalendarState,
    {
        let next = {
            let mut state = self.lock_state()?;
            let next = transform(&*state);
            if next == *state {
                return Ok(next);
            }
            *state = next.clone();
            next
        };

        let document = encode_document(&next)?;
        if let Err(error) = self.bridge.save(document).await {
            tracing::warn!(%error, "calendar save failed; keeping optimistic local state");
            return Err(error);
        }
        Ok(next)
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, CalendarState>, InfraError> {
        self.state
            .lock()
            .map_err(|error| InfraError::StatePoisoned(format!("calendar state lock poisoned: {error}")))
    }
}
