use crate::infrastructure::config::RetryConfig;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::remote_bridge::{ChangeListener, RemoteStateBridge, Subscription};
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio::time::{sleep, Duration as TokioDuration};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u8,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay_ms: config.base_delay_ms,
        }
    }
}

pub struct RetryingBridge<B>
where
    B: RemoteStateBridge,
{
    inner: Arc<B>,
    retry_policy: RetryPolicy,
}

impl<B> RetryingBridge<B>
where
    B: RemoteStateBridge,
{
    pub fn new(inner: Arc<B>) -> Self {
        Self {
            inner,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn inner(&self) -> &Arc<B> {
        &self.inner
    }

    async fn with_retry<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, InfraError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, InfraError>>,
    {
        let max_attempts = self.retry_policy.max_attempts.max(1);
        let mut attempt: u8 = 0;

        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(error) if should_retry(&error) && attempt + 1 < max_attempts => {
                    let delay = self
                        .retry_policy
                        .base_delay_ms
                        .saturating_mul(2u64.saturating_pow(attempt as u32));
                    tracing::warn!(
                        operation,
                        attempt = attempt + 1,
                        delay_ms = delay,
                        %error,
                        "remote calendar call failed; retrying"
                    );
                    sleep(TokioDuration::from_millis(delay)).await;
                    attempt = attempt.saturating_add(1);
                }
                Err(error) => return Err(error),
            }
        }
    }
}

fn should_retry(error: &InfraError) -> bool {
    matches!(error, InfraError::RemoteUnavailable(_))
}

#[async_trait]
impl<B> RemoteStateBridge for RetryingBridge<B>
where
    B: RemoteStateBridge,
{
    async fn load(&self) -> Result<Option<Value>, InfraError> {
        self.with_retry("load", || self.inner.load()).await
    }

    async fn save(&self, document: Value) -> Result<(), InfraError> {
        self.with_retry("save", || self.inner.save(document.clone()))
            .await
    }

    fn subscribe(&self, listener: ChangeListener) -> Result<Subscription, InfraError> {
        self.inner.subscribe(listener)
    }
}
