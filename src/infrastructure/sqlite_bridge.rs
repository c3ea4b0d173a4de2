use crate::infrastructure::error::InfraError;
use crate::infrastructure::remote_bridge::{ChangeListener, ListenerRegistry, RemoteStateBridge, Subscription};
use crate::infrastructure::storage::initialize_database;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub body: Value,
    pub revision: i64,
    pub updated_at: DateTime<Utc>,
}

/// Shared document kept in a SQLite file. Several processes may open the same file;
/// each one picks up the others' writes through `refresh` or `spawn_watcher`.
///
/// Deliveries happen under the fan-out lock in revision order, and a revision is
/// delivered at most once. Listeners must not call back into the bridge.
pub struct SqliteRemoteStateBridge {
    db_path: PathBuf,
    document_path: String,
    busy_timeout: Duration,
    delivered_revision: Mutex<i64>,
    listeners: ListenerRegistry,
    now_provider: NowProvider,
}

impl SqliteRemoteStateBridge {
    pub fn new(db_path: impl AsRef<Path>, document_path: impl Into<String>) -> Result<Self, InfraError> {
        let document_path = document_path.into();
        if document_path.trim().is_empty() {
            return Err(InfraError::InvalidConfig(
                "document path must not be empty".to_string(),
            ));
        }
        let db_path = db_path.as_ref().to_path_buf();
        initialize_database(&db_path)?;

        Ok(Self {
            db_path,
            document_path,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            delivered_revision: Mutex::new(0),
            listeners: ListenerRegistry::default(),
            now_provider: Arc::new(Utc::now),
        })
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    pub fn document_path(&self) -> &str {
        &self.document_path
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        let connection = Connection::open(&self.db_path).map_err(sqlite_error)?;
        connection
            .busy_timeout(self.busy_timeout)
            .map_err(sqlite_error)?;
        Ok(connection)
    }

    pub fn stored(&self) -> Result<Option<StoredDocument>, InfraError> {
        let connection = self.connect()?;
        let row: Option<(String, i64, String)> = connection
            .query_row(
                "SELECT body, revision, updated_at FROM calendar_documents WHERE path = ?1",
                params![self.document_path],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(sqlite_error)?;

        let Some((body_raw, revision, updated_at_raw)) = row else {
            return Ok(None);
        };

        let updated_at = DateTime::parse_from_rfc3339(&updated_at_raw).map_err(|error| {
            InfraError::InvalidDocument(format!(
                "invalid calendar_documents.updated_at '{}': {error}",
                updated_at_raw
            ))
        })?;

        Ok(Some(StoredDocument {
            body: serde_json::from_str(&body_raw)?,
            revision,
            updated_at: updated_at.with_timezone(&Utc),
        }))
    }

    fn write(&self, document: &Value) -> Result<i64, InfraError> {
        let connection = self.connect()?;
        let body = serde_json::to_string(document)?;
        connection
            .query_row(
                "INSERT INTO calendar_documents (path, body, revision, updated_at)
                 VALUES (?1, ?2, 1, ?3)
                 ON CONFLICT(path) DO UPDATE SET
                   body = excluded.body,
                   revision = calendar_documents.revision + 1,
                   updated_at = excluded.updated_at
                 RETURNING revision",
                params![self.document_path, body, (self.now_provider)().to_rfc3339()],
                |row| row.get(0),
            )
            .map_err(sqlite_error)
    }

    pub fn refresh(&self) -> Result<bool, InfraError> {
        let mut delivered = self.lock_delivery()?;
        let Some(stored) = self.stored()? else {
            return Ok(false);
        };
        if stored.revision <= *delivered {
            return Ok(false);
        }

        *delivered = stored.revision;
        tracing::debug!(
            document = %self.document_path,
            revision = stored.revision,
            "picked up external calendar write"
        );
        self.listeners.notify(&stored.body)?;
        Ok(true)
    }

    pub fn spawn_watcher(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let bridge = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let Some(bridge) = bridge.upgrade() else {
                    break;
                };
                if let Err(error) = bridge.refresh() {
                    tracing::warn!(
                        document = %bridge.document_path,
                        %error,
                        "calendar change poll failed"
                    );
                }
            }
        })
    }

    fn lock_delivery(&self) -> Result<MutexGuard<'_, i64>, InfraError> {
        self.delivered_revision
            .lock()
            .map_err(|error| InfraError::StatePoisoned(format!("delivery lock poisoned: {error}")))
    }
}

// Lock contention is transient; everything else from SQLite is not.
fn sqlite_error(error: rusqlite::Error) -> InfraError {
    match &error {
        rusqlite::Error::SqliteFailure(failure, _)
            if matches!(failure.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) =>
        {
            InfraError::RemoteUnavailable(error.to_string())
        }
        _ => InfraError::Sqlite(error),
    }
}

#[async_trait]
impl RemoteStateBridge for SqliteRemoteStateBridge {
    async fn load(&self) -> Result<Option<Value>, InfraError> {
        Ok(self.stored()?.map(|stored| stored.body))
    }

    async fn save(&self, document: Value) -> Result<(), InfraError> {
        let mut delivered = self.lock_delivery()?;
        let revision = self.write(&document)?;
        tracing::debug!(document = %self.document_path, revision, "saved calendar document");
        if revision <= *delivered {
            return Ok(());
        }
        *delivered = revision;
        self.listeners.notify(&document)
    }

    fn subscribe(&self, listener: ChangeListener) -> Result<Subscription, InfraError> {
        let mut delivered = self.lock_delivery()?;
        let subscription = self.listeners.register(Arc::clone(&listener))?;
        if let Some(stored) = self.stored()? {
            *delivered = (*delivered).max(stored.revision);
            listener(stored.body);
        }
        Ok(subscription)
    }
}
