use crate::application::commands::Planner;
use crate::application::lifecycle::BlockFactory;
use crate::application::remote_sync::{RetryPolicy, RetryingBridge};
use crate::infrastructure::activity_log::ActivityLog;
use crate::infrastructure::config::{ensure_default_configs, load_planner_config, PlannerConfig};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::sqlite_bridge::SqliteRemoteStateBridge;
use crate::infrastructure::storage::initialize_database;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub type WorkspacePlanner = Planner<RetryingBridge<SqliteRemoteStateBridge>>;

#[derive(Debug)]
pub struct BootstrapResult {
    pub workspace_root: PathBuf,
    pub database_path: PathBuf,
    pub logs_dir: PathBuf,
    pub config: PlannerConfig,
}

pub fn bootstrap_workspace(workspace_root: &Path) -> Result<BootstrapResult, InfraError> {
    let config_dir = workspace_root.join("config");
    let state_dir = workspace_root.join("state");
    let logs_dir = workspace_root.join("logs");
    let database_path = state_dir.join("planner.sqlite");

    fs::create_dir_all(&config_dir)?;
    fs::create_dir_all(&state_dir)?;
    fs::create_dir_all(&logs_dir)?;

    ensure_default_configs(&config_dir)?;
    let config = load_planner_config(&config_dir)?;
    initialize_database(&database_path)?;

    Ok(BootstrapResult {
        workspace_root: workspace_root.to_path_buf(),
        database_path,
        logs_dir,
        config,
    })
}

/// Bootstraps `workspace_root` and opens a planner on its SQLite document, polling
/// for writes from other processes at the configured interval.
///
/// Must be called from within a tokio runtime.
pub async fn open_workspace(workspace_root: &Path) -> Result<WorkspacePlanner, InfraError> {
    let bootstrap = bootstrap_workspace(workspace_root)?;
    let config = &bootstrap.config;
    let timezone = config.timezone()?;

    let sqlite = Arc::new(SqliteRemoteStateBridge::new(
        &bootstrap.database_path,
        config.document_path.clone(),
    )?);
    let watcher = sqlite.spawn_watcher(Duration::from_millis(config.poll_interval_ms.max(1)));
    let bridge = Arc::new(
        RetryingBridge::new(sqlite).with_retry_policy(RetryPolicy::from(&config.retry)),
    );

    let activity_log = ActivityLog::new(&bootstrap.logs_dir);
    let planner = match Planner::open(bridge, timezone).await {
        Ok(planner) => planner,
        Err(error) => {
            watcher.abort();
            activity_log.error("open_workspace", &error.to_string());
            return Err(error);
        }
    };

    activity_log.info(
        "open_workspace",
        &format!(
            "root={} document={}",
            bootstrap.workspace_root.display(),
            config.document_path
        ),
    );
    Ok(planner
        .with_block_factory(BlockFactory::new(config.process_template.clone()))
        .with_activity_log(activity_log)
        .with_watcher(watcher))
}
