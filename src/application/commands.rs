use crate::application::lifecycle::{self, BlockFactory};
use crate::application::month_view::{month_view, MonthView};
use crate::application::store::SchedulingStore;
use crate::application::transfer::{TransferCoordinator, TransferSource, TransferState};
use crate::domain::calendar::{self, day_key};
use crate::domain::models::{Block, BlockLocation, CalendarState};
use crate::infrastructure::activity_log::ActivityLog;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::remote_bridge::RemoteStateBridge;
use chrono::NaiveDate;
use chrono_tz::Tz;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;

pub struct Planner<B>
where
    B: RemoteStateBridge,
{
    store: Arc<SchedulingStore<B>>,
    transfers: Mutex<TransferCoordinator>,
    factory: BlockFactory,
    timezone: Tz,
    activity_log: ActivityLog,
    watcher: Option<JoinHandle<()>>,
}

impl<B> Planner<B>
where
    B: RemoteStateBridge + 'static,
{
    pub async fn open(bridge: Arc<B>, timezone: Tz) -> Result<Self, InfraError> {
        let store = SchedulingStore::open(bridge, CalendarState::for_today(&timezone)).await?;
        Ok(Self {
            store,
            transfers: Mutex::new(TransferCoordinator::new()),
            factory: BlockFactory::default(),
            timezone,
            activity_log: ActivityLog::disabled(),
            watcher: None,
        })
    }

    pub fn with_block_factory(mut self, factory: BlockFactory) -> Self {
        self.factory = factory;
        self
    }

    pub fn with_activity_log(mut self, activity_log: ActivityLog) -> Self {
        self.activity_log = activity_log;
        self
    }

    pub fn with_watcher(mut self, watcher: JoinHandle<()>) -> Self {
        if let Some(previous) = self.watcher.replace(watcher) {
            previous.abort();
        }
        self
    }

    pub fn store(&self) -> &Arc<SchedulingStore<B>> {
        &self.store
    }

    pub fn activity_log(&self) -> &ActivityLog {
        &self.activity_log
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn state(&self) -> Result<CalendarState, InfraError> {
        self.store
            .snapshot()
            .map_err(|error| self.command_error("state", error))
    }

    pub fn month_view(&self) -> Result<MonthView, InfraError> {
        let state = self
            .store
            .snapshot()
            .map_err(|error| self.command_error("month_view", error))?;
        Ok(month_view(&state))
    }

    pub fn today_key(&self) -> String {
        calendar::today_key(&self.timezone)
    }

    pub async fn create_batch(&self, batch: &str) -> Result<Vec<Block>, InfraError> {
        let mut created = Vec::new();
        self.store
            .mutate(|state| {
                let next = lifecycle::create_blocks_for_batch(state, batch, &self.factory);
                created = next.to_schedule[state.to_schedule.len()..].to_vec();
                next
            })
            .await
            .map_err(|error| self.command_error("create_batch", error))?;

        if !created.is_empty() {
            self.activity_log.info(
                "create_batch",
                &format!("batch={} blocks={}", batch.trim(), created.len()),
            );
        }
        Ok(created)
    }

    pub fn begin_transfer(&self, block_id: &str, source: TransferSource) -> Result<bool, InfraError> {
        let state = self
            .store
            .snapshot()
            .map_err(|error| self.command_error("begin_transfer", error))?;
        let block = match &source {
            TransferSource::Pool => state.to_schedule.iter().find(|block| block.id == block_id),
            TransferSource::Day { day_key, index } => state
                .day_blocks(day_key)
                .get(*index)
                .filter(|block| block.id == block_id),
        };
        let Some(block) = block.cloned() else {
            return Ok(false);
        };

        self.lock_transfers()
            .map_err(|error| self.command_error("begin_transfer", error))?
            .start(block, source);
        Ok(true)
    }

    pub fn cancel_transfer(&self) -> Result<bool, InfraError> {
        let cancelled = self
            .lock_transfers()
            .map_err(|error| self.command_error("cancel_transfer", error))?
            .cancel();
        Ok(cancelled.is_some())
    }

    pub fn transfer_state(&self) -> Result<TransferState, InfraError> {
        Ok(self.lock_transfers()?.state().clone())
    }

    pub async fn commit_transfer(&self, target: NaiveDate) -> Result<bool, InfraError> {
        let planned = self
            .lock_transfers()
            .map_err(|error| self.command_error("commit_transfer", error))?
            .commit(target);
        let Some(planned) = planned else {
            return Ok(false);
        };

        let mut moved = false;
        self.store
            .mutate(|state| {
                let next = planned.apply(state);
                moved = next != *state;
                next
            })
            .await
            .map_err(|error| self.command_error("commit_transfer", error))?;
        if moved {
            self.activity_log.info(
                "commit_transfer",
                &format!("block_id={} day={}", planned.block.id, day_key(&target)),
            );
        }
        Ok(true)
    }

    pub async fn edit_title(
        &self,
        block_id: &str,
        new_title: &str,
        location: &BlockLocation,
    ) -> Result<CalendarState, InfraError> {
        self.store
            .mutate(|state| lifecycle::edit_title(state, block_id, new_title, location))
            .await
            .map_err(|error| self.command_error("edit_title", error))
    }

    pub async fn set_completed(
        &self,
        block_id: &str,
        location: &BlockLocation,
        completed: bool,
    ) -> Result<CalendarState, InfraError> {
        self.store
            .mutate(|state| lifecycle::toggle_completed(state, block_id, location, completed))
            .await
            .map_err(|error| self.command_error("set_completed", error))
    }

    pub async fn delete_block(
        &self,
        block_id: &str,
        location: &BlockLocation,
    ) -> Result<CalendarState, InfraError> {
        let mut deleted = false;
        let next = self
            .store
            .mutate(|state| {
                let next = lifecycle::delete_block(state, block_id, location);
                deleted = next != *state;
                next
            })
            .await
            .map_err(|error| self.command_error("delete_block", error))?;
        if deleted {
            self.activity_log
                .info("delete_block", &format!("block_id={block_id}"));
        }
        Ok(next)
    }

    pub async fn prev_month(&self) -> Result<CalendarState, InfraError> {
        self.store
            .mutate(CalendarState::with_prev_month)
            .await
            .map_err(|error| self.command_error("prev_month", error))
    }

    pub async fn next_month(&self) -> Result<CalendarState, InfraError> {
        self.store
            .mutate(CalendarState::with_next_month)
            .await
            .map_err(|error| self.command_error("next_month", error))
    }

    fn command_error(&self, command: &str, error: InfraError) -> InfraError {
        self.activity_log.error(command, &error.to_string());
        error
    }

    fn lock_transfers(&self) -> Result<MutexGuard<'_, TransferCoordinator>, InfraError> {
        self.transfers
            .lock()
            .map_err(|error| InfraError::StatePoisoned(format!("transfer lock poisoned: {error}")))
    }
}

impl<B> Drop for Planner<B>
where
    B: RemoteStateBridge,
{
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
    }
}
