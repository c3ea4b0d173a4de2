use crate::domain::calendar::day_key;
use crate::domain::models::{Block, CalendarState};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransferSource {
    Pool,
    Day { day_key: String, index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TransferState {
    #[default]
    Idle,
    Pending { block: Block, source: TransferSource },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTransfer {
    pub block: Block,
    pub source: TransferSource,
    pub target: NaiveDate,
}

impl PlannedTransfer {
    pub fn target_key(&self) -> String {
        day_key(&self.target)
    }

    pub fn apply(&self, state: &CalendarState) -> CalendarState {
        match &self.source {
            TransferSource::Pool => assign_to_day(state, &self.block.id, &self.target),
            TransferSource::Day { day_key, index } => {
                move_between_days(state, day_key, *index, &self.target)
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct TransferCoordinator {
    state: TransferState,
}

impl TransferCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &TransferState {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, TransferState::Pending { .. })
    }

    pub fn start(&mut self, block: Block, source: TransferSource) -> Option<(Block, TransferSource)> {
        // Not queued: a still-pending transfer is replaced and handed back.
        let previous = self.take_pending();
        if let Some((abandoned, _)) = &previous {
            tracing::warn!(block_id = %abandoned.id, "transfer started while another was pending");
        }
        self.state = TransferState::Pending { block, source };
        previous
    }

    pub fn cancel(&mut self) -> Option<(Block, TransferSource)> {
        self.take_pending()
    }

    pub fn commit(&mut self, target: NaiveDate) -> Option<PlannedTransfer> {
        self.take_pending()
            .map(|(block, source)| PlannedTransfer { block, source, target })
    }

    fn take_pending(&mut self) -> Option<(Block, TransferSource)> {
        match std::mem::take(&mut self.state) {
            TransferState::Idle => None,
            TransferState::Pending { block, source } => Some((block, source)),
        }
    }
}

/// Moves a pool block (matched by id) to the end of `target`'s sequence.
///
/// The pool's current copy of the block is moved, so edits made since the transfer
/// started are kept. A block no longer in the pool leaves the state unchanged.
pub fn assign_to_day(state: &CalendarState, block_id: &str, target: &NaiveDate) -> CalendarState {
    let mut next = state.clone();
    let Some(position) = next.to_schedule.iter().position(|block| block.id == block_id) else {
        return next;
    };
    let block = next.to_schedule.remove(position);
    next.events.entry(day_key(target)).or_default().push(block);
    next
}

pub fn move_between_days(
    state: &CalendarState,
    from_key: &str,
    index: usize,
    target: &NaiveDate,
) -> CalendarState {
    let mut next = state.clone();
    let Some(source) = next.events.get_mut(from_key) else {
        return next;
    };
    if index >= source.len() {
        return next;
    }
    let block = source.remove(index);
    if source.is_empty() {
        next.events.remove(from_key);
    }
    // Onto the same day this re-appends at the end.
    next.events.entry(day_key(target)).or_default().push(block);
    next
}
