use crate::domain::color::random_batch_color;
use crate::domain::models::{Block, BlockLocation, CalendarState, PROCESS_TEMPLATE};
use std::sync::Arc;
use uuid::Uuid;

type IdProvider = Arc<dyn Fn() -> String + Send + Sync>;
type ColorProvider = Arc<dyn Fn() -> String + Send + Sync>;

pub fn next_block_id() -> String {
    format!("blk-{}", Uuid::new_v4().simple())
}

#[derive(Clone)]
pub struct BlockFactory {
    process_template: Vec<String>,
    id_provider: IdProvider,
    color_provider: ColorProvider,
}

impl Default for BlockFactory {
    fn default() -> Self {
        Self::new(PROCESS_TEMPLATE.iter().map(|stage| stage.to_string()).collect())
    }
}

impl BlockFactory {
    pub fn new(process_template: Vec<String>) -> Self {
        Self {
            process_template,
            id_provider: Arc::new(next_block_id),
            color_provider: Arc::new(random_batch_color),
        }
    }

    pub fn with_id_provider(mut self, id_provider: IdProvider) -> Self {
        self.id_provider = id_provider;
        self
    }

    pub fn with_color_provider(mut self, color_provider: ColorProvider) -> Self {
        self.color_provider = color_provider;
        self
    }

    pub fn process_template(&self) -> &[String] {
        &self.process_template
    }
}

impl std::fmt::Debug for BlockFactory {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("BlockFactory")
            .field("process_template", &self.process_template)
            .finish_non_exhaustive()
    }
}

pub fn create_blocks_for_batch(
    state: &CalendarState,
    batch: &str,
    factory: &BlockFactory,
) -> CalendarState {
    let batch = batch.trim();
    if batch.is_empty() {
        return state.clone();
    }

    let color = state
        .batch_colors
        .get(batch)
        .cloned()
        .unwrap_or_else(|| (factory.color_provider)());

    let mut next = state.clone();
    next.batch_colors.insert(batch.to_string(), color.clone());
    next.to_schedule
        .extend(factory.process_template.iter().map(|stage| Block {
            id: (factory.id_provider)(),
            title: stage.clone(),
            batch: batch.to_string(),
            color: color.clone(),
            completed: false,
        }));
    next
}

pub fn edit_title(
    state: &CalendarState,
    block_id: &str,
    new_title: &str,
    location: &BlockLocation,
) -> CalendarState {
    update_block(state, block_id, location, |block| {
        block.title = new_title.to_string();
    })
}

pub fn toggle_completed(
    state: &CalendarState,
    block_id: &str,
    location: &BlockLocation,
    completed: bool,
) -> CalendarState {
    update_block(state, block_id, location, |block| {
        block.completed = completed;
    })
}

pub fn delete_block(state: &CalendarState, block_id: &str, location: &BlockLocation) -> CalendarState {
    let mut next = state.clone();
    let Some(blocks) = blocks_mut(&mut next, location) else {
        return next;
    };
    let Some(position) = position_in(blocks, block_id, pinned_index(location)) else {
        return next;
    };
    blocks.remove(position);

    if let BlockLocation::Day { day_key, .. } = location {
        if next.day_blocks(day_key).is_empty() {
            next.events.remove(day_key);
        }
    }
    next
}

fn update_block(
    state: &CalendarState,
    block_id: &str,
    location: &BlockLocation,
    apply: impl FnOnce(&mut Block),
) -> CalendarState {
    let mut next = state.clone();
    if let Some(blocks) = blocks_mut(&mut next, location) {
        if let Some(position) = position_in(blocks, block_id, pinned_index(location)) {
            apply(&mut blocks[position]);
        }
    }
    next
}

fn pinned_index(location: &BlockLocation) -> Option<usize> {
    match location {
        BlockLocation::Pool => None,
        BlockLocation::Day { index, .. } => *index,
    }
}

fn blocks_mut<'a>(state: &'a mut CalendarState, location: &BlockLocation) -> Option<&'a mut Vec<Block>> {
    match location {
        BlockLocation::Pool => Some(&mut state.to_schedule),
        BlockLocation::Day { day_key, .. } => state.events.get_mut(day_key),
    }
}

pub(crate) fn position_in(blocks: &[Block], block_id: &str, index: Option<usize>) -> Option<usize> {
    match index {
        Some(index) => blocks
            .get(index)
            .filter(|block| block.id == block_id)
            .map(|_| index),
        None => blocks.iter().position(|block| block.id == block_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_factory(color: &'static str) -> BlockFactory {
        let counter = Arc::new(AtomicUsize::new(0));
        BlockFactory::default()
            .with_id_provider(Arc::new(move || {
                format!("blk-{}", counter.fetch_add(1, Ordering::Relaxed))
            }))
            .with_color_provider(Arc::new(move || color.to_string()))
    }

    fn scheduled_state() -> CalendarState {
        let factory = counting_factory("#aa3300");
        let mut state = create_blocks_for_batch(&CalendarState::new(2025, 2), "B12", &factory);
        let moved = state.to_schedule.split_off(2);
        state.events.insert("2025-03-10".to_string(), moved);
        state
    }

    #[test]
    fn create_blocks_for_batch_appends_one_block_per_stage() {
        let state = create_blocks_for_batch(
            &CalendarState::new(2025, 2),
            "B12",
            &BlockFactory::default(),
        );

        assert_eq!(state.to_schedule.len(), 4);
        let color = state.batch_colors.get("B12").expect("batch color recorded");
        assert!(state.to_schedule.iter().all(|block| block.batch == "B12"));
        assert!(state.to_schedule.iter().all(|block| &block.color == color));
        assert!(state.to_schedule.iter().all(|block| !block.completed));
        assert_eq!(
            state
                .to_schedule
                .iter()
                .map(|block| block.title.as_str())
                .collect::<Vec<_>>(),
            PROCESS_TEMPLATE.to_vec()
        );
        assert!(state.validate().is_ok());
    }

    #[test]
    fn create_blocks_for_batch_generates_distinct_ids() {
        let factory = BlockFactory::default();
        let once = create_blocks_for_batch(&CalendarState::new(2025, 2), "B12", &factory);
        let twice = create_blocks_for_batch(&once, "B12", &factory);

        assert_eq!(twice.to_schedule.len(), 8);
        assert!(twice.validate().is_ok());
    }

    #[test]
    fn create_blocks_for_batch_reuses_existing_batch_color() {
        let first = create_blocks_for_batch(&CalendarState::new(2025, 2), "B12", &counting_factory("#111111"));
        let second = create_blocks_for_batch(&first, "B12", &counting_factory("#222222"));

        assert_eq!(second.batch_colors.len(), 1);
        assert_eq!(second.batch_colors["B12"], "#111111");
        assert!(second.to_schedule.iter().all(|block| block.color == "#111111"));
    }

    #[test]
    fn create_blocks_for_batch_ignores_blank_label_and_trims() {
        let empty = CalendarState::new(2025, 2);
        assert_eq!(create_blocks_for_batch(&empty, "", &BlockFactory::default()), empty);
        assert_eq!(create_blocks_for_batch(&empty, "  \t", &BlockFactory::default()), empty);

        let state = create_blocks_for_batch(&empty, "  B12 ", &BlockFactory::default());
        assert!(state.batch_colors.contains_key("B12"));
        assert!(state.to_schedule.iter().all(|block| block.batch == "B12"));
    }

    #[test]
    fn create_blocks_for_batch_follows_custom_template() {
        let factory = BlockFactory::new(vec!["Mix".to_string(), "Cure".to_string()]);
        let state = create_blocks_for_batch(&CalendarState::new(2025, 2), "B3", &factory);
        assert_eq!(state.to_schedule.len(), 2);
        assert_eq!(state.to_schedule[1].title, "Cure");
        assert_eq!(factory.process_template().len(), 2);
    }

    #[test]
    fn edit_title_changes_only_title_in_place() {
        let state = scheduled_state();
        let next = edit_title(&state, "blk-1", "Plasma Treatment (rework)", &BlockLocation::Pool);

        assert_eq!(next.to_schedule[1].title, "Plasma Treatment (rework)");
        assert_eq!(next.to_schedule[1].id, "blk-1");
        assert_eq!(next.to_schedule[1].color, state.to_schedule[1].color);
        assert_eq!(next.to_schedule[0], state.to_schedule[0]);
        assert_eq!(next.events, state.events);
    }

    #[test]
    fn edit_title_on_day_respects_pinned_index() {
        let state = scheduled_state();

        let next = edit_title(&state, "blk-3", "Pack", &BlockLocation::day_at("2025-03-10", 1));
        assert_eq!(next.day_blocks("2025-03-10")[1].title, "Pack");

        let mismatched = edit_title(&state, "blk-3", "Pack", &BlockLocation::day_at("2025-03-10", 0));
        assert_eq!(mismatched, state);

        let by_id = edit_title(&state, "blk-2", "QC hold", &BlockLocation::day("2025-03-10"));
        assert_eq!(by_id.day_blocks("2025-03-10")[0].title, "QC hold");
    }

    #[test]
    fn edits_at_wrong_location_are_no_ops() {
        let state = scheduled_state();
        assert_eq!(edit_title(&state, "blk-2", "x", &BlockLocation::Pool), state);
        assert_eq!(edit_title(&state, "blk-0", "x", &BlockLocation::day("2025-03-10")), state);
        assert_eq!(edit_title(&state, "blk-0", "x", &BlockLocation::day("2025-03-11")), state);
        assert_eq!(toggle_completed(&state, "missing", &BlockLocation::Pool, true), state);
        assert_eq!(delete_block(&state, "missing", &BlockLocation::Pool), state);
        assert_eq!(delete_block(&state, "blk-2", &BlockLocation::day_at("2025-03-10", 1)), state);
    }

    #[test]
    fn toggle_completed_sets_flag_both_ways() {
        let state = scheduled_state();
        let done = toggle_completed(&state, "blk-2", &BlockLocation::day_at("2025-03-10", 0), true);
        assert!(done.day_blocks("2025-03-10")[0].completed);
        assert_eq!(done.day_blocks("2025-03-10")[0].title, state.day_blocks("2025-03-10")[0].title);

        let undone = toggle_completed(&done, "blk-2", &BlockLocation::day("2025-03-10"), false);
        assert_eq!(undone, state);
    }

    #[test]
    fn delete_block_removes_and_drops_empty_day() {
        let state = scheduled_state();
        let pool_deleted = delete_block(&state, "blk-0", &BlockLocation::Pool);
        assert_eq!(pool_deleted.to_schedule.len(), 1);
        assert_eq!(pool_deleted.to_schedule[0].id, "blk-1");

        let one_left = delete_block(&state, "blk-2", &BlockLocation::day("2025-03-10"));
        assert_eq!(one_left.day_blocks("2025-03-10").len(), 1);

        let emptied = delete_block(&one_left, "blk-3", &BlockLocation::day_at("2025-03-10", 0));
        assert!(!emptied.events.contains_key("2025-03-10"));
        assert_eq!(emptied.batch_colors, state.batch_colors);
    }
}
