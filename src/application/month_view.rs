use crate::domain::calendar::{day_key, days_of_month, leading_blank_count, month_name};
use crate::domain::color::display_color;
use crate::domain::models::{Block, CalendarState};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BlockView {
    #[serde(flatten)]
    pub block: Block,
    pub display_color: String,
}

impl BlockView {
    fn from_block(block: &Block) -> Self {
        Self {
            display_color: display_color(&block.color, block.completed),
            block: block.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DayCell {
    pub date: NaiveDate,
    pub day_key: String,
    pub day_of_month: u32,
    pub blocks: Vec<BlockView>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MonthView {
    pub year: i32,
    pub month: u32,
    pub month_name: String,
    pub leading_blanks: u32,
    pub days: Vec<DayCell>,
    pub pool: Vec<BlockView>,
}

pub fn month_view(state: &CalendarState) -> MonthView {
    let days = days_of_month(state.year, state.month)
        .map(|date| {
            let key = day_key(&date);
            DayCell {
                blocks: state.day_blocks(&key).iter().map(BlockView::from_block).collect(),
                day_of_month: date.day(),
                day_key: key,
                date,
            }
        })
        .collect();

    MonthView {
        year: state.year,
        month: state.month,
        month_name: month_name(state.month).unwrap_or_default().to_string(),
        leading_blanks: leading_blank_count(state.year, state.month),
        days,
        pool: state.to_schedule.iter().map(BlockView::from_block).collect(),
    }
}
