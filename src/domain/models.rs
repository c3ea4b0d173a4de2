use crate::domain::calendar::{self, is_valid_day_key};
use crate::domain::color::is_valid_hex_color;
use chrono::{Datelike, TimeZone};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub const PROCESS_TEMPLATE: [&str; 4] = ["Plasma Treatment", "Enzyme Dipcoating", "QC", "Packaging"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Block {
    pub id: String,
    pub title: String,
    pub batch: String,
    pub color: String,
    #[serde(default)]
    pub completed: bool,
}

impl Block {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "block.id")?;
        validate_non_empty(&self.batch, "block.batch")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockLocation {
    Pool,
    Day {
        day_key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },
}

impl BlockLocation {
    pub fn day(day_key: impl Into<String>) -> Self {
        Self::Day {
            day_key: day_key.into(),
            index: None,
        }
    }

    pub fn day_at(day_key: impl Into<String>, index: usize) -> Self {
        Self::Day {
            day_key: day_key.into(),
            index: Some(index),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarState {
    pub year: i32,
    pub month: u32,
    #[serde(default)]
    pub to_schedule: Vec<Block>,
    #[serde(default)]
    pub events: BTreeMap<String, Vec<Block>>,
    #[serde(default)]
    pub batch_colors: BTreeMap<String, String>,
}

impl CalendarState {
    pub fn new(year: i32, month: u32) -> Self {
        Self {
            year,
            month: month.min(11),
            to_schedule: Vec::new(),
            events: BTreeMap::new(),
            batch_colors: BTreeMap::new(),
        }
    }

    pub fn for_today<Tz: TimeZone>(timezone: &Tz) -> Self {
        let today = calendar::today_in(timezone);
        Self::new(today.year(), today.month0())
    }

    pub fn with_prev_month(&self) -> Self {
        let (year, month) = calendar::prev_month(self.year, self.month);
        Self {
            year,
            month,
            ..self.clone()
        }
    }

    pub fn with_next_month(&self) -> Self {
        let (year, month) = calendar::next_month(self.year, self.month);
        Self {
            year,
            month,
            ..self.clone()
        }
    }

    pub fn day_blocks(&self, day_key: &str) -> &[Block] {
        self.events.get(day_key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn blocks_at(&self, location: &BlockLocation) -> &[Block] {
        match location {
            BlockLocation::Pool => &self.to_schedule,
            BlockLocation::Day { day_key, .. } => self.day_blocks(day_key),
        }
    }

    pub fn all_blocks(&self) -> impl Iterator<Item = (BlockLocation, &Block)> + '_ {
        let pool = self
            .to_schedule
            .iter()
            .map(|block| (BlockLocation::Pool, block));
        let days = self.events.iter().flat_map(|(day_key, blocks)| {
            blocks
                .iter()
                .enumerate()
                .map(move |(index, block)| (BlockLocation::day_at(day_key.clone(), index), block))
        });
        pool.chain(days)
    }

    pub fn block_count(&self) -> usize {
        self.to_schedule.len() + self.events.values().map(Vec::len).sum::<usize>()
    }

    pub fn validate_shape(&self) -> Result<(), String> {
        if self.month > 11 {
            return Err(format!("calendar.month must be in 0..=11, got {}", self.month));
        }
        for day_key in self.events.keys() {
            if !is_valid_day_key(day_key) {
                return Err(format!("calendar.events key '{day_key}' must be YYYY-MM-DD"));
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), String> {
        self.validate_shape()?;
        for (batch, color) in &self.batch_colors {
            validate_non_empty(batch, "calendar.batchColors key")?;
            if !is_valid_hex_color(color) {
                return Err(format!("calendar.batchColors['{batch}'] must be #RRGGBB"));
            }
        }

        let mut seen: HashMap<&str, BlockLocation> = HashMap::new();
        for (location, block) in self.all_blocks() {
            block.validate()?;
            if let Some(previous) = seen.insert(block.id.as_str(), location.clone()) {
                return Err(format!(
                    "block '{}' appears in more than one location: {:?} and {:?}",
                    block.id, previous, location
                ));
            }
        }
        Ok(())
    }
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}
