use crate::domain::models::CalendarState;
use crate::infrastructure::error::InfraError;
use serde_json::Value;

const KEY_COMPLETED: &str = "completed";
const KEY_TO_SCHEDULE: &str = "toSchedule";
const KEY_EVENTS: &str = "events";

/// Sets `completed = false` on every block that lacks a boolean `completed`.
///
/// Touches nothing else and is idempotent. Returns the number of repaired blocks.
pub fn normalize_document(document: &mut Value) -> usize {
    let Some(root) = document.as_object_mut() else {
        return 0;
    };

    let mut repaired = 0;
    if let Some(pool) = root.get_mut(KEY_TO_SCHEDULE) {
        repaired += normalize_sequence(pool);
    }
    if let Some(days) = root.get_mut(KEY_EVENTS).and_then(Value::as_object_mut) {
        for blocks in days.values_mut() {
            repaired += normalize_sequence(blocks);
        }
    }
    repaired
}

fn normalize_sequence(blocks: &mut Value) -> usize {
    let Some(blocks) = blocks.as_array_mut() else {
        return 0;
    };
    let mut repaired = 0;
    for block in blocks.iter_mut().filter_map(Value::as_object_mut) {
        if !matches!(block.get(KEY_COMPLETED), Some(Value::Bool(_))) {
            block.insert(KEY_COMPLETED.to_string(), Value::Bool(false));
            repaired += 1;
        }
    }
    repaired
}

pub fn decode_document(mut document: Value) -> Result<CalendarState, InfraError> {
    let repaired = normalize_document(&mut document);
    if repaired > 0 {
        tracing::debug!(repaired, "normalized legacy blocks without completion flag");
    }
    let state: CalendarState = serde_json::from_value(document)
        .map_err(|error| InfraError::InvalidDocument(format!("cannot decode calendar: {error}")))?;
    state.validate_shape().map_err(InfraError::InvalidDocument)?;
    Ok(state)
}

pub fn encode_document(state: &CalendarState) -> Result<Value, InfraError> {
    Ok(serde_json::to_value(state)?)
}
