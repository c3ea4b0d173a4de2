use crate::domain::models::PROCESS_TEMPLATE;
use crate::infrastructure::error::InfraError;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const PLANNER_JSON: &str = "planner.json";
const DEFAULT_DOCUMENT_PATH: &str = "calendar/live";
const DEFAULT_TIMEZONE: &str = "UTC";
const SUPPORTED_SCHEMA: u64 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    pub max_attempts: u8,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlannerConfig {
    pub schema: u8,
    pub document_path: String,
    pub timezone: String,
    pub process_template: Vec<String>,
    #[serde(default)]
    pub retry: RetryConfig,
    pub poll_interval_ms: u64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            schema: 1,
            document_path: DEFAULT_DOCUMENT_PATH.to_string(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            process_template: PROCESS_TEMPLATE.iter().map(|stage| stage.to_string()).collect(),
            retry: RetryConfig::default(),
            poll_interval_ms: 1000,
        }
    }
}

impl PlannerConfig {
    pub fn validate(&self) -> Result<(), InfraError> {
        if self.document_path.trim().is_empty() {
            return Err(InfraError::InvalidConfig(
                "documentPath must not be empty".to_string(),
            ));
        }
        self.timezone()?;
        if self.process_template.is_empty() {
            return Err(InfraError::InvalidConfig(
                "processTemplate must not be empty".to_string(),
            ));
        }
        if self.process_template.iter().any(|stage| stage.trim().is_empty()) {
            return Err(InfraError::InvalidConfig(
                "processTemplate stages must not be blank".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(InfraError::InvalidConfig(
                "pollIntervalMs must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timezone(&self) -> Result<Tz, InfraError> {
        self.timezone.trim().parse::<Tz>().map_err(|error| {
            InfraError::InvalidConfig(format!("unknown timezone '{}': {error}", self.timezone))
        })
    }
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    let path = config_dir.join(PLANNER_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&PlannerConfig::default())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != SUPPORTED_SCHEMA {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_planner_config(config_dir: &Path) -> Result<PlannerConfig, InfraError> {
    let path = config_dir.join(PLANNER_JSON);
    let config: PlannerConfig = serde_json::from_value(read_config(&path)?).map_err(|error| {
        InfraError::InvalidConfig(format!("invalid {}: {error}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}
