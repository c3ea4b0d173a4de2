use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const ACTIVITY_LOG_FILE: &str = "commands.log";

#[derive(Debug)]
pub struct ActivityLog {
    path: Option<PathBuf>,
    guard: Mutex<()>,
}

impl ActivityLog {
    pub fn new(logs_dir: &Path) -> Self {
        Self {
            path: Some(logs_dir.join(ACTIVITY_LOG_FILE)),
            guard: Mutex::new(()),
        }
    }

    pub fn disabled() -> Self {
        Self {
            path: None,
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn info(&self, command: &str, message: &str) {
        tracing::info!(command, "{message}");
        self.append("info", command, message);
    }

    pub fn error(&self, command: &str, message: &str) {
        tracing::error!(command, "{message}");
        self.append("error", command, message);
    }

    fn append(&self, level: &str, command: &str, message: &str) {
        let Some(path) = self.path.as_deref() else {
            return;
        };
        let Ok(_guard) = self.guard.lock() else {
            return;
        };
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "command": command,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{}", payload);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn entries_are_appended_as_json_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = ActivityLog::new(dir.path());

        log.info("create_batch", "created 4 blocks for batch=B12");
        log.error("commit_transfer", "remote store unavailable");

        let raw = fs::read_to_string(log.path().expect("path")).expect("read log");
        let entries = raw
            .lines()
            .map(|line| serde_json::from_str::<serde_json::Value>(line).expect("json line"))
            .collect::<Vec<_>>();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["level"], "info");
        assert_eq!(entries[0]["command"], "create_batch");
        assert_eq!(entries[1]["level"], "error");
        assert_eq!(entries[1]["message"], "remote store unavailable");
    }

    #[test]
    fn disabled_log_writes_nothing() {
        let log = ActivityLog::disabled();
        log.info("next_month", "viewing 2026-01");
        assert!(log.path().is_none());
    }
}
