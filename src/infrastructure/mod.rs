pub mod activity_log;
pub mod config;
pub mod error;
pub mod remote_bridge;
pub mod sqlite_bridge;
pub mod storage;
