pub mod bootstrap;
pub mod commands;
pub mod lifecycle;
pub mod month_view;
pub mod remote_sync;
pub mod store;
pub mod transfer;
