pub mod calendar;
pub mod color;
pub mod migration;
pub mod models;
