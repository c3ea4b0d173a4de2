pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::bootstrap::{bootstrap_workspace, open_workspace, BootstrapResult, WorkspacePlanner};
pub use application::commands::Planner;
pub use application::month_view::{BlockView, DayCell, MonthView};
pub use application::remote_sync::{RetryPolicy, RetryingBridge};
pub use application::store::SchedulingStore;
pub use application::transfer::{TransferSource, TransferState};
pub use domain::models::{Block, BlockLocation, CalendarState, PROCESS_TEMPLATE};
pub use infrastructure::error::InfraError;
pub use infrastructure::remote_bridge::{
    ChangeListener, InMemoryRemoteStateBridge, RemoteStateBridge, Subscription,
};
pub use infrastructure::sqlite_bridge::SqliteRemoteStateBridge;
