//! Core domain logic for the dormitory menu.
//!
//! Ingests draft day records, normalizes them, stores them per month with a
//! bounded retention window and serves day/month lookups.

pub mod clock;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod settings;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::menu::{parse_draft_batch, MenuDraft, MenuItem, MonthBucket};
pub use model::month_key::{MonthKey, MonthKeyError};
pub use model::normalize::{normalize, split_dishes, NormalizeError, NormalizeResult};
pub use repo::day_row_repo::{
    DayRow, DayRowRepository, RepoError, RepoResult, SqliteDayRowRepository,
};
pub use service::calendar::{browse_range, clamp_to_browse_range, CalendarDay};
pub use service::menu_service::{ImportResult, MenuService};
pub use settings::{SettingsError, StoreSettings};
pub use store::backend::{
    BackendError, BackendResult, FileBackend, MemoryBackend, SnapshotBackend,
};
pub use store::retention::{sweep, EvictionPolicy, Swept};
pub use store::sqlite_backend::SqliteSnapshotBackend;
pub use store::{BucketViolation, MenuStore, StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
