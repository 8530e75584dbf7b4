//! Repository layer for the authoritative per-day menu table.
//!
//! # Responsibility
//! - Define the lookup/insert contract import relies on for duplicate checks.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - `date` is the unique key; inserting an existing date is `Duplicate`.
//! - Read paths reject invalid persisted rows instead of masking them.

pub mod day_row_repo;
