//! Canonical menu data model.
//!
//! # Responsibility
//! - Define the day-level and month-level records used by core logic.
//! - Convert unvalidated draft records into canonical menu items.
//!
//! # Invariants
//! - Every `MenuItem` belongs to exactly one `MonthKey` derived from its date.
//! - Within a `MonthBucket`, no two items share a date.

pub mod menu;
pub mod month_key;
pub mod normalize;
