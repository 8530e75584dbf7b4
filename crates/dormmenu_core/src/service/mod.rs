//! Core use-case services.
//!
//! # Responsibility
//! - Expose the read-side lookups presentation callers use.
//! - Run draft imports into the store and the optional authoritative table.

pub mod calendar;
pub mod menu_service;
