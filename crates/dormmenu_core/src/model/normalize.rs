//! Draft-to-canonical record normalization.
//!
//! # Responsibility
//! - Validate draft dates and convert meal text into dish token lists.
//!
//! # Invariants
//! - Normalization is pure and deterministic.
//! - Malformed dates are rejected, never coerced.

use crate::model::menu::{MenuDraft, MenuItem};
use crate::model::month_key::MonthKey;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

// Unicode-aware: also matches U+3000 (ideographic space).
static DISH_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid dish separator regex"));

const FULL_WIDTH_SPACE: char = '\u{3000}';
const DATE_FORMAT: &str = "%Y-%m-%d";

pub type NormalizeResult<T> = Result<T, NormalizeError>;

/// Normalization failure for a single draft record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    /// Draft date is not a `YYYY-MM-DD` calendar date.
    MalformedDate { value: String },
}

impl Display for NormalizeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedDate { value } => write!(f, "malformed menu date `{value}`"),
        }
    }
}

impl Error for NormalizeError {}

/// Converts one draft into a canonical `MenuItem`.
///
/// # Errors
/// - `MalformedDate` when `draft.date` is not a representable calendar date.
pub fn normalize(draft: &MenuDraft) -> NormalizeResult<MenuItem> {
    let date = parse_menu_date(&draft.date)?;
    Ok(MenuItem::new(
        date,
        split_dishes(&draft.breakfast),
        split_dishes(&draft.dinner),
    ))
}

/// Parses a draft date in `YYYY-MM-DD` form.
pub fn parse_menu_date(value: &str) -> NormalizeResult<NaiveDate> {
    let malformed = || NormalizeError::MalformedDate {
        value: value.to_string(),
    };

    let date = NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| malformed())?;
    // Keeps every accepted date addressable by a four-digit month key.
    MonthKey::of_date(date).ok_or_else(malformed)?;
    Ok(date)
}

/// Splits free meal text into dish tokens.
///
/// Newlines and any whitespace run separate tokens; full-width spaces are
/// stripped from each token and empty tokens are dropped.
pub fn split_dishes(text: &str) -> Vec<String> {
    DISH_SEPARATOR_RE
        .split(text)
        .map(|token| token.replace(FULL_WIDTH_SPACE, ""))
        .filter(|token| !token.trim().is_empty())
        .collect()
}
