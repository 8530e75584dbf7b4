//! Calendar month identifier.
//!
//! # Responsibility
//! - Identify one calendar month as `YYYY-MM`.
//! - Provide chronological ordering for retention decisions.
//!
//! # Invariants
//! - `year` is within `0..=9999`, so the four-digit textual form orders
//!   exactly like the chronological form.
//! - `month` is within `1..=12`.

use chrono::{Datelike, NaiveDate};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const MIN_YEAR: i32 = 0;
const MAX_YEAR: i32 = 9999;

/// Month-level storage key, rendered as `YYYY-MM`.
///
/// Field order matters: derived `Ord` compares `year` first, then `month`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

/// Error returned when a month key cannot be parsed or constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthKeyError {
    pub value: String,
}

impl Display for MonthKeyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid month key `{}`; expected YYYY-MM", self.value)
    }
}

impl Error for MonthKeyError {}

impl MonthKey {
    /// Builds a key from numeric parts.
    ///
    /// Returns `None` when `month` is outside `1..=12` or `year` cannot be
    /// rendered with four digits.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) || !(1..=12).contains(&month) {
            return None;
        }
        Some(Self { year, month })
    }

    /// Returns the month containing `date`, when its year is representable.
    pub fn of_date(date: NaiveDate) -> Option<Self> {
        Self::new(date.year(), date.month())
    }

    pub fn year(self) -> i32 {
        self.year
    }

    pub fn month(self) -> u32 {
        self.month
    }

    /// Whether `date` falls inside this month.
    pub fn contains(self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// Day 1 of this month.
    pub fn first_day(self) -> NaiveDate {
        // Validated year/month always name a real date.
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Every calendar day of this month, ascending.
    pub fn days(self) -> impl Iterator<Item = NaiveDate> {
        self.first_day()
            .iter_days()
            .take_while(move |date| self.contains(*date))
    }

    /// Shifts by `months`, saturating at the representable range.
    pub fn offset(self, months: i32) -> Self {
        let index = self.year * 12 + (self.month as i32 - 1) + months;
        let clamped = index.clamp(MIN_YEAR * 12, MAX_YEAR * 12 + 11);
        Self {
            year: clamped.div_euclid(12),
            month: clamped.rem_euclid(12) as u32 + 1,
        }
    }
}

impl Display for MonthKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = MonthKeyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || MonthKeyError {
            value: value.to_string(),
        };

        let trimmed = value.trim();
        let (year_text, month_text) = trimmed.split_once('-').ok_or_else(invalid)?;
        if year_text.len() != 4
            || month_text.len() != 2
            || !year_text.bytes().all(|b| b.is_ascii_digit())
            || !month_text.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let year = year_text.parse::<i32>().map_err(|_| invalid())?;
        let month = month_text.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, month).ok_or_else(invalid)
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::MonthKey;
    use chrono::NaiveDate;

    #[test]
    fn display_is_zero_padded() {
        let key = MonthKey::new(2025, 3).unwrap();
        assert_eq!(key.to_string(), "2025-03");
    }

    #[test]
    fn parse_rejects_loose_forms() {
        assert!("2025-3".parse::<MonthKey>().is_err());
        assert!("2025-13".parse::<MonthKey>().is_err());
        assert!("2025-00".parse::<MonthKey>().is_err());
        assert!("25-03".parse::<MonthKey>().is_err());
        assert!("2025/03".parse::<MonthKey>().is_err());
        assert_eq!(
            " 2025-12 ".parse::<MonthKey>().unwrap(),
            MonthKey::new(2025, 12).unwrap()
        );
    }

    #[test]
    fn ordering_matches_text_ordering() {
        let keys = ["2024-12", "2025-01", "2025-02", "2025-10"]
            .iter()
            .map(|text| text.parse::<MonthKey>().unwrap())
            .collect::<Vec<_>>();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(sorted, keys);
    }

    #[test]
    fn days_cover_the_whole_month() {
        let february = MonthKey::new(2024, 2).unwrap();
        let days = february.days().collect::<Vec<_>>();
        assert_eq!(days.len(), 29);
        assert_eq!(days[0], NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(days[28], NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn first_day_is_day_one_and_contained() {
        let key = MonthKey::new(2025, 12).unwrap();
        assert_eq!(key.first_day(), NaiveDate::from_ymd_opt(2025, 12, 1).unwrap());
        assert!(key.contains(key.first_day()));
        assert_eq!(MonthKey::of_date(key.first_day()), Some(key));
        assert_eq!(key.days().count(), 31);
    }

    #[test]
    fn offset_crosses_year_boundaries() {
        let november = MonthKey::new(2025, 11).unwrap();
        assert_eq!(november.offset(2).to_string(), "2026-01");
        assert_eq!(november.offset(-11).to_string(), "2024-12");
    }
}
