//! Calendar projections over stored months.
//!
//! # Invariants
//! - A calendar month has exactly one entry per calendar day, ascending.
//! - Days without a stored record are synthesized with `no_menu = true`.

use crate::model::menu::MenuItem;
use crate::model::month_key::MonthKey;
use chrono::{Datelike, NaiveDate};

/// Months a viewer may browse ahead of the current month.
pub const BROWSE_MONTHS_AHEAD: i32 = 2;

/// One cell of a month calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarDay {
    /// Day of month, 1-based.
    pub day: u32,
    pub item: MenuItem,
    pub is_today: bool,
}

/// Expands stored `items` of `month` into a full calendar month.
pub fn build_calendar_month(
    month: MonthKey,
    items: &[MenuItem],
    today: NaiveDate,
) -> Vec<CalendarDay> {
    month
        .days()
        .map(|date| CalendarDay {
            day: date.day(),
            item: items
                .iter()
                .find(|item| item.date == date)
                .cloned()
                .unwrap_or_else(|| MenuItem::no_service(date)),
            is_today: date == today,
        })
        .collect()
}

/// Inclusive month window a viewer may browse from `today`.
///
/// Returns `None` only when `today` has no four-digit month key.
pub fn browse_range(today: NaiveDate) -> Option<(MonthKey, MonthKey)> {
    let current = MonthKey::of_date(today)?;
    Some((current, current.offset(BROWSE_MONTHS_AHEAD)))
}

/// Clamps a requested month into the browse window of `today`.
pub fn clamp_to_browse_range(requested: MonthKey, today: NaiveDate) -> MonthKey {
    match browse_range(today) {
        Some((first, last)) => requested.clamp(first, last),
        None => requested,
    }
}

#[cfg(test)]
mod tests {
    use super::{browse_range, build_calendar_month, clamp_to_browse_range};
    use crate::model::menu::MenuItem;
    use crate::model::month_key::MonthKey;
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn calendar_fills_missing_days_with_no_service() {
        let month = MonthKey::new(2025, 4).unwrap();
        let items = vec![MenuItem::new(day(2025, 4, 2), vec!["パン".into()], vec![])];

        let days = build_calendar_month(month, &items, day(2025, 4, 3));
        assert_eq!(days.len(), 30);
        assert!(days[0].item.no_menu);
        assert_eq!(days[0].item.date, day(2025, 4, 1));
        assert!(!days[1].item.no_menu);
        assert_eq!(days[1].item.breakfast, vec!["パン"]);
        assert!(days[2].is_today);
        assert_eq!(days.iter().filter(|cell| cell.is_today).count(), 1);
    }

    #[test]
    fn browse_range_spans_three_months() {
        let (first, last) = browse_range(day(2025, 11, 20)).unwrap();
        assert_eq!(first.to_string(), "2025-11");
        assert_eq!(last.to_string(), "2026-01");
    }

    #[test]
    fn clamp_keeps_requests_inside_window() {
        let today = day(2025, 4, 10);
        let before = MonthKey::new(2025, 1).unwrap();
        let after = MonthKey::new(2025, 9).unwrap();
        let inside = MonthKey::new(2025, 5).unwrap();
        assert_eq!(clamp_to_browse_range(before, today).to_string(), "2025-04");
        assert_eq!(clamp_to_browse_range(after, today).to_string(), "2025-06");
        assert_eq!(clamp_to_browse_range(inside, today), inside);
    }
}
