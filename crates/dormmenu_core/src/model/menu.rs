//! Menu records.
//!
//! # Responsibility
//! - Define the canonical per-day `MenuItem` and the per-month `MonthBucket`.
//! - Define the unvalidated `MenuDraft` accepted from table parsing.
//!
//! # Invariants
//! - `MenuItem::breakfast`/`dinner` hold normalized, non-empty dish tokens.
//! - `MonthBucket` items are sorted by date, unique by date and non-empty.

use crate::model::month_key::MonthKey;
use crate::model::normalize::split_dishes;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;

/// One calendar day's menu.
///
/// Serialized with camelCase field names (`noMenu`) to match the persisted
/// snapshot layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    /// Calendar day, serialized as `YYYY-MM-DD`.
    pub date: NaiveDate,
    /// Breakfast dish names in source order. May be empty.
    #[serde(default, deserialize_with = "deserialize_dishes")]
    pub breakfast: Vec<String>,
    /// Dinner dish names in source order. May be empty.
    #[serde(default, deserialize_with = "deserialize_dishes")]
    pub dinner: Vec<String>,
    /// True only for synthesized "no dormitory meal service" days.
    #[serde(default)]
    pub no_menu: bool,
}

impl MenuItem {
    pub fn new(date: NaiveDate, breakfast: Vec<String>, dinner: Vec<String>) -> Self {
        Self {
            date,
            breakfast,
            dinner,
            no_menu: false,
        }
    }

    /// Placeholder for a day without meal service.
    pub fn no_service(date: NaiveDate) -> Self {
        Self {
            date,
            breakfast: Vec::new(),
            dinner: Vec::new(),
            no_menu: true,
        }
    }

    /// Month this item belongs to.
    ///
    /// Returns `None` only for dates whose year has more than four digits,
    /// which the normalizer never produces.
    pub fn month_key(&self) -> Option<MonthKey> {
        MonthKey::of_date(self.date)
    }
}

/// Older snapshots stored each meal as one free-text string.
#[derive(Deserialize)]
#[serde(untagged)]
enum DishesRepr {
    List(Vec<String>),
    Text(String),
}

fn deserialize_dishes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match DishesRepr::deserialize(deserializer)? {
        DishesRepr::List(dishes) => dishes,
        DishesRepr::Text(text) => split_dishes(&text),
    })
}

/// One calendar month of stored menu data.
///
/// Buckets are immutable once built; the store swaps whole buckets in and
/// out and hands out shared snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthBucket {
    month_key: MonthKey,
    items: Vec<MenuItem>,
    last_updated: DateTime<Utc>,
}

impl MonthBucket {
    /// Builds a bucket from items already validated against `month_key`.
    pub(crate) fn new(
        month_key: MonthKey,
        mut items: Vec<MenuItem>,
        last_updated: DateTime<Utc>,
    ) -> Arc<Self> {
        items.sort_by_key(|item| item.date);
        Arc::new(Self {
            month_key,
            items,
            last_updated,
        })
    }

    pub fn month_key(&self) -> MonthKey {
        self.month_key
    }

    /// Items ordered by date.
    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    /// Finds the item for `date`.
    pub fn day(&self, date: NaiveDate) -> Option<&MenuItem> {
        self.items
            .binary_search_by_key(&date, |item| item.date)
            .ok()
            .map(|index| &self.items[index])
    }
}

/// Unvalidated day-level record produced by table parsing.
///
/// Missing meal fields deserialize as empty strings so that sparse parser
/// output still reaches the normalizer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MenuDraft {
    pub date: String,
    #[serde(default)]
    pub breakfast: String,
    #[serde(default)]
    pub dinner: String,
}

impl MenuDraft {
    pub fn new(
        date: impl Into<String>,
        breakfast: impl Into<String>,
        dinner: impl Into<String>,
    ) -> Self {
        Self {
            date: date.into(),
            breakfast: breakfast.into(),
            dinner: dinner.into(),
        }
    }
}

/// Parses the JSON array of drafts emitted by the table parser.
pub fn parse_draft_batch(json: &str) -> Result<Vec<MenuDraft>, serde_json::Error> {
    serde_json::from_str(json)
}
