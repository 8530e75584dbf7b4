//! Menu query and import service.
//!
//! # Responsibility
//! - Resolve today's menu and monthly menus from the store.
//! - Normalize draft batches, classify each record and write accepted ones
//!   with one bulk store mutation.
//!
//! # Invariants
//! - Absence is never an error on the read side.
//! - `success + skipped + failed` always equals the batch length.
//! - Normalization and duplicate lookups finish before anything is written.
//! - With an authority attached, each touched month is rebuilt from the
//!   authority's rows plus the accepted records, so skipped days stay
//!   visible through the store.
//! - Authority rows commit only after the snapshot is saved; a failed
//!   authority commit restores the previous snapshot.

use crate::model::menu::{MenuDraft, MenuItem};
use crate::model::month_key::MonthKey;
use crate::model::normalize::normalize;
use crate::repo::day_row_repo::{DayRow, DayRowRepository};
use crate::service::calendar::{build_calendar_month, CalendarDay};
use crate::store::backend::BackendError;
use crate::store::{MenuStore, StoreResult};
use log::{debug, error, info};
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

/// Per-record tally of one import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportResult {
    /// Records accepted and written.
    pub success: usize,
    /// Records whose date already exists (authoritative store or earlier in
    /// the same batch).
    pub skipped: usize,
    /// Records rejected by normalization.
    pub failed: usize,
}

impl ImportResult {
    pub fn total(&self) -> usize {
        self.success + self.skipped + self.failed
    }
}

/// Read/import facade over a `MenuStore`.
pub struct MenuService<'a> {
    store: &'a MenuStore,
    authority: Option<&'a dyn DayRowRepository>,
}

impl<'a> MenuService<'a> {
    pub fn new(store: &'a MenuStore) -> Self {
        Self {
            store,
            authority: None,
        }
    }

    /// Attaches an authoritative day-row store used for duplicate detection
    /// and as a second write target during import.
    pub fn with_authority(mut self, authority: &'a dyn DayRowRepository) -> Self {
        self.authority = Some(authority);
        self
    }

    /// Today's menu, or `None` when nothing is stored for today.
    pub fn fetch_current_menu(&self) -> Option<MenuItem> {
        self.store.get_day(self.store.clock().today())
    }

    /// Items of one month, empty when the month is absent or invalid.
    pub fn fetch_monthly_menu(&self, year: i32, month: u32) -> Vec<MenuItem> {
        MonthKey::new(year, month)
            .and_then(|key| self.store.get_month(key))
            .map(|bucket| bucket.items().to_vec())
            .unwrap_or_default()
    }

    /// Full calendar month with synthesized no-menu days.
    ///
    /// Returns an empty sequence for an invalid month number.
    pub fn fetch_calendar_month(&self, year: i32, month: u32) -> Vec<CalendarDay> {
        let Some(key) = MonthKey::new(year, month) else {
            return Vec::new();
        };
        let items = self.fetch_monthly_menu(year, month);
        build_calendar_month(key, &items, self.store.clock().today())
    }

    /// Whether an import is currently running against the store.
    pub fn is_importing(&self) -> bool {
        self.store.is_importing()
    }

    /// Imports a batch of draft records.
    ///
    /// Records are classified in input order: malformed dates count as
    /// `failed`; dates already present in the authoritative store or earlier
    /// in this batch count as `skipped`; everything else is `success` and is
    /// written grouped by month through one bulk store write.
    ///
    /// # Errors
    /// - `UnavailableStore` when the authoritative store cannot be queried
    ///   or written, or the snapshot cannot be persisted. Neither target
    ///   keeps any of the batch in that case. Per-record problems never
    ///   surface as errors.
    pub fn import_from_drafts(&self, drafts: &[MenuDraft]) -> StoreResult<ImportResult> {
        let _guard = self.store.begin_import();
        let started_at = Instant::now();
        info!(
            "event=import module=service status=start drafts={} authority={}",
            drafts.len(),
            self.authority.is_some()
        );

        match self.run_import(drafts) {
            Ok(result) => {
                info!(
                    "event=import module=service status=ok duration_ms={} success={} skipped={} failed={}",
                    started_at.elapsed().as_millis(),
                    result.success,
                    result.skipped,
                    result.failed
                );
                Ok(result)
            }
            Err(err) => {
                error!(
                    "event=import module=service status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    fn run_import(&self, drafts: &[MenuDraft]) -> StoreResult<ImportResult> {
        let mut result = ImportResult::default();
        let mut seen = HashSet::new();
        let mut groups: BTreeMap<MonthKey, Vec<MenuItem>> = BTreeMap::new();

        for (index, draft) in drafts.iter().enumerate() {
            let item = match normalize(draft) {
                Ok(item) => item,
                Err(err) => {
                    debug!(
                        "event=import_record module=service status=skip index={} reason=malformed_date error={}",
                        index, err
                    );
                    result.failed += 1;
                    continue;
                }
            };
            let Some(month_key) = item.month_key() else {
                result.failed += 1;
                continue;
            };

            if seen.contains(&item.date) || self.exists_in_authority(&item)? {
                debug!(
                    "event=import_record module=service status=skip index={} reason=duplicate_date",
                    index
                );
                result.skipped += 1;
                continue;
            }

            seen.insert(item.date);
            groups.entry(month_key).or_default().push(item);
            result.success += 1;
        }

        if groups.is_empty() {
            return Ok(result);
        }

        let Some(authority) = self.authority else {
            self.store.replace_months(groups.into_iter().collect())?;
            return Ok(result);
        };

        let rows = groups
            .values()
            .flatten()
            .map(DayRow::from)
            .collect::<Vec<_>>();
        for (month_key, items) in groups.iter_mut() {
            let existing = authority
                .list_month(*month_key)
                .map_err(BackendError::from)?;
            items.extend(existing.iter().map(DayRow::to_menu_item));
        }

        self.store
            .replace_months_then(groups.into_iter().collect(), || {
                authority
                    .insert_batch(&rows)
                    .map_err(|err| BackendError::from(err).into())
            })?;

        Ok(result)
    }

    fn exists_in_authority(&self, item: &MenuItem) -> StoreResult<bool> {
        match self.authority {
            Some(authority) => Ok(authority
                .find_by_date(item.date)
                .map_err(BackendError::from)?
                .is_some()),
            None => Ok(false),
        }
    }
}
