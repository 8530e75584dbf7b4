//! Month-keyed menu store with retention.
//!
//! # Responsibility
//! - Own every `MonthBucket` and persist the whole mapping through a
//!   `SnapshotBackend` under one key.
//! - Apply whole-month replacement followed by a retention sweep.
//!
//! # Invariants
//! - Writes are serialized store-wide; the sweep sees a consistent mapping.
//! - Readers observe the mapping before or after a write, never in between.
//! - A failed write (validation or persistence) leaves state unchanged.
//! - Stored buckets are non-empty; replacing with no items removes the month.

use crate::clock::Clock;
use crate::model::menu::{MenuItem, MonthBucket};
use crate::model::month_key::MonthKey;
use crate::settings::StoreSettings;
use chrono::NaiveDate;
use log::{error, info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

pub mod backend;
pub mod retention;
mod snapshot;
pub mod sqlite_backend;

use backend::{BackendError, SnapshotBackend};
use retention::sweep;
use snapshot::Buckets;

pub type StoreResult<T> = Result<T, StoreError>;

/// Why a set of items cannot form the bucket of a month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketViolation {
    /// Item date lies outside the declared month.
    ForeignDate(NaiveDate),
    /// Two items share this date.
    DuplicateDate(NaiveDate),
}

impl Display for BucketViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ForeignDate(date) => write!(f, "date {date} is outside the month"),
            Self::DuplicateDate(date) => write!(f, "date {date} appears more than once"),
        }
    }
}

/// Store-level failure surfaced to callers.
#[derive(Debug)]
pub enum StoreError {
    /// Items do not form a valid bucket for `month_key`; nothing was written.
    InvalidBucket {
        month_key: MonthKey,
        violation: BucketViolation,
    },
    /// Persistence is unreachable or holds corrupt state.
    UnavailableStore(BackendError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidBucket {
                month_key,
                violation,
            } => write!(f, "invalid bucket for {month_key}: {violation}"),
            Self::UnavailableStore(err) => write!(f, "menu store unavailable: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidBucket { .. } => None,
            Self::UnavailableStore(err) => Some(err),
        }
    }
}

impl From<BackendError> for StoreError {
    fn from(value: BackendError) -> Self {
        Self::UnavailableStore(value)
    }
}

/// Checks that `items` may form the bucket of `month_key`.
pub(crate) fn check_bucket_items(
    month_key: MonthKey,
    items: &[MenuItem],
) -> Result<(), BucketViolation> {
    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if !month_key.contains(item.date) {
            return Err(BucketViolation::ForeignDate(item.date));
        }
        if !seen.insert(item.date) {
            return Err(BucketViolation::DuplicateDate(item.date));
        }
    }
    Ok(())
}

/// Process-wide menu store.
///
/// Construct once and share by reference (or `Arc`) with query and import
/// callers.
pub struct MenuStore {
    backend: Box<dyn SnapshotBackend>,
    clock: Arc<dyn Clock>,
    settings: StoreSettings,
    buckets: RwLock<Buckets>,
    write_gate: Mutex<()>,
    import_gate: Mutex<()>,
    importing: AtomicBool,
}

/// Marks an import in progress; clears the flag on drop.
pub(crate) struct ImportGuard<'a> {
    importing: &'a AtomicBool,
    _gate: MutexGuard<'a, ()>,
}

impl Drop for ImportGuard<'_> {
    fn drop(&mut self) {
        self.importing.store(false, Ordering::Release);
    }
}

impl MenuStore {
    /// Opens the store, falling back to an empty mapping when the persisted
    /// snapshot cannot be read or decoded.
    ///
    /// The fallback condition is returned next to the store so callers can
    /// report it; the store itself stays usable.
    pub fn open(
        backend: Box<dyn SnapshotBackend>,
        clock: Arc<dyn Clock>,
        settings: StoreSettings,
    ) -> (Self, Option<StoreError>) {
        let tag = backend.backend_tag();
        let (buckets, load_error) = match load_buckets(backend.as_ref(), &settings) {
            Ok(buckets) => {
                info!(
                    "event=store_open module=store status=ok backend={} months={}",
                    tag,
                    buckets.len()
                );
                (buckets, None)
            }
            Err(err) => {
                error!(
                    "event=store_open module=store status=error backend={} error_code=snapshot_unreadable error={}",
                    tag, err
                );
                (Buckets::new(), Some(err))
            }
        };

        (Self::from_parts(backend, clock, settings, buckets), load_error)
    }

    /// Opens the store, failing when the persisted snapshot is unusable.
    pub fn try_open(
        backend: Box<dyn SnapshotBackend>,
        clock: Arc<dyn Clock>,
        settings: StoreSettings,
    ) -> StoreResult<Self> {
        let buckets = load_buckets(backend.as_ref(), &settings)?;
        info!(
            "event=store_open module=store status=ok backend={} months={}",
            backend.backend_tag(),
            buckets.len()
        );
        Ok(Self::from_parts(backend, clock, settings, buckets))
    }

    fn from_parts(
        backend: Box<dyn SnapshotBackend>,
        clock: Arc<dyn Clock>,
        settings: StoreSettings,
        buckets: Buckets,
    ) -> Self {
        Self {
            backend,
            clock,
            settings,
            buckets: RwLock::new(buckets),
            write_gate: Mutex::new(()),
            import_gate: Mutex::new(()),
            importing: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Replaces the bucket of `month_key` wholesale, then sweeps.
    ///
    /// # Errors
    /// - `InvalidBucket` when an item lies outside `month_key` or two items
    ///   share a date. Nothing changes.
    /// - `UnavailableStore` when the snapshot cannot be persisted. Nothing
    ///   changes.
    pub fn replace_month(&self, month_key: MonthKey, items: Vec<MenuItem>) -> StoreResult<()> {
        self.replace_months(vec![(month_key, items)])
    }

    /// Applies several month replacements as one atomic write.
    ///
    /// Groups are applied in order with a retention sweep after each, the
    /// result is persisted once and swapped in as a unit.
    pub fn replace_months(&self, groups: Vec<(MonthKey, Vec<MenuItem>)>) -> StoreResult<()> {
        self.replace_months_then(groups, || Ok(()))
    }

    /// `replace_months` with a second durable write chained in.
    ///
    /// `commit` runs after the snapshot is saved and before the new state is
    /// swapped in, still under the write gate. When it fails the previous
    /// snapshot is written back and the in-memory state is left untouched.
    pub(crate) fn replace_months_then<F>(
        &self,
        groups: Vec<(MonthKey, Vec<MenuItem>)>,
        commit: F,
    ) -> StoreResult<()>
    where
        F: FnOnce() -> StoreResult<()>,
    {
        for (month_key, items) in &groups {
            if let Err(violation) = check_bucket_items(*month_key, items) {
                warn!(
                    "event=replace_month module=store status=error month={} error_code=invalid_bucket error={}",
                    month_key, violation
                );
                return Err(StoreError::InvalidBucket {
                    month_key: *month_key,
                    violation,
                });
            }
        }

        let _gate = self.write_gate.lock().unwrap_or_else(PoisonError::into_inner);
        let now = self.clock.now();
        let current_month = MonthKey::of_date(self.clock.today());
        let mut staged = self.read_buckets().clone();
        let mut evicted = Vec::new();

        for (month_key, items) in groups {
            let count = items.len();
            if items.is_empty() {
                staged.remove(&month_key);
            } else {
                staged.insert(month_key, MonthBucket::new(month_key, items, now));
            }
            info!(
                "event=replace_month module=store status=staged month={} items={}",
                month_key, count
            );

            if let Some(current_month) = current_month {
                let swept = sweep(
                    staged,
                    current_month,
                    self.settings.max_months(),
                    self.settings.eviction(),
                );
                staged = swept.retained;
                evicted.extend(swept.evicted);
            }
        }

        let payload = snapshot::encode(&staged)?;
        if let Err(err) = self.backend.save(self.settings.storage_key(), &payload) {
            error!(
                "event=replace_month module=store status=error backend={} error_code=snapshot_save_failed error={}",
                self.backend.backend_tag(),
                err
            );
            return Err(err.into());
        }

        if let Err(err) = commit() {
            error!(
                "event=replace_month module=store status=error backend={} error_code=commit_failed error={}",
                self.backend.backend_tag(),
                err
            );
            self.restore_snapshot();
            return Err(err);
        }

        let retained = staged.len();
        *self.buckets.write().unwrap_or_else(PoisonError::into_inner) = staged;
        for month_key in &evicted {
            info!(
                "event=retention_sweep module=store status=ok evicted_month={}",
                month_key
            );
        }
        info!(
            "event=replace_month module=store status=ok months={} evicted={}",
            retained,
            evicted.len()
        );
        Ok(())
    }

    /// Returns the bucket of `month_key`, if stored.
    pub fn get_month(&self, month_key: MonthKey) -> Option<Arc<MonthBucket>> {
        self.read_buckets().get(&month_key).cloned()
    }

    /// Returns the item stored for `date`, if any.
    pub fn get_day(&self, date: NaiveDate) -> Option<MenuItem> {
        let month_key = MonthKey::of_date(date)?;
        self.get_month(month_key)?.day(date).cloned()
    }

    /// Stored month keys, ascending.
    pub fn month_keys(&self) -> Vec<MonthKey> {
        self.read_buckets().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.read_buckets().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_buckets().is_empty()
    }

    /// Whether an import is running against this store.
    pub fn is_importing(&self) -> bool {
        self.importing.load(Ordering::Acquire)
    }

    /// Serializes imports; blocks while another import holds the gate.
    pub(crate) fn begin_import(&self) -> ImportGuard<'_> {
        let gate = self.import_gate.lock().unwrap_or_else(PoisonError::into_inner);
        self.importing.store(true, Ordering::Release);
        ImportGuard {
            importing: &self.importing,
            _gate: gate,
        }
    }

    /// Writes the in-memory state back over a snapshot that was saved ahead
    /// of a failed commit.
    fn restore_snapshot(&self) {
        let restored = snapshot::encode(&self.read_buckets())
            .and_then(|payload| self.backend.save(self.settings.storage_key(), &payload));
        match restored {
            Ok(()) => warn!(
                "event=snapshot_restore module=store status=ok backend={}",
                self.backend.backend_tag()
            ),
            Err(err) => error!(
                "event=snapshot_restore module=store status=error backend={} error_code=snapshot_restore_failed error={}",
                self.backend.backend_tag(),
                err
            ),
        }
    }

    fn read_buckets(&self) -> std::sync::RwLockReadGuard<'_, Buckets> {
        self.buckets.read().unwrap_or_else(PoisonError::into_inner)
    }
}

fn load_buckets(backend: &dyn SnapshotBackend, settings: &StoreSettings) -> StoreResult<Buckets> {
    match backend.load(settings.storage_key())? {
        Some(payload) => Ok(snapshot::decode(&payload)?),
        None => Ok(Buckets::new()),
    }
}
