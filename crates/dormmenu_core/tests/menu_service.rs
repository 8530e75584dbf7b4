use chrono::NaiveDate;
use dormmenu_core::db::open_db_in_memory;
use dormmenu_core::{
    parse_draft_batch, BackendError, BackendResult, DayRow, DayRowRepository, FixedClock,
    ImportResult, MemoryBackend, MenuDraft, MenuItem, MenuService, MenuStore, MonthKey,
    RepoError, RepoResult, SnapshotBackend, SqliteDayRowRepository, StoreError, StoreSettings,
};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn store_at(today: NaiveDate) -> MenuStore {
    let clock = Arc::new(FixedClock::at_date(today));
    MenuStore::try_open(Box::new(MemoryBackend::new()), clock, StoreSettings::default()).unwrap()
}

fn draft(date: &str) -> MenuDraft {
    MenuDraft::new(date, "ごはん　味噌汁\nさば", "カレー サラダ")
}

fn dates_of(items: &[MenuItem]) -> Vec<NaiveDate> {
    items.iter().map(|item| item.date).collect()
}

/// Memory backend shared with the test; writes can be switched off.
#[derive(Clone, Default)]
struct SharedBackend {
    inner: Arc<MemoryBackend>,
    fail_writes: Arc<AtomicBool>,
}

impl SnapshotBackend for SharedBackend {
    fn backend_tag(&self) -> &'static str {
        "shared"
    }

    fn load(&self, key: &str) -> BackendResult<Option<String>> {
        self.inner.load(key)
    }

    fn save(&self, key: &str, payload: &str) -> BackendResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BackendError::Io(io::Error::new(
                io::ErrorKind::Other,
                "storage offline",
            )));
        }
        self.inner.save(key, payload)
    }
}

fn shared_store(backend: &SharedBackend, today: NaiveDate) -> MenuStore {
    let clock = Arc::new(FixedClock::at_date(today));
    MenuStore::try_open(Box::new(backend.clone()), clock, StoreSettings::default()).unwrap()
}

/// Authority that answers reads but refuses batch writes.
struct ReadOnlyAuthority<'conn> {
    inner: SqliteDayRowRepository<'conn>,
}

impl DayRowRepository for ReadOnlyAuthority<'_> {
    fn find_by_date(&self, date: NaiveDate) -> RepoResult<Option<DayRow>> {
        self.inner.find_by_date(date)
    }

    fn insert(&self, row: &DayRow) -> RepoResult<()> {
        self.inner.insert(row)
    }

    fn list_month(&self, month: MonthKey) -> RepoResult<Vec<DayRow>> {
        self.inner.list_month(month)
    }

    fn insert_batch(&self, _rows: &[DayRow]) -> RepoResult<()> {
        Err(RepoError::InvalidData("authority is read-only".to_string()))
    }
}

#[test]
fn fetch_current_menu_is_absent_on_empty_store() {
    let store = store_at(day(2025, 4, 7));
    let service = MenuService::new(&store);

    assert_eq!(service.fetch_current_menu(), None);
    assert!(service.fetch_monthly_menu(2025, 4).is_empty());
}

#[test]
fn fetch_current_menu_returns_todays_item() {
    let store = store_at(day(2025, 4, 7));
    let service = MenuService::new(&store);
    service
        .import_from_drafts(&[draft("2025-04-06"), draft("2025-04-07")])
        .unwrap();

    let today = service.fetch_current_menu().unwrap();
    assert_eq!(today.date, day(2025, 4, 7));
    assert_eq!(today.breakfast, vec!["ごはん", "味噌汁", "さば"]);
    assert_eq!(today.dinner, vec!["カレー", "サラダ"]);
}

#[test]
fn monthly_menu_round_trips_imported_records() {
    let store = store_at(day(2025, 4, 1));
    let service = MenuService::new(&store);
    service
        .import_from_drafts(&[
            draft("2025-04-03"),
            draft("2025-04-01"),
            draft("2025-05-01"),
        ])
        .unwrap();

    let april = service.fetch_monthly_menu(2025, 4);
    let dates = april.iter().map(|item| item.date).collect::<Vec<_>>();
    assert_eq!(dates, vec![day(2025, 4, 1), day(2025, 4, 3)]);
    assert!(april.iter().all(|item| !item.no_menu));
    assert_eq!(service.fetch_monthly_menu(2025, 5).len(), 1);
    assert!(service.fetch_monthly_menu(2025, 13).is_empty());
}

#[test]
fn malformed_date_is_counted_as_failed() {
    let store = store_at(day(2025, 4, 1));
    let service = MenuService::new(&store);
    let drafts = vec![
        draft("2025-04-01"),
        draft("2025-04-02"),
        draft("not-a-date"),
        draft("2025-04-03"),
        draft("2025-04-04"),
    ];

    let result = service.import_from_drafts(&drafts).unwrap();

    assert_eq!(
        result,
        ImportResult {
            success: 4,
            skipped: 0,
            failed: 1
        }
    );
    assert_eq!(service.fetch_monthly_menu(2025, 4).len(), 4);
}

#[test]
fn counts_always_partition_the_batch() {
    let conn = open_db_in_memory().unwrap();
    let authority = SqliteDayRowRepository::try_new(&conn).unwrap();
    authority
        .insert(&DayRow {
            date: day(2025, 4, 2),
            breakfast: "既存".to_string(),
            dinner: String::new(),
        })
        .unwrap();
    let store = store_at(day(2025, 4, 1));
    let service = MenuService::new(&store).with_authority(&authority);

    let batches: Vec<Vec<MenuDraft>> = vec![
        vec![],
        vec![draft("bad")],
        vec![draft("2025-04-01"), draft("2025-04-01")],
        vec![draft("2025-04-02"), draft("2025-02-30"), draft("2025-04-05")],
        vec![draft("2025-04-06"), draft(""), draft("2025-04-02"), draft("2025-05-01")],
    ];

    for batch in batches {
        let result = service.import_from_drafts(&batch).unwrap();
        assert_eq!(result.total(), batch.len(), "batch {batch:?} -> {result:?}");
    }
}

#[test]
fn dates_present_in_authority_are_skipped_and_new_ones_written_through() {
    let conn = open_db_in_memory().unwrap();
    let authority = SqliteDayRowRepository::try_new(&conn).unwrap();
    authority
        .insert(&DayRow {
            date: day(2025, 4, 1),
            breakfast: "既存".to_string(),
            dinner: String::new(),
        })
        .unwrap();
    let store = store_at(day(2025, 4, 1));
    let service = MenuService::new(&store).with_authority(&authority);

    let result = service
        .import_from_drafts(&[draft("2025-04-01"), draft("2025-04-02")])
        .unwrap();

    assert_eq!(
        result,
        ImportResult {
            success: 1,
            skipped: 1,
            failed: 0
        }
    );
    let written = authority.find_by_date(day(2025, 4, 2)).unwrap().unwrap();
    assert_eq!(written.breakfast, "ごはん 味噌汁 さば");
    assert_eq!(
        authority.find_by_date(day(2025, 4, 1)).unwrap().unwrap().breakfast,
        "既存"
    );
    let april = service.fetch_monthly_menu(2025, 4);
    assert_eq!(dates_of(&april), vec![day(2025, 4, 1), day(2025, 4, 2)]);
    assert_eq!(april[0].breakfast, vec!["既存"]);
    assert_eq!(april[1].breakfast, vec!["ごはん", "味噌汁", "さば"]);
}

#[test]
fn reimporting_a_month_keeps_days_already_in_authority() {
    let conn = open_db_in_memory().unwrap();
    let authority = SqliteDayRowRepository::try_new(&conn).unwrap();
    let store = store_at(day(2025, 4, 1));
    let service = MenuService::new(&store).with_authority(&authority);
    service.import_from_drafts(&[draft("2025-04-01")]).unwrap();

    let result = service
        .import_from_drafts(&[draft("2025-04-01"), draft("2025-04-02")])
        .unwrap();

    assert_eq!((result.success, result.skipped, result.failed), (1, 1, 0));
    assert_eq!(
        dates_of(&service.fetch_monthly_menu(2025, 4)),
        vec![day(2025, 4, 1), day(2025, 4, 2)]
    );
    assert_eq!(service.fetch_current_menu().unwrap().date, day(2025, 4, 1));
    assert_eq!(authority.list_month(MonthKey::new(2025, 4).unwrap()).unwrap().len(), 2);
}

#[test]
fn snapshot_failure_keeps_authority_clean_and_retry_succeeds() {
    let conn = open_db_in_memory().unwrap();
    let authority = SqliteDayRowRepository::try_new(&conn).unwrap();
    let backend = SharedBackend::default();
    let store = shared_store(&backend, day(2025, 4, 1));
    let service = MenuService::new(&store).with_authority(&authority);

    backend.fail_writes.store(true, Ordering::SeqCst);
    let err = service
        .import_from_drafts(&[draft("2025-04-01")])
        .unwrap_err();

    assert!(matches!(err, StoreError::UnavailableStore(BackendError::Io(_))));
    assert!(authority.find_by_date(day(2025, 4, 1)).unwrap().is_none());
    assert!(store.is_empty());
    assert!(!service.is_importing());

    backend.fail_writes.store(false, Ordering::SeqCst);
    let result = service.import_from_drafts(&[draft("2025-04-01")]).unwrap();

    assert_eq!((result.success, result.skipped, result.failed), (1, 0, 0));
    assert!(authority.find_by_date(day(2025, 4, 1)).unwrap().is_some());
    assert_eq!(service.fetch_monthly_menu(2025, 4).len(), 1);
}

#[test]
fn authority_failure_restores_previous_snapshot() {
    let backend = SharedBackend::default();
    let store = shared_store(&backend, day(2025, 4, 1));
    MenuService::new(&store)
        .import_from_drafts(&[draft("2025-04-01")])
        .unwrap();

    let conn = open_db_in_memory().unwrap();
    let authority = ReadOnlyAuthority {
        inner: SqliteDayRowRepository::try_new(&conn).unwrap(),
    };
    let service = MenuService::new(&store).with_authority(&authority);
    let err = service
        .import_from_drafts(&[draft("2025-04-02")])
        .unwrap_err();

    assert!(matches!(
        err,
        StoreError::UnavailableStore(BackendError::Authority(RepoError::InvalidData(_)))
    ));
    assert_eq!(dates_of(&service.fetch_monthly_menu(2025, 4)), vec![day(2025, 4, 1)]);

    let reopened = shared_store(&backend, day(2025, 4, 1));
    assert!(reopened.get_day(day(2025, 4, 1)).is_some());
    assert!(reopened.get_day(day(2025, 4, 2)).is_none());
}

#[test]
fn repeated_date_within_batch_keeps_the_first_record() {
    let store = store_at(day(2025, 4, 1));
    let service = MenuService::new(&store);

    let result = service
        .import_from_drafts(&[
            MenuDraft::new("2025-04-01", "最初", ""),
            MenuDraft::new("2025-04-01", "二番目", ""),
        ])
        .unwrap();

    assert_eq!((result.success, result.skipped), (1, 1));
    assert_eq!(
        service.fetch_monthly_menu(2025, 4)[0].breakfast,
        vec!["最初"]
    );
}

#[test]
fn batch_with_only_failures_leaves_store_untouched() {
    let store = store_at(day(2025, 4, 1));
    let service = MenuService::new(&store);
    service.import_from_drafts(&[draft("2025-04-01")]).unwrap();

    let result = service
        .import_from_drafts(&[draft("nope"), draft("2025-13-01")])
        .unwrap();

    assert_eq!(result.failed, 2);
    assert_eq!(service.fetch_monthly_menu(2025, 4).len(), 1);
}

#[test]
fn importing_four_months_keeps_latest_three() {
    let store = store_at(day(2025, 4, 20));
    let service = MenuService::new(&store);

    for month in ["2025-01", "2025-02", "2025-03", "2025-04"] {
        let result = service
            .import_from_drafts(&[draft(&format!("{month}-10"))])
            .unwrap();
        assert_eq!(result.success, 1);
    }

    let months = store
        .month_keys()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    assert_eq!(months, ["2025-02", "2025-03", "2025-04"]);
    assert!(service.fetch_monthly_menu(2025, 1).is_empty());
}

#[test]
fn calendar_month_synthesizes_no_menu_days() {
    let store = store_at(day(2025, 4, 2));
    let service = MenuService::new(&store);
    service.import_from_drafts(&[draft("2025-04-02")]).unwrap();

    let calendar = service.fetch_calendar_month(2025, 4);

    assert_eq!(calendar.len(), 30);
    assert!(calendar[0].item.no_menu);
    assert!(calendar[0].item.breakfast.is_empty());
    assert!(!calendar[1].item.no_menu);
    assert!(calendar[1].is_today);
    assert!(service.fetch_calendar_month(2025, 0).is_empty());
}

#[test]
fn import_flag_is_cleared_after_import() {
    let store = store_at(day(2025, 4, 1));
    let service = MenuService::new(&store);
    assert!(!service.is_importing());

    service.import_from_drafts(&[draft("2025-04-01")]).unwrap();
    assert!(!service.is_importing());
}

#[test]
fn parsed_json_batch_imports_end_to_end() {
    let json = r#"[
        {"date": "2025-04-01", "breakfast": "パン\nスープ", "dinner": "ハンバーグ"},
        {"date": "2025-04-02", "breakfast": "ごはん"},
        {"date": "04/03", "breakfast": "", "dinner": ""}
    ]"#;
    let drafts = parse_draft_batch(json).unwrap();
    assert_eq!(drafts[1].dinner, "");

    let store = store_at(day(2025, 4, 1));
    let service = MenuService::new(&store);
    let result = service.import_from_drafts(&drafts).unwrap();

    assert_eq!((result.success, result.skipped, result.failed), (2, 0, 1));
    let bucket = store.get_month(MonthKey::new(2025, 4).unwrap()).unwrap();
    assert_eq!(bucket.items()[0].breakfast, vec!["パン", "スープ"]);
    assert!(bucket.items()[1].dinner.is_empty());
}
