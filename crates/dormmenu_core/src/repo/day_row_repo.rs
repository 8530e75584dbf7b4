//! Day-row repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Store one row per served day with `date`, `breakfast`, `dinner` columns.
//! - Provide point lookup by date and month listing.
//!
//! # Invariants
//! - Dish lists are stored joined by a single ASCII space.
//! - `insert_batch` on SQLite is all-or-nothing.

use crate::db::DbError;
use crate::model::menu::MenuItem;
use crate::model::month_key::MonthKey;
use crate::model::normalize::{parse_menu_date, split_dishes};
use chrono::NaiveDate;
use rusqlite::{params, Connection, ErrorCode, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const DAY_ROW_SELECT_SQL: &str = "SELECT date, breakfast, dinner FROM menu";
const DATE_FORMAT: &str = "%Y-%m-%d";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for day-row persistence and queries.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// A row for this date already exists.
    Duplicate(NaiveDate),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Duplicate(date) => write!(f, "menu row already exists for {date}"),
            Self::InvalidData(message) => write!(f, "invalid persisted menu row: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Duplicate(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// One persisted day in the authoritative table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayRow {
    pub date: NaiveDate,
    pub breakfast: String,
    pub dinner: String,
}

impl DayRow {
    /// Re-tokenizes stored text into a canonical item.
    pub fn to_menu_item(&self) -> MenuItem {
        MenuItem::new(
            self.date,
            split_dishes(&self.breakfast),
            split_dishes(&self.dinner),
        )
    }
}

impl From<&MenuItem> for DayRow {
    fn from(item: &MenuItem) -> Self {
        Self {
            date: item.date,
            breakfast: item.breakfast.join(" "),
            dinner: item.dinner.join(" "),
        }
    }
}

/// CRUD contract of the authoritative day-row store.
pub trait DayRowRepository {
    fn find_by_date(&self, date: NaiveDate) -> RepoResult<Option<DayRow>>;
    fn insert(&self, row: &DayRow) -> RepoResult<()>;
    /// Rows of one month ordered by date.
    fn list_month(&self, month: MonthKey) -> RepoResult<Vec<DayRow>>;

    /// Inserts rows one by one. Implementations backed by a transactional
    /// store should override this to make the batch atomic.
    fn insert_batch(&self, rows: &[DayRow]) -> RepoResult<()> {
        for row in rows {
            self.insert(row)?;
        }
        Ok(())
    }
}

/// SQLite-backed day-row repository over the `menu` table.
pub struct SqliteDayRowRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDayRowRepository<'conn> {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - `InvalidData` when the `menu` table is missing (unmigrated handle).
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_menu_table(conn)?;
        Ok(Self { conn })
    }
}

impl DayRowRepository for SqliteDayRowRepository<'_> {
    fn find_by_date(&self, date: NaiveDate) -> RepoResult<Option<DayRow>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{DAY_ROW_SELECT_SQL} WHERE date = ?1;"))?;
        let mut rows = stmt.query([date_to_db(date)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_day_row(row)?));
        }

        Ok(None)
    }

    fn insert(&self, row: &DayRow) -> RepoResult<()> {
        insert_row(self.conn, row)
    }

    fn list_month(&self, month: MonthKey) -> RepoResult<Vec<DayRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "{DAY_ROW_SELECT_SQL}
             WHERE substr(date, 1, 7) = ?1
             ORDER BY date ASC;"
        ))?;
        let mut rows = stmt.query([month.to_string()])?;
        let mut day_rows = Vec::new();

        while let Some(row) = rows.next()? {
            day_rows.push(parse_day_row(row)?);
        }

        Ok(day_rows)
    }

    fn insert_batch(&self, rows: &[DayRow]) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        for row in rows {
            insert_row(&tx, row)?;
        }
        tx.commit()?;
        Ok(())
    }
}

fn insert_row(conn: &Connection, row: &DayRow) -> RepoResult<()> {
    let result = conn.execute(
        "INSERT INTO menu (date, breakfast, dinner) VALUES (?1, ?2, ?3);",
        params![
            date_to_db(row.date),
            row.breakfast.as_str(),
            row.dinner.as_str()
        ],
    );

    match result {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == ErrorCode::ConstraintViolation =>
        {
            Err(RepoError::Duplicate(row.date))
        }
        Err(err) => Err(err.into()),
    }
}

fn parse_day_row(row: &Row<'_>) -> RepoResult<DayRow> {
    let date_text: String = row.get("date")?;
    let date = parse_menu_date(&date_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid date `{date_text}` in menu.date"))
    })?;

    Ok(DayRow {
        date,
        breakfast: row.get("breakfast")?,
        dinner: row.get("dinner")?,
    })
}

fn date_to_db(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn ensure_menu_table(conn: &Connection) -> RepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = 'menu'
        );",
        [],
        |row| row.get(0),
    )?;

    if exists == 1 {
        Ok(())
    } else {
        Err(RepoError::InvalidData(
            "menu table is missing; open the connection through db::open_db".to_string(),
        ))
    }
}
