//! SQLite snapshot backend over the `menu_snapshots` table.

use crate::store::backend::{BackendResult, SnapshotBackend};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Mutex, PoisonError};

/// Stores snapshots in a migrated SQLite connection it owns.
pub struct SqliteSnapshotBackend {
    conn: Mutex<Connection>,
}

impl SqliteSnapshotBackend {
    /// Takes ownership of a connection returned by `db::open_db*`.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

impl SnapshotBackend for SqliteSnapshotBackend {
    fn backend_tag(&self) -> &'static str {
        "sqlite"
    }

    fn load(&self, key: &str) -> BackendResult<Option<String>> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let payload = conn
            .query_row(
                "SELECT payload FROM menu_snapshots WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(payload)
    }

    fn save(&self, key: &str, payload: &str) -> BackendResult<()> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        conn.execute(
            "INSERT INTO menu_snapshots (key, payload)
             VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                payload = excluded.payload,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![key, payload],
        )?;
        Ok(())
    }
}
