//! The output buffer: an in-memory FIFO of ready-to-serve hex blocks,
//! mirrored into a SQLite table so a restart doesn't discard unconsumed
//! entropy.
//!
//! The persistent mirror is best-effort. A store failure is logged and the
//! in-memory queue stays authoritative; this type never returns an error to
//! its caller.

use std::collections::VecDeque;
use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection};

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS random_buffer (hex_value TEXT PRIMARY KEY)";

struct Inner {
    deque: VecDeque<String>,
    conn: Option<Connection>,
}

/// FIFO of output blocks, backed by a best-effort SQLite mirror.
pub struct OutputBuffer {
    inner: Mutex<Inner>,
}

impl OutputBuffer {
    /// Opens (or creates) the store at `db_path` and loads whatever rows it
    /// already holds. Every failure along the way is logged and degrades to
    /// an empty/unmirrored buffer rather than propagating, since a pipeline
    /// should start with zero entropy before it refuses to start at all.
    pub fn open(db_path: &Path) -> Self {
        let conn = match Connection::open(db_path) {
            Ok(conn) => Some(conn),
            Err(e) => {
                log::error!("failed to open buffer store {db_path:?}: {e}");
                None
            }
        };

        if let Some(conn) = &conn {
            if let Err(e) = conn.execute(CREATE_TABLE_SQL, []) {
                log::error!("failed to initialise buffer store schema: {e}");
            }
        }

        let mut deque = VecDeque::new();
        if let Some(conn) = &conn {
            match conn.prepare("SELECT hex_value FROM random_buffer") {
                Ok(mut stmt) => match stmt.query_map([], |row| row.get::<_, String>(0)) {
                    Ok(rows) => {
                        for row in rows {
                            match row {
                                Ok(value) => deque.push_back(value),
                                Err(e) => log::error!("skipping unreadable buffer row: {e}"),
                            }
                        }
                    }
                    Err(e) => log::error!("failed to load buffer store rows: {e}"),
                },
                Err(e) => log::error!("failed to prepare buffer load query: {e}"),
            }
        }

        log::info!("buffer store loaded with {} pending value(s)", deque.len());
        Self {
            inner: Mutex::new(Inner { deque, conn }),
        }
    }

    /// Appends `hex_value` to the buffer and to the persistent mirror.
    pub fn push(&self, hex_value: String) {
        let mut inner = self.inner.lock();
        if let Some(conn) = &inner.conn {
            if let Err(e) = conn.execute(
                "INSERT OR IGNORE INTO random_buffer (hex_value) VALUES (?1)",
                params![hex_value],
            ) {
                log::error!("failed to persist buffer value: {e}");
            }
        }
        inner.deque.push_back(hex_value);
    }

    /// Pops the oldest value, removing it from the persistent mirror too.
    pub fn pop(&self) -> Option<String> {
        let mut inner = self.inner.lock();
        let value = inner.deque.pop_front()?;
        if let Some(conn) = &inner.conn {
            if let Err(e) = conn.execute("DELETE FROM random_buffer WHERE hex_value = ?1", params![value]) {
                log::error!("failed to delete consumed buffer value: {e}");
            }
        }
        Some(value)
    }

    pub fn size(&self) -> usize {
        self.inner.lock().deque.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_round_trips_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("buffer.db");

        let buffer = OutputBuffer::open(&db_path);
        assert_eq!(buffer.size(), 0);
        buffer.push("abc123".to_string());
        buffer.push("def456".to_string());
        assert_eq!(buffer.size(), 2);
        assert_eq!(buffer.pop().as_deref(), Some("abc123"));
        assert_eq!(buffer.size(), 1);
        drop(buffer);

        let reopened = OutputBuffer::open(&db_path);
        assert_eq!(reopened.size(), 1);
    }

    #[test]
    fn pop_on_empty_buffer_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let buffer = OutputBuffer::open(&dir.path().join("empty.db"));
        assert!(buffer.pop().is_none());
    }

    #[test]
    fn unopenable_store_degrades_to_in_memory_only() {
        // A directory can never be opened as a sqlite file; this should log
        // and fall back rather than panicking or erroring out.
        let dir = tempfile::tempdir().unwrap();
        let buffer = OutputBuffer::open(dir.path());
        buffer.push("still-works".to_string());
        assert_eq!(buffer.size(), 1);
    }
}
