//! SQLite persistence backend.
//!
//! One connection, WAL journal mode, snake_case schema. Snapshot branching
//! and live-row clearing run under immediate (serializable) transactions;
//! flush batches commit as a single deferred transaction. Metadata inserts
//! use INSERT OR IGNORE, so duplicate records arriving across flushes are
//! absorbed instead of failing the batch.

use chrono::Utc;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Transaction, TransactionBehavior};
use serde_json::{json, Map, Value};
use std::path::Path;

use super::backend::{FlushBatch, FlushStats, Isolation, StorageBackend, StorageError};
use crate::engine_core::types::{CounterInfo, SnapshotRecord, ThreadInfo, SNAPSHOT_LIVE};

/// Application identity written into new stores and verified on open.
pub const APPLICATION: &str = "profstore";
/// Fixed on-disk format version; bumped on breaking schema changes.
pub const FILE_VERSION: i64 = 3;

pub const PROP_APPLICATION: &str = "application";
pub const PROP_FILE_VERSION: &str = "file_version";
pub const PROP_FILE_NAME: &str = "file_name";
pub const PROP_ENGINE_VERSION: &str = "engine_version";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS properties (
    name TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    timestamp INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS functions (
    id INTEGER PRIMARY KEY,
    class_id INTEGER NOT NULL,
    is_native INTEGER NOT NULL,
    name TEXT NOT NULL,
    signature TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS classes (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS threads (
    id INTEGER PRIMARY KEY,
    is_alive INTEGER NOT NULL,
    name TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS counters (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS counter_values (
    counter_id INTEGER NOT NULL,
    time REAL NOT NULL,
    value REAL NOT NULL
);
CREATE TABLE IF NOT EXISTS samples (
    snapshot_id INTEGER NOT NULL,
    thread_id INTEGER NOT NULL,
    function_id INTEGER NOT NULL,
    time REAL NOT NULL,
    PRIMARY KEY (snapshot_id, thread_id, function_id)
);
CREATE TABLE IF NOT EXISTS calls (
    snapshot_id INTEGER NOT NULL,
    thread_id INTEGER NOT NULL,
    parent_id INTEGER NOT NULL,
    child_id INTEGER NOT NULL,
    time REAL NOT NULL,
    PRIMARY KEY (snapshot_id, thread_id, parent_id, child_id)
);
CREATE TABLE IF NOT EXISTS allocations (
    snapshot_id INTEGER NOT NULL,
    class_id INTEGER NOT NULL,
    function_id INTEGER NOT NULL,
    alloc_count INTEGER NOT NULL,
    total_size INTEGER NOT NULL,
    PRIMARY KEY (snapshot_id, class_id, function_id)
);
CREATE TABLE IF NOT EXISTS gc_events (
    generation INTEGER NOT NULL,
    function_id INTEGER NOT NULL,
    time REAL NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_counter_values ON counter_values (counter_id, time);
";

/// Apply the connection pragmas (WAL, NORMAL, MEMORY temp store, mmap,
/// cache, autocheckpoint). Some pragmas echo a row back, so each one is
/// stepped individually and empty results are tolerated.
fn apply_pragmas(conn: &Connection) -> Result<(), rusqlite::Error> {
    const PRAGMAS: [&str; 6] = [
        "PRAGMA journal_mode = WAL",
        "PRAGMA synchronous = NORMAL",
        "PRAGMA temp_store = MEMORY",
        "PRAGMA mmap_size = 268435456",
        "PRAGMA cache_size = -65536",
        "PRAGMA wal_autocheckpoint = 1000",
    ];
    for pragma in PRAGMAS {
        match conn.query_row(pragma, [], |_| Ok(())) {
            Ok(()) | Err(rusqlite::Error::QueryReturnedNoRows) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Create (or reattach to) a store at `db_path`, writing the identity
    /// properties and the reserved "Current" snapshot row before any data
    /// is accepted.
    pub fn create(db_path: impl AsRef<Path>) -> Result<Self, StorageError> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&db_path)?;
        apply_pragmas(&conn)?;
        conn.execute_batch(SCHEMA)?;

        let file_name = db_path
            .as_ref()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut backend = Self { conn };
        // Reattaching to a store that already carries an identity is only
        // allowed when that identity matches; a foreign or out-of-version
        // store must never be overwritten.
        if backend.get_property(PROP_APPLICATION)?.is_some() {
            backend.check_identity()?;
        }
        backend.write_property(PROP_APPLICATION, APPLICATION)?;
        backend.write_property(PROP_FILE_VERSION, &FILE_VERSION.to_string())?;
        backend.write_property(PROP_FILE_NAME, &file_name)?;
        backend.write_property(PROP_ENGINE_VERSION, env!("CARGO_PKG_VERSION"))?;
        backend.conn.execute(
            "INSERT OR IGNORE INTO snapshots (id, name, timestamp) VALUES (?1, 'Current', ?2)",
            params![SNAPSHOT_LIVE, Utc::now().timestamp()],
        )?;

        log::info!("✅ SQLite store initialized with WAL mode: {}", file_name);
        Ok(backend)
    }

    /// Open an existing store, verifying its identity properties before any
    /// mutation. A missing or mismatched `application` or `file_version`
    /// property is a hard data-format error.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open_with_flags(&db_path, OpenFlags::SQLITE_OPEN_READ_WRITE)?;
        apply_pragmas(&conn)?;

        let mut backend = Self { conn };
        backend.check_identity()?;

        log::info!("📂 SQLite store opened: {}", db_path.as_ref().display());
        Ok(backend)
    }

    /// Verify the store's `application` and `file_version` properties match
    /// this engine. A missing or mismatched property is a hard data-format
    /// error.
    fn check_identity(&mut self) -> Result<(), StorageError> {
        match self.get_property(PROP_APPLICATION)? {
            Some(ref app) if app == APPLICATION => {}
            other => {
                return Err(StorageError::FormatMismatch(format!(
                    "application property is {:?}, expected {:?}",
                    other, APPLICATION
                )))
            }
        }
        match self.get_property(PROP_FILE_VERSION)? {
            Some(ref version) if *version == FILE_VERSION.to_string() => {}
            other => {
                return Err(StorageError::FormatMismatch(format!(
                    "file_version property is {:?}, expected \"{}\"",
                    other, FILE_VERSION
                )))
            }
        }
        Ok(())
    }

    fn begin(&mut self, isolation: Isolation) -> Result<Transaction<'_>, StorageError> {
        let behavior = match isolation {
            Isolation::Default => TransactionBehavior::Deferred,
            Isolation::Serializable => TransactionBehavior::Immediate,
        };
        Ok(self.conn.transaction_with_behavior(behavior)?)
    }
}

impl StorageBackend for SqliteBackend {
    fn commit_batch(&mut self, batch: &FlushBatch<'_>) -> Result<FlushStats, StorageError> {
        let tx = self.begin(Isolation::Default)?;
        let mut stats = FlushStats::default();

        for function in batch.functions {
            stats.functions_inserted += tx.execute(
                "INSERT OR IGNORE INTO functions (id, class_id, is_native, name, signature)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    function.id,
                    function.class_id,
                    function.is_native,
                    function.name,
                    function.signature,
                ],
            )?;
        }
        for class in batch.classes {
            stats.classes_inserted += tx.execute(
                "INSERT OR IGNORE INTO classes (id, name) VALUES (?1, ?2)",
                params![class.id, class.name],
            )?;
        }
        stats.duplicates_ignored = (batch.functions.len() - stats.functions_inserted)
            + (batch.classes.len() - stats.classes_inserted);

        for row in batch.samples {
            tx.execute(
                "INSERT INTO samples (snapshot_id, thread_id, function_id, time)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (snapshot_id, thread_id, function_id)
                 DO UPDATE SET time = time + excluded.time",
                params![SNAPSHOT_LIVE, row.thread_id, row.function_id, row.time],
            )?;
        }
        for row in batch.calls {
            tx.execute(
                "INSERT INTO calls (snapshot_id, thread_id, parent_id, child_id, time)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (snapshot_id, thread_id, parent_id, child_id)
                 DO UPDATE SET time = time + excluded.time",
                params![SNAPSHOT_LIVE, row.thread_id, row.parent_id, row.child_id, row.time],
            )?;
        }
        for row in batch.allocations {
            tx.execute(
                "INSERT INTO allocations (snapshot_id, class_id, function_id, alloc_count, total_size)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (snapshot_id, class_id, function_id)
                 DO UPDATE SET alloc_count = alloc_count + excluded.alloc_count,
                               total_size = total_size + excluded.total_size",
                params![
                    SNAPSHOT_LIVE,
                    row.class_id,
                    row.function_id,
                    row.count as i64,
                    row.total_size as i64,
                ],
            )?;
        }

        tx.commit()?;
        Ok(stats)
    }

    fn upsert_thread(&mut self, thread: &ThreadInfo) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO threads (id, is_alive, name) VALUES (?1, ?2, ?3)
             ON CONFLICT (id) DO UPDATE SET is_alive = excluded.is_alive, name = excluded.name",
            params![thread.id, thread.is_alive, thread.name],
        )?;
        Ok(())
    }

    fn insert_counter(&mut self, counter: &CounterInfo) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO counters (id, name) VALUES (?1, ?2)",
            params![counter.id, counter.name],
        )?;
        Ok(())
    }

    fn insert_counter_value(
        &mut self,
        counter_id: i64,
        time: f64,
        value: f64,
    ) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO counter_values (counter_id, time, value) VALUES (?1, ?2, ?3)",
            params![counter_id, time, value],
        )?;
        Ok(())
    }

    fn insert_gc_event(
        &mut self,
        generation: i64,
        function_id: i64,
        time: f64,
    ) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO gc_events (generation, function_id, time) VALUES (?1, ?2, ?3)",
            params![generation, function_id, time],
        )?;
        Ok(())
    }

    fn create_snapshot(&mut self, name: &str) -> Result<SnapshotRecord, StorageError> {
        let timestamp = Utc::now().timestamp();
        let tx = self.begin(Isolation::Serializable)?;

        tx.execute(
            "INSERT INTO snapshots (name, timestamp) VALUES (?1, ?2)",
            params![name, timestamp],
        )?;
        let id = tx.last_insert_rowid();

        // Branch, not checkpoint: live rows are copied, never moved.
        tx.execute(
            "INSERT INTO samples (snapshot_id, thread_id, function_id, time)
             SELECT ?1, thread_id, function_id, time FROM samples WHERE snapshot_id = ?2",
            params![id, SNAPSHOT_LIVE],
        )?;
        tx.execute(
            "INSERT INTO calls (snapshot_id, thread_id, parent_id, child_id, time)
             SELECT ?1, thread_id, parent_id, child_id, time FROM calls WHERE snapshot_id = ?2",
            params![id, SNAPSHOT_LIVE],
        )?;
        tx.execute(
            "INSERT INTO allocations (snapshot_id, class_id, function_id, alloc_count, total_size)
             SELECT ?1, class_id, function_id, alloc_count, total_size
             FROM allocations WHERE snapshot_id = ?2",
            params![id, SNAPSHOT_LIVE],
        )?;

        tx.commit()?;
        log::debug!("📸 snapshot {:?} branched from live data (id={})", name, id);
        Ok(SnapshotRecord {
            id,
            name: name.to_string(),
            timestamp,
        })
    }

    fn clear_live(&mut self) -> Result<(), StorageError> {
        let tx = self.begin(Isolation::Serializable)?;
        tx.execute("DELETE FROM samples WHERE snapshot_id = ?1", params![SNAPSHOT_LIVE])?;
        tx.execute("DELETE FROM calls WHERE snapshot_id = ?1", params![SNAPSHOT_LIVE])?;
        tx.execute(
            "DELETE FROM allocations WHERE snapshot_id = ?1",
            params![SNAPSHOT_LIVE],
        )?;
        tx.commit()?;
        log::debug!("🧹 live rows cleared, named snapshots retained");
        Ok(())
    }

    fn list_snapshots(&mut self) -> Result<Vec<SnapshotRecord>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, timestamp FROM snapshots ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok(SnapshotRecord {
                id: row.get(0)?,
                name: row.get(1)?,
                timestamp: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn write_property(&mut self, name: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO properties (name, value) VALUES (?1, ?2)
             ON CONFLICT (name) DO UPDATE SET value = excluded.value",
            params![name, value],
        )?;
        Ok(())
    }

    fn get_property(&mut self, name: &str) -> Result<Option<String>, StorageError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM properties WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn query_rows(&mut self, sql: &str) -> Result<Vec<Value>, StorageError> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let mut rows = stmt.query([])?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut object = Map::new();
            for (i, column) in columns.iter().enumerate() {
                let value = match row.get_ref(i)? {
                    ValueRef::Null => Value::Null,
                    ValueRef::Integer(n) => json!(n),
                    ValueRef::Real(f) => json!(f),
                    ValueRef::Text(t) => json!(String::from_utf8_lossy(t)),
                    ValueRef::Blob(b) => json!(b),
                };
                object.insert(column.clone(), value);
            }
            out.push(Value::Object(object));
        }
        Ok(out)
    }

    fn query_scalar(&mut self, sql: &str) -> Result<Option<f64>, StorageError> {
        let value = self
            .conn
            .query_row(sql, [], |row| row.get::<_, Option<f64>>(0))
            .optional()?;
        Ok(value.flatten())
    }

    fn execute(&mut self, sql: &str) -> Result<usize, StorageError> {
        Ok(self.conn.execute(sql, [])?)
    }

    fn backend_name(&self) -> &'static str {
        "SQLite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_core::types::{AllocRow, CallRow, ClassInfo, FunctionInfo, SampleRow};
    use tempfile::tempdir;

    fn function(id: i64, name: &str) -> FunctionInfo {
        FunctionInfo {
            id,
            class_id: 1,
            is_native: false,
            name: name.to_string(),
            signature: "()".to_string(),
        }
    }

    #[test]
    fn create_writes_identity_and_current_snapshot() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("profile.db");
        let _backend = SqliteBackend::create(&db_path).unwrap();

        let conn = Connection::open(&db_path).unwrap();
        let app: String = conn
            .query_row(
                "SELECT value FROM properties WHERE name = 'application'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(app, APPLICATION);

        let (id, name): (i64, String) = conn
            .query_row("SELECT id, name FROM snapshots", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(id, 0);
        assert_eq!(name, "Current");
    }

    #[test]
    fn wal_mode_enabled() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("profile.db");
        let _backend = SqliteBackend::create(&db_path).unwrap();

        let conn = Connection::open(&db_path).unwrap();
        let journal_mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(journal_mode.to_lowercase(), "wal");
    }

    #[test]
    fn open_rejects_foreign_application() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("profile.db");
        {
            let mut backend = SqliteBackend::create(&db_path).unwrap();
            backend.write_property(PROP_APPLICATION, "someone-else").unwrap();
        }

        match SqliteBackend::open(&db_path) {
            Err(StorageError::FormatMismatch(_)) => {}
            other => panic!("expected format mismatch, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn open_rejects_wrong_file_version() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("profile.db");
        {
            let mut backend = SqliteBackend::create(&db_path).unwrap();
            backend.write_property(PROP_FILE_VERSION, "2").unwrap();
        }

        assert!(matches!(
            SqliteBackend::open(&db_path),
            Err(StorageError::FormatMismatch(_))
        ));
    }

    #[test]
    fn create_refuses_store_owned_by_another_application() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("profile.db");
        {
            let mut backend = SqliteBackend::create(&db_path).unwrap();
            backend.write_property(PROP_APPLICATION, "someone-else").unwrap();
        }

        assert!(matches!(
            SqliteBackend::create(&db_path),
            Err(StorageError::FormatMismatch(_))
        ));

        // The foreign identity was not overwritten by the refused create.
        let conn = Connection::open(&db_path).unwrap();
        let app: String = conn
            .query_row(
                "SELECT value FROM properties WHERE name = 'application'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(app, "someone-else");
    }

    #[test]
    fn create_reattaches_to_compatible_store() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("profile.db");
        {
            let mut backend = SqliteBackend::create(&db_path).unwrap();
            backend
                .commit_batch(&FlushBatch {
                    samples: &[SampleRow {
                        thread_id: 1,
                        function_id: 10,
                        time: 1.0,
                    }],
                    ..Default::default()
                })
                .unwrap();
        }

        let mut backend = SqliteBackend::create(&db_path).unwrap();
        // Existing data and the reserved snapshot row survive.
        assert_eq!(
            backend
                .query_scalar("SELECT COUNT(*) FROM samples WHERE snapshot_id = 0")
                .unwrap(),
            Some(1.0)
        );
        assert_eq!(
            backend
                .query_scalar("SELECT COUNT(*) FROM snapshots")
                .unwrap(),
            Some(1.0)
        );
    }

    #[test]
    fn open_accepts_compatible_store() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("profile.db");
        drop(SqliteBackend::create(&db_path).unwrap());

        let mut backend = SqliteBackend::open(&db_path).unwrap();
        assert_eq!(
            backend.get_property(PROP_FILE_VERSION).unwrap().as_deref(),
            Some("3")
        );
    }

    #[test]
    fn commit_batch_ignores_duplicate_metadata() {
        let dir = tempdir().unwrap();
        let mut backend = SqliteBackend::create(dir.path().join("profile.db")).unwrap();

        let functions = [function(10, "main"), function(20, "work")];
        let first = backend
            .commit_batch(&FlushBatch {
                functions: &functions,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(first.functions_inserted, 2);
        assert_eq!(first.duplicates_ignored, 0);

        let second = backend
            .commit_batch(&FlushBatch {
                functions: &functions,
                classes: &[ClassInfo {
                    id: 1,
                    name: "App".to_string(),
                }],
                ..Default::default()
            })
            .unwrap();
        assert_eq!(second.functions_inserted, 0);
        assert_eq!(second.classes_inserted, 1);
        assert_eq!(second.duplicates_ignored, 2);
    }

    #[test]
    fn merged_rows_accumulate_across_batches() {
        let dir = tempdir().unwrap();
        let mut backend = SqliteBackend::create(dir.path().join("profile.db")).unwrap();

        let batch_rows = [SampleRow {
            thread_id: 1,
            function_id: 10,
            time: 5.0,
        }];
        let call_rows = [CallRow {
            thread_id: 1,
            parent_id: 0,
            child_id: 10,
            time: 5.0,
        }];
        let alloc_rows = [AllocRow {
            class_id: 7,
            function_id: 10,
            count: 2,
            total_size: 64,
        }];
        for _ in 0..2 {
            backend
                .commit_batch(&FlushBatch {
                    samples: &batch_rows,
                    calls: &call_rows,
                    allocations: &alloc_rows,
                    ..Default::default()
                })
                .unwrap();
        }

        let total = backend
            .query_scalar("SELECT SUM(time) FROM samples WHERE snapshot_id = 0")
            .unwrap();
        assert_eq!(total, Some(10.0));
        let calls = backend
            .query_scalar("SELECT SUM(time) FROM calls WHERE snapshot_id = 0")
            .unwrap();
        assert_eq!(calls, Some(10.0));
        // Allocation counters add onto the existing live row as well.
        let alloc_count = backend
            .query_scalar("SELECT alloc_count FROM allocations WHERE snapshot_id = 0")
            .unwrap();
        assert_eq!(alloc_count, Some(4.0));
        let alloc_size = backend
            .query_scalar("SELECT total_size FROM allocations WHERE snapshot_id = 0")
            .unwrap();
        assert_eq!(alloc_size, Some(128.0));
    }

    #[test]
    fn snapshot_copies_live_rows_without_disturbing_them() {
        let dir = tempdir().unwrap();
        let mut backend = SqliteBackend::create(dir.path().join("profile.db")).unwrap();

        backend
            .commit_batch(&FlushBatch {
                samples: &[SampleRow {
                    thread_id: 1,
                    function_id: 10,
                    time: 7.5,
                }],
                ..Default::default()
            })
            .unwrap();

        let record = backend.create_snapshot("before-gc").unwrap();
        assert!(record.id > 0);

        let live = backend
            .query_scalar("SELECT SUM(time) FROM samples WHERE snapshot_id = 0")
            .unwrap();
        assert_eq!(live, Some(7.5));
        let branched = backend
            .query_scalar(&format!(
                "SELECT SUM(time) FROM samples WHERE snapshot_id = {}",
                record.id
            ))
            .unwrap();
        assert_eq!(branched, Some(7.5));
    }

    #[test]
    fn clear_live_keeps_named_snapshots() {
        let dir = tempdir().unwrap();
        let mut backend = SqliteBackend::create(dir.path().join("profile.db")).unwrap();

        backend
            .commit_batch(&FlushBatch {
                samples: &[SampleRow {
                    thread_id: 1,
                    function_id: 10,
                    time: 3.0,
                }],
                ..Default::default()
            })
            .unwrap();
        let record = backend.create_snapshot("keep-me").unwrap();

        backend.clear_live().unwrap();

        let live = backend
            .query_scalar("SELECT COUNT(*) FROM samples WHERE snapshot_id = 0")
            .unwrap();
        assert_eq!(live, Some(0.0));
        let kept = backend
            .query_scalar(&format!(
                "SELECT COUNT(*) FROM samples WHERE snapshot_id = {}",
                record.id
            ))
            .unwrap();
        assert_eq!(kept, Some(1.0));

        let snapshots = backend.list_snapshots().unwrap();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[1].name, "keep-me");
    }

    #[test]
    fn query_rows_returns_json_objects() {
        let dir = tempdir().unwrap();
        let mut backend = SqliteBackend::create(dir.path().join("profile.db")).unwrap();

        backend
            .upsert_thread(&ThreadInfo {
                id: 1,
                is_alive: true,
                name: "worker".to_string(),
            })
            .unwrap();

        let rows = backend
            .query_rows("SELECT id, is_alive, name FROM threads")
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], json!(1));
        assert_eq!(rows[0]["is_alive"], json!(1));
        assert_eq!(rows[0]["name"], json!("worker"));
    }

    #[test]
    fn property_round_trip() {
        let dir = tempdir().unwrap();
        let mut backend = SqliteBackend::create(dir.path().join("profile.db")).unwrap();

        backend.write_property("target_pid", "4242").unwrap();
        backend.write_property("target_pid", "4243").unwrap();

        assert_eq!(
            backend.get_property("target_pid").unwrap().as_deref(),
            Some("4243")
        );
        assert_eq!(backend.get_property("missing").unwrap(), None);
    }
}
