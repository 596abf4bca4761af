use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::Connection;
use rusqlite::types::ValueRef;

use crate::error::SQLError;
use crate::traits::{Row, SQLStore, Value};

/// SqliteStore is a SQLStore implementation backed by rusqlite (bundled SQLite).
///
/// One connection behind a mutex: statements are serialized, so a single
/// conditional UPDATE is atomic with respect to every other caller.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path.
    pub fn open(path: &Path) -> Result<Self, SQLError> {
        let conn = Connection::open(path)
            .map_err(|e| SQLError::Connection(e.to_string()))?;

        // WAL keeps readers from blocking on the writer.
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| SQLError::Connection(e.to_string()))?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(|e| SQLError::Connection(e.to_string()))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite database (useful for tests).
    pub fn open_in_memory() -> Result<Self, SQLError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| SQLError::Connection(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SQLError> {
        self.conn
            .lock()
            .map_err(|e| SQLError::Connection(format!("connection poisoned: {e}")))
    }
}

/// Convert our Value enum to rusqlite's ToSql.
fn bind_params(params: &[Value]) -> Vec<&dyn rusqlite::types::ToSql> {
    params.iter().map(as_sql).collect()
}

fn as_sql(v: &Value) -> &dyn rusqlite::types::ToSql {
    match v {
        Value::Null => &rusqlite::types::Null,
        Value::Integer(i) => i,
        Value::Text(s) => s,
    }
}

impl SQLStore for SqliteStore {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError> {
        let conn = self.lock()?;
        let bound = bind_params(params);

        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| SQLError::Query(e.to_string()))?;

        let column_names: Vec<String> = stmt
            .column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        let rows = stmt
            .query_map(bound.as_slice(), |row| {
                let mut columns = Vec::with_capacity(column_names.len());
                for (i, name) in column_names.iter().enumerate() {
                    columns.push((name.clone(), row_value_at(row, i)?));
                }
                Ok(Row { columns })
            })
            .map_err(|e| SQLError::Query(e.to_string()))?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row.map_err(|e| SQLError::Query(e.to_string()))?);
        }
        Ok(result)
    }

    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, SQLError> {
        let conn = self.lock()?;
        let bound = bind_params(params);

        let affected = conn
            .execute(sql, bound.as_slice())
            .map_err(|e| SQLError::Execution(e.to_string()))?;

        Ok(affected as u64)
    }

    fn exec_batch(&self, sql: &str) -> Result<(), SQLError> {
        let conn = self.lock()?;
        conn.execute_batch(sql)
            .map_err(|e| SQLError::Execution(e.to_string()))
    }
}

/// Extract a Value from a rusqlite row at a given column index.
///
/// REAL and BLOB columns are not part of any schema here and are rejected.
fn row_value_at(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Value> {
    match row.get_ref(idx)? {
        ValueRef::Null => Ok(Value::Null),
        ValueRef::Integer(i) => Ok(Value::Integer(i)),
        ValueRef::Text(t) => Ok(Value::Text(String::from_utf8_lossy(t).into_owned())),
        other => Err(rusqlite::Error::InvalidColumnType(
            idx,
            format!("column {idx}"),
            other.data_type(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_table() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .exec_batch(
                "CREATE TABLE t (k TEXT PRIMARY KEY, n INTEGER NOT NULL, note TEXT);
                 CREATE INDEX idx_t_n ON t(n);",
            )
            .unwrap();
        store
    }

    #[test]
    fn test_exec_and_query() {
        let store = store_with_table();
        let n = store
            .exec(
                "INSERT INTO t (k, n, note) VALUES (?1, ?2, ?3)",
                &[Value::Text("a".into()), Value::Integer(1), Value::Null],
            )
            .unwrap();
        assert_eq!(n, 1);

        let rows = store
            .query("SELECT k, n, note FROM t WHERE k = ?1", &[Value::Text("a".into())])
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_str("k"), Some("a"));
        assert_eq!(rows[0].get_i64("n"), Some(1));
        assert_eq!(rows[0].get_bool("n"), Some(true));
        assert_eq!(rows[0].get("note"), Some(&Value::Null));
        assert_eq!(rows[0].get_str("note"), None);
    }

    #[test]
    fn test_conditional_update_counts() {
        let store = store_with_table();
        store
            .exec(
                "INSERT INTO t (k, n) VALUES (?1, 0)",
                &[Value::Text("a".into())],
            )
            .unwrap();

        let flip = "UPDATE t SET n = 1 WHERE k = ?1 AND n = 0";
        assert_eq!(store.exec(flip, &[Value::Text("a".into())]).unwrap(), 1);
        assert_eq!(store.exec(flip, &[Value::Text("a".into())]).unwrap(), 0);
    }

    #[test]
    fn test_unique_violation_detected() {
        let store = store_with_table();
        let insert = "INSERT INTO t (k, n) VALUES (?1, 0)";
        store.exec(insert, &[Value::Text("a".into())]).unwrap();
        let err = store.exec(insert, &[Value::Text("a".into())]).unwrap_err();
        assert!(err.is_unique_violation(), "got {err}");

        let err = store.exec("INSERT INTO nope VALUES (1)", &[]).unwrap_err();
        assert!(!err.is_unique_violation());
    }

    #[test]
    fn test_open_on_disk_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.sqlite");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.exec_batch("CREATE TABLE t (k TEXT PRIMARY KEY);").unwrap();
            store
                .exec("INSERT INTO t (k) VALUES (?1)", &[Value::Text("x".into())])
                .unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        let rows = store.query("SELECT COUNT(*) AS cnt FROM t", &[]).unwrap();
        assert_eq!(rows[0].get_i64("cnt"), Some(1));
    }

    #[test]
    fn test_opt_text() {
        assert_eq!(Value::opt_text(Some("p")), Value::Text("p".into()));
        assert_eq!(Value::opt_text(None), Value::Null);
    }
}
