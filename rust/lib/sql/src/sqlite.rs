use std::path::Path;
use std::sync::Mutex;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, ErrorCode};
use tracing::debug;

use crate::error::SQLError;
use crate::traits::{Row, SQLStore, Value};

/// SqliteStore is a SQLStore implementation backed by rusqlite (bundled SQLite).
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path.
    pub fn open(path: &Path) -> Result<Self, SQLError> {
        let conn = Connection::open(path).map_err(|e| SQLError::Connection(e.to_string()))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| SQLError::Connection(e.to_string()))?;
        debug!("opened sqlite store at {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite database (useful for tests).
    pub fn open_in_memory() -> Result<Self, SQLError> {
        let conn = Connection::open_in_memory().map_err(|e| SQLError::Connection(e.to_string()))?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| SQLError::Connection(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn to_sql(v: &Value) -> rusqlite::types::Value {
    match v {
        Value::Null => rusqlite::types::Value::Null,
        Value::Integer(i) => rusqlite::types::Value::Integer(*i),
        Value::Real(f) => rusqlite::types::Value::Real(*f),
        Value::Text(s) => rusqlite::types::Value::Text(s.clone()),
        Value::Blob(b) => rusqlite::types::Value::Blob(b.clone()),
    }
}

fn from_sql(v: ValueRef<'_>) -> Value {
    match v {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
    }
}

/// Map a write failure, separating constraint violations from other errors.
fn exec_error(e: rusqlite::Error) -> SQLError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation => {
            SQLError::Constraint(e.to_string())
        }
        _ => SQLError::Execution(e.to_string()),
    }
}

impl SQLStore for SqliteStore {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SQLError::Query(e.to_string()))?;

        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| SQLError::Query(e.to_string()))?;

        let column_names: Vec<String> = stmt
            .column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        let bound: Vec<rusqlite::types::Value> = params.iter().map(to_sql).collect();
        let rows = stmt
            .query_map(rusqlite::params_from_iter(bound.iter()), |row| {
                let mut columns = Vec::with_capacity(column_names.len());
                for (i, name) in column_names.iter().enumerate() {
                    columns.push((name.clone(), from_sql(row.get_ref(i)?)));
                }
                Ok(Row { columns })
            })
            .map_err(|e| SQLError::Query(e.to_string()))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| SQLError::Query(e.to_string()))
    }

    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, SQLError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SQLError::Execution(e.to_string()))?;

        let bound: Vec<rusqlite::types::Value> = params.iter().map(to_sql).collect();
        let affected = conn
            .execute(sql, rusqlite::params_from_iter(bound.iter()))
            .map_err(exec_error)?;

        Ok(affected as u64)
    }

    fn exec_many(&self, sql: &str, param_sets: &[Vec<Value>]) -> Result<u64, SQLError> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| SQLError::Execution(e.to_string()))?;

        // Dropping the transaction without commit rolls everything back.
        let tx = conn
            .transaction()
            .map_err(|e| SQLError::Execution(e.to_string()))?;
        let mut affected = 0u64;
        {
            let mut stmt = tx.prepare(sql).map_err(exec_error)?;
            for params in param_sets {
                let bound: Vec<rusqlite::types::Value> = params.iter().map(to_sql).collect();
                affected += stmt
                    .execute(rusqlite::params_from_iter(bound.iter()))
                    .map_err(exec_error)? as u64;
            }
        }
        tx.commit().map_err(exec_error)?;

        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .exec("CREATE TABLE t (id TEXT PRIMARY KEY, code TEXT UNIQUE, n INTEGER)", &[])
            .unwrap();
        store
    }

    #[test]
    fn query_returns_typed_columns() {
        let s = store();
        s.exec(
            "INSERT INTO t (id, code, n) VALUES (?1, ?2, ?3)",
            &["a".into(), "X-1".into(), 7i64.into()],
        )
        .unwrap();
        let rows = s.query("SELECT id, code, n FROM t", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_str("code"), Some("X-1"));
        assert_eq!(rows[0].get_i64("n"), Some(7));
        assert_eq!(rows[0].get("missing"), None);
    }

    #[test]
    fn unique_violation_is_constraint_error() {
        let s = store();
        s.exec("INSERT INTO t (id, code) VALUES ('a', 'X-1')", &[]).unwrap();
        let err = s
            .exec("INSERT INTO t (id, code) VALUES ('b', 'X-1')", &[])
            .unwrap_err();
        assert!(err.is_constraint(), "got {err:?}");
    }

    #[test]
    fn exec_many_is_all_or_nothing() {
        let s = store();
        let sets = vec![
            vec!["a".into(), "X-1".into()],
            vec!["b".into(), "X-2".into()],
            vec!["c".into(), "X-1".into()],
        ];
        let err = s
            .exec_many("INSERT INTO t (id, code) VALUES (?1, ?2)", &sets)
            .unwrap_err();
        assert!(err.is_constraint());
        let rows = s.query("SELECT COUNT(*) AS cnt FROM t", &[]).unwrap();
        assert_eq!(rows[0].get_i64("cnt"), Some(0));

        let ok = s
            .exec_many("INSERT INTO t (id, code) VALUES (?1, ?2)", &sets[..2])
            .unwrap();
        assert_eq!(ok, 2);
    }

    #[test]
    fn on_disk_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cards.sqlite");
        {
            let s = SqliteStore::open(&path).unwrap();
            s.exec("CREATE TABLE t (id TEXT PRIMARY KEY)", &[]).unwrap();
            s.exec("INSERT INTO t (id) VALUES ('keep')", &[]).unwrap();
        }
        let s = SqliteStore::open(&path).unwrap();
        let rows = s.query("SELECT id FROM t", &[]).unwrap();
        assert_eq!(rows[0].get_str("id"), Some("keep"));
    }

    #[test]
    fn option_and_bool_values() {
        assert_eq!(Value::from(None::<String>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".into()));
        assert_eq!(Value::from(true), Value::Integer(1));
    }
}
