pub mod appointment;
pub mod batch;
pub mod card;
pub mod clinic;
pub mod error;
pub mod generator;
pub mod location;
pub mod message;
pub mod perk;
pub mod schema;
pub mod settings;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use mocards_core::{merge_patch, now_rfc3339, ListResult, ServiceError};
use mocards_sql::{SQLError, SQLStore, Value};

pub use error::{CardError, CodeKind};

/// Days a card (and each of its perks) stays valid.
pub const VALIDITY_DAYS: i64 = 365;

/// MOCARDS service: owns the store handle and every business operation.
pub struct CardService {
    pub(crate) sql: Arc<dyn SQLStore>,
}

/// Translate a store failure. Constraint violations become `Conflict`, the
/// one signal callers may retry on; everything else keeps its message.
pub(crate) fn store_error(e: SQLError) -> ServiceError {
    match e {
        SQLError::Constraint(msg) => ServiceError::Conflict(msg),
        other => ServiceError::Storage(other.to_string()),
    }
}

fn to_json<T: Serialize>(record: &T) -> Result<String, ServiceError> {
    serde_json::to_string(record).map_err(|e| ServiceError::Internal(e.to_string()))
}

fn where_clause(filters: &[(&str, Value)], first_idx: usize) -> (String, Vec<Value>) {
    if filters.is_empty() {
        return (String::new(), Vec::new());
    }
    let clauses: Vec<String> = filters
        .iter()
        .enumerate()
        .map(|(i, (col, _))| format!("{} = ?{}", col, first_idx + i))
        .collect();
    let params = filters.iter().map(|(_, v)| v.clone()).collect();
    (format!(" WHERE {}", clauses.join(" AND ")), params)
}

impl CardService {
    pub fn new(sql: Arc<dyn SQLStore>) -> Result<Self, ServiceError> {
        schema::init_schema(sql.as_ref())?;
        Ok(Self { sql })
    }

    // ── Generic record helpers ──

    /// Insert a record as JSON into a table with indexed columns.
    pub(crate) fn insert_record<T: Serialize>(
        &self,
        table: &str,
        id: &str,
        record: &T,
        indexes: &[(&str, Value)],
    ) -> Result<(), ServiceError> {
        let mut cols = vec!["id", "data"];
        let mut params = vec![Value::Text(id.to_string()), Value::Text(to_json(record)?)];
        for (col, val) in indexes {
            cols.push(*col);
            params.push(val.clone());
        }
        let placeholders: Vec<String> = (1..=cols.len()).map(|i| format!("?{}", i)).collect();

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            cols.join(", "),
            placeholders.join(", "),
        );
        self.sql.exec(&sql, &params).map_err(store_error)?;
        Ok(())
    }

    /// Insert many records in one atomic statement batch.
    ///
    /// Every record must carry values for the same `columns`, in order.
    pub(crate) fn insert_records<T: Serialize>(
        &self,
        table: &str,
        columns: &[&str],
        records: &[(&str, &T, Vec<Value>)],
    ) -> Result<u64, ServiceError> {
        let mut cols = vec!["id", "data"];
        cols.extend_from_slice(columns);
        let placeholders: Vec<String> = (1..=cols.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            cols.join(", "),
            placeholders.join(", "),
        );

        let mut param_sets = Vec::with_capacity(records.len());
        for (id, record, values) in records {
            if values.len() != columns.len() {
                return Err(ServiceError::Internal(format!(
                    "{} values for {} columns in {}",
                    values.len(),
                    columns.len(),
                    table
                )));
            }
            let mut params = vec![Value::Text(id.to_string()), Value::Text(to_json(*record)?)];
            params.extend(values.iter().cloned());
            param_sets.push(params);
        }

        self.sql.exec_many(&sql, &param_sets).map_err(store_error)
    }

    /// Insert or replace a keyed record (settings, labels, formats).
    pub(crate) fn upsert_record<T: Serialize>(
        &self,
        table: &str,
        id: &str,
        record: &T,
        indexes: &[(&str, Value)],
    ) -> Result<(), ServiceError> {
        let now = now_rfc3339();
        let mut cols = vec!["id", "data", "create_at", "update_at"];
        let mut params = vec![
            Value::Text(id.to_string()),
            Value::Text(to_json(record)?),
            Value::Text(now.clone()),
            Value::Text(now),
        ];
        for (col, val) in indexes {
            cols.push(*col);
            params.push(val.clone());
        }
        let placeholders: Vec<String> = (1..=cols.len()).map(|i| format!("?{}", i)).collect();
        let updates: Vec<String> = cols
            .iter()
            .filter(|c| **c != "id" && **c != "create_at")
            .map(|c| format!("{c} = excluded.{c}"))
            .collect();

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT(id) DO UPDATE SET {}",
            table,
            cols.join(", "),
            placeholders.join(", "),
            updates.join(", "),
        );
        self.sql.exec(&sql, &params).map_err(store_error)?;
        Ok(())
    }

    /// Get a record by id, deserializing the JSON `data` column.
    pub(crate) fn get_record<T: DeserializeOwned>(
        &self,
        table: &str,
        id: &str,
    ) -> Result<T, ServiceError> {
        self.find_record_by(table, "id", Value::Text(id.to_string()))?
            .ok_or_else(|| ServiceError::NotFound(format!("{}/{}", table, id)))
    }

    /// Find the first record whose `column` equals `value`.
    pub(crate) fn find_record_by<T: DeserializeOwned>(
        &self,
        table: &str,
        column: &str,
        value: Value,
    ) -> Result<Option<T>, ServiceError> {
        let sql = format!("SELECT data FROM {} WHERE {} = ?1 LIMIT 1", table, column);
        let rows = self.sql.query(&sql, &[value]).map_err(store_error)?;
        match rows.first() {
            Some(row) => {
                let data = row
                    .get_str("data")
                    .ok_or_else(|| ServiceError::Internal("missing data column".into()))?;
                serde_json::from_str(data)
                    .map(Some)
                    .map_err(|e| ServiceError::Internal(e.to_string()))
            }
            None => Ok(None),
        }
    }

    /// Cheap existence probe on an indexed column.
    pub(crate) fn exists_by(
        &self,
        table: &str,
        column: &str,
        value: &str,
    ) -> Result<bool, ServiceError> {
        let sql = format!("SELECT 1 AS hit FROM {} WHERE {} = ?1 LIMIT 1", table, column);
        let rows = self
            .sql
            .query(&sql, &[Value::Text(value.to_string())])
            .map_err(store_error)?;
        Ok(!rows.is_empty())
    }

    /// Update a record's JSON and indexed columns, but only while every
    /// `guard` column still holds its expected value.
    ///
    /// Returns `false` when no row matched (missing, or the guard failed).
    pub(crate) fn update_record_if<T: Serialize>(
        &self,
        table: &str,
        id: &str,
        record: &T,
        indexes: &[(&str, Value)],
        guards: &[(&str, Value)],
    ) -> Result<bool, ServiceError> {
        let mut sets = vec!["data = ?1".to_string()];
        let mut params: Vec<Value> = vec![Value::Text(to_json(record)?)];

        for (col, val) in indexes {
            params.push(val.clone());
            sets.push(format!("{} = ?{}", col, params.len()));
        }

        params.push(Value::Text(id.to_string()));
        let mut conds = vec![format!("id = ?{}", params.len())];
        for (col, val) in guards {
            params.push(val.clone());
            conds.push(format!("{} = ?{}", col, params.len()));
        }

        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            table,
            sets.join(", "),
            conds.join(" AND "),
        );
        let affected = self.sql.exec(&sql, &params).map_err(store_error)?;
        Ok(affected > 0)
    }

    /// Update a record's JSON data and indexed columns.
    pub(crate) fn update_record<T: Serialize>(
        &self,
        table: &str,
        id: &str,
        record: &T,
        indexes: &[(&str, Value)],
    ) -> Result<(), ServiceError> {
        if self.update_record_if(table, id, record, indexes, &[])? {
            Ok(())
        } else {
            Err(ServiceError::NotFound(format!("{}/{}", table, id)))
        }
    }

    /// Delete a record by id.
    pub(crate) fn delete_record(&self, table: &str, id: &str) -> Result<(), ServiceError> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", table);
        let affected = self
            .sql
            .exec(&sql, &[Value::Text(id.to_string())])
            .map_err(store_error)?;
        if affected == 0 {
            return Err(ServiceError::NotFound(format!("{}/{}", table, id)));
        }
        Ok(())
    }

    /// Run a raw `WHERE` fragment and decode every matching `data` column.
    pub(crate) fn select_records<T: DeserializeOwned>(
        &self,
        table: &str,
        where_sql: &str,
        params: &[Value],
        order_by: &str,
    ) -> Result<Vec<T>, ServiceError> {
        let sql = format!(
            "SELECT data FROM {} WHERE {} ORDER BY {}",
            table, where_sql, order_by
        );
        let rows = self.sql.query(&sql, params).map_err(store_error)?;
        rows.iter()
            .map(|row| {
                let data = row
                    .get_str("data")
                    .ok_or_else(|| ServiceError::Internal("missing data column".into()))?;
                serde_json::from_str(data).map_err(|e| ServiceError::Internal(e.to_string()))
            })
            .collect()
    }

    /// List records with equality filters, pagination, and total count.
    pub(crate) fn list_records<T: DeserializeOwned + Serialize>(
        &self,
        table: &str,
        filters: &[(&str, Value)],
        limit: usize,
        offset: usize,
        order_by: &str,
    ) -> Result<ListResult<T>, ServiceError> {
        let total = self.count_records(table, filters)? as usize;

        let (where_sql, mut params) = where_clause(filters, 1);
        let limit_idx = params.len() + 1;
        let offset_idx = params.len() + 2;
        params.push(Value::Integer(limit as i64));
        params.push(Value::Integer(offset as i64));

        let sql = format!(
            "SELECT data FROM {}{} ORDER BY {} LIMIT ?{} OFFSET ?{}",
            table, where_sql, order_by, limit_idx, offset_idx,
        );
        let rows = self.sql.query(&sql, &params).map_err(store_error)?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            let data = row
                .get_str("data")
                .ok_or_else(|| ServiceError::Internal("missing data column".into()))?;
            items.push(serde_json::from_str(data).map_err(|e| ServiceError::Internal(e.to_string()))?);
        }

        Ok(ListResult { items, total })
    }

    /// Count records with optional equality filters.
    pub(crate) fn count_records(
        &self,
        table: &str,
        filters: &[(&str, Value)],
    ) -> Result<i64, ServiceError> {
        let (where_sql, params) = where_clause(filters, 1);
        let sql = format!("SELECT COUNT(*) AS cnt FROM {}{}", table, where_sql);
        let rows = self.sql.query(&sql, &params).map_err(store_error)?;
        Ok(rows.first().and_then(|r| r.get_i64("cnt")).unwrap_or(0))
    }

    /// Apply a JSON merge-patch to a record, keeping `id` and `createAt`.
    pub(crate) fn apply_patch<T: Serialize + DeserializeOwned>(
        current: &T,
        patch: serde_json::Value,
    ) -> Result<T, ServiceError> {
        let mut json =
            serde_json::to_value(current).map_err(|e| ServiceError::Internal(e.to_string()))?;

        let mut patch = patch;
        if let Some(obj) = patch.as_object_mut() {
            obj.remove("id");
            obj.remove("createAt");
            obj.insert("updateAt".into(), serde_json::json!(now_rfc3339()));
        }

        merge_patch(&mut json, &patch);
        serde_json::from_value(json).map_err(|e| ServiceError::Validation(e.to_string()))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, serde::Deserialize, PartialEq)]
    struct Note {
        id: String,
        text: String,
    }

    #[test]
    fn guarded_update_respects_guard() {
        let svc = testing::service();
        svc.sql
            .exec("CREATE TABLE notes (id TEXT PRIMARY KEY, data TEXT, state TEXT)", &[])
            .unwrap();
        let n = Note { id: "n1".into(), text: "a".into() };
        svc.insert_record("notes", "n1", &n, &[("state", "open".into())]).unwrap();

        let changed = Note { id: "n1".into(), text: "b".into() };
        let hit = svc
            .update_record_if("notes", "n1", &changed, &[("state", "closed".into())], &[("state", "closed".into())])
            .unwrap();
        assert!(!hit);
        let hit = svc
            .update_record_if("notes", "n1", &changed, &[("state", "closed".into())], &[("state", "open".into())])
            .unwrap();
        assert!(hit);
        let back: Note = svc.get_record("notes", "n1").unwrap();
        assert_eq!(back, changed);
    }

    #[test]
    fn duplicate_insert_is_conflict() {
        let svc = testing::service();
        svc.sql
            .exec("CREATE TABLE notes (id TEXT PRIMARY KEY, data TEXT)", &[])
            .unwrap();
        let n = Note { id: "n1".into(), text: "a".into() };
        svc.insert_record("notes", "n1", &n, &[]).unwrap();
        let err = svc.insert_record("notes", "n1", &n, &[]).unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)), "got {err:?}");
    }

    #[test]
    fn upsert_replaces_data() {
        let svc = testing::service();
        let a = Note { id: "k".into(), text: "first".into() };
        let b = Note { id: "k".into(), text: "second".into() };
        svc.upsert_record("system_config", "k", &a, &[]).unwrap();
        svc.upsert_record("system_config", "k", &b, &[]).unwrap();
        let back: Note = svc.get_record("system_config", "k").unwrap();
        assert_eq!(back.text, "second");
        assert_eq!(svc.count_records("system_config", &[]).unwrap(), 1);
    }

    #[test]
    fn patch_keeps_id() {
        let n = Note { id: "n1".into(), text: "a".into() };
        let patched: Note =
            CardService::apply_patch(&n, serde_json::json!({"id": "other", "text": "z"})).unwrap();
        assert_eq!(patched.id, "n1");
        assert_eq!(patched.text, "z");
    }
}
