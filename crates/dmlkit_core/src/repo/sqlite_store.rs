//! SQLite-backed record store.
//!
//! # Responsibility
//! - Implement `RecordStore` over the per-kind tables created by
//!   `db::migrations`.
//! - Keep SQL text and value conversion inside this module.
//!
//! # Invariants
//! - Each batch runs inside its own savepoint, so a failure on any record
//!   rolls back the whole batch even when nested in a caller transaction.
//! - Read paths reject rows that do not decode into valid field values.
//! - Query result order is SQLite's scan order; no ordering is imposed.
//! - `In` lists longer than `MAX_IN_BIND_VALUES` are split across
//!   statements, so list length never hits SQLite's variable limit.

use crate::db::migrations::latest_version;
use crate::model::field::{FieldType, FieldValue, FieldValues, RecordField, RecordKind};
use crate::model::record::{Record, RecordId, RecordValidationError};
use crate::repo::store::{FieldFilter, RecordQuery, RecordStore, RepoError, RepoResult, UpsertOutcome};
use chrono::NaiveDate;
use log::{debug, warn};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use std::collections::HashSet;
use uuid::Uuid;

const DATE_FORMAT: &str = "%Y-%m-%d";
const SAVEPOINT_NAME: &str = "dmlkit_scope";
/// Largest `In` list bound into a single statement.
const MAX_IN_BIND_VALUES: usize = 500;

/// SQLite implementation of the record-persistence provider.
pub struct SqliteRecordStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRecordStore<'conn> {
    /// Constructs a store from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_store_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn insert_row<R: Record>(&self, id: RecordId, record: &R) -> RepoResult<()> {
        let mut stmt = self.conn.prepare_cached(&insert_sql(R::KIND))?;
        stmt.execute(params_from_iter(row_values(id, record)))?;
        Ok(())
    }

    fn update_row<R: Record>(&self, id: RecordId, record: &R) -> RepoResult<()> {
        let mut stmt = self.conn.prepare_cached(&update_sql(R::KIND))?;
        let changed = stmt.execute(params_from_iter(row_values(id, record)))?;
        if changed == 0 {
            return Err(RepoError::NotFound { kind: R::KIND, id });
        }
        Ok(())
    }

    /// Runs one SELECT; every `In` value is bound as its own parameter.
    fn select_records<R: Record>(&self, query: &RecordQuery) -> RepoResult<Vec<R>> {
        let kind = R::KIND;
        let mut sql = format!("{} WHERE 1 = 1", select_sql(kind));
        let mut bind_values: Vec<Value> = Vec::new();

        for filter in &query.filters {
            match filter {
                FieldFilter::Eq(field, value) => {
                    sql.push_str(&format!(" AND {} = ?", field.column()));
                    bind_values.push(to_sql_value(value));
                }
                FieldFilter::In(_, values) if values.is_empty() => {
                    sql.push_str(" AND 0 = 1");
                }
                FieldFilter::In(field, values) => {
                    let placeholders = vec!["?"; values.len()].join(", ");
                    sql.push_str(&format!(" AND {} IN ({placeholders})", field.column()));
                    bind_values.extend(values.iter().map(to_sql_value));
                }
            }
        }

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_record_row::<R>(row)?);
        }

        Ok(records)
    }
}

impl RecordStore for SqliteRecordStore<'_> {
    fn insert<R: Record>(&self, records: &mut [R]) -> RepoResult<Vec<RecordId>> {
        for record in records.iter() {
            if let Some(id) = record.id() {
                return Err(RecordValidationError::IdAssignedOnInsert { kind: R::KIND, id }.into());
            }
            record.validate()?;
        }
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<RecordId> = records.iter().map(|_| Uuid::new_v4()).collect();
        with_savepoint(self.conn, || {
            for (record, id) in records.iter().zip(&ids) {
                self.insert_row(*id, record)?;
            }
            Ok(())
        })?;

        for (record, id) in records.iter_mut().zip(&ids) {
            record.set_id(*id);
        }
        debug!(
            "event=record_insert module=repo status=ok kind={} count={}",
            R::KIND,
            ids.len()
        );
        Ok(ids)
    }

    fn update<R: Record>(&self, records: &[R]) -> RepoResult<()> {
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            ids.push(record.id().ok_or(RepoError::MissingId(R::KIND))?);
            record.validate()?;
        }
        if records.is_empty() {
            return Ok(());
        }

        with_savepoint(self.conn, || {
            for (record, id) in records.iter().zip(&ids) {
                self.update_row(*id, record)?;
            }
            Ok(())
        })?;

        debug!(
            "event=record_update module=repo status=ok kind={} count={}",
            R::KIND,
            ids.len()
        );
        Ok(())
    }

    fn upsert<R: Record>(&self, records: &mut [R]) -> RepoResult<UpsertOutcome> {
        for record in records.iter() {
            record.validate()?;
        }
        if records.is_empty() {
            return Ok(UpsertOutcome::default());
        }

        let mut outcome = UpsertOutcome::default();
        let mut assigned: Vec<(usize, RecordId)> = Vec::new();
        with_savepoint(self.conn, || {
            for (index, record) in records.iter().enumerate() {
                match record.id() {
                    Some(id) => {
                        self.update_row(id, record)?;
                        outcome.updated += 1;
                    }
                    None => {
                        let id = Uuid::new_v4();
                        self.insert_row(id, record)?;
                        assigned.push((index, id));
                        outcome.created += 1;
                    }
                }
            }
            Ok(())
        })?;

        for (index, id) in assigned {
            records[index].set_id(id);
        }
        debug!(
            "event=record_upsert module=repo status=ok kind={} created={} updated={}",
            R::KIND,
            outcome.created,
            outcome.updated
        );
        Ok(outcome)
    }

    fn delete<R: Record>(&self, records: &[R]) -> RepoResult<()> {
        let ids = records
            .iter()
            .map(|record| record.id().ok_or(RepoError::MissingId(R::KIND)))
            .collect::<RepoResult<Vec<_>>>()?;
        if ids.is_empty() {
            return Ok(());
        }

        let sql = format!("DELETE FROM {} WHERE id = ?1;", R::KIND.table());
        with_savepoint(self.conn, || {
            let mut stmt = self.conn.prepare_cached(&sql)?;
            for id in &ids {
                if stmt.execute([id.to_string()])? == 0 {
                    return Err(RepoError::NotFound {
                        kind: R::KIND,
                        id: *id,
                    });
                }
            }
            Ok(())
        })?;

        debug!(
            "event=record_delete module=repo status=ok kind={} count={}",
            R::KIND,
            ids.len()
        );
        Ok(())
    }

    fn query<R: Record>(&self, query: &RecordQuery) -> RepoResult<Vec<R>> {
        query.check(R::KIND)?;

        let oversized = query
            .filters
            .iter()
            .enumerate()
            .find_map(|(index, filter)| match filter {
                FieldFilter::In(field, values) if values.len() > MAX_IN_BIND_VALUES => {
                    Some((index, *field, values))
                }
                _ => None,
            });
        let Some((index, field, values)) = oversized else {
            return self.select_records(query);
        };

        // One statement per slice keeps bind counts under SQLite's variable
        // limit. Rows matched by a value repeated across slices are kept once.
        let mut records: Vec<R> = Vec::new();
        let mut seen: HashSet<RecordId> = HashSet::new();
        for chunk in values.chunks(MAX_IN_BIND_VALUES) {
            let remaining = match query.limit {
                Some(limit) => {
                    let taken = u32::try_from(records.len()).unwrap_or(u32::MAX);
                    match limit.saturating_sub(taken) {
                        0 => break,
                        remaining => Some(remaining),
                    }
                }
                None => None,
            };

            let mut slice_query = query.clone();
            slice_query.filters[index] = FieldFilter::In(field, chunk.to_vec());
            slice_query.limit = remaining;
            for record in self.query::<R>(&slice_query)? {
                if record.id().is_some_and(|id| seen.insert(id)) {
                    records.push(record);
                }
            }
        }

        debug!(
            "event=record_query module=repo status=ok kind={} in_values={} slices={} rows={}",
            R::KIND,
            values.len(),
            values.len().div_ceil(MAX_IN_BIND_VALUES),
            records.len()
        );
        Ok(records)
    }

    fn in_transaction<T, F>(&self, work: F) -> RepoResult<T>
    where
        F: FnOnce(&Self) -> RepoResult<T>,
    {
        with_savepoint(self.conn, || work(self))
    }
}

/// Runs `work` inside a savepoint, rolling it back when `work` fails.
///
/// Outside any transaction the savepoint opens one; inside another scope
/// it nests. A failed `RELEASE` (the commit of an outermost scope) is
/// rolled back too, so no transaction is left open.
fn with_savepoint<T>(conn: &Connection, work: impl FnOnce() -> RepoResult<T>) -> RepoResult<T> {
    conn.execute_batch(&format!("SAVEPOINT {SAVEPOINT_NAME};"))?;
    let result = work().and_then(|value| {
        conn.execute_batch(&format!("RELEASE SAVEPOINT {SAVEPOINT_NAME};"))?;
        Ok(value)
    });
    if result.is_err() {
        rollback_savepoint(conn);
    }
    result
}

fn rollback_savepoint(conn: &Connection) {
    if let Err(rollback_err) = conn.execute_batch(&format!(
        "ROLLBACK TO SAVEPOINT {SAVEPOINT_NAME}; RELEASE SAVEPOINT {SAVEPOINT_NAME};"
    )) {
        warn!(
            "event=savepoint_rollback module=repo status=error error={}",
            rollback_err
        );
    }
}

fn columns(kind: RecordKind) -> Vec<&'static str> {
    std::iter::once(RecordField::Id.column())
        .chain(kind.fields().iter().map(|field| field.column()))
        .collect()
}

fn select_sql(kind: RecordKind) -> String {
    format!("SELECT {} FROM {}", columns(kind).join(", "), kind.table())
}

fn insert_sql(kind: RecordKind) -> String {
    let columns = columns(kind);
    let placeholders = (1..=columns.len())
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({placeholders});",
        kind.table(),
        columns.join(", ")
    )
}

// Binds as `row_values`: ?1 is the id, data fields follow.
fn update_sql(kind: RecordKind) -> String {
    let assignments = kind
        .fields()
        .iter()
        .enumerate()
        .map(|(index, field)| format!("{} = ?{}", field.column(), index + 2))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "UPDATE {}
         SET {assignments}, updated_at = (strftime('%s', 'now') * 1000)
         WHERE id = ?1;",
        kind.table()
    )
}

fn row_values<R: Record>(id: RecordId, record: &R) -> Vec<Value> {
    let values = record.to_field_values();
    std::iter::once(Value::Text(id.to_string()))
        .chain(
            R::KIND
                .fields()
                .iter()
                .map(|field| values.get(*field).map_or(Value::Null, to_sql_value)),
        )
        .collect()
}

fn to_sql_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Text(text) => Value::Text(text.clone()),
        FieldValue::Id(id) => Value::Text(id.to_string()),
        FieldValue::Bool(flag) => Value::Integer(i64::from(*flag)),
        FieldValue::Date(date) => Value::Text(date.format(DATE_FORMAT).to_string()),
        FieldValue::Number(number) => Value::Real(*number),
    }
}

fn parse_record_row<R: Record>(row: &Row<'_>) -> RepoResult<R> {
    let kind = R::KIND;
    let id_text: String = row.get(RecordField::Id.column())?;
    let id = parse_uuid(&id_text, kind, RecordField::Id)?;

    let mut values = FieldValues::new();
    for field in kind.fields() {
        values.set(*field, read_column(row, kind, *field)?);
    }

    let record = R::from_field_values(id, &values)?;
    record.validate()?;
    Ok(record)
}

fn read_column(
    row: &Row<'_>,
    kind: RecordKind,
    field: RecordField,
) -> RepoResult<Option<FieldValue>> {
    let column = field.column();
    let value = match field.value_type() {
        FieldType::Text => row.get::<_, Option<String>>(column)?.map(FieldValue::Text),
        FieldType::Id => match row.get::<_, Option<String>>(column)? {
            Some(text) => Some(FieldValue::Id(parse_uuid(&text, kind, field)?)),
            None => None,
        },
        FieldType::Bool => match row.get::<_, Option<i64>>(column)? {
            None => None,
            Some(0) => Some(FieldValue::Bool(false)),
            Some(1) => Some(FieldValue::Bool(true)),
            Some(other) => {
                return Err(RepoError::InvalidData(format!(
                    "invalid boolean `{other}` in {}.{column}",
                    kind.table()
                )));
            }
        },
        FieldType::Date => match row.get::<_, Option<String>>(column)? {
            Some(text) => {
                let date = NaiveDate::parse_from_str(&text, DATE_FORMAT).map_err(|_| {
                    RepoError::InvalidData(format!(
                        "invalid date `{text}` in {}.{column}",
                        kind.table()
                    ))
                })?;
                Some(FieldValue::Date(date))
            }
            None => None,
        },
        FieldType::Number => row.get::<_, Option<f64>>(column)?.map(FieldValue::Number),
    };
    Ok(value)
}

fn parse_uuid(value: &str, kind: RecordKind, field: RecordField) -> RepoResult<Uuid> {
    Uuid::parse_str(value).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid uuid `{value}` in {}.{}",
            kind.table(),
            field.column()
        ))
    })
}

fn ensure_store_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for kind in RecordKind::ALL {
        let table = kind.table();
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for column in columns(kind) {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
