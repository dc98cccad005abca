#![allow(dead_code)]

use dmlkit_core::db::open_db_in_memory;
use dmlkit_core::{
    FieldValues, Record, RecordId, RecordKind, RecordQuery, RecordStore, RecordValidationError,
    RepoError, RepoResult, UpsertOutcome,
};
use rusqlite::Connection;
use std::cell::RefCell;
use std::collections::BTreeMap;
use uuid::Uuid;

/// One provider call as seen by `RecordingStore`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Insert(RecordKind, usize),
    Update(RecordKind, usize),
    Upsert(RecordKind, usize),
    Delete(RecordKind, usize),
    Query(RecordKind),
    Transaction,
}

type Tables = BTreeMap<RecordKind, Vec<(RecordId, FieldValues)>>;

/// In-memory `RecordStore` that logs every call and every inserted row.
#[derive(Default)]
pub struct RecordingStore {
    tables: RefCell<Tables>,
    calls: RefCell<Vec<Call>>,
    inserted: RefCell<Vec<(RecordKind, FieldValues)>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds records directly, bypassing the call log.
    pub fn seed<R: Record>(&self, records: &mut [R]) {
        let mut tables = self.tables.borrow_mut();
        let rows = tables.entry(R::KIND).or_default();
        for record in records.iter_mut() {
            let id = Uuid::new_v4();
            record.set_id(id);
            rows.push((id, record.to_field_values()));
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Calls excluding transaction markers and reads.
    pub fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| !matches!(call, Call::Query(_) | Call::Transaction))
            .collect()
    }

    pub fn count(&self, kind: RecordKind) -> usize {
        self.tables.borrow().get(&kind).map_or(0, Vec::len)
    }

    pub fn all<R: Record>(&self) -> Vec<R> {
        self.query(&RecordQuery::of::<R>()).unwrap()
    }

    pub fn inserted_values(&self, kind: RecordKind) -> Vec<FieldValues> {
        self.inserted
            .borrow()
            .iter()
            .filter(|(inserted_kind, _)| *inserted_kind == kind)
            .map(|(_, values)| values.clone())
            .collect()
    }

    fn log(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn position(&self, kind: RecordKind, id: RecordId) -> RepoResult<usize> {
        self.tables
            .borrow()
            .get(&kind)
            .and_then(|rows| rows.iter().position(|(row_id, _)| *row_id == id))
            .ok_or(RepoError::NotFound { kind, id })
    }
}

impl RecordStore for RecordingStore {
    fn insert<R: Record>(&self, records: &mut [R]) -> RepoResult<Vec<RecordId>> {
        self.log(Call::Insert(R::KIND, records.len()));
        for record in records.iter() {
            if let Some(id) = record.id() {
                return Err(RecordValidationError::IdAssignedOnInsert { kind: R::KIND, id }.into());
            }
            record.validate()?;
        }

        let mut ids = Vec::with_capacity(records.len());
        let mut tables = self.tables.borrow_mut();
        let rows = tables.entry(R::KIND).or_default();
        for record in records.iter_mut() {
            let id = Uuid::new_v4();
            let values = record.to_field_values();
            rows.push((id, values.clone()));
            self.inserted.borrow_mut().push((R::KIND, values));
            record.set_id(id);
            ids.push(id);
        }
        Ok(ids)
    }

    fn update<R: Record>(&self, records: &[R]) -> RepoResult<()> {
        self.log(Call::Update(R::KIND, records.len()));
        let mut positions = Vec::with_capacity(records.len());
        for record in records {
            let id = record.id().ok_or(RepoError::MissingId(R::KIND))?;
            record.validate()?;
            positions.push(self.position(R::KIND, id)?);
        }

        let mut tables = self.tables.borrow_mut();
        let rows = tables.entry(R::KIND).or_default();
        for (record, position) in records.iter().zip(positions) {
            rows[position].1 = record.to_field_values();
        }
        Ok(())
    }

    fn upsert<R: Record>(&self, records: &mut [R]) -> RepoResult<UpsertOutcome> {
        self.log(Call::Upsert(R::KIND, records.len()));
        let mut outcome = UpsertOutcome::default();
        for record in records.iter() {
            record.validate()?;
            if let Some(id) = record.id() {
                self.position(R::KIND, id)?;
            }
        }

        let mut tables = self.tables.borrow_mut();
        let rows = tables.entry(R::KIND).or_default();
        for record in records.iter_mut() {
            let values = record.to_field_values();
            match record.id() {
                Some(id) => {
                    if let Some(row) = rows.iter_mut().find(|(row_id, _)| *row_id == id) {
                        row.1 = values;
                    }
                    outcome.updated += 1;
                }
                None => {
                    let id = Uuid::new_v4();
                    rows.push((id, values.clone()));
                    self.inserted.borrow_mut().push((R::KIND, values));
                    record.set_id(id);
                    outcome.created += 1;
                }
            }
        }
        Ok(outcome)
    }

    fn delete<R: Record>(&self, records: &[R]) -> RepoResult<()> {
        self.log(Call::Delete(R::KIND, records.len()));
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            let id = record.id().ok_or(RepoError::MissingId(R::KIND))?;
            self.position(R::KIND, id)?;
            ids.push(id);
        }

        let mut tables = self.tables.borrow_mut();
        let rows = tables.entry(R::KIND).or_default();
        rows.retain(|(row_id, _)| !ids.contains(row_id));
        Ok(())
    }

    fn query<R: Record>(&self, query: &RecordQuery) -> RepoResult<Vec<R>> {
        self.log(Call::Query(R::KIND));
        query.check(R::KIND)?;

        let tables = self.tables.borrow();
        let mut records = Vec::new();
        for (id, values) in tables.get(&R::KIND).into_iter().flatten() {
            if query.limit.is_some_and(|limit| records.len() >= limit as usize) {
                break;
            }
            if query.filters.iter().all(|filter| filter.matches(*id, values)) {
                records.push(R::from_field_values(*id, values)?);
            }
        }
        Ok(records)
    }

    fn in_transaction<T, F>(&self, work: F) -> RepoResult<T>
    where
        F: FnOnce(&Self) -> RepoResult<T>,
    {
        self.log(Call::Transaction);
        let snapshot = self.tables.borrow().clone();
        let result = work(self);
        if result.is_err() {
            *self.tables.borrow_mut() = snapshot;
        }
        result
    }
}

/// Fresh migrated in-memory database.
pub fn memory_db() -> Connection {
    open_db_in_memory().unwrap()
}

pub fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| row.get(0))
        .unwrap()
}
