//! Record-persistence provider contract.
//!
//! # Responsibility
//! - Define the batch DML surface (`insert`/`update`/`upsert`/`delete`)
//!   and filtered queries every provider must offer.
//! - Carry the typed error vocabulary providers report to callers.
//!
//! # Invariants
//! - Every batch call is all-or-nothing: on error nothing from the batch
//!   is persisted and no ids are written back to the input records.
//! - Writes call `Record::validate()` on every record before touching
//!   storage.
//! - `in_transaction` scopes nest; an error unwinds only the innermost
//!   scope that observed it.

use crate::db::DbError;
use crate::model::field::{FieldDecodeError, FieldValue, FieldValues, RecordField, RecordKind};
use crate::model::record::{Record, RecordId, RecordValidationError};
use chrono::NaiveDate;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Error surfaced by persistence providers.
#[derive(Debug)]
pub enum RepoError {
    /// A record failed validation; nothing was written.
    Validation(RecordValidationError),
    /// Storage transport or constraint failure.
    Db(DbError),
    /// Target record does not exist.
    NotFound { kind: RecordKind, id: RecordId },
    /// Update/delete received a record without an identifier.
    MissingId(RecordKind),
    /// Query targets a field or value type the kind does not support.
    InvalidQuery(String),
    /// Persisted state cannot be decoded into a valid record.
    InvalidData(String),
    /// A derived date falls outside the supported calendar.
    DateOutOfRange { base: NaiveDate, months: u32 },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::MissingId(kind) => write!(f, "{kind} has no id; persist it before this call"),
            Self::InvalidQuery(message) => write!(f, "invalid record query: {message}"),
            Self::InvalidData(message) => write!(f, "invalid persisted record data: {message}"),
            Self::DateOutOfRange { base, months } => {
                write!(f, "date {months} months after {base} is out of range")
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "record store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "record store requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "record store requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RecordValidationError> for RepoError {
    fn from(value: RecordValidationError) -> Self {
        Self::Validation(value)
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

impl From<FieldDecodeError> for RepoError {
    fn from(value: FieldDecodeError) -> Self {
        Self::InvalidData(value.to_string())
    }
}

/// One filter clause; a query matches records satisfying every clause.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldFilter {
    /// Field equals the value. Null fields never match.
    Eq(RecordField, FieldValue),
    /// Field equals any of the values. An empty list matches nothing.
    In(RecordField, Vec<FieldValue>),
}

impl FieldFilter {
    pub fn field(&self) -> RecordField {
        match self {
            Self::Eq(field, _) | Self::In(field, _) => *field,
        }
    }

    /// Evaluates the clause against one stored record.
    pub fn matches(&self, id: RecordId, values: &FieldValues) -> bool {
        let id_value = FieldValue::Id(id);
        let actual = match self.field() {
            RecordField::Id => Some(&id_value),
            field => values.get(field),
        };
        let Some(actual) = actual else {
            return false;
        };

        match self {
            Self::Eq(_, expected) => actual == expected,
            Self::In(_, expected) => expected.iter().any(|value| value == actual),
        }
    }
}

/// Filtered lookup over one record kind.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordQuery {
    pub kind: RecordKind,
    pub filters: Vec<FieldFilter>,
    pub limit: Option<u32>,
}

impl RecordQuery {
    /// Matches every record of `kind`.
    pub fn new(kind: RecordKind) -> Self {
        Self {
            kind,
            filters: Vec::new(),
            limit: None,
        }
    }

    pub fn of<R: Record>() -> Self {
        Self::new(R::KIND)
    }

    pub fn filter_eq(mut self, field: RecordField, value: impl Into<FieldValue>) -> Self {
        self.filters.push(FieldFilter::Eq(field, value.into()));
        self
    }

    pub fn filter_in<I, V>(mut self, field: RecordField, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.filters.push(FieldFilter::In(field, values));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Checks the query targets `expected` with well-typed filters.
    pub fn check(&self, expected: RecordKind) -> RepoResult<()> {
        if self.kind != expected {
            return Err(RepoError::InvalidQuery(format!(
                "query targets {} but {} records were requested",
                self.kind, expected
            )));
        }

        for filter in &self.filters {
            let field = filter.field();
            if !self.kind.has_field(field) {
                return Err(RepoError::InvalidQuery(format!(
                    "{} has no field `{field}`",
                    self.kind
                )));
            }

            let values: &[FieldValue] = match filter {
                FieldFilter::Eq(_, value) => std::slice::from_ref(value),
                FieldFilter::In(_, values) => values,
            };
            if let Some(value) = values
                .iter()
                .find(|value| value.value_type() != field.value_type())
            {
                return Err(RepoError::InvalidQuery(format!(
                    "{}.{field} cannot be compared with {value:?}",
                    self.kind
                )));
            }
        }

        Ok(())
    }
}

/// Counts reported by an upsert batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub created: usize,
    pub updated: usize,
}

/// Record-persistence provider.
///
/// All methods are generic over the record type so one provider serves
/// every record kind.
pub trait RecordStore {
    /// Inserts new records and writes generated ids back into them.
    ///
    /// Records that already carry an id are rejected.
    fn insert<R: Record>(&self, records: &mut [R]) -> RepoResult<Vec<RecordId>>;

    /// Replaces stored field values of existing records.
    fn update<R: Record>(&self, records: &[R]) -> RepoResult<()>;

    /// Inserts records without an id and updates records with one.
    fn upsert<R: Record>(&self, records: &mut [R]) -> RepoResult<UpsertOutcome>;

    /// Removes persisted records.
    fn delete<R: Record>(&self, records: &[R]) -> RepoResult<()>;

    /// Returns records matching every filter in provider order.
    fn query<R: Record>(&self, query: &RecordQuery) -> RepoResult<Vec<R>>;

    /// Loads one record by id.
    fn get<R: Record>(&self, id: RecordId) -> RepoResult<Option<R>> {
        let query = RecordQuery::of::<R>().filter_eq(RecordField::Id, id).limit(1);
        Ok(self.query(&query)?.into_iter().next())
    }

    /// Runs `work` in an all-or-nothing scope.
    fn in_transaction<T, F>(&self, work: F) -> RepoResult<T>
    where
        F: FnOnce(&Self) -> RepoResult<T>;
}

impl<S: RecordStore> RecordStore for &S {
    fn insert<R: Record>(&self, records: &mut [R]) -> RepoResult<Vec<RecordId>> {
        (**self).insert(records)
    }

    fn update<R: Record>(&self, records: &[R]) -> RepoResult<()> {
        (**self).update(records)
    }

    fn upsert<R: Record>(&self, records: &mut [R]) -> RepoResult<UpsertOutcome> {
        (**self).upsert(records)
    }

    fn delete<R: Record>(&self, records: &[R]) -> RepoResult<()> {
        (**self).delete(records)
    }

    fn query<R: Record>(&self, query: &RecordQuery) -> RepoResult<Vec<R>> {
        (**self).query(query)
    }

    fn get<R: Record>(&self, id: RecordId) -> RepoResult<Option<R>> {
        (**self).get(id)
    }

    fn in_transaction<T, F>(&self, work: F) -> RepoResult<T>
    where
        F: FnOnce(&Self) -> RepoResult<T>,
    {
        (**self).in_transaction(|_| work(self))
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldFilter, RecordQuery, RepoError};
    use crate::model::account::Account;
    use crate::model::contact::Contact;
    use crate::model::field::{FieldValue, FieldValues, RecordField, RecordKind};
    use uuid::Uuid;

    #[test]
    fn check_rejects_field_unknown_to_kind() {
        let query = RecordQuery::of::<Contact>().filter_eq(RecordField::Industry, "Energy");
        let err = query.check(RecordKind::Contact).unwrap_err();
        assert!(matches!(err, RepoError::InvalidQuery(message) if message.contains("industry")));
    }

    #[test]
    fn check_rejects_mismatched_value_type_and_kind() {
        let query = RecordQuery::of::<Account>().filter_eq(RecordField::Active, "yes");
        assert!(matches!(
            query.check(RecordKind::Account),
            Err(RepoError::InvalidQuery(_))
        ));

        let query = RecordQuery::of::<Account>();
        assert!(matches!(
            query.check(RecordKind::Lead),
            Err(RepoError::InvalidQuery(_))
        ));
    }

    #[test]
    fn filters_match_ids_values_and_skip_nulls() {
        let id = Uuid::new_v4();
        let mut values = FieldValues::new();
        values.set(RecordField::Name, Some("Doe".into()));

        assert!(FieldFilter::Eq(RecordField::Id, FieldValue::Id(id)).matches(id, &values));
        assert!(FieldFilter::In(RecordField::Name, vec!["Jane".into(), "Doe".into()])
            .matches(id, &values));
        assert!(!FieldFilter::In(RecordField::Name, Vec::new()).matches(id, &values));
        assert!(!FieldFilter::Eq(RecordField::Industry, "Doe".into()).matches(id, &values));
    }
}
