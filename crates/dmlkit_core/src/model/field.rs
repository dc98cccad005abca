//! Record kinds, field catalog and storage-agnostic field values.
//!
//! # Responsibility
//! - Enumerate the fixed record kinds and the fields each kind carries.
//! - Provide a typed value bag (`FieldValues`) shared by every provider.
//!
//! # Invariants
//! - `RecordField::Id` is filterable on every kind but never listed in
//!   `RecordKind::fields()`; identity is stored separately.
//! - Each field has exactly one `FieldType`; values of another type are
//!   rejected on decode.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Fixed set of business record kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Account,
    Contact,
    Opportunity,
    Lead,
    Case,
}

impl RecordKind {
    /// All kinds in schema order.
    pub const ALL: [RecordKind; 5] = [
        RecordKind::Account,
        RecordKind::Contact,
        RecordKind::Opportunity,
        RecordKind::Lead,
        RecordKind::Case,
    ];

    /// Storage table backing this kind.
    pub fn table(self) -> &'static str {
        match self {
            Self::Account => "accounts",
            Self::Contact => "contacts",
            Self::Opportunity => "opportunities",
            Self::Lead => "leads",
            Self::Case => "cases",
        }
    }

    /// Human-readable kind name used in errors and logs.
    pub fn label(self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Contact => "contact",
            Self::Opportunity => "opportunity",
            Self::Lead => "lead",
            Self::Case => "case",
        }
    }

    /// Data fields of this kind, excluding the identifier.
    pub fn fields(self) -> &'static [RecordField] {
        match self {
            Self::Account => &[
                RecordField::Name,
                RecordField::Industry,
                RecordField::Description,
                RecordField::Active,
            ],
            Self::Contact => &[RecordField::LastName, RecordField::AccountId],
            Self::Opportunity => &[
                RecordField::Name,
                RecordField::Stage,
                RecordField::CloseDate,
                RecordField::Amount,
                RecordField::AccountId,
            ],
            Self::Lead => &[RecordField::LastName, RecordField::Company],
            Self::Case => &[
                RecordField::Status,
                RecordField::Origin,
                RecordField::Subject,
                RecordField::AccountId,
            ],
        }
    }

    /// Returns whether `field` can be read or filtered on this kind.
    pub fn has_field(self, field: RecordField) -> bool {
        field == RecordField::Id || self.fields().contains(&field)
    }
}

impl Display for RecordKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Every field known to any record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordField {
    Id,
    Name,
    Industry,
    Description,
    Active,
    LastName,
    AccountId,
    Stage,
    CloseDate,
    Amount,
    Company,
    Status,
    Origin,
    Subject,
}

impl RecordField {
    /// Storage column name.
    pub fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Industry => "industry",
            Self::Description => "description",
            Self::Active => "active",
            Self::LastName => "last_name",
            Self::AccountId => "account_id",
            Self::Stage => "stage",
            Self::CloseDate => "close_date",
            Self::Amount => "amount",
            Self::Company => "company",
            Self::Status => "status",
            Self::Origin => "origin",
            Self::Subject => "subject",
        }
    }

    /// Value type stored in this field.
    pub fn value_type(self) -> FieldType {
        match self {
            Self::Id | Self::AccountId => FieldType::Id,
            Self::Active => FieldType::Bool,
            Self::CloseDate => FieldType::Date,
            Self::Amount => FieldType::Number,
            Self::Name
            | Self::Industry
            | Self::Description
            | Self::LastName
            | Self::Stage
            | Self::Company
            | Self::Status
            | Self::Origin
            | Self::Subject => FieldType::Text,
        }
    }
}

impl Display for RecordField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}

/// Primitive value types a field may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Id,
    Bool,
    Date,
    Number,
}

/// One non-null field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum FieldValue {
    Text(String),
    Id(Uuid),
    Bool(bool),
    Date(NaiveDate),
    Number(f64),
}

impl FieldValue {
    pub fn value_type(&self) -> FieldType {
        match self {
            Self::Text(_) => FieldType::Text,
            Self::Id(_) => FieldType::Id,
            Self::Bool(_) => FieldType::Bool,
            Self::Date(_) => FieldType::Date,
            Self::Number(_) => FieldType::Number,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Uuid> for FieldValue {
    fn from(value: Uuid) -> Self {
        Self::Id(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// Field value could not be decoded into the record's expected type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecodeError {
    pub kind: RecordKind,
    pub field: RecordField,
    pub expected: FieldType,
}

impl Display for FieldDecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{} expected a {:?} value",
            self.kind, self.field, self.expected
        )
    }
}

impl Error for FieldDecodeError {}

/// Sparse map of field values; absent keys are null.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldValues {
    values: BTreeMap<RecordField, FieldValue>,
}

impl FieldValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets or clears (`None`) one field.
    pub fn set(&mut self, field: RecordField, value: Option<FieldValue>) {
        match value {
            Some(value) => {
                self.values.insert(field, value);
            }
            None => {
                self.values.remove(&field);
            }
        }
    }

    pub fn get(&self, field: RecordField) -> Option<&FieldValue> {
        self.values.get(&field)
    }

    pub fn text(&self, kind: RecordKind, field: RecordField) -> Result<Option<String>, FieldDecodeError> {
        match self.get(field) {
            None => Ok(None),
            Some(FieldValue::Text(value)) => Ok(Some(value.clone())),
            Some(_) => Err(mismatch(kind, field, FieldType::Text)),
        }
    }

    pub fn id(&self, kind: RecordKind, field: RecordField) -> Result<Option<Uuid>, FieldDecodeError> {
        match self.get(field) {
            None => Ok(None),
            Some(FieldValue::Id(value)) => Ok(Some(*value)),
            Some(_) => Err(mismatch(kind, field, FieldType::Id)),
        }
    }

    pub fn bool(&self, kind: RecordKind, field: RecordField) -> Result<Option<bool>, FieldDecodeError> {
        match self.get(field) {
            None => Ok(None),
            Some(FieldValue::Bool(value)) => Ok(Some(*value)),
            Some(_) => Err(mismatch(kind, field, FieldType::Bool)),
        }
    }

    pub fn date(
        &self,
        kind: RecordKind,
        field: RecordField,
    ) -> Result<Option<NaiveDate>, FieldDecodeError> {
        match self.get(field) {
            None => Ok(None),
            Some(FieldValue::Date(value)) => Ok(Some(*value)),
            Some(_) => Err(mismatch(kind, field, FieldType::Date)),
        }
    }

    pub fn number(&self, kind: RecordKind, field: RecordField) -> Result<Option<f64>, FieldDecodeError> {
        match self.get(field) {
            None => Ok(None),
            Some(FieldValue::Number(value)) => Ok(Some(*value)),
            Some(_) => Err(mismatch(kind, field, FieldType::Number)),
        }
    }
}

fn mismatch(kind: RecordKind, field: RecordField, expected: FieldType) -> FieldDecodeError {
    FieldDecodeError {
        kind,
        field,
        expected,
    }
}
