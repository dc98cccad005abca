//! Shared record contract implemented by every business record type.
//!
//! # Responsibility
//! - Expose identity, validation and field projection uniformly so
//!   providers can persist any record kind generically.
//!
//! # Invariants
//! - `id` is `None` until a provider assigns one on insert/upsert.
//! - `to_field_values` and `from_field_values` are inverse projections
//!   for every field listed in `RecordKind::fields()`.

use crate::model::field::{FieldDecodeError, FieldValue, FieldValues, RecordField, RecordKind};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use uuid::Uuid;

/// Provider-assigned record identifier.
pub type RecordId = Uuid;

/// Validation failure raised before a record is written.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValidationError {
    /// Required text field is missing or blank.
    MissingRequiredField {
        kind: RecordKind,
        field: RecordField,
    },
    /// Insert received a record that already carries an identifier.
    IdAssignedOnInsert { kind: RecordKind, id: RecordId },
    /// Numeric field is negative or not finite.
    InvalidAmount { kind: RecordKind, value: f64 },
}

impl Display for RecordValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRequiredField { kind, field } => {
                write!(f, "required field missing: {kind}.{field}")
            }
            Self::IdAssignedOnInsert { kind, id } => {
                write!(f, "cannot insert {kind} that already has id {id}")
            }
            Self::InvalidAmount { kind, value } => {
                write!(f, "invalid {kind} amount {value}; expected a finite value >= 0")
            }
        }
    }
}

impl Error for RecordValidationError {}

/// Contract between record types and persistence providers.
pub trait Record: Clone + Debug + 'static {
    /// Record kind (and therefore storage table) of this type.
    const KIND: RecordKind;

    fn id(&self) -> Option<RecordId>;

    fn set_id(&mut self, id: RecordId);

    /// Checks field-level rules; providers call this before every write.
    fn validate(&self) -> Result<(), RecordValidationError>;

    /// Reads one data field. Returns `None` for null or unknown fields.
    fn field_value(&self, field: RecordField) -> Option<FieldValue>;

    /// Rebuilds a record from its persisted id and field values.
    fn from_field_values(id: RecordId, values: &FieldValues) -> Result<Self, FieldDecodeError>;

    /// Projects all data fields of this record.
    fn to_field_values(&self) -> FieldValues {
        let mut values = FieldValues::new();
        for field in Self::KIND.fields() {
            values.set(*field, self.field_value(*field));
        }
        values
    }
}

/// Rejects missing or whitespace-only required text.
pub(crate) fn require_text(
    kind: RecordKind,
    field: RecordField,
    value: Option<&str>,
) -> Result<(), RecordValidationError> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(()),
        _ => Err(RecordValidationError::MissingRequiredField { kind, field }),
    }
}

pub(crate) fn text_value(value: &Option<String>) -> Option<FieldValue> {
    value.clone().map(FieldValue::Text)
}
