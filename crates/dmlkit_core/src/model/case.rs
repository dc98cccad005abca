//! Case record: a service request, usually raised against an account.

use crate::model::field::{FieldDecodeError, FieldValue, FieldValues, RecordField, RecordKind};
use crate::model::record::{text_value, Record, RecordId, RecordValidationError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    pub id: Option<RecordId>,
    pub status: Option<String>,
    pub origin: Option<String>,
    pub subject: Option<String>,
    pub account_id: Option<RecordId>,
}

impl Record for Case {
    const KIND: RecordKind = RecordKind::Case;

    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    // No required fields.
    fn validate(&self) -> Result<(), RecordValidationError> {
        Ok(())
    }

    fn field_value(&self, field: RecordField) -> Option<FieldValue> {
        match field {
            RecordField::Id => self.id.map(FieldValue::Id),
            RecordField::Status => text_value(&self.status),
            RecordField::Origin => text_value(&self.origin),
            RecordField::Subject => text_value(&self.subject),
            RecordField::AccountId => self.account_id.map(FieldValue::Id),
            _ => None,
        }
    }

    fn from_field_values(id: RecordId, values: &FieldValues) -> Result<Self, FieldDecodeError> {
        Ok(Self {
            id: Some(id),
            status: values.text(Self::KIND, RecordField::Status)?,
            origin: values.text(Self::KIND, RecordField::Origin)?,
            subject: values.text(Self::KIND, RecordField::Subject)?,
            account_id: values.id(Self::KIND, RecordField::AccountId)?,
        })
    }
}
