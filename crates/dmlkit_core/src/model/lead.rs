//! Lead record: a prospective contact not yet tied to an account.

use crate::model::field::{FieldDecodeError, FieldValue, FieldValues, RecordField, RecordKind};
use crate::model::record::{require_text, Record, RecordId, RecordValidationError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub id: Option<RecordId>,
    pub last_name: String,
    pub company: String,
}

impl Lead {
    pub fn new(last_name: impl Into<String>, company: impl Into<String>) -> Self {
        Self {
            id: None,
            last_name: last_name.into(),
            company: company.into(),
        }
    }
}

impl Record for Lead {
    const KIND: RecordKind = RecordKind::Lead;

    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    fn validate(&self) -> Result<(), RecordValidationError> {
        require_text(Self::KIND, RecordField::LastName, Some(self.last_name.as_str()))?;
        require_text(Self::KIND, RecordField::Company, Some(self.company.as_str()))
    }

    fn field_value(&self, field: RecordField) -> Option<FieldValue> {
        match field {
            RecordField::Id => self.id.map(FieldValue::Id),
            RecordField::LastName => Some(FieldValue::Text(self.last_name.clone())),
            RecordField::Company => Some(FieldValue::Text(self.company.clone())),
            _ => None,
        }
    }

    fn from_field_values(id: RecordId, values: &FieldValues) -> Result<Self, FieldDecodeError> {
        Ok(Self {
            id: Some(id),
            last_name: values
                .text(Self::KIND, RecordField::LastName)?
                .unwrap_or_default(),
            company: values
                .text(Self::KIND, RecordField::Company)?
                .unwrap_or_default(),
        })
    }
}
