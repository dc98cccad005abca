//! Contact record: a person, optionally linked to one account.

use crate::model::field::{FieldDecodeError, FieldValue, FieldValues, RecordField, RecordKind};
use crate::model::record::{require_text, Record, RecordId, RecordValidationError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: Option<RecordId>,
    pub last_name: String,
    pub account_id: Option<RecordId>,
}

impl Contact {
    pub fn new(last_name: impl Into<String>) -> Self {
        Self {
            id: None,
            last_name: last_name.into(),
            account_id: None,
        }
    }

    pub fn for_account(last_name: impl Into<String>, account_id: RecordId) -> Self {
        Self {
            account_id: Some(account_id),
            ..Self::new(last_name)
        }
    }
}

impl Record for Contact {
    const KIND: RecordKind = RecordKind::Contact;

    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    fn validate(&self) -> Result<(), RecordValidationError> {
        require_text(Self::KIND, RecordField::LastName, Some(self.last_name.as_str()))
    }

    fn field_value(&self, field: RecordField) -> Option<FieldValue> {
        match field {
            RecordField::Id => self.id.map(FieldValue::Id),
            RecordField::LastName => Some(FieldValue::Text(self.last_name.clone())),
            RecordField::AccountId => self.account_id.map(FieldValue::Id),
            _ => None,
        }
    }

    fn from_field_values(id: RecordId, values: &FieldValues) -> Result<Self, FieldDecodeError> {
        Ok(Self {
            id: Some(id),
            last_name: values
                .text(Self::KIND, RecordField::LastName)?
                .unwrap_or_default(),
            account_id: values.id(Self::KIND, RecordField::AccountId)?,
        })
    }
}
