//! Account record: an organization that owns contacts, opportunities and cases.
//!
//! # Invariants
//! - `name` is required and non-blank.
//! - Account names are not unique; lookups by name may return several rows.

use crate::model::field::{FieldDecodeError, FieldValue, FieldValues, RecordField, RecordKind};
use crate::model::record::{require_text, text_value, Record, RecordId, RecordValidationError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: Option<RecordId>,
    pub name: String,
    pub industry: Option<String>,
    pub description: Option<String>,
    /// Custom active flag; `None` when never set.
    pub active: Option<bool>,
}

impl Account {
    /// Builds an unsaved account with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            industry: None,
            description: None,
            active: None,
        }
    }

    pub fn with_industry(mut self, industry: impl Into<String>) -> Self {
        self.industry = Some(industry.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl Record for Account {
    const KIND: RecordKind = RecordKind::Account;

    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    fn validate(&self) -> Result<(), RecordValidationError> {
        require_text(Self::KIND, RecordField::Name, Some(self.name.as_str()))
    }

    fn field_value(&self, field: RecordField) -> Option<FieldValue> {
        match field {
            RecordField::Id => self.id.map(FieldValue::Id),
            RecordField::Name => Some(FieldValue::Text(self.name.clone())),
            RecordField::Industry => text_value(&self.industry),
            RecordField::Description => text_value(&self.description),
            RecordField::Active => self.active.map(FieldValue::Bool),
            _ => None,
        }
    }

    fn from_field_values(id: RecordId, values: &FieldValues) -> Result<Self, FieldDecodeError> {
        Ok(Self {
            id: Some(id),
            name: values
                .text(Self::KIND, RecordField::Name)?
                .unwrap_or_default(),
            industry: values.text(Self::KIND, RecordField::Industry)?,
            description: values.text(Self::KIND, RecordField::Description)?,
            active: values.bool(Self::KIND, RecordField::Active)?,
        })
    }
}
