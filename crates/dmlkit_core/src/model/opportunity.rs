//! Opportunity record: a sales deal owned by an account.
//!
//! # Invariants
//! - `name`, `stage` and `close_date` are required.
//! - `amount`, when set, is finite and non-negative.

use crate::model::field::{FieldDecodeError, FieldValue, FieldValues, RecordField, RecordKind};
use crate::model::record::{require_text, text_value, Record, RecordId, RecordValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: Option<RecordId>,
    pub name: String,
    /// Sales stage label, e.g. `Prospecting` or `Qualification`.
    pub stage: Option<String>,
    pub close_date: Option<NaiveDate>,
    pub amount: Option<f64>,
    pub account_id: Option<RecordId>,
}

impl Opportunity {
    /// Builds an unsaved opportunity with only a name.
    ///
    /// Stage and close date must be filled before the record validates.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            stage: None,
            close_date: None,
            amount: None,
            account_id: None,
        }
    }
}

impl Record for Opportunity {
    const KIND: RecordKind = RecordKind::Opportunity;

    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    fn validate(&self) -> Result<(), RecordValidationError> {
        require_text(Self::KIND, RecordField::Name, Some(self.name.as_str()))?;
        require_text(Self::KIND, RecordField::Stage, self.stage.as_deref())?;
        if self.close_date.is_none() {
            return Err(RecordValidationError::MissingRequiredField {
                kind: Self::KIND,
                field: RecordField::CloseDate,
            });
        }
        if let Some(amount) = self.amount {
            if !amount.is_finite() || amount < 0.0 {
                return Err(RecordValidationError::InvalidAmount {
                    kind: Self::KIND,
                    value: amount,
                });
            }
        }
        Ok(())
    }

    fn field_value(&self, field: RecordField) -> Option<FieldValue> {
        match field {
            RecordField::Id => self.id.map(FieldValue::Id),
            RecordField::Name => Some(FieldValue::Text(self.name.clone())),
            RecordField::Stage => text_value(&self.stage),
            RecordField::CloseDate => self.close_date.map(FieldValue::Date),
            RecordField::Amount => self.amount.map(FieldValue::Number),
            RecordField::AccountId => self.account_id.map(FieldValue::Id),
            _ => None,
        }
    }

    fn from_field_values(id: RecordId, values: &FieldValues) -> Result<Self, FieldDecodeError> {
        Ok(Self {
            id: Some(id),
            name: values
                .text(Self::KIND, RecordField::Name)?
                .unwrap_or_default(),
            stage: values.text(Self::KIND, RecordField::Stage)?,
            close_date: values.date(Self::KIND, RecordField::CloseDate)?,
            amount: values.number(Self::KIND, RecordField::Amount)?,
            account_id: values.id(Self::KIND, RecordField::AccountId)?,
        })
    }
}
