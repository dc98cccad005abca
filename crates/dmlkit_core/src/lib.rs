//! Core of dmlkit: record DML exercises over a pluggable persistence
//! provider.
//! This crate is the single source of truth for record validation and the
//! exercise procedures.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status, LogSettings, LoggingError};
pub use model::account::Account;
pub use model::case::Case;
pub use model::contact::Contact;
pub use model::field::{FieldValue, FieldValues, RecordField, RecordKind};
pub use model::lead::Lead;
pub use model::opportunity::Opportunity;
pub use model::record::{Record, RecordId, RecordValidationError};
pub use repo::sqlite_store::SqliteRecordStore;
pub use repo::store::{
    FieldFilter, RecordQuery, RecordStore, RepoError, RepoResult, UpsertOutcome,
};
pub use service::dml_service::DmlService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
