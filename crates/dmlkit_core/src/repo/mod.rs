//! Record-persistence provider contract and SQLite implementation.
//!
//! # Responsibility
//! - Define the provider interface services depend on (`RecordStore`).
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Providers must enforce `Record::validate()` before persistence.
//! - Providers return semantic errors (`NotFound`, `Validation`) in
//!   addition to storage transport errors.

pub mod sqlite_store;
pub mod store;
