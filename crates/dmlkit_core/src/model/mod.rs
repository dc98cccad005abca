//! Business record model shared by services and persistence providers.
//!
//! # Responsibility
//! - Define the five fixed record types and their validation rules.
//! - Describe fields generically so providers stay record-agnostic.
//!
//! # Invariants
//! - Records are transient values; identity comes from the provider.

pub mod account;
pub mod case;
pub mod contact;
pub mod field;
pub mod lead;
pub mod opportunity;
pub mod record;
