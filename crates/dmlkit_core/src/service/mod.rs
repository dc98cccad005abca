//! DML exercise services.
//!
//! # Responsibility
//! - Orchestrate record construction and provider calls per exercise.
//! - Keep callers decoupled from storage details via an injected store.

pub mod account_upsert;
pub mod dml_service;
