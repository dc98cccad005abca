//! Name-matched account upserts.
//!
//! # Responsibility
//! - Upsert accounts keyed by exact name.
//! - Link contacts to the account named after their last name, creating
//!   missing accounts in one batch first.
//!
//! # Invariants
//! - Account name matching is exact and case-sensitive.
//! - New accounts are persisted (and hold ids) before any contact is
//!   linked to them.
//! - Every input contact is linked and persisted, or the call fails.

use crate::model::account::Account;
use crate::model::contact::Contact;
use crate::model::field::RecordField;
use crate::model::record::RecordId;
use crate::repo::store::{RecordQuery, RecordStore, RepoError, RepoResult};
use crate::service::dml_service::{persisted_id, DmlService};
use log::info;
use std::collections::{BTreeSet, HashMap};

pub const NEW_ACCOUNT_DESCRIPTION: &str = "new";
pub const UPDATED_ACCOUNT_DESCRIPTION: &str = "updated";

impl<S: RecordStore> DmlService<S> {
    /// Upserts accounts named exactly `name`.
    ///
    /// # Contract
    /// - Existing matches all get description `updated` and are persisted
    ///   in one batch.
    /// - Without a match, one account with description `new` is created.
    /// - Returns the first persisted account. With several matches, which
    ///   one comes first follows the store's query order and is not fixed.
    pub fn upsert_account(&self, name: &str) -> RepoResult<Account> {
        self.store.in_transaction(|store| {
            let query = RecordQuery::of::<Account>().filter_eq(RecordField::Name, name);
            let mut accounts = store.query::<Account>(&query)?;

            let description = if accounts.is_empty() {
                accounts.push(Account::new(name));
                NEW_ACCOUNT_DESCRIPTION
            } else {
                UPDATED_ACCOUNT_DESCRIPTION
            };
            for account in &mut accounts {
                account.description = Some(description.to_string());
            }

            let outcome = store.upsert(&mut accounts)?;
            info!(
                "event=upsert_account module=service status=ok created={} updated={}",
                outcome.created, outcome.updated
            );

            accounts.into_iter().next().ok_or_else(|| {
                RepoError::InvalidData(format!("upsert returned no account for name `{name}`"))
            })
        })
    }

    /// Links each contact to the account named after its last name.
    ///
    /// Missing accounts are inserted in one batch, then all contacts are
    /// upserted in one batch with `account_id` set. Contacts sharing a last
    /// name share one account. When several accounts already carry the
    /// same name, the first one returned by the store is used.
    pub fn upsert_accounts_with_contacts(&self, contacts: Vec<Contact>) -> RepoResult<Vec<Contact>> {
        self.store.in_transaction(|store| {
            let last_names: BTreeSet<&str> = contacts
                .iter()
                .map(|contact| contact.last_name.as_str())
                .collect();

            let query = RecordQuery::of::<Account>()
                .filter_in(RecordField::Name, last_names.iter().copied());
            let mut existing: HashMap<String, RecordId> = HashMap::new();
            for account in store.query::<Account>(&query)? {
                let id = persisted_id(&account)?;
                existing.entry(account.name).or_insert(id);
            }

            let mut created: Vec<Account> = last_names
                .iter()
                .filter(|name| !existing.contains_key(**name))
                .map(|name| Account::new(*name))
                .collect();
            if !created.is_empty() {
                store.insert(&mut created)?;
            }

            let mut created_ids: HashMap<String, RecordId> = HashMap::new();
            for account in &created {
                created_ids.insert(account.name.clone(), persisted_id(account)?);
            }

            let mut staged = Vec::with_capacity(contacts.len());
            for mut contact in contacts.iter().cloned() {
                let account_id = created_ids
                    .get(contact.last_name.as_str())
                    .or_else(|| existing.get(contact.last_name.as_str()))
                    .copied()
                    .ok_or_else(|| {
                        RepoError::InvalidData(format!(
                            "no account resolved for contact last name `{}`",
                            contact.last_name
                        ))
                    })?;
                contact.account_id = Some(account_id);
                staged.push(contact);
            }

            let outcome = store.upsert(&mut staged)?;
            info!(
                "event=upsert_accounts_with_contacts module=service status=ok accounts_created={} accounts_reused={} contacts_created={} contacts_updated={}",
                created.len(),
                existing.len(),
                outcome.created,
                outcome.updated
            );
            Ok(staged)
        })
    }
}
