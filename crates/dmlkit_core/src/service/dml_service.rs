//! Single-purpose DML exercises over an injected record store.
//!
//! # Responsibility
//! - Build records with fixed or caller-supplied values and submit them
//!   through exactly the batch calls each exercise documents.
//! - Wrap every exercise in one `RecordStore::in_transaction` scope.
//!
//! # Invariants
//! - The service holds no state besides the store and its "today" date.
//! - Provider errors are returned unchanged; nothing is retried.
//!
//! The name-matching upserts live in `service::account_upsert`.

use crate::model::account::Account;
use crate::model::case::Case;
use crate::model::contact::Contact;
use crate::model::field::RecordField;
use crate::model::lead::Lead;
use crate::model::opportunity::Opportunity;
use crate::model::record::{Record, RecordId};
use crate::repo::store::{RecordQuery, RecordStore, RepoError, RepoResult};
use chrono::{Local, Months, NaiveDate};
use log::info;
use std::collections::{BTreeSet, HashMap};

pub const STARTER_ACCOUNT_NAME: &str = "Acme Learning";
pub const STARTER_ACCOUNT_INDUSTRY: &str = "Education";
pub const STARTER_CONTACT_LAST_NAME: &str = "Smith";
pub const QUALIFICATION_STAGE: &str = "Qualification";
pub const PROSPECTING_STAGE: &str = "Prospecting";
pub const QUALIFIED_AMOUNT: f64 = 50_000.0;
pub const CLOSE_DATE_OFFSET_MONTHS: u32 = 3;
pub const LEAD_PLACEHOLDER_COMPANY: &str = "Unknown Company";
pub const CASE_STATUS_NEW: &str = "New";
pub const CASE_ORIGIN_PHONE: &str = "Phone";

/// Stateless facade exposing every DML exercise.
pub struct DmlService<S: RecordStore> {
    pub(crate) store: S,
    today: NaiveDate,
}

impl<S: RecordStore> DmlService<S> {
    /// Creates a service whose date-relative exercises use the local date.
    pub fn new(store: S) -> Self {
        Self::with_today(store, Local::now().date_naive())
    }

    /// Creates a service with a fixed "today", used for close dates.
    pub fn with_today(store: S, today: NaiveDate) -> Self {
        Self { store, today }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Close date assigned by opportunity exercises: three months out,
    /// clamped to the end of a shorter month.
    ///
    /// # Errors
    /// - `RepoError::DateOutOfRange` when "today" is within three months
    ///   of the last representable date.
    pub fn default_close_date(&self) -> RepoResult<NaiveDate> {
        self.today
            .checked_add_months(Months::new(CLOSE_DATE_OFFSET_MONTHS))
            .ok_or(RepoError::DateOutOfRange {
                base: self.today,
                months: CLOSE_DATE_OFFSET_MONTHS,
            })
    }

    /// Inserts the fixed starter account and returns its id.
    pub fn insert_new_account(&self) -> RepoResult<RecordId> {
        let mut account = Account::new(STARTER_ACCOUNT_NAME).with_industry(STARTER_ACCOUNT_INDUSTRY);
        account.active = Some(true);

        let account = self
            .store
            .in_transaction(|store| insert_one(store, account))?;
        let id = persisted_id(&account)?;
        info!("event=insert_new_account module=service status=ok id={id}");
        Ok(id)
    }

    /// Inserts one account with the given name and industry.
    pub fn create_account(
        &self,
        name: impl Into<String>,
        industry: impl Into<String>,
    ) -> RepoResult<RecordId> {
        let account = Account::new(name).with_industry(industry);
        let account = self
            .store
            .in_transaction(|store| insert_one(store, account))?;
        let id = persisted_id(&account)?;
        info!("event=create_account module=service status=ok id={id}");
        Ok(id)
    }

    /// Inserts the fixed starter contact under `account_id`.
    pub fn insert_new_contact(&self, account_id: RecordId) -> RepoResult<RecordId> {
        let contact = Contact::for_account(STARTER_CONTACT_LAST_NAME, account_id);
        let contact = self
            .store
            .in_transaction(|store| insert_one(store, contact))?;
        let id = persisted_id(&contact)?;
        info!("event=insert_new_contact module=service status=ok id={id} account_id={account_id}");
        Ok(id)
    }

    /// Renames an existing contact.
    ///
    /// # Errors
    /// - `RepoError::NotFound` when `contact_id` is unknown.
    pub fn update_contact_last_name(
        &self,
        contact_id: RecordId,
        last_name: impl Into<String>,
    ) -> RepoResult<Contact> {
        self.store.in_transaction(|store| {
            let mut contact = load_required::<_, Contact>(store, contact_id)?;
            contact.last_name = last_name.into();
            store.update(std::slice::from_ref(&contact))?;
            Ok(contact)
        })
    }

    /// Moves an existing opportunity to a new stage.
    pub fn update_opportunity_stage(
        &self,
        opportunity_id: RecordId,
        stage: impl Into<String>,
    ) -> RepoResult<Opportunity> {
        self.store.in_transaction(|store| {
            let mut opportunity = load_required::<_, Opportunity>(store, opportunity_id)?;
            opportunity.stage = Some(stage.into());
            store.update(std::slice::from_ref(&opportunity))?;
            Ok(opportunity)
        })
    }

    /// Overwrites an existing account's name and industry.
    pub fn update_account_fields(
        &self,
        account_id: RecordId,
        name: impl Into<String>,
        industry: impl Into<String>,
    ) -> RepoResult<Account> {
        self.store.in_transaction(|store| {
            let mut account = load_required::<_, Account>(store, account_id)?;
            account.name = name.into();
            account.industry = Some(industry.into());
            store.update(std::slice::from_ref(&account))?;
            Ok(account)
        })
    }

    /// Qualifies every opportunity and upserts the whole list in one batch.
    ///
    /// Each record gets stage `Qualification`, the default close date and
    /// amount 50000; records without an id are created.
    pub fn upsert_opportunity_list(
        &self,
        mut opportunities: Vec<Opportunity>,
    ) -> RepoResult<Vec<Opportunity>> {
        let close_date = self.default_close_date()?;
        for opportunity in &mut opportunities {
            opportunity.stage = Some(QUALIFICATION_STAGE.to_string());
            opportunity.close_date = Some(close_date);
            opportunity.amount = Some(QUALIFIED_AMOUNT);
        }

        let outcome = self
            .store
            .in_transaction(|store| store.upsert(&mut opportunities))?;
        info!(
            "event=upsert_opportunity_list module=service status=ok created={} updated={}",
            outcome.created, outcome.updated
        );
        Ok(opportunities)
    }

    /// Upserts one opportunity per distinct name under the named account.
    ///
    /// # Contract
    /// - The account is the first exact-name match, or is inserted.
    /// - Names that already exist on that account reuse the stored record;
    ///   others become new `Prospecting` opportunities.
    /// - Duplicate input names are collapsed, keeping first occurrence order.
    pub fn upsert_opportunities(
        &self,
        account_name: &str,
        opportunity_names: &[impl AsRef<str>],
    ) -> RepoResult<Vec<Opportunity>> {
        let close_date = self.default_close_date()?;
        let mut seen = BTreeSet::new();
        let names: Vec<&str> = opportunity_names
            .iter()
            .map(|name| name.as_ref())
            .filter(|name| seen.insert(*name))
            .collect();

        self.store.in_transaction(|store| {
            let lookup = RecordQuery::of::<Account>()
                .filter_eq(RecordField::Name, account_name)
                .limit(1);
            let account = match store.query::<Account>(&lookup)?.into_iter().next() {
                Some(account) => account,
                None => insert_one(store, Account::new(account_name))?,
            };
            let account_id = persisted_id(&account)?;

            let existing_query = RecordQuery::of::<Opportunity>()
                .filter_eq(RecordField::AccountId, account_id)
                .filter_in(RecordField::Name, names.iter().copied());
            let mut existing: HashMap<String, Opportunity> = HashMap::new();
            for opportunity in store.query::<Opportunity>(&existing_query)? {
                existing
                    .entry(opportunity.name.clone())
                    .or_insert(opportunity);
            }

            let mut batch: Vec<Opportunity> = names
                .iter()
                .map(|name| {
                    existing.remove(*name).unwrap_or_else(|| {
                        let mut opportunity = Opportunity::new(*name);
                        opportunity.stage = Some(PROSPECTING_STAGE.to_string());
                        opportunity.close_date = Some(close_date);
                        opportunity.account_id = Some(account_id);
                        opportunity
                    })
                })
                .collect();

            let outcome = store.upsert(&mut batch)?;
            info!(
                "event=upsert_opportunities module=service status=ok account_id={} created={} updated={}",
                account_id, outcome.created, outcome.updated
            );
            Ok(batch)
        })
    }

    /// Inserts one lead per last name, then deletes them again.
    ///
    /// Returns the ids the leads held while they existed.
    pub fn insert_and_delete_leads(&self, last_names: &[impl AsRef<str>]) -> RepoResult<Vec<RecordId>> {
        let mut leads: Vec<Lead> = last_names
            .iter()
            .map(|name| Lead::new(name.as_ref(), LEAD_PLACEHOLDER_COMPANY))
            .collect();

        let ids = self.store.in_transaction(|store| {
            let ids = store.insert(&mut leads)?;
            store.delete(&leads)?;
            Ok(ids)
        })?;
        info!(
            "event=insert_and_delete_leads module=service status=ok count={}",
            ids.len()
        );
        Ok(ids)
    }

    /// Creates `count` cases on the account, then deletes them again.
    ///
    /// Subjects run `Case # 0` through `Case # {count - 1}`.
    pub fn create_and_delete_cases(
        &self,
        account_id: RecordId,
        count: usize,
    ) -> RepoResult<Vec<RecordId>> {
        let mut cases: Vec<Case> = (0..count)
            .map(|index| Case {
                status: Some(CASE_STATUS_NEW.to_string()),
                origin: Some(CASE_ORIGIN_PHONE.to_string()),
                subject: Some(case_subject(index)),
                account_id: Some(account_id),
                ..Case::default()
            })
            .collect();

        let ids = self.store.in_transaction(|store| {
            let ids = store.insert(&mut cases)?;
            store.delete(&cases)?;
            Ok(ids)
        })?;
        info!(
            "event=create_and_delete_cases module=service status=ok account_id={} count={}",
            account_id,
            ids.len()
        );
        Ok(ids)
    }
}

pub fn case_subject(index: usize) -> String {
    format!("Case # {index}")
}

pub(crate) fn insert_one<S: RecordStore, R: Record>(store: &S, record: R) -> RepoResult<R> {
    let mut batch = [record];
    store.insert(&mut batch)?;
    let [record] = batch;
    Ok(record)
}

pub(crate) fn persisted_id<R: Record>(record: &R) -> RepoResult<RecordId> {
    record.id().ok_or(RepoError::MissingId(R::KIND))
}

fn load_required<S: RecordStore, R: Record>(store: &S, id: RecordId) -> RepoResult<R> {
    store
        .get::<R>(id)?
        .ok_or(RepoError::NotFound { kind: R::KIND, id })
}
