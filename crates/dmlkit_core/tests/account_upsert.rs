mod common;

use common::{count_rows, memory_db, Call, RecordingStore};
use dmlkit_core::service::account_upsert::{NEW_ACCOUNT_DESCRIPTION, UPDATED_ACCOUNT_DESCRIPTION};
use dmlkit_core::{
    Account, Contact, DmlService, RecordField, RecordKind, RecordQuery, RecordStore, RepoError,
    SqliteRecordStore,
};
use uuid::Uuid;

#[test]
fn upsert_account_creates_account_when_name_is_unknown() {
    let conn = memory_db();
    let service = DmlService::new(SqliteRecordStore::try_new(&conn).unwrap());

    let account = service.upsert_account("Northwind").unwrap();

    assert!(account.id.is_some());
    assert_eq!(account.name, "Northwind");
    assert_eq!(account.description.as_deref(), Some(NEW_ACCOUNT_DESCRIPTION));
    assert_eq!(count_rows(&conn, "accounts"), 1);
}

#[test]
fn upsert_account_updates_single_match_without_new_rows() {
    let conn = memory_db();
    let service = DmlService::new(SqliteRecordStore::try_new(&conn).unwrap());
    let id = service.create_account("Northwind", "Retail").unwrap();

    let account = service.upsert_account("Northwind").unwrap();

    assert_eq!(account.id, Some(id));
    assert_eq!(account.description.as_deref(), Some(UPDATED_ACCOUNT_DESCRIPTION));
    assert_eq!(account.industry.as_deref(), Some("Retail"));
    assert_eq!(count_rows(&conn, "accounts"), 1);

    let stored: Account = service.store().get(id).unwrap().unwrap();
    assert_eq!(stored.description.as_deref(), Some(UPDATED_ACCOUNT_DESCRIPTION));
}

#[test]
fn upsert_account_updates_every_match() {
    let conn = memory_db();
    let service = DmlService::new(SqliteRecordStore::try_new(&conn).unwrap());
    let first = service.create_account("Doe", "Retail").unwrap();
    let second = service.create_account("Doe", "Energy").unwrap();
    let other = service.create_account("doe", "Media").unwrap();

    let account = service.upsert_account("Doe").unwrap();

    let returned = account.id.unwrap();
    assert!(returned == first || returned == second);
    for id in [first, second] {
        let stored: Account = service.store().get(id).unwrap().unwrap();
        assert_eq!(stored.description.as_deref(), Some(UPDATED_ACCOUNT_DESCRIPTION));
    }
    let untouched: Account = service.store().get(other).unwrap().unwrap();
    assert_eq!(untouched.description, None);
}

#[test]
fn upsert_account_issues_one_upsert_batch() {
    let store = RecordingStore::new();
    let mut seeded = [Account::new("Doe"), Account::new("Doe")];
    store.seed(&mut seeded);
    let service = DmlService::new(&store);

    service.upsert_account("Doe").unwrap();

    assert_eq!(store.writes(), vec![Call::Upsert(RecordKind::Account, 2)]);
    assert_eq!(store.count(RecordKind::Account), 2);
}

#[test]
fn contacts_sharing_a_last_name_share_one_new_account() {
    let conn = memory_db();
    let service = DmlService::new(SqliteRecordStore::try_new(&conn).unwrap());

    let contacts = service
        .upsert_accounts_with_contacts(vec![
            Contact::new("Doe"),
            Contact::new("Jane"),
            Contact::new("Doe"),
        ])
        .unwrap();

    assert_eq!(count_rows(&conn, "accounts"), 2);
    assert_eq!(count_rows(&conn, "contacts"), 3);
    assert!(contacts.iter().all(|contact| contact.id.is_some()));
    assert_eq!(contacts[0].account_id, contacts[2].account_id);
    assert_ne!(contacts[0].account_id, contacts[1].account_id);

    let jane_account: Account = service
        .store()
        .get(contacts[1].account_id.unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(jane_account.name, "Jane");
}

#[test]
fn existing_account_is_reused_for_matching_contacts() {
    let conn = memory_db();
    let service = DmlService::new(SqliteRecordStore::try_new(&conn).unwrap());
    let doe_id = service.create_account("Doe", "Retail").unwrap();

    let contacts = service
        .upsert_accounts_with_contacts(vec![Contact::new("Doe"), Contact::new("Roe")])
        .unwrap();

    assert_eq!(contacts[0].account_id, Some(doe_id));
    assert_ne!(contacts[1].account_id, Some(doe_id));
    assert_eq!(count_rows(&conn, "accounts"), 2);
}

#[test]
fn every_contact_is_persisted_with_its_account_link() {
    let conn = memory_db();
    let service = DmlService::new(SqliteRecordStore::try_new(&conn).unwrap());

    let contacts = service
        .upsert_accounts_with_contacts(vec![Contact::new("Doe"), Contact::new("Jane")])
        .unwrap();

    for contact in &contacts {
        let stored: Contact = service.store().get(contact.id.unwrap()).unwrap().unwrap();
        assert_eq!(stored.account_id, contact.account_id);
        assert!(stored.account_id.is_some());
    }

    let linked: Vec<Contact> = service
        .store()
        .query(
            &RecordQuery::of::<Contact>()
                .filter_eq(RecordField::AccountId, contacts[0].account_id.unwrap()),
        )
        .unwrap();
    assert_eq!(linked.len(), 1);
}

#[test]
fn already_persisted_contacts_are_updated_in_place() {
    let conn = memory_db();
    let service = DmlService::new(SqliteRecordStore::try_new(&conn).unwrap());
    let mut existing = [Contact::new("Doe")];
    service.store().insert(&mut existing).unwrap();

    let contacts = service
        .upsert_accounts_with_contacts(existing.to_vec())
        .unwrap();

    assert_eq!(contacts[0].id, existing[0].id);
    assert_eq!(count_rows(&conn, "contacts"), 1);
    let stored: Contact = service.store().get(existing[0].id.unwrap()).unwrap().unwrap();
    assert_eq!(stored.account_id, contacts[0].account_id);
}

#[test]
fn failed_contact_upsert_rolls_back_created_accounts() {
    let conn = memory_db();
    let service = DmlService::new(SqliteRecordStore::try_new(&conn).unwrap());
    let mut stale = Contact::new("Ghost");
    stale.id = Some(Uuid::new_v4());

    let err = service
        .upsert_accounts_with_contacts(vec![Contact::new("Doe"), stale])
        .unwrap_err();

    assert!(matches!(
        err,
        RepoError::NotFound {
            kind: RecordKind::Contact,
            ..
        }
    ));
    assert_eq!(count_rows(&conn, "accounts"), 0);
    assert_eq!(count_rows(&conn, "contacts"), 0);
}

#[test]
fn contact_linking_uses_one_account_batch_and_one_contact_batch() {
    let store = RecordingStore::new();
    let service = DmlService::new(&store);

    service
        .upsert_accounts_with_contacts(vec![
            Contact::new("Doe"),
            Contact::new("Jane"),
            Contact::new("Doe"),
        ])
        .unwrap();

    assert_eq!(
        store.writes(),
        vec![
            Call::Insert(RecordKind::Account, 2),
            Call::Upsert(RecordKind::Contact, 3)
        ]
    );
}

#[test]
fn duplicate_existing_account_names_link_to_first_match() {
    let store = RecordingStore::new();
    let mut seeded = [Account::new("Doe"), Account::new("Doe")];
    store.seed(&mut seeded);
    let service = DmlService::new(&store);

    let contacts = service
        .upsert_accounts_with_contacts(vec![Contact::new("Doe")])
        .unwrap();

    assert_eq!(contacts[0].account_id, seeded[0].id);
    assert_eq!(store.count(RecordKind::Account), 2);
    assert_eq!(store.writes(), vec![Call::Upsert(RecordKind::Contact, 1)]);
}

#[test]
fn empty_contact_list_is_a_no_op() {
    let conn = memory_db();
    let service = DmlService::new(SqliteRecordStore::try_new(&conn).unwrap());

    let contacts = service.upsert_accounts_with_contacts(Vec::new()).unwrap();

    assert!(contacts.is_empty());
    assert_eq!(count_rows(&conn, "accounts"), 0);
}

#[test]
fn contact_batches_beyond_sqlite_variable_limit_link_every_contact() {
    let conn = memory_db();
    let service = DmlService::new(SqliteRecordStore::try_new(&conn).unwrap());
    let early = service.create_account("Name7", "Retail").unwrap();
    let late = service.create_account("Name33000", "Retail").unwrap();

    let contacts: Vec<Contact> = (0..33_001)
        .map(|index| Contact::new(format!("Name{index}")))
        .collect();
    let linked = service.upsert_accounts_with_contacts(contacts).unwrap();

    assert_eq!(linked.len(), 33_001);
    assert!(linked.iter().all(|contact| contact.account_id.is_some()));
    assert_eq!(linked[7].account_id, Some(early));
    assert_eq!(linked[33_000].account_id, Some(late));
    assert_eq!(count_rows(&conn, "accounts"), 33_001);
    assert_eq!(count_rows(&conn, "contacts"), 33_001);
}
