//! CLI smoke entry point.
//!
//! # Responsibility
//! - Run every DML exercise once against a fresh or configured database.
//! - Print a deterministic JSON summary for quick local sanity checks.

mod config;

use config::CliConfig;
use dmlkit_core::db::{open_db, open_db_in_memory};
use dmlkit_core::{init_logging, Contact, DmlService, Opportunity, RecordId, SqliteRecordStore};
use log::error;
use serde::Serialize;
use std::error::Error;
use std::process::ExitCode;

#[derive(Debug, Serialize)]
struct RunSummary {
    core_version: &'static str,
    starter_account_id: RecordId,
    created_account_id: RecordId,
    starter_contact_id: RecordId,
    qualified_opportunities: usize,
    named_opportunities: usize,
    upserted_account_description: Option<String>,
    linked_contacts: usize,
    leads_round_tripped: usize,
    cases_round_tripped: usize,
}

fn main() -> ExitCode {
    let config = CliConfig::from_env();
    if let Some(log_dir) = config.log_dir.as_deref() {
        if let Err(err) = init_logging(&config.log_level, log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    match run(&config) {
        Ok(summary) => match serde_json::to_string_pretty(&summary) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("failed to render summary: {err}");
                ExitCode::FAILURE
            }
        },
        Err(err) => {
            error!("event=cli_run module=cli status=error error={err}");
            eprintln!("dmlkit run failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &CliConfig) -> Result<RunSummary, Box<dyn Error>> {
    let conn = match config.db_path.as_ref() {
        Some(path) => open_db(path)?,
        None => open_db_in_memory()?,
    };
    let service = DmlService::new(SqliteRecordStore::try_new(&conn)?);

    let starter_account_id = service.insert_new_account()?;
    let created_account_id = service.create_account("Northwind Traders", "Retail")?;
    let starter_contact_id = service.insert_new_contact(starter_account_id)?;
    service.update_contact_last_name(starter_contact_id, "Smithson")?;
    service.update_account_fields(created_account_id, "Northwind Holdings", "Finance")?;

    let qualified = service.upsert_opportunity_list(vec![
        Opportunity::new("Platform Renewal"),
        Opportunity::new("Support Upsell"),
    ])?;
    if let Some(id) = qualified.first().and_then(|opportunity| opportunity.id) {
        service.update_opportunity_stage(id, "Closed Won")?;
    }
    let named = service.upsert_opportunities("Northwind Holdings", &["Q3 Expansion", "Q4 Pilot"])?;

    let upserted = service.upsert_account("Contoso")?;
    let linked = service.upsert_accounts_with_contacts(vec![
        Contact::new("Doe"),
        Contact::new("Jane"),
        Contact::new("Doe"),
    ])?;

    let leads = service.insert_and_delete_leads(&["Lovelace", "Hopper"])?;
    let cases = service.create_and_delete_cases(starter_account_id, 3)?;

    Ok(RunSummary {
        core_version: dmlkit_core::core_version(),
        starter_account_id,
        created_account_id,
        starter_contact_id,
        qualified_opportunities: qualified.len(),
        named_opportunities: named.len(),
        upserted_account_description: upserted.description,
        linked_contacts: linked.len(),
        leads_round_tripped: leads.len(),
        cases_round_tripped: cases.len(),
    })
}
