mod config;
mod domain;
mod engine;
mod errors;
mod mail;
mod pipeline;
mod retry;
mod scraper;
mod sheets;

#[cfg(test)]
mod tests;

use crate::config::{load_accounts, load_detail_accounts, load_sheet_credentials};
use crate::domain::zone::Zone;
use crate::errors::PipelineError;
use crate::mail::{GmailSource, MessageSource};
use crate::scraper::{LinkSource, SessionPool, SiteSession, SiteSearch};
use crate::sheets::SheetsClient;
use chrono::Local;
use std::path::Path;

const ACCOUNTS_FILE: &str = "secrets/accounts.json";
const CREDENTIALS_FILE: &str = "secrets/sheet_credentials.json";

fn main() {
    let command = std::env::args().nth(1).unwrap_or_else(|| "all".to_string());
    if let Err(e) = run(&command) {
        eprintln!("❌ {e}");
        std::process::exit(1);
    }
}

fn run(command: &str) -> Result<(), PipelineError> {
    if !matches!(command, "collect" | "update" | "mail" | "all") {
        return Err(PipelineError::Config(format!(
            "unknown command '{command}' (expected collect | update | mail | all)"
        )));
    }

    let creds = load_sheet_credentials(Path::new(CREDENTIALS_FILE))?;
    let client = SheetsClient::new(&creds.api_token, &creds.spreadsheet_id)
        .map_err(|e| PipelineError::Remote(e.to_string()))?;
    let today = Local::now().date_naive();

    if matches!(command, "collect" | "update" | "all") {
        let accounts = load_accounts(Path::new(ACCOUNTS_FILE))?;
        let detail_accounts = load_detail_accounts(Path::new(ACCOUNTS_FILE))?;

        let mut pool: SessionPool<SiteSession> =
            SessionPool::new(Box::new(SiteSession::new));
        let profiles: Vec<String> = detail_accounts.iter().map(|a| a.profile.clone()).collect();
        pool.bootstrap(&profiles);

        if matches!(command, "collect" | "all") {
            let mut search =
                SiteSearch::new().map_err(|e| PipelineError::Remote(e.to_string()))?;
            for account in &accounts {
                let Some(zone) = Zone::from_name(&account.zone) else {
                    eprintln!("⚠️ Unknown zone '{}' for {}", account.zone, account.email);
                    continue;
                };
                let tab = match client.open_tab(zone.name()) {
                    Ok(t) => t,
                    Err(e) => {
                        eprintln!("⚠️ Could not open {zone} tab: {e}");
                        continue;
                    }
                };
                println!("🌐 Collecting {zone}");
                for state in &account.states {
                    match search.new_links(state) {
                        Ok(links) => {
                            pipeline::insert_new_records(&tab, &mut pool, state, &links);
                        }
                        Err(e) => eprintln!("⚠️ Search failed for {state}: {e}"),
                    }
                }
            }
        }

        if matches!(command, "update" | "all") {
            for zone in Zone::ALL {
                let tab = match client.open_tab(zone.name()) {
                    Ok(t) => t,
                    Err(e) => {
                        eprintln!("⚠️ Could not open {zone} tab: {e}");
                        continue;
                    }
                };
                println!("🗂️ Updating {zone}");
                pipeline::update_previous_records(&tab, &mut pool, today);
            }
        }
    }

    if matches!(command, "mail" | "all") {
        println!("📮 Reading mailbox {}", creds.mailbox);
        let source =
            GmailSource::new(&creds.api_token).map_err(|e| PipelineError::Remote(e.to_string()))?;
        run_mail_pass(&client, &source);
    }

    Ok(())
}

fn sales_tab_name(zone: Zone) -> String {
    format!("{} SOLD", zone.name())
}

fn run_mail_pass(client: &SheetsClient, source: &dyn MessageSource) {
    let (mut by_zone, stats) = pipeline::collect_change_events(source);
    println!(
        "📬 {} message(s): {} parsed, {} skipped, {} unrouted",
        stats.messages, stats.parsed, stats.skipped, stats.unrouted
    );

    for zone in Zone::ALL {
        let Some(events) = by_zone.remove(&zone) else {
            continue;
        };
        println!("🌐 {zone}: {} change event(s)", events.len());
        let listings = match client.open_tab(zone.name()) {
            Ok(t) => t,
            Err(e) => {
                eprintln!("⚠️ Could not open {zone} tab: {e}");
                continue;
            }
        };
        let sales = match client.open_tab(&sales_tab_name(zone)) {
            Ok(t) => t,
            Err(e) => {
                eprintln!("⚠️ Could not open {zone} archive tab: {e}");
                continue;
            }
        };
        pipeline::reconcile_zone(&listings, &sales, events);
    }
}
