// config.rs
//
// Processing knobs and secrets loading. Knobs are compile-time constants;
// credentials come from JSON files under ./secrets, and a missing or
// malformed file is a fatal configuration error.

use crate::errors::PipelineError;
use serde::Deserialize;
use std::fs;
use std::path::Path;

// === Chunk knobs ===
pub const CHUNK_ROWS: u32 = 500;
pub const MAX_UPDATE_CHUNKS: usize = 20;
// A window past this row with zero populated rows means we are scanning an
// empty tail and should stop.
pub const EMPTY_TAIL_ROW: u32 = 5000;

// === Row insert knobs ===
pub const STACK_NEW_ROWS_AT_TOP: bool = true;
pub const ARCHIVE_BATCH_ROWS: usize = 50;

// === Business rules ===
pub const SURPLUS_THRESHOLD: i64 = 100;
pub const STALE_AFTER_DAYS: i64 = 15;

// === Session pool ===
pub const COOLDOWN_WINDOW: u32 = 20;

// === Mail source ===
pub const MAIL_QUERY: &str = "is:unread in:inbox from:noreply@auction.com";
pub const MAIL_PAGE_SIZE: u32 = 200;

#[derive(Debug, Clone, Deserialize)]
pub struct AccountEntry {
    pub profile: String,
    pub zone: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub states: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AccountsFile {
    #[serde(default)]
    accounts: Vec<AccountEntry>,
    #[serde(default)]
    detail_accounts: Vec<AccountEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SheetCredentials {
    pub spreadsheet_id: String,
    pub api_token: String,
    /// Mailbox the message source reads; also authorized by `api_token`.
    pub mailbox: String,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, PipelineError> {
    let text = fs::read_to_string(path)
        .map_err(|e| PipelineError::Config(format!("missing secrets file {}: {e}", path.display())))?;
    serde_json::from_str(&text)
        .map_err(|e| PipelineError::Config(format!("malformed secrets file {}: {e}", path.display())))
}

/// Zone accounts: one per zone, each carrying the states it covers.
pub fn load_accounts(path: &Path) -> Result<Vec<AccountEntry>, PipelineError> {
    let file: AccountsFile = read_json(path)?;
    println!("🔐 Loaded {} zone account(s) from secrets file.", file.accounts.len());
    Ok(file.accounts)
}

/// Detail accounts back the scraping session pool.
pub fn load_detail_accounts(path: &Path) -> Result<Vec<AccountEntry>, PipelineError> {
    let file: AccountsFile = read_json(path)?;
    if file.detail_accounts.is_empty() {
        eprintln!("⚠️ No detail accounts found in secrets file.");
    }
    Ok(file.detail_accounts)
}

pub fn load_sheet_credentials(path: &Path) -> Result<SheetCredentials, PipelineError> {
    read_json(path)
}
