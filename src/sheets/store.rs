// src/sheets/store.rs
//
// Generic chunked key-value row store. One implementor per worksheet tab;
// row 1 is always the header. Row numbers are 1-based A1 row numbers.

use crate::retry::{with_backoff, RemoteError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueMode {
    Raw,
    UserEntered,
}

impl ValueMode {
    pub fn as_api_str(&self) -> &'static str {
        match self {
            ValueMode::Raw => "RAW",
            ValueMode::UserEntered => "USER_ENTERED",
        }
    }
}

pub trait RowStore {
    /// Read an A1 range such as "A2:J501". Rows trailing the populated area
    /// are omitted by the backend, so the result may be shorter than asked.
    fn get_range(&self, range: &str) -> Result<Vec<Vec<String>>, RemoteError>;

    fn update_range(&self, range: &str, values: &[Vec<String>]) -> Result<(), RemoteError>;

    /// Insert a single row at the given 1-based row number, shifting rows down.
    fn insert_row(&self, values: &[String], at: u32, mode: ValueMode) -> Result<(), RemoteError>;

    fn append_rows(&self, rows: &[Vec<String>], mode: ValueMode) -> Result<(), RemoteError>;

    fn delete_row(&self, row: u32) -> Result<(), RemoteError>;

    fn batch_get(&self, ranges: &[String]) -> Result<Vec<Vec<Vec<String>>>, RemoteError>;

    /// Last populated row number (header included), 0 for an empty sheet.
    fn row_count(&self) -> Result<u32, RemoteError>;
}

/// Column letter for a 0-based index; the schemas here never pass column Z.
pub fn col_letter(index: usize) -> char {
    (b'A' + index as u8) as char
}

/// A1 range covering `ncols` columns from `start_row` to `end_row` inclusive.
pub fn a1_range(start_row: u32, end_row: u32, ncols: usize) -> String {
    format!("A{start_row}:{}{end_row}", col_letter(ncols.saturating_sub(1)))
}

/// Enforce the documented header on first access: if the observed header row
/// differs from the expected list, overwrite it.
pub fn ensure_header(store: &dyn RowStore, expected: &[&str]) -> Result<(), RemoteError> {
    let range = a1_range(1, 1, expected.len());
    let observed = with_backoff("header read", || store.get_range(&range))?;
    let current = observed.first().cloned().unwrap_or_default();
    if current.iter().map(String::as_str).ne(expected.iter().copied()) {
        let row: Vec<String> = expected.iter().map(|s| s.to_string()).collect();
        with_backoff("header write", || store.update_range(&range, &[row.clone()]))?;
        println!("🛠️ Header rewritten to the documented column order.");
    }
    Ok(())
}
