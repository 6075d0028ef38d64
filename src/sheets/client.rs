// src/sheets/client.rs
//
// Google Sheets REST client. `SheetsClient` owns the HTTP session and the
// spreadsheet id; `SheetTab` is one worksheet tab implementing `RowStore`.
// Tabs are created on first open when missing, with the grid id resolved
// from spreadsheet metadata (deletes and inserts need the numeric id).

use crate::retry::RemoteError;
use crate::sheets::store::{RowStore, ValueMode};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const SHEETS_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

pub struct SheetsClient {
    http: Client,
    token: String,
    spreadsheet_id: String,
}

pub struct SheetTab<'a> {
    client: &'a SheetsClient,
    title: String,
    grid_id: i64,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    #[serde(rename = "sheetId")]
    sheet_id: i64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct BatchGetResponse {
    #[serde(rename = "valueRanges", default)]
    value_ranges: Vec<ValueRange>,
}

impl SheetsClient {
    pub fn new(token: impl Into<String>, spreadsheet_id: impl Into<String>) -> Result<Self, RemoteError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(RemoteError::from_reqwest)?;
        Ok(Self {
            http,
            token: token.into(),
            spreadsheet_id: spreadsheet_id.into(),
        })
    }

    /// Open a tab by title, adding the worksheet when it does not exist yet.
    pub fn open_tab(&self, title: &str) -> Result<SheetTab<'_>, RemoteError> {
        let meta = self.fetch_meta()?;
        if let Some(sheet) = meta.sheets.iter().find(|s| s.properties.title == title) {
            return Ok(SheetTab {
                client: self,
                title: title.to_string(),
                grid_id: sheet.properties.sheet_id,
            });
        }

        self.batch_update(json!({
            "requests": [{
                "addSheet": {
                    "properties": {
                        "title": title,
                        "gridProperties": { "rowCount": 20000, "columnCount": 30 }
                    }
                }
            }]
        }))?;

        let meta = self.fetch_meta()?;
        let sheet = meta
            .sheets
            .iter()
            .find(|s| s.properties.title == title)
            .ok_or_else(|| RemoteError::fatal(format!("worksheet '{title}' missing after add")))?;
        Ok(SheetTab {
            client: self,
            title: title.to_string(),
            grid_id: sheet.properties.sheet_id,
        })
    }

    fn fetch_meta(&self) -> Result<SpreadsheetMeta, RemoteError> {
        let url = format!("{SHEETS_BASE}/{}", self.spreadsheet_id);
        self.get_json(&url, &[("fields", "sheets.properties")])
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, RemoteError> {
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .map_err(RemoteError::from_reqwest)?;
        let status = resp.status();
        let text = resp.text().map_err(RemoteError::from_reqwest)?;
        if !status.is_success() {
            return Err(RemoteError::from_status(status.as_u16(), &text));
        }
        serde_json::from_str(&text)
            .map_err(|e| RemoteError::fatal(format!("sheet response shape: {e}")))
    }

    fn send_json(
        &self,
        request: reqwest::blocking::RequestBuilder,
        body: &Value,
    ) -> Result<(), RemoteError> {
        let resp = request
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .map_err(RemoteError::from_reqwest)?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            return Err(RemoteError::from_status(status.as_u16(), &text));
        }
        Ok(())
    }

    fn batch_update(&self, body: Value) -> Result<(), RemoteError> {
        let url = format!("{SHEETS_BASE}/{}:batchUpdate", self.spreadsheet_id);
        self.send_json(self.http.post(&url), &body)
    }
}

impl SheetTab<'_> {
    fn qualified(&self, range: &str) -> String {
        format!("'{}'!{}", self.title, range)
    }
}

impl RowStore for SheetTab<'_> {
    fn get_range(&self, range: &str) -> Result<Vec<Vec<String>>, RemoteError> {
        let url = format!(
            "{SHEETS_BASE}/{}/values/{}",
            self.client.spreadsheet_id,
            self.qualified(range)
        );
        let vr: ValueRange = self.client.get_json(&url, &[])?;
        Ok(vr.values)
    }

    fn update_range(&self, range: &str, values: &[Vec<String>]) -> Result<(), RemoteError> {
        let url = format!(
            "{SHEETS_BASE}/{}/values/{}",
            self.client.spreadsheet_id,
            self.qualified(range)
        );
        let body = json!({ "values": values });
        let req = self
            .client
            .http
            .put(&url)
            .query(&[("valueInputOption", ValueMode::UserEntered.as_api_str())]);
        self.client.send_json(req, &body)
    }

    fn insert_row(&self, values: &[String], at: u32, mode: ValueMode) -> Result<(), RemoteError> {
        // Insert a blank row, then fill it; the dimension indexes are 0-based
        // and end-exclusive.
        self.client.batch_update(json!({
            "requests": [{
                "insertDimension": {
                    "range": {
                        "sheetId": self.grid_id,
                        "dimension": "ROWS",
                        "startIndex": at - 1,
                        "endIndex": at
                    },
                    "inheritFromBefore": false
                }
            }]
        }))?;

        let range = crate::sheets::store::a1_range(at, at, values.len());
        let url = format!(
            "{SHEETS_BASE}/{}/values/{}",
            self.client.spreadsheet_id,
            self.qualified(&range)
        );
        let body = json!({ "values": [values] });
        let req = self
            .client
            .http
            .put(&url)
            .query(&[("valueInputOption", mode.as_api_str())]);
        self.client.send_json(req, &body)
    }

    fn append_rows(&self, rows: &[Vec<String>], mode: ValueMode) -> Result<(), RemoteError> {
        let url = format!(
            "{SHEETS_BASE}/{}/values/{}:append",
            self.client.spreadsheet_id,
            self.qualified("A1")
        );
        let body = json!({ "values": rows });
        let req = self.client.http.post(&url).query(&[
            ("valueInputOption", mode.as_api_str()),
            ("insertDataOption", "INSERT_ROWS"),
        ]);
        self.client.send_json(req, &body)
    }

    fn delete_row(&self, row: u32) -> Result<(), RemoteError> {
        self.client.batch_update(json!({
            "requests": [{
                "deleteDimension": {
                    "range": {
                        "sheetId": self.grid_id,
                        "dimension": "ROWS",
                        "startIndex": row - 1,
                        "endIndex": row
                    }
                }
            }]
        }))
    }

    fn batch_get(&self, ranges: &[String]) -> Result<Vec<Vec<Vec<String>>>, RemoteError> {
        let url = format!(
            "{SHEETS_BASE}/{}/values:batchGet",
            self.client.spreadsheet_id
        );
        let query: Vec<(&str, String)> = ranges
            .iter()
            .map(|r| ("ranges", self.qualified(r)))
            .collect();
        let resp = self
            .client
            .http
            .get(&url)
            .bearer_auth(&self.client.token)
            .query(&query)
            .send()
            .map_err(RemoteError::from_reqwest)?;
        let status = resp.status();
        let text = resp.text().map_err(RemoteError::from_reqwest)?;
        if !status.is_success() {
            return Err(RemoteError::from_status(status.as_u16(), &text));
        }
        let parsed: BatchGetResponse = serde_json::from_str(&text)
            .map_err(|e| RemoteError::fatal(format!("sheet response shape: {e}")))?;
        Ok(parsed.value_ranges.into_iter().map(|vr| vr.values).collect())
    }

    fn row_count(&self) -> Result<u32, RemoteError> {
        let rows = self.get_range("A:A")?;
        Ok(rows.len() as u32)
    }
}
