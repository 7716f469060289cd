//! Google Sheets queue backend

use crate::config::GoogleConfig;
use crate::error::QueueError;
use crate::google::TokenProvider;
use crate::queue::QueueBackend;
use async_trait::async_trait;
use reqwest::{Response, Url};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueUpdate<'a> {
    range: &'a str,
    major_dimension: &'static str,
    values: [[&'a str; 1]; 1],
}

/// Column letters for a 0-based column index (0 -> A, 26 -> AA)
pub fn column_letters(column: usize) -> String {
    let mut n = column + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// Sheet name as it must appear in an A1 range
///
/// Names other than a plain identifier are single-quoted, with embedded
/// quotes doubled.
pub fn sheet_range(sheet: &str) -> String {
    let plain = sheet.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
        && sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        sheet.to_string()
    } else {
        format!("'{}'", sheet.replace('\'', "''"))
    }
}

/// A1 reference for a 1-based row and 0-based column
pub fn a1_cell(sheet: &str, row: usize, column: usize) -> String {
    format!("{}!{}{}", sheet_range(sheet), column_letters(column), row)
}

fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Queue backend over one worksheet of a spreadsheet
pub struct SheetsBackend {
    http: reqwest::Client,
    tokens: Arc<TokenProvider>,
    base_url: String,
    spreadsheet_id: String,
    sheet_name: String,
}

impl SheetsBackend {
    /// Backend for the configured spreadsheet
    pub fn new(
        http: reqwest::Client,
        tokens: Arc<TokenProvider>,
        base_url: &str,
        config: &GoogleConfig,
    ) -> Self {
        Self {
            http,
            tokens,
            base_url: base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            sheet_name: config.sheet_name.clone(),
        }
    }

    fn values_url(&self, range: &str) -> Result<Url, QueueError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| QueueError::Transport(format!("invalid Sheets base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| QueueError::Transport("Sheets base URL cannot hold a path".to_string()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str(), "values", range]);
        Ok(url)
    }

    async fn check(response: Response) -> Result<Response, QueueError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let status_code = status.as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error body".to_string());

        error!(status_code, error_body = %body, "Sheets API returned error status");

        if status_code == 429 {
            return Err(QueueError::RateLimited(body));
        }
        Err(QueueError::Api {
            status: status_code,
            body,
        })
    }
}

#[async_trait]
impl QueueBackend for SheetsBackend {
    async fn fetch_rows(&self) -> Result<Vec<Vec<String>>, QueueError> {
        let url = self.values_url(&sheet_range(&self.sheet_name))?;
        let token = self.tokens.access_token().await?;

        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| QueueError::Transport(e.to_string()))?;
        let response = Self::check(response).await?;

        let range: ValueRange = response
            .json()
            .await
            .map_err(|e| QueueError::Transport(format!("invalid values response: {}", e)))?;

        let rows: Vec<Vec<String>> = range
            .values
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect();
        debug!(rows = rows.len(), "Fetched sheet values");
        Ok(rows)
    }

    async fn update_cell(&self, row: usize, column: usize, value: &str) -> Result<(), QueueError> {
        let range = a1_cell(&self.sheet_name, row, column);
        let url = self.values_url(&range)?;
        let token = self.tokens.access_token().await?;

        let body = ValueUpdate {
            range: &range,
            major_dimension: "ROWS",
            values: [[value]],
        };

        let response = self
            .http
            .put(url)
            .bearer_auth(token)
            .query(&[("valueInputOption", "RAW")])
            .json(&body)
            .send()
            .await
            .map_err(|e| QueueError::Transport(e.to_string()))?;
        Self::check(response).await?;

        debug!(range = %range, "Updated cell");
        Ok(())
    }
}
