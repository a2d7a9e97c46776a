//! Spreadsheet values API client (Google Sheets v4 REST shape).

use async_trait::async_trait;
use chulseok_core::{RangeWrite, StoreError, TabularStore};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::SyncError;

pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com";

/// Tabular store backed by one spreadsheet.
pub struct SheetsClient {
    client: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    token: String,
    /// Sheet that bare cell addresses ("B2") refer to.
    sheet_name: Option<String>,
    roster_range: String,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdateRequest<'a> {
    value_input_option: &'static str,
    data: Vec<BatchData<'a>>,
}

#[derive(Serialize)]
struct BatchData<'a> {
    range: String,
    values: &'a [Vec<String>],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdateResponse {
    #[serde(default)]
    total_updated_cells: u64,
}

impl SheetsClient {
    /// Create a client for `spreadsheet_id`, authenticating with a bearer `token`.
    ///
    /// `base_url` should be like `https://sheets.googleapis.com` (no trailing slash).
    pub fn new(base_url: String, spreadsheet_id: String, token: String, roster_range: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            spreadsheet_id,
            token,
            sheet_name: sheet_of(&roster_range).map(str::to_string),
            roster_range,
        }
    }

    /// Sheet that unqualified write addresses belong to.
    pub fn with_sheet(mut self, sheet_name: impl Into<String>) -> Self {
        self.sheet_name = Some(sheet_name.into());
        self
    }

    fn values_url(&self, tail: &[&str]) -> Result<Url, SyncError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| SyncError::Url(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| SyncError::Url(self.base_url.clone()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets"])
            .extend(tail);
        Ok(url)
    }

    fn qualify(&self, range: &str) -> String {
        match &self.sheet_name {
            Some(sheet) if !range.contains('!') => {
                format!("'{}'!{range}", sheet.replace('\'', "''"))
            }
            _ => range.to_string(),
        }
    }

    async fn fetch_values(&self, range: &str) -> Result<Vec<Vec<String>>, SyncError> {
        let url = self.values_url(&[self.spreadsheet_id.as_str(), "values", range])?;
        info!(range, "reading sheet range");
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::Server {
                status: status.as_u16(),
                body,
            });
        }
        let text = resp.text().await?;
        let parsed: ValueRange = serde_json::from_str(&text)?;
        let rows = to_rows(parsed.values);
        info!(range, rows = rows.len(), "read sheet range");
        Ok(rows)
    }

    async fn push_batch(&self, writes: &[RangeWrite]) -> Result<u64, SyncError> {
        let target = format!("{}:batchUpdate", self.spreadsheet_id);
        let url = self.values_url(&[target.as_str()])?;
        let body = BatchUpdateRequest {
            value_input_option: "RAW",
            data: writes
                .iter()
                .map(|w| BatchData {
                    range: self.qualify(&w.range),
                    values: &w.values,
                })
                .collect(),
        };

        info!(count = writes.len(), "sending batch update");
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::Server {
                status: status.as_u16(),
                body,
            });
        }
        let text = resp.text().await?;
        let result: BatchUpdateResponse = serde_json::from_str(&text)?;
        info!(updated = result.total_updated_cells, "batch update complete");
        Ok(result.total_updated_cells)
    }
}

#[async_trait]
impl TabularStore for SheetsClient {
    async fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>, StoreError> {
        Ok(self.fetch_values(range).await?)
    }

    async fn batch_write(&self, writes: &[RangeWrite]) -> Result<u64, StoreError> {
        Ok(self.push_batch(writes).await?)
    }

    async fn list_participants(&self) -> Result<Vec<String>, StoreError> {
        let rows = self.fetch_values(&self.roster_range).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.into_iter().next())
            .map(|cell| cell.trim().to_string())
            .filter(|cell| !cell.is_empty())
            .collect())
    }
}

/// Sheet name of an A1 range: `'출석부'!A1:C3` → `출석부`.
pub fn sheet_of(range: &str) -> Option<&str> {
    let (sheet, _) = range.rsplit_once('!')?;
    let sheet = sheet.trim_matches('\'');
    (!sheet.is_empty()).then_some(sheet)
}

fn to_rows(values: Vec<Vec<Value>>) -> Vec<Vec<String>> {
    values
        .into_iter()
        .map(|row| row.into_iter().map(cell_text).collect())
        .collect()
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
