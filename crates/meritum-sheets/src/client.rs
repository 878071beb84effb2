//! Google Sheets v4 REST client implementing the core's `SheetStore`.
//!
//! One sheet read maps to a bulk `values` GET; cell writes map to `values`
//! PUT calls in RAW mode; row inserts map to a `batchUpdate` InsertDimension
//! followed by a `values` PUT into the opened row. Transient failures get
//! exactly one retry; everything else surfaces as
//! `meritum_core::Error::ExternalService` at the trait boundary.

use crate::config::SheetsConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use meritum_core::{Grid, SheetKind, SheetStore};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

/// Google Sheets backend
pub struct GoogleSheetsStore {
    config: SheetsConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl GoogleSheetsStore {
    /// Create a store; the HTTP client carries the per-call timeout.
    #[must_use]
    pub fn new(config: SheetsConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");
        Self { config, client }
    }

    /// Create from environment
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(SheetsConfig::from_env()?))
    }

    fn target(&self, sheet: SheetKind) -> (&str, &str) {
        match sheet {
            SheetKind::Main => (&self.config.main_spreadsheet_id, &self.config.main_tab),
            SheetKind::Special => (
                &self.config.special_spreadsheet_id,
                &self.config.special_tab,
            ),
        }
    }

    async fn send(&self, build: impl Fn() -> reqwest::RequestBuilder) -> Result<Value> {
        match self.send_once(build()).await {
            Err(e) if e.is_transient() => {
                warn!(error = %e, "sheets call failed, retrying once");
                self.send_once(build()).await
            }
            other => other,
        }
    }

    async fn send_once(&self, req: reqwest::RequestBuilder) -> Result<Value> {
        let resp = req
            .bearer_auth(self.config.access_token.expose_secret())
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_else(|_| status.to_string());
            return Err(Error::Api {
                status: status.as_u16(),
                message: truncate(&message, 200),
            });
        }
        resp.json::<Value>()
            .await
            .map_err(|e| Error::Parse(e.to_string()))
    }
}

#[async_trait]
impl SheetStore for GoogleSheetsStore {
    async fn read_grid(&self, sheet: SheetKind) -> meritum_core::Result<Grid> {
        let (id, tab) = self.target(sheet);
        let url = format!("{}/{}/values/{}", self.config.api_base, id, tab);
        let body = self.send(|| self.client.get(&url)).await?;
        let range: ValueRange =
            serde_json::from_value(body).map_err(|e| Error::Parse(e.to_string()))?;
        let grid: Grid = range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect();
        debug!(sheet = sheet.name(), rows = grid.len(), "sheet read");
        Ok(grid)
    }

    async fn write_cell(
        &self,
        sheet: SheetKind,
        row: usize,
        col: usize,
        value: &str,
    ) -> meritum_core::Result<()> {
        let (id, tab) = self.target(sheet);
        let cell = a1_cell(row, col);
        let url = format!(
            "{}/{}/values/{}!{}?valueInputOption=RAW",
            self.config.api_base, id, tab, cell
        );
        let body = json!({ "values": [[value]] });
        self.send(|| self.client.put(&url).json(&body)).await?;
        debug!(sheet = sheet.name(), %cell, value, "cell written");
        Ok(())
    }

    async fn insert_row(
        &self,
        sheet: SheetKind,
        at_row: usize,
        values: Vec<String>,
    ) -> meritum_core::Result<()> {
        let (id, tab) = self.target(sheet);

        let url = format!("{}/{}:batchUpdate", self.config.api_base, id);
        let body = json!({
            "requests": [{
                "insertDimension": {
                    "range": {
                        "sheetId": self.config.gid(sheet),
                        "dimension": "ROWS",
                        "startIndex": at_row,
                        "endIndex": at_row + 1,
                    },
                    "inheritFromBefore": at_row > 0,
                }
            }]
        });
        self.send(|| self.client.post(&url).json(&body)).await?;

        let url = format!(
            "{}/{}/values/{}!A{}?valueInputOption=RAW",
            self.config.api_base,
            id,
            tab,
            at_row + 1
        );
        let body = json!({ "values": [values] });
        self.send(|| self.client.put(&url).json(&body)).await?;
        debug!(sheet = sheet.name(), at_row, "row inserted");
        Ok(())
    }
}

/// 0-based (row, col) to A1 notation: (0, 0) -> A1, (4, 27) -> AB5
fn a1_cell(row: usize, col: usize) -> String {
    let mut letters = String::new();
    let mut c = col;
    loop {
        letters.insert(0, (b'A' + (c % 26) as u8) as char);
        if c < 26 {
            break;
        }
        c = c / 26 - 1;
    }
    format!("{}{}", letters, row + 1)
}

/// Formatted cell values are strings; anything else is rendered plainly.
fn cell_to_string(v: Value) -> String {
    match v {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        s[..end].to_string()
    }
}
