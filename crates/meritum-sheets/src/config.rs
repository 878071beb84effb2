//! Google Sheets backend configuration

use crate::error::{Error, Result};
use secrecy::SecretString;
use serde::Deserialize;

fn default_api_base() -> String {
    "https://sheets.googleapis.com/v4/spreadsheets".to_string()
}

fn default_tab() -> String {
    "Roster".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

/// Configuration for the two ledger spreadsheets
#[derive(Debug, Clone, Deserialize)]
pub struct SheetsConfig {
    /// OAuth bearer token with spreadsheet scope
    #[serde(skip, default = "empty_token")]
    pub access_token: SecretString,
    /// Spreadsheet id of the main ledger
    pub main_spreadsheet_id: String,
    /// Spreadsheet id of the special-detachment ledger
    pub special_spreadsheet_id: String,
    /// Tab name inside the main spreadsheet
    #[serde(default = "default_tab")]
    pub main_tab: String,
    /// Tab name inside the special spreadsheet
    #[serde(default = "default_tab")]
    pub special_tab: String,
    /// Numeric grid id of the main tab, used by row inserts
    #[serde(default)]
    pub main_sheet_gid: u64,
    /// Numeric grid id of the special tab, used by row inserts
    #[serde(default)]
    pub special_sheet_gid: u64,
    /// API base URL (override for tests)
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Per-call timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn empty_token() -> SecretString {
    SecretString::from(String::new())
}

impl SheetsConfig {
    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let access_token = std::env::var("SHEETS_ACCESS_TOKEN")
            .map_err(|_| Error::Config("SHEETS_ACCESS_TOKEN not set".to_string()))?;
        let main_spreadsheet_id = std::env::var("SHEETS_MAIN_ID")
            .map_err(|_| Error::Config("SHEETS_MAIN_ID not set".to_string()))?;
        let special_spreadsheet_id = std::env::var("SHEETS_SPECIAL_ID")
            .map_err(|_| Error::Config("SHEETS_SPECIAL_ID not set".to_string()))?;

        let main_tab = std::env::var("SHEETS_MAIN_TAB").unwrap_or_else(|_| default_tab());
        let special_tab = std::env::var("SHEETS_SPECIAL_TAB").unwrap_or_else(|_| default_tab());
        let main_sheet_gid = std::env::var("SHEETS_MAIN_GID")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0);
        let special_sheet_gid = std::env::var("SHEETS_SPECIAL_GID")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0);
        let api_base = std::env::var("SHEETS_API_BASE").unwrap_or_else(|_| default_api_base());
        let timeout_secs = std::env::var("SHEETS_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or_else(default_timeout_secs);

        Ok(Self {
            access_token: SecretString::from(access_token),
            main_spreadsheet_id,
            special_spreadsheet_id,
            main_tab,
            special_tab,
            main_sheet_gid,
            special_sheet_gid,
            api_base,
            timeout_secs,
        })
    }

    /// Grid id of the tab hosting one ledger
    #[must_use]
    pub fn gid(&self, sheet: meritum_core::SheetKind) -> u64 {
        match sheet {
            meritum_core::SheetKind::Main => self.main_sheet_gid,
            meritum_core::SheetKind::Special => self.special_sheet_gid,
        }
    }

    /// Create with explicit ids and token
    #[must_use]
    pub fn new(
        access_token: impl Into<String>,
        main_spreadsheet_id: impl Into<String>,
        special_spreadsheet_id: impl Into<String>,
    ) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            main_spreadsheet_id: main_spreadsheet_id.into(),
            special_spreadsheet_id: special_spreadsheet_id.into(),
            main_tab: default_tab(),
            special_tab: default_tab(),
            main_sheet_gid: 0,
            special_sheet_gid: 0,
            api_base: default_api_base(),
            timeout_secs: default_timeout_secs(),
        }
    }
}
