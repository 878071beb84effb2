//! Meritum Sheets - Google Sheets ledger backend
//!
//! Implements `meritum_core::SheetStore` over the Sheets v4 REST API.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod error;

pub use client::GoogleSheetsStore;
pub use config::SheetsConfig;
pub use error::{Error, Result};
