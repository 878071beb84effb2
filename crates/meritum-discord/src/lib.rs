//! Meritum Discord - chat platform adapter
//!
//! Serenity-based adapter for the merit ledger engine: prefix-command
//! dispatch, the `GuildGateway` implementation for role/nickname edits and
//! audit embeds, and client lifecycle.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod adapter;
pub mod commands;
pub mod config;
pub mod error;
pub mod gateway;
pub mod handler;
pub mod util;

pub use adapter::DiscordAdapter;
pub use commands::MeritumCommands;
pub use config::DiscordConfig;
pub use error::{Error, Result};
pub use gateway::DiscordGateway;
