//! Discord bot configuration

use crate::error::{Error, Result};
use serde::Deserialize;

fn default_prefix() -> String {
    "!".to_string()
}

/// Discord bot configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    /// Bot token (from DISCORD_BOT_TOKEN env)
    pub bot_token: String,
    /// The guild this bot manages
    pub guild_id: u64,
    /// Command prefix (default `!`)
    #[serde(default = "default_prefix")]
    pub command_prefix: String,
    /// Roles allowed to award points and run sync (empty = nobody)
    #[serde(default)]
    pub officer_role_ids: Vec<u64>,
    /// Channel receiving one audit embed per award
    #[serde(default)]
    pub audit_channel_id: Option<u64>,
}

impl DiscordConfig {
    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let bot_token = std::env::var("DISCORD_BOT_TOKEN")
            .map_err(|_| Error::Discord("DISCORD_BOT_TOKEN not set".to_string()))?;

        let guild_id: u64 = std::env::var("DISCORD_GUILD_ID")
            .map_err(|_| Error::Discord("DISCORD_GUILD_ID not set".to_string()))?
            .trim()
            .parse()
            .map_err(|_| Error::Discord("DISCORD_GUILD_ID is not a numeric id".to_string()))?;

        let command_prefix =
            std::env::var("DISCORD_COMMAND_PREFIX").unwrap_or_else(|_| default_prefix());

        let officer_role_ids: Vec<u64> = std::env::var("DISCORD_OFFICER_ROLES")
            .ok()
            .map(|s| {
                s.split(',')
                    .filter_map(|id| id.trim().parse().ok())
                    .collect()
            })
            .unwrap_or_default();

        let audit_channel_id: Option<u64> = std::env::var("DISCORD_AUDIT_CHANNEL_ID")
            .ok()
            .and_then(|s| s.trim().parse().ok());

        Ok(Self {
            bot_token,
            guild_id,
            command_prefix,
            officer_role_ids,
            audit_channel_id,
        })
    }

    /// Create with a bot token and guild
    #[must_use]
    pub fn new(bot_token: impl Into<String>, guild_id: u64) -> Self {
        Self {
            bot_token: bot_token.into(),
            guild_id,
            command_prefix: default_prefix(),
            officer_role_ids: Vec::new(),
            audit_channel_id: None,
        }
    }

    /// Set the officer roles allowed to award
    #[must_use]
    pub fn with_officer_roles(mut self, roles: Vec<u64>) -> Self {
        self.officer_role_ids = roles;
        self
    }

    /// Set the audit channel
    #[must_use]
    pub fn with_audit_channel(mut self, channel_id: u64) -> Self {
        self.audit_channel_id = Some(channel_id);
        self
    }

    /// Whether a member's role set authorizes awarding
    #[must_use]
    pub fn is_officer(&self, role_ids: &[u64]) -> bool {
        self.officer_role_ids.iter().any(|r| role_ids.contains(r))
    }
}
