//! Discord client lifecycle: gateway intents, handler wiring, startup.

use crate::commands::MeritumCommands;
use crate::config::DiscordConfig;
use crate::error::{Error, Result};
use crate::gateway::DiscordGateway;
use crate::handler::MeritumHandler;
use meritum_core::SheetStore;
use serenity::all::{Client, GatewayIntents};
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use tracing::{info, instrument};

/// Discord bot adapter
pub struct DiscordAdapter {
    pub(crate) config: DiscordConfig,
    pub(crate) bot_user_id: AtomicU64,
}

impl DiscordAdapter {
    /// Create a new Discord adapter
    #[must_use]
    pub fn new(config: DiscordConfig) -> Self {
        Self {
            config,
            bot_user_id: AtomicU64::new(0),
        }
    }

    /// Create from environment
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(DiscordConfig::from_env()?))
    }

    /// The configuration in use
    #[must_use]
    pub fn config(&self) -> &DiscordConfig {
        &self.config
    }

    /// Start the bot. Hands the HTTP client to `gateway` before connecting
    /// so presentation edits and audit embeds can flow as soon as commands
    /// arrive.
    #[instrument(skip_all)]
    pub async fn run<S: SheetStore + 'static>(
        self: Arc<Self>,
        gateway: Arc<DiscordGateway>,
        commands: MeritumCommands<S>,
    ) -> Result<()> {
        info!(guild_id = self.config.guild_id, "starting merit ledger bot");

        let intents = GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MEMBERS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT;

        let handler = MeritumHandler::new(self.clone(), commands);

        let mut client = Client::builder(&self.config.bot_token, intents)
            .event_handler(handler)
            .await
            .map_err(|e| Error::Discord(format!("Failed to create client: {}", e)))?;

        gateway.set_http(client.http.clone()).await;

        client
            .start()
            .await
            .map_err(|e| Error::Discord(format!("Client error: {}", e)))?;

        Ok(())
    }
}
