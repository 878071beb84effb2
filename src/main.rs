//! Meritum - guild merit ledger bot
//!
//! Process entry point: loads settings, wires the engine to the Google
//! Sheets backend and the Discord adapter, and runs the bot.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use meritum_core::{
    AwardCounters, AwardProcessor, GuildGateway, Ledger, MemorySheetStore, QueryEngine,
    RankLadder, RegimentMap, SheetKind, SheetStore,
};
use meritum_discord::{DiscordAdapter, DiscordConfig, DiscordGateway, MeritumCommands};
use meritum_sheets::GoogleSheetsStore;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod settings;

use settings::Settings;

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "meritum", about = "Guild merit ledger bot")]
struct Cli {
    /// Settings file (without extension), e.g. config/default
    #[arg(long, default_value = "config/default")]
    config: String,

    /// Use an in-memory ledger instead of Google Sheets
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "meritum=info,serenity=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    info!("Starting Meritum v{}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load(&cli.config)?;
    let ladder = Arc::new(RankLadder::new(settings.ladder.clone())?);
    let regiments = Arc::new(RegimentMap::new(settings.regiments.clone()));

    let discord_config = DiscordConfig::from_env()?;
    if cli.dry_run {
        warn!("dry run: ledger writes stay in memory");
        let store = Arc::new(MemorySheetStore::new());
        seed_dry_run(&store).await;
        run(store, ladder, regiments, settings, discord_config).await
    } else {
        let store = Arc::new(GoogleSheetsStore::from_env()?);
        run(store, ladder, regiments, settings, discord_config).await
    }
}

async fn run<S: SheetStore + 'static>(
    store: Arc<S>,
    ladder: Arc<RankLadder>,
    regiments: Arc<RegimentMap>,
    settings: Settings,
    discord_config: DiscordConfig,
) -> Result<()> {
    let gateway = Arc::new(DiscordGateway::new(
        discord_config.guild_id,
        discord_config.audit_channel_id,
    ));

    let processor = Arc::new(AwardProcessor::new(
        Arc::new(Ledger::new(Arc::clone(&store), Arc::clone(&ladder))),
        Arc::clone(&ladder),
        regiments,
        Arc::clone(&gateway) as Arc<dyn GuildGateway>,
        Arc::new(AwardCounters::new()),
        settings.limits,
    ));
    let query = Arc::new(QueryEngine::new(store, ladder));
    let commands = MeritumCommands::new(processor, query);

    let adapter = Arc::new(DiscordAdapter::new(discord_config));
    adapter.run(gateway, commands).await?;
    Ok(())
}

/// Seed empty header-only sheets so dry-run upserts have tables to land in
async fn seed_dry_run(store: &MemorySheetStore) {
    let header = || {
        vec![vec![
            "Name".to_string(),
            "Merits".to_string(),
            "Rank".to_string(),
        ]]
    };
    store.seed(SheetKind::Main, header()).await;
    store.seed(SheetKind::Special, header()).await;
}
