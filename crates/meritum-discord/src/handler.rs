//! Discord event handler: prefix-command dispatch.
//!
//! Authorization (officer role check for `award`/`sync`) happens here,
//! before any engine logic runs. Every command degrades to a text reply;
//! nothing in this handler can take the process down.

use crate::adapter::DiscordAdapter;
use crate::commands::MeritumCommands;
use crate::util::chunk_message;
use async_trait::async_trait;
use meritum_core::{resolver, MemberRef, SheetStore};
use serenity::all::{
    Context, CreateMessage, EventHandler, GuildId, Member, Message, MessageReference, Ready,
    UserId,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{error, info};

/// Discord caps one member-list page at 1000 entries.
const MEMBER_PAGE_SIZE: usize = 1000;

/// Discord event handler
pub struct MeritumHandler<S: SheetStore> {
    adapter: Arc<DiscordAdapter>,
    commands: MeritumCommands<S>,
}

impl<S: SheetStore + 'static> MeritumHandler<S> {
    /// Create a handler
    pub fn new(adapter: Arc<DiscordAdapter>, commands: MeritumCommands<S>) -> Self {
        Self { adapter, commands }
    }

    /// Fetch the full guild roster as engine member refs
    async fn roster(&self, ctx: &Context) -> Result<Vec<MemberRef>, String> {
        let mut pager = HttpPager {
            ctx,
            guild: GuildId::new(self.adapter.config.guild_id),
        };
        fetch_roster(&mut pager).await
    }

    async fn reply(&self, ctx: &Context, msg: &Message, text: &str) {
        for chunk in chunk_message(text) {
            let builder = CreateMessage::new()
                .content(chunk)
                .reference_message(MessageReference::from((msg.channel_id, msg.id)));
            if let Err(e) = msg.channel_id.send_message(&ctx.http, builder).await {
                error!(error = %e, "failed to send reply");
            }
        }
    }

    /// Resolve an optional subject argument, defaulting to the author
    fn subject<'a>(
        token: Option<&str>,
        roster: &'a [MemberRef],
        author: &'a MemberRef,
    ) -> Result<&'a MemberRef, String> {
        match token {
            None => Ok(author),
            Some(t) => {
                resolver::resolve(t, roster).ok_or_else(|| format!("No member matches `{t}`."))
            }
        }
    }
}

#[serenity::async_trait]
impl<S: SheetStore + 'static> EventHandler for MeritumHandler<S> {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("Merit ledger bot connected as {}", ready.user.name);
        self.adapter
            .bot_user_id
            .store(ready.user.id.get(), Ordering::SeqCst);
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        let config = &self.adapter.config;
        if msg.guild_id.map(|g| g.get()) != Some(config.guild_id) {
            return;
        }
        let Some(text) = msg.content.strip_prefix(&config.command_prefix) else {
            return;
        };
        let mut parts = text.split_whitespace();
        let Some(command) = parts.next() else {
            return;
        };
        let args: Vec<&str> = parts.collect();

        let author_roles: Vec<u64> = msg
            .member
            .as_ref()
            .map(|m| m.roles.iter().map(|r| r.get()).collect())
            .unwrap_or_default();
        let author = MemberRef {
            user_id: msg.author.id.get(),
            username: msg.author.name.clone(),
            display_name: msg
                .member
                .as_ref()
                .and_then(|m| m.nick.clone())
                .or_else(|| msg.author.global_name.clone())
                .unwrap_or_else(|| msg.author.name.clone()),
            role_ids: author_roles.clone(),
        };

        let response = match command {
            "award" => {
                if !config.is_officer(&author_roles) {
                    "Only officers can award merits.".to_string()
                } else {
                    match self.roster(&ctx).await {
                        Ok(roster) => {
                            self.commands.handle_award(&author, &args, &roster).await
                        }
                        Err(e) => e,
                    }
                }
            }
            "merits" => match self.roster(&ctx).await {
                Ok(roster) => match Self::subject(args.first().copied(), &roster, &author) {
                    Ok(subject) => self.commands.handle_merits(subject).await,
                    Err(e) => e,
                },
                Err(e) => e,
            },
            "progress" => match self.roster(&ctx).await {
                Ok(roster) => match Self::subject(args.first().copied(), &roster, &author) {
                    Ok(subject) => self.commands.handle_progress(subject).await,
                    Err(e) => e,
                },
                Err(e) => e,
            },
            "leaderboard" => {
                let n = args
                    .first()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(10);
                self.commands.handle_leaderboard(n).await
            }
            "sync" => {
                if !config.is_officer(&author_roles) {
                    "Only officers can sync members.".to_string()
                } else {
                    match self.roster(&ctx).await {
                        Ok(roster) => match Self::subject(args.first().copied(), &roster, &author)
                        {
                            Ok(subject) => self.commands.handle_sync(subject).await,
                            Err(e) => e,
                        },
                        Err(e) => e,
                    }
                }
            }
            _ => return,
        };

        self.reply(&ctx, &msg, &response).await;
    }
}

/// One page of the guild member list, keyed by an `after` user-id cursor
#[async_trait]
trait MemberPager: Send {
    async fn page(&mut self, after: Option<u64>) -> Result<Vec<MemberRef>, String>;
}

struct HttpPager<'a> {
    ctx: &'a Context,
    guild: GuildId,
}

#[async_trait]
impl MemberPager for HttpPager<'_> {
    async fn page(&mut self, after: Option<u64>) -> Result<Vec<MemberRef>, String> {
        self.guild
            .members(
                &self.ctx.http,
                Some(MEMBER_PAGE_SIZE as u64),
                after.map(UserId::new),
            )
            .await
            .map(|members| members.iter().map(member_ref).collect())
            .map_err(|e| {
                error!(error = %e, "failed to fetch guild members");
                "Could not fetch the member list, try again shortly.".to_string()
            })
    }
}

/// Walk the member list page by page until a short page signals the end.
/// Pages arrive in ascending user-id order, so the last member of each
/// page is the cursor for the next.
async fn fetch_roster(pager: &mut dyn MemberPager) -> Result<Vec<MemberRef>, String> {
    let mut roster: Vec<MemberRef> = Vec::new();
    loop {
        let page = pager.page(roster.last().map(|m| m.user_id)).await?;
        let full_page = page.len() >= MEMBER_PAGE_SIZE;
        roster.extend(page);
        if !full_page {
            return Ok(roster);
        }
    }
}

/// Convert a Discord member to the engine's view
fn member_ref(member: &Member) -> MemberRef {
    MemberRef {
        user_id: member.user.id.get(),
        username: member.user.name.clone(),
        display_name: member
            .nick
            .clone()
            .or_else(|| member.user.global_name.clone())
            .unwrap_or_else(|| member.user.name.clone()),
        role_ids: member.roles.iter().map(|r| r.get()).collect(),
    }
}
