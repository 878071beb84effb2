//! `GuildGateway` implementation over the Discord HTTP API.
//!
//! Role and nickname changes land as one member edit. The bot's own role
//! height is checked first: when the target's highest role sits at or
//! above the bot's, the edit is refused locally as `HierarchyBlocked`
//! instead of burning an API call that Discord would reject anyway.

use meritum_core::{AwardEvent, GuildGateway, MemberRef, PresentationEdit};
use serenity::all::{
    ChannelId, CreateEmbed, CreateEmbedFooter, CreateMessage, EditMember, GuildId, RoleId, UserId,
};
use serenity::http::{Http, HttpError};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Discord-backed gateway for presentation edits and audit messages
pub struct DiscordGateway {
    guild_id: GuildId,
    audit_channel_id: Option<ChannelId>,
    http: RwLock<Option<Arc<Http>>>,
}

impl DiscordGateway {
    /// Create a gateway; the HTTP handle arrives once the client is built.
    #[must_use]
    pub fn new(guild_id: u64, audit_channel_id: Option<u64>) -> Self {
        Self {
            guild_id: GuildId::new(guild_id),
            audit_channel_id: audit_channel_id.map(ChannelId::new),
            http: RwLock::new(None),
        }
    }

    /// Store the HTTP handle (called by the adapter before the gateway
    /// receives traffic)
    pub async fn set_http(&self, http: Arc<Http>) {
        *self.http.write().await = Some(http);
    }

    async fn http(&self) -> meritum_core::Result<Arc<Http>> {
        self.http
            .read()
            .await
            .clone()
            .ok_or_else(|| meritum_core::Error::ExternalService("discord not connected".into()))
    }

    /// Compare role heights: true when the bot's highest role is strictly
    /// above the target's.
    async fn bot_outranks(&self, http: &Http, target: &MemberRef) -> meritum_core::Result<bool> {
        let roles = http
            .get_guild_roles(self.guild_id)
            .await
            .map_err(|e| external("fetch guild roles", &e))?;
        let position = |id: u64| {
            roles
                .iter()
                .find(|r| r.id.get() == id)
                .map(|r| r.position)
                .unwrap_or(0)
        };

        let bot_user = http
            .get_current_user()
            .await
            .map_err(|e| external("fetch bot user", &e))?;
        let bot_member = http
            .get_member(self.guild_id, bot_user.id)
            .await
            .map_err(|e| external("fetch bot member", &e))?;

        let bot_top = bot_member
            .roles
            .iter()
            .map(|r| position(r.get()))
            .max()
            .unwrap_or(0);
        let target_top = target
            .role_ids
            .iter()
            .map(|id| position(*id))
            .max()
            .unwrap_or(0);
        Ok(bot_top > target_top)
    }
}

#[async_trait::async_trait]
impl GuildGateway for DiscordGateway {
    #[instrument(skip(self, member, edit), fields(user_id = member.user_id))]
    async fn apply_presentation(
        &self,
        member: &MemberRef,
        edit: &PresentationEdit,
    ) -> meritum_core::Result<()> {
        let http = self.http().await?;

        if !self.bot_outranks(&http, member).await? {
            return Err(meritum_core::Error::HierarchyBlocked {
                who: member.username.clone(),
            });
        }

        // Final role set: current roles minus other ladder roles, plus the
        // new tier. Recomputed from the member's known roles so the edit
        // is idempotent.
        let mut roles: Vec<RoleId> = member
            .role_ids
            .iter()
            .filter(|id| !edit.remove_role_ids.contains(id))
            .map(|id| RoleId::new(*id))
            .collect();
        let add = RoleId::new(edit.add_role_id);
        if !roles.contains(&add) {
            roles.push(add);
        }

        let builder = EditMember::new().roles(roles).nickname(&edit.new_nick);
        self.guild_id
            .edit_member(&http, UserId::new(member.user_id), builder)
            .await
            .map_err(|e| map_edit_error(&member.username, e))?;

        debug!(nick = %edit.new_nick, "presentation applied");
        Ok(())
    }

    async fn emit_audit(&self, event: &AwardEvent) -> meritum_core::Result<()> {
        let Some(channel) = self.audit_channel_id else {
            debug!("no audit channel configured, skipping audit embed");
            return Ok(());
        };
        let http = self.http().await?;

        let embed = CreateEmbed::new()
            .title("Merit Award")
            .field("Giver", &event.giver_name, true)
            .field("Receiver", &event.receiver_identity, true)
            .field("Points", event.points.to_string(), true)
            .field("New Total", event.new_total.to_string(), true)
            .field("New Rank", &event.new_rank, true)
            .footer(CreateEmbedFooter::new(
                event.at.format("%Y-%m-%d %H:%M UTC").to_string(),
            ))
            .color(0x00aa55);
        channel
            .send_message(&http, CreateMessage::new().embed(embed))
            .await
            .map_err(|e| external("send audit embed", &e))?;
        Ok(())
    }
}

fn external(what: &str, e: &serenity::Error) -> meritum_core::Error {
    meritum_core::Error::ExternalService(format!("{what}: {e}"))
}

/// Map a failed member edit onto the engine's taxonomy: permission
/// refusals and throttling are distinct from other transport failures.
fn map_edit_error(who: &str, e: serenity::Error) -> meritum_core::Error {
    if let serenity::Error::Http(HttpError::UnsuccessfulRequest(ref resp)) = e {
        match resp.status_code.as_u16() {
            403 => {
                return meritum_core::Error::PermissionDenied {
                    who: who.to_string(),
                }
            }
            429 => {
                return meritum_core::Error::ExternalService(
                    "rate limited by discord, retry shortly".to_string(),
                )
            }
            _ => {}
        }
    }
    external("edit member", &e)
}
