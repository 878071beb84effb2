//! Command handlers: engine calls in, report text out.

use meritum_core::{
    tag, AwardProcessor, MemberRef, Progress, QueryEngine, SheetStore,
};
use std::sync::Arc;

/// Prefix-command handlers for the merit ledger
pub struct MeritumCommands<S: SheetStore> {
    processor: Arc<AwardProcessor<S>>,
    query: Arc<QueryEngine<S>>,
}

impl<S: SheetStore> MeritumCommands<S> {
    /// Wire up the handlers
    pub fn new(processor: Arc<AwardProcessor<S>>, query: Arc<QueryEngine<S>>) -> Self {
        Self { processor, query }
    }

    /// `!award <targets...> <points>`: one report line per target
    pub async fn handle_award(
        &self,
        giver: &MemberRef,
        args: &[&str],
        roster: &[MemberRef],
    ) -> String {
        if args.is_empty() {
            return "Usage: award <member...> <points>".to_string();
        }
        match self.processor.process(giver, args, roster).await {
            Ok(outcomes) if outcomes.is_empty() => {
                "Usage: award <member...> <points>".to_string()
            }
            Ok(outcomes) => outcomes
                .iter()
                .map(|o| o.line())
                .collect::<Vec<_>>()
                .join("\n"),
            Err(e) => e.to_string(),
        }
    }

    /// `!merits [member]`: current total and rank
    pub async fn handle_merits(&self, subject: &MemberRef) -> String {
        let Some(identity) = tag::identity_of(&subject.display_name) else {
            return format!("Cannot derive a ledger identity for {}.", subject.username);
        };
        match self.query.rank_of(&identity).await {
            Ok(Some((total, tier))) => {
                format!("{} has {} merits ({}).", identity, total, tier.name)
            }
            Ok(None) => format!("No ledger entry for {}.", identity),
            Err(e) => e.to_string(),
        }
    }

    /// `!progress [member]`: distance to the next rank
    pub async fn handle_progress(&self, subject: &MemberRef) -> String {
        let Some(identity) = tag::identity_of(&subject.display_name) else {
            return format!("Cannot derive a ledger identity for {}.", subject.username);
        };
        match self.query.progress(&identity).await {
            Ok(Some(Progress::Toward { next_rank, deficit })) => {
                format!("{} needs {} more merits for {}.", identity, deficit, next_rank)
            }
            Ok(Some(Progress::AtMax)) => {
                format!("{} is at the top of the ladder.", identity)
            }
            Ok(None) => format!("No ledger entry for {}.", identity),
            Err(e) => e.to_string(),
        }
    }

    /// `!leaderboard [n]`: top totals, default 10
    pub async fn handle_leaderboard(&self, n: usize) -> String {
        match self.query.leaderboard(n).await {
            Ok(rows) if rows.is_empty() => "The ledger is empty.".to_string(),
            Ok(rows) => rows
                .iter()
                .enumerate()
                .map(|(i, (identity, total))| format!("{}. {} — {}", i + 1, identity, total))
                .collect::<Vec<_>>()
                .join("\n"),
            Err(e) => e.to_string(),
        }
    }

    /// `!sync <member>`: raise sheet baseline to held rank and refresh
    /// roles/nickname
    pub async fn handle_sync(&self, member: &MemberRef) -> String {
        match self.processor.sync_member(member).await {
            Ok(s) if s.presentation_applied => {
                format!("{} synced: {} merits ({}).", s.identity, s.new_total, s.new_rank)
            }
            Ok(s) => format!(
                "{} synced: {} merits ({}) — roles/nickname unchanged: {}",
                s.identity,
                s.new_total,
                s.new_rank,
                s.presentation_note.as_deref().unwrap_or("edit skipped")
            ),
            Err(e) => e.to_string(),
        }
    }
}
