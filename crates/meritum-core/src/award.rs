//! Award processor: the end-to-end path for `!award`.
//!
//! Resolves human input to members, pushes the point delta through the
//! ledger synchronizer, recomputes rank, and reconciles the member's role
//! set and display-name tag. The ledger write is the anchor: presentation
//! failures (hierarchy, permissions, throttling) never roll it back, they
//! are surfaced on the target's result line.

use crate::counters::{AwardCounters, AwardLimits};
use crate::error::{Error, Result};
use crate::ladder::RankLadder;
use crate::ledger::Ledger;
use crate::regiment::RegimentMap;
use crate::resolver::{self, MemberRef};
use crate::store::SheetStore;
use crate::tag;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// One audit record per award; ephemeral, emitted and forgotten
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwardEvent {
    /// Giver's platform user id
    pub giver_id: u64,
    /// Giver's username
    pub giver_name: String,
    /// Receiver's platform user id
    pub receiver_id: u64,
    /// Receiver's ledger identity
    pub receiver_identity: String,
    /// Points awarded
    pub points: u32,
    /// Merit total after the award
    pub new_total: u32,
    /// Rank name after the award
    pub new_rank: String,
    /// When the award happened
    pub at: DateTime<Utc>,
}

/// The single member edit reconciling presentation with the new rank
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationEdit {
    /// Ladder roles to strip (every held rank role except the new one)
    pub remove_role_ids: Vec<u64>,
    /// The new tier's role; adding it is a no-op when already held
    pub add_role_id: u64,
    /// Re-encoded display-name tag
    pub new_nick: String,
}

/// Chat-platform seam: role/nickname mutation and the audit channel.
///
/// Implementations map platform refusals onto [`Error::HierarchyBlocked`]
/// and [`Error::PermissionDenied`], and throttling onto
/// [`Error::ExternalService`].
#[async_trait::async_trait]
pub trait GuildGateway: Send + Sync {
    /// Apply role-set and nickname changes as one member update
    async fn apply_presentation(&self, member: &MemberRef, edit: &PresentationEdit) -> Result<()>;

    /// Send one structured audit message for an award
    async fn emit_audit(&self, event: &AwardEvent) -> Result<()>;
}

/// Successful (possibly partially successful) award for one target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwardSuccess {
    /// Ledger identity credited
    pub identity: String,
    /// Merit total after the award
    pub new_total: u32,
    /// Rank name after the award
    pub new_rank: String,
    /// Whether the role/nickname edit went through
    pub presentation_applied: bool,
    /// Why presentation was skipped, when it was
    pub presentation_note: Option<String>,
}

/// Per-target result, one per input token, in input order
#[derive(Debug)]
pub struct TargetOutcome {
    /// The raw input token this outcome answers
    pub token: String,
    /// Award result for the target
    pub result: Result<AwardSuccess>,
}

impl TargetOutcome {
    /// One user-visible report line
    #[must_use]
    pub fn line(&self) -> String {
        match &self.result {
            Ok(s) if s.presentation_applied => format!(
                "{}: {} merits ({})",
                s.identity, s.new_total, s.new_rank
            ),
            Ok(s) => format!(
                "{}: {} merits ({}) — ledger updated, roles/nickname unchanged: {}",
                s.identity,
                s.new_total,
                s.new_rank,
                s.presentation_note.as_deref().unwrap_or("edit skipped")
            ),
            Err(e) => format!("{}: {}", self.token, e),
        }
    }
}

/// Parse an award invocation: member tokens followed by a trailing
/// positive point count. A bad trailing token rejects the whole batch.
pub fn parse_batch<'a>(tokens: &'a [&'a str]) -> Result<(&'a [&'a str], u32)> {
    let (last, targets) = tokens.split_last().ok_or(Error::InvalidPoints)?;
    let points: u32 = last.parse().map_err(|_| Error::InvalidPoints)?;
    if points == 0 {
        return Err(Error::InvalidPoints);
    }
    Ok((targets, points))
}

/// Top-level orchestration for awards and rank sync
pub struct AwardProcessor<S: SheetStore> {
    ledger: Arc<Ledger<S>>,
    ladder: Arc<RankLadder>,
    regiments: Arc<RegimentMap>,
    gateway: Arc<dyn GuildGateway>,
    counters: Arc<AwardCounters>,
    limits: AwardLimits,
}

impl<S: SheetStore> AwardProcessor<S> {
    /// Wire up a processor
    pub fn new(
        ledger: Arc<Ledger<S>>,
        ladder: Arc<RankLadder>,
        regiments: Arc<RegimentMap>,
        gateway: Arc<dyn GuildGateway>,
        counters: Arc<AwardCounters>,
        limits: AwardLimits,
    ) -> Self {
        Self {
            ledger,
            ladder,
            regiments,
            gateway,
            counters,
            limits,
        }
    }

    /// Process one award batch. Fails fast on an invalid points token;
    /// after that, one target's failure never aborts its siblings.
    #[instrument(skip(self, giver, members), fields(giver = %giver.username))]
    pub async fn process(
        &self,
        giver: &MemberRef,
        tokens: &[&str],
        members: &[MemberRef],
    ) -> Result<Vec<TargetOutcome>> {
        let (targets, points) = parse_batch(tokens)?;

        let mut outcomes = Vec::with_capacity(targets.len());
        for token in targets {
            let result = match resolver::resolve(token, members) {
                Some(member) => self.award_one(giver, member, points).await,
                None => Err(Error::MemberNotFound {
                    token: (*token).to_string(),
                }),
            };
            // Only awards that reached the ledger count toward the giver's
            // window.
            if result.is_ok() {
                self.counters.observe(giver.user_id, points, &self.limits);
            }
            outcomes.push(TargetOutcome {
                token: (*token).to_string(),
                result,
            });
        }
        Ok(outcomes)
    }

    /// Award `points` to one resolved member
    async fn award_one(
        &self,
        giver: &MemberRef,
        member: &MemberRef,
        points: u32,
    ) -> Result<AwardSuccess> {
        let decoded = tag::decode(&member.display_name);
        let identity = tag::identity_of(&member.display_name).ok_or_else(|| Error::NoIdentity {
            display_name: member.display_name.clone(),
        })?;

        let regiment =
            self.regiments
                .select(&member.role_ids)
                .ok_or_else(|| Error::UnsupportedRegiment {
                    who: member.username.clone(),
                })?;

        let baseline = self.ladder.baseline_for_roles(&member.role_ids);
        let outcome = self
            .ledger
            .upsert(
                regiment.sheet,
                Some(&regiment.display_header),
                &identity,
                points,
                baseline,
            )
            .await?;

        let tier = self.ladder.rank_for(outcome.new_total);
        info!(
            identity,
            points,
            new_total = outcome.new_total,
            new_rank = %tier.name,
            "award committed"
        );

        let edit = self.presentation_edit(member, &identity, decoded.as_ref(), regiment, tier);
        let (applied, note) = match self.gateway.apply_presentation(member, &edit).await {
            Ok(()) => (true, None),
            Err(e) => {
                warn!(identity, error = %e, "presentation edit skipped, ledger stands");
                (false, Some(e.to_string()))
            }
        };

        let event = AwardEvent {
            giver_id: giver.user_id,
            giver_name: giver.username.clone(),
            receiver_id: member.user_id,
            receiver_identity: identity.clone(),
            points,
            new_total: outcome.new_total,
            new_rank: tier.name.clone(),
            at: Utc::now(),
        };
        if let Err(e) = self.gateway.emit_audit(&event).await {
            warn!(error = %e, "audit emit failed, award stands");
        }

        Ok(AwardSuccess {
            identity,
            new_total: outcome.new_total,
            new_rank: tier.name.clone(),
            presentation_applied: applied,
            presentation_note: note,
        })
    }

    /// Re-sync one member's sheet baseline and presentation without
    /// changing their total (the `!sync` path).
    pub async fn sync_member(&self, member: &MemberRef) -> Result<AwardSuccess> {
        let decoded = tag::decode(&member.display_name);
        let identity = tag::identity_of(&member.display_name).ok_or_else(|| Error::NoIdentity {
            display_name: member.display_name.clone(),
        })?;
        let regiment =
            self.regiments
                .select(&member.role_ids)
                .ok_or_else(|| Error::UnsupportedRegiment {
                    who: member.username.clone(),
                })?;

        let held = self.ladder.baseline_for_roles(&member.role_ids);
        let total = match self
            .ledger
            .reconcile_baseline(
                regiment.sheet,
                Some(&regiment.display_header),
                &identity,
                held,
            )
            .await?
        {
            Some(total) => total,
            // No row yet: create one seeded from the held rank role.
            None => {
                self.ledger
                    .upsert(
                        regiment.sheet,
                        Some(&regiment.display_header),
                        &identity,
                        0,
                        held,
                    )
                    .await?
                    .new_total
            }
        };

        let tier = self.ladder.rank_for(total);
        let edit = self.presentation_edit(member, &identity, decoded.as_ref(), regiment, tier);
        let (applied, note) = match self.gateway.apply_presentation(member, &edit).await {
            Ok(()) => (true, None),
            Err(e) => (false, Some(e.to_string())),
        };

        Ok(AwardSuccess {
            identity,
            new_total: total,
            new_rank: tier.name.clone(),
            presentation_applied: applied,
            presentation_note: note,
        })
    }

    fn presentation_edit(
        &self,
        member: &MemberRef,
        identity: &str,
        decoded: Option<&tag::DecodedTag>,
        regiment: &crate::regiment::Regiment,
        tier: &crate::ladder::RankTier,
    ) -> PresentationEdit {
        let prefix = decoded.and_then(|t| t.prefix.as_deref());
        let reg_tag = decoded
            .and_then(|t| t.regiment.as_deref())
            .unwrap_or(&regiment.tag);
        let new_nick = tag::encode(prefix, Some(reg_tag), &tier.abbreviation, identity);

        let remove_role_ids: Vec<u64> = self
            .ladder
            .role_ids()
            .filter(|id| *id != tier.role_id && member.role_ids.contains(id))
            .collect();

        PresentationEdit {
            remove_role_ids,
            add_role_id: tier.role_id,
            new_nick,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ladder::tests::test_ladder;
    use crate::regiment::tests::test_regiments;
    use crate::store::{MemorySheetStore, SheetKind};
    use crate::table::tests::grid;
    use std::sync::Mutex;

    /// Recording gateway: captures edits and audits, optionally failing
    /// presentation with a chosen error.
    #[derive(Default)]
    struct FakeGateway {
        edits: Mutex<Vec<PresentationEdit>>,
        audits: Mutex<Vec<AwardEvent>>,
        fail_presentation: Mutex<Option<fn(&MemberRef) -> Error>>,
        fail_audit: Mutex<bool>,
    }

    #[async_trait::async_trait]
    impl GuildGateway for FakeGateway {
        async fn apply_presentation(
            &self,
            member: &MemberRef,
            edit: &PresentationEdit,
        ) -> Result<()> {
            if let Some(make) = *self.fail_presentation.lock().unwrap() {
                return Err(make(member));
            }
            self.edits.lock().unwrap().push(edit.clone());
            Ok(())
        }

        async fn emit_audit(&self, event: &AwardEvent) -> Result<()> {
            if *self.fail_audit.lock().unwrap() {
                return Err(Error::ExternalService("audit channel down".into()));
            }
            self.audits.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    struct Fixture {
        processor: AwardProcessor<MemorySheetStore>,
        store: Arc<MemorySheetStore>,
        gateway: Arc<FakeGateway>,
        counters: Arc<AwardCounters>,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemorySheetStore::new());
        store
            .seed(
                SheetKind::Main,
                grid(&[
                    &["SEVENTH REGIMENT"],
                    &["Name", "Merits", "Rank"],
                    &["Kael", "20", "Private"],
                ]),
            )
            .await;
        store
            .seed(
                SheetKind::Special,
                grid(&[&["AUXILIARY"], &["Name", "Merits", "Rank"]]),
            )
            .await;
        let ladder = Arc::new(test_ladder());
        let gateway = Arc::new(FakeGateway::default());
        let counters = Arc::new(AwardCounters::new());
        let processor = AwardProcessor::new(
            Arc::new(Ledger::new(Arc::clone(&store), Arc::clone(&ladder))),
            ladder,
            Arc::new(test_regiments()),
            gateway.clone() as Arc<dyn GuildGateway>,
            Arc::clone(&counters),
            AwardLimits::default(),
        );
        Fixture {
            processor,
            store,
            gateway,
            counters,
        }
    }

    fn giver() -> MemberRef {
        MemberRef {
            user_id: 1,
            username: "officer".to_string(),
            display_name: "{7TH} LT | Officer".to_string(),
            role_ids: vec![104, 700],
        }
    }

    fn kael() -> MemberRef {
        MemberRef {
            user_id: 123,
            username: "kael".to_string(),
            display_name: "{7TH} PVT | Kael".to_string(),
            role_ids: vec![101, 700],
        }
    }

    #[test]
    fn test_parse_batch_rejects_bad_points() {
        assert!(matches!(
            parse_batch(&["kael", "zero"]),
            Err(Error::InvalidPoints)
        ));
        assert!(matches!(parse_batch(&["kael", "0"]), Err(Error::InvalidPoints)));
        assert!(matches!(parse_batch(&["kael", "-3"]), Err(Error::InvalidPoints)));
        assert!(matches!(parse_batch(&[]), Err(Error::InvalidPoints)));

        let (targets, points) = parse_batch(&["a", "b", "12"]).unwrap();
        assert_eq!(targets, &["a", "b"]);
        assert_eq!(points, 12);
    }

    #[tokio::test]
    async fn test_award_updates_ledger_roles_and_nick() {
        let fx = fixture().await;
        let members = vec![kael()];
        let outcomes = fx
            .processor
            .process(&giver(), &["<@123>", "10"], &members)
            .await
            .unwrap();
        assert_eq!(outcomes.len(), 1);
        let success = outcomes[0].result.as_ref().unwrap();
        assert_eq!(success.new_total, 30);
        assert_eq!(success.new_rank, "Corporal");
        assert!(success.presentation_applied);

        let g = fx.store.snapshot(SheetKind::Main).await;
        assert_eq!(g[2][1], "30");
        assert_eq!(g[2][2], "Corporal");

        let edits = fx.gateway.edits.lock().unwrap();
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].add_role_id, 102);
        assert_eq!(edits[0].remove_role_ids, vec![101]);
        assert_eq!(edits[0].new_nick, "{7TH} CPL | Kael");

        let audits = fx.gateway.audits.lock().unwrap();
        assert_eq!(audits.len(), 1);
        assert_eq!(audits[0].points, 10);
        assert_eq!(audits[0].receiver_identity, "Kael");
    }

    #[tokio::test]
    async fn test_untagged_member_gets_fallback_tag() {
        let fx = fixture().await;
        let members = vec![MemberRef {
            user_id: 456,
            username: "mara".to_string(),
            display_name: "Mara Venn".to_string(),
            role_ids: vec![800],
        }];
        let outcomes = fx
            .processor
            .process(&giver(), &["mara", "5"], &members)
            .await
            .unwrap();
        let success = outcomes[0].result.as_ref().unwrap();
        assert_eq!(success.identity, "Venn");
        assert_eq!(success.new_total, 5);

        // New row landed in the special sheet's auxiliary table.
        let g = fx.store.snapshot(SheetKind::Special).await;
        assert_eq!(g[2][0], "Venn");

        let edits = fx.gateway.edits.lock().unwrap();
        assert_eq!(edits[0].new_nick, "{AUX} REC | Venn");
    }

    #[tokio::test]
    async fn test_batch_sibling_failures_are_isolated() {
        let fx = fixture().await;
        let members = vec![kael()];
        let outcomes = fx
            .processor
            .process(&giver(), &["ghost", "<@123>", "5"], &members)
            .await
            .unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(matches!(
            outcomes[0].result,
            Err(Error::MemberNotFound { .. })
        ));
        assert_eq!(outcomes[1].result.as_ref().unwrap().new_total, 25);
    }

    #[tokio::test]
    async fn test_invalid_points_rejects_before_side_effects() {
        let fx = fixture().await;
        let members = vec![kael()];
        let err = fx
            .processor
            .process(&giver(), &["<@123>", "lots"], &members)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPoints));
        let g = fx.store.snapshot(SheetKind::Main).await;
        assert_eq!(g[2][1], "20");
    }

    #[tokio::test]
    async fn test_hierarchy_block_keeps_ledger_write() {
        let fx = fixture().await;
        *fx.gateway.fail_presentation.lock().unwrap() = Some(|m| Error::HierarchyBlocked {
            who: m.username.clone(),
        });
        let members = vec![kael()];
        let outcomes = fx
            .processor
            .process(&giver(), &["kael", "10"], &members)
            .await
            .unwrap();
        let success = outcomes[0].result.as_ref().unwrap();
        assert!(!success.presentation_applied);
        assert!(success
            .presentation_note
            .as_ref()
            .unwrap()
            .contains("outranks"));

        // Ledger committed despite the skipped edit.
        let g = fx.store.snapshot(SheetKind::Main).await;
        assert_eq!(g[2][1], "30");

        // The divergence is surfaced on the report line.
        assert!(outcomes[0].line().contains("roles/nickname unchanged"));
    }

    #[tokio::test]
    async fn test_audit_failure_is_non_fatal() {
        let fx = fixture().await;
        *fx.gateway.fail_audit.lock().unwrap() = true;
        let members = vec![kael()];
        let outcomes = fx
            .processor
            .process(&giver(), &["kael", "10"], &members)
            .await
            .unwrap();
        assert!(outcomes[0].result.is_ok());
    }

    #[tokio::test]
    async fn test_no_regiment_role_is_unsupported() {
        let fx = fixture().await;
        let members = vec![MemberRef {
            user_id: 9,
            username: "drifter".to_string(),
            display_name: "Drifter".to_string(),
            role_ids: vec![],
        }];
        let outcomes = fx
            .processor
            .process(&giver(), &["drifter", "5"], &members)
            .await
            .unwrap();
        assert!(matches!(
            outcomes[0].result,
            Err(Error::UnsupportedRegiment { .. })
        ));
    }

    #[tokio::test]
    async fn test_failed_awards_do_not_count_toward_giver_window() {
        let fx = fixture().await;
        let window = std::time::Duration::from_secs(3600);

        fx.processor
            .process(&giver(), &["ghost", "5"], &[])
            .await
            .unwrap();
        assert_eq!(fx.counters.record(1, 0, window), 0);

        let members = vec![kael()];
        fx.processor
            .process(&giver(), &["kael", "5"], &members)
            .await
            .unwrap();
        assert_eq!(fx.counters.record(1, 0, window), 5);
    }

    #[tokio::test]
    async fn test_sync_member_raises_baseline_and_reencodes() {
        let fx = fixture().await;
        // Kael holds Sergeant role (103) but the sheet says 20.
        let member = MemberRef {
            role_ids: vec![103, 700],
            ..kael()
        };
        let success = fx.processor.sync_member(&member).await.unwrap();
        assert_eq!(success.new_total, 50);
        assert_eq!(success.new_rank, "Sergeant");

        let g = fx.store.snapshot(SheetKind::Main).await;
        assert_eq!(g[2][1], "50");

        let edits = fx.gateway.edits.lock().unwrap();
        assert_eq!(edits[0].new_nick, "{7TH} SGT | Kael");
    }
}
