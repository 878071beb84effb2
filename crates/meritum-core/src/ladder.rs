//! Rank ladder: the fixed threshold table mapping merit totals to ranks.
//!
//! Pure and stateless; thresholds are validated once at construction so
//! every lookup afterwards is total.

use crate::error::{Error, Result};
use serde::Deserialize;

/// One step on the rank ladder
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RankTier {
    /// Minimum merit total for this tier
    pub threshold: u32,
    /// Full rank name, written into the sheet's Rank column
    pub name: String,
    /// Short form embedded in the display-name tag
    pub abbreviation: String,
    /// Platform role carrying this rank
    pub role_id: u64,
}

/// Ordered ladder of rank tiers, ascending by threshold
#[derive(Debug, Clone)]
pub struct RankLadder {
    tiers: Vec<RankTier>,
}

impl RankLadder {
    /// Build a ladder, validating the threshold invariants: non-empty,
    /// first threshold 0 (so every non-negative total maps to a tier),
    /// strictly increasing.
    pub fn new(tiers: Vec<RankTier>) -> Result<Self> {
        if tiers.is_empty() {
            return Err(Error::InvalidConfig("rank ladder is empty".to_string()));
        }
        if tiers[0].threshold != 0 {
            return Err(Error::InvalidConfig(
                "first rank tier must have threshold 0".to_string(),
            ));
        }
        for pair in tiers.windows(2) {
            if pair[1].threshold <= pair[0].threshold {
                return Err(Error::InvalidConfig(format!(
                    "rank thresholds must be strictly increasing ({} then {})",
                    pair[0].threshold, pair[1].threshold
                )));
            }
        }
        Ok(Self { tiers })
    }

    /// The tier with the greatest threshold ≤ `total`. Always defined.
    #[must_use]
    pub fn rank_for(&self, total: u32) -> &RankTier {
        self.tiers
            .iter()
            .rev()
            .find(|t| t.threshold <= total)
            .unwrap_or(&self.tiers[0])
    }

    /// Next-higher tier and the remaining deficit, or `None` at the top.
    ///
    /// At a total exactly on a threshold the member *holds* that tier, so
    /// the returned deficit counts toward the tier above it.
    #[must_use]
    pub fn points_to_next(&self, total: u32) -> Option<(&RankTier, u32)> {
        self.tiers
            .iter()
            .find(|t| t.threshold > total)
            .map(|t| (t, t.threshold - total))
    }

    /// Look up the tier presented by a platform role, if it is one of ours
    #[must_use]
    pub fn tier_for_role(&self, role_id: u64) -> Option<&RankTier> {
        self.tiers.iter().find(|t| t.role_id == role_id)
    }

    /// Highest threshold implied by the rank roles a member already holds;
    /// 0 when none of the roles is a ladder role. This is the baseline for
    /// a member awarded points before their ledger row exists.
    #[must_use]
    pub fn baseline_for_roles(&self, role_ids: &[u64]) -> u32 {
        role_ids
            .iter()
            .filter_map(|id| self.tier_for_role(*id))
            .map(|t| t.threshold)
            .max()
            .unwrap_or(0)
    }

    /// Every role id on the ladder, in tier order
    pub fn role_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.tiers.iter().map(|t| t.role_id)
    }

    /// All tiers, ascending
    #[must_use]
    pub fn tiers(&self) -> &[RankTier] {
        &self.tiers
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_ladder() -> RankLadder {
        RankLadder::new(vec![
            tier(0, "Recruit", "REC", 100),
            tier(10, "Private", "PVT", 101),
            tier(25, "Corporal", "CPL", 102),
            tier(50, "Sergeant", "SGT", 103),
            tier(100, "Lieutenant", "LT", 104),
        ])
        .unwrap()
    }

    fn tier(threshold: u32, name: &str, abbr: &str, role_id: u64) -> RankTier {
        RankTier {
            threshold,
            name: name.to_string(),
            abbreviation: abbr.to_string(),
            role_id,
        }
    }

    #[test]
    fn test_rank_for_zero_is_lowest_tier() {
        let ladder = test_ladder();
        assert_eq!(ladder.rank_for(0).name, "Recruit");
    }

    #[test]
    fn test_rank_for_greatest_threshold_at_or_below() {
        let ladder = test_ladder();
        assert_eq!(ladder.rank_for(9).name, "Recruit");
        assert_eq!(ladder.rank_for(10).name, "Private");
        assert_eq!(ladder.rank_for(49).name, "Corporal");
        assert_eq!(ladder.rank_for(5000).name, "Lieutenant");
    }

    #[test]
    fn test_points_to_next_at_exact_threshold() {
        let ladder = test_ladder();
        // Holding exactly 25 means Corporal; the deficit targets Sergeant.
        let (next, deficit) = ladder.points_to_next(25).unwrap();
        assert_eq!(next.name, "Sergeant");
        assert_eq!(deficit, 25);
    }

    #[test]
    fn test_points_to_next_at_top() {
        let ladder = test_ladder();
        assert!(ladder.points_to_next(100).is_none());
        assert!(ladder.points_to_next(999).is_none());
    }

    #[test]
    fn test_baseline_from_held_roles() {
        let ladder = test_ladder();
        assert_eq!(ladder.baseline_for_roles(&[102, 999]), 25);
        assert_eq!(ladder.baseline_for_roles(&[101, 103]), 50);
        assert_eq!(ladder.baseline_for_roles(&[999]), 0);
        assert_eq!(ladder.baseline_for_roles(&[]), 0);
    }

    #[test]
    fn test_new_rejects_bad_ladders() {
        assert!(RankLadder::new(vec![]).is_err());
        assert!(RankLadder::new(vec![tier(5, "A", "A", 1)]).is_err());
        assert!(RankLadder::new(vec![tier(0, "A", "A", 1), tier(0, "B", "B", 2)]).is_err());
    }
}
