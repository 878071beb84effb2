//! Read-only queries across every ledger table on both sheets.

use crate::error::Result;
use crate::ladder::{RankLadder, RankTier};
use crate::store::{SheetKind, SheetStore};
use crate::table::Table;
use std::sync::Arc;

/// Progress toward the next rank
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// Next tier name and remaining deficit
    Toward {
        /// Name of the next tier
        next_rank: String,
        /// Points still needed
        deficit: u32,
    },
    /// Already at the top of the ladder
    AtMax,
}

/// Read-only scan engine over a [`SheetStore`]
pub struct QueryEngine<S: SheetStore> {
    store: Arc<S>,
    ladder: Arc<RankLadder>,
}

impl<S: SheetStore> QueryEngine<S> {
    /// Create a query engine
    pub fn new(store: Arc<S>, ladder: Arc<RankLadder>) -> Self {
        Self { store, ladder }
    }

    /// Current merit total for an identity; scans every table on every
    /// sheet, case-insensitively, first hit wins. `None` when the identity
    /// has no ledger row anywhere.
    pub async fn total_for(&self, identity: &str) -> Result<Option<u32>> {
        for sheet in SheetKind::all() {
            let grid = self.store.read_grid(sheet).await?;
            for table in Table::locate_all(&grid) {
                for (offset, name) in table.identities(&grid).enumerate() {
                    if !name.is_empty() && name.eq_ignore_ascii_case(identity) {
                        let row = table.data_start + offset;
                        let total = table
                            .cell(&grid, row, table.merits_col)
                            .parse::<u32>()
                            .unwrap_or(0);
                        return Ok(Some(total));
                    }
                }
            }
        }
        Ok(None)
    }

    /// Top `n` identities by merit total, descending; ties keep scan
    /// order (stable sort).
    pub async fn leaderboard(&self, n: usize) -> Result<Vec<(String, u32)>> {
        let mut rows = Vec::new();
        for sheet in SheetKind::all() {
            let grid = self.store.read_grid(sheet).await?;
            for table in Table::locate_all(&grid) {
                for (offset, name) in table.identities(&grid).enumerate() {
                    if name.is_empty() {
                        continue;
                    }
                    let row = table.data_start + offset;
                    let total = table
                        .cell(&grid, row, table.merits_col)
                        .parse::<u32>()
                        .unwrap_or(0);
                    rows.push((name.to_string(), total));
                }
            }
        }
        rows.sort_by(|a, b| b.1.cmp(&a.1));
        rows.truncate(n);
        Ok(rows)
    }

    /// Progress toward the next tier, or `None` when the identity has no
    /// ledger row.
    pub async fn progress(&self, identity: &str) -> Result<Option<Progress>> {
        let Some(total) = self.total_for(identity).await? else {
            return Ok(None);
        };
        Ok(Some(match self.ladder.points_to_next(total) {
            Some((next, deficit)) => Progress::Toward {
                next_rank: next.name.clone(),
                deficit,
            },
            None => Progress::AtMax,
        }))
    }

    /// Current rank tier for an identity's total
    pub async fn rank_of(&self, identity: &str) -> Result<Option<(u32, RankTier)>> {
        let Some(total) = self.total_for(identity).await? else {
            return Ok(None);
        };
        Ok(Some((total, self.ladder.rank_for(total).clone())))
    }
}
