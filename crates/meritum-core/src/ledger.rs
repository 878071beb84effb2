//! Ledger synchronizer: find-or-insert-then-update of merit rows.
//!
//! The spreadsheet exposes no transactions, so a read of the current total
//! and the write of the new one are independent round trips. Two awards to
//! the same identity interleaving between them would lose an increment;
//! every upsert therefore runs under a keyed async mutex scoped to
//! `(sheet, identity)`.
//!
//! The rank label cell is always re-derived from the merits cell, never
//! trusted on read. A label write that fails after the merits write leaves
//! nothing to repair: the next read or write regenerates it.

use crate::error::{Error, Result};
use crate::ladder::RankLadder;
use crate::store::{SheetKind, SheetStore};
use crate::table::{Grid, Table};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, warn};

/// A located ledger row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRow {
    /// 0-based grid row
    pub row: usize,
    /// Identity as written in the sheet (original casing)
    pub identity: String,
    /// Current merit total, 0 when the cell is blank or unparsable
    pub merits: u32,
}

/// Outcome of an upsert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// Grid row written
    pub row: usize,
    /// Merit total after the write
    pub new_total: u32,
    /// Whether a new row was created for this identity
    pub created: bool,
}

/// Per-key async mutexes serializing upserts for one `(sheet, identity)`.
///
/// Identity keys are lowercased so the lock policy matches the
/// case-insensitive row lookup.
#[derive(Debug, Default)]
pub struct LockMap {
    inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl LockMap {
    /// Acquire the lock for one ledger subject, waiting if another award
    /// to the same subject is mid-flight.
    pub async fn acquire(&self, sheet: SheetKind, identity: &str) -> OwnedMutexGuard<()> {
        let key = format!("{}:{}", sheet.name(), identity.to_lowercase());
        let lock = {
            let mut map = self.inner.lock().expect("lock map poisoned");
            Arc::clone(map.entry(key).or_default())
        };
        lock.lock_owned().await
    }
}

/// Ledger synchronizer over a [`SheetStore`]
pub struct Ledger<S: SheetStore> {
    store: Arc<S>,
    ladder: Arc<RankLadder>,
    locks: LockMap,
}

impl<S: SheetStore> Ledger<S> {
    /// Create a synchronizer
    pub fn new(store: Arc<S>, ladder: Arc<RankLadder>) -> Self {
        Self {
            store,
            ladder,
            locks: LockMap::default(),
        }
    }

    /// The backing store
    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Find the row holding `identity` inside `table`, case-insensitively.
    #[must_use]
    pub fn find_row(table: &Table, grid: &Grid, identity: &str) -> Option<LedgerRow> {
        for (offset, name) in table.identities(grid).enumerate() {
            if !name.is_empty() && name.eq_ignore_ascii_case(identity) {
                let row = table.data_start + offset;
                let merits = table
                    .cell(grid, row, table.merits_col)
                    .parse::<u32>()
                    .unwrap_or(0);
                return Some(LedgerRow {
                    row,
                    identity: name.to_string(),
                    merits,
                });
            }
        }
        None
    }

    /// Add `delta` merits to `identity`'s row, creating the row when the
    /// identity is new. `baseline_if_new` seeds the total for a member who
    /// already holds a rank role but has no ledger row yet.
    ///
    /// Serialized per `(sheet, identity)`. Idempotence under retry is the
    /// caller's concern: no award identifier is stored, so calling this
    /// twice applies the delta twice.
    pub async fn upsert(
        &self,
        sheet: SheetKind,
        section: Option<&str>,
        identity: &str,
        delta: u32,
        baseline_if_new: u32,
    ) -> Result<UpsertOutcome> {
        let _guard = self.locks.acquire(sheet, identity).await;

        let grid = self.store.read_grid(sheet).await?;
        let table = self.locate(&grid, sheet, section)?;

        if let Some(found) = Self::find_row(&table, &grid, identity) {
            let new_total = found.merits.saturating_add(delta);
            self.write_row(sheet, &table, found.row, identity, new_total)
                .await?;
            debug!(sheet = sheet.name(), identity, new_total, "merits updated");
            return Ok(UpsertOutcome {
                row: found.row,
                new_total,
                created: false,
            });
        }

        let new_total = baseline_if_new.saturating_add(delta);
        let free_slot = table
            .identities(&grid)
            .position(|name| name.is_empty())
            .map(|offset| table.data_start + offset);

        let row = match free_slot {
            Some(row) => {
                self.store
                    .write_cell(sheet, row, table.name_col, identity)
                    .await?;
                self.write_row(sheet, &table, row, identity, new_total)
                    .await?;
                row
            }
            None => {
                let width = table.name_col.max(table.merits_col).max(table.rank_col) + 1;
                let mut values = vec![String::new(); width];
                values[table.name_col] = identity.to_string();
                values[table.merits_col] = new_total.to_string();
                values[table.rank_col] = self.ladder.rank_for(new_total).name.clone();
                // Insert inside the table's own range: a sheet-level append
                // would land the row in the next stacked table.
                self.store.insert_row(sheet, table.data_end, values).await?;
                table.data_end
            }
        };
        debug!(sheet = sheet.name(), identity, new_total, row, "ledger row created");
        Ok(UpsertOutcome {
            row,
            new_total,
            created: true,
        })
    }

    /// One-way baseline correction: when the sheet records fewer merits
    /// than the threshold of a rank role the member already holds, raise
    /// the sheet to that threshold. Never lowers. Returns the total after
    /// reconciliation, or `None` when the identity has no row.
    pub async fn reconcile_baseline(
        &self,
        sheet: SheetKind,
        section: Option<&str>,
        identity: &str,
        held_threshold: u32,
    ) -> Result<Option<u32>> {
        let _guard = self.locks.acquire(sheet, identity).await;

        let grid = self.store.read_grid(sheet).await?;
        let table = self.locate(&grid, sheet, section)?;
        let Some(found) = Self::find_row(&table, &grid, identity) else {
            return Ok(None);
        };

        if found.merits >= held_threshold {
            return Ok(Some(found.merits));
        }
        warn!(
            sheet = sheet.name(),
            identity,
            recorded = found.merits,
            held_threshold,
            "sheet behind held rank role, raising baseline"
        );
        self.write_row(sheet, &table, found.row, identity, held_threshold)
            .await?;
        Ok(Some(held_threshold))
    }

    fn locate(&self, grid: &Grid, sheet: SheetKind, section: Option<&str>) -> Result<Table> {
        match section {
            Some(s) => Table::locate_section(grid, sheet.name(), s),
            None => Table::locate(grid, sheet.name()),
        }
    }

    /// Write merits then rank label. The pair is not atomic; the label is
    /// derived data, so a failed second write only costs a warning.
    async fn write_row(
        &self,
        sheet: SheetKind,
        table: &Table,
        row: usize,
        identity: &str,
        total: u32,
    ) -> Result<()> {
        self.store
            .write_cell(sheet, row, table.merits_col, &total.to_string())
            .await?;
        let label = &self.ladder.rank_for(total).name;
        if let Err(e) = self
            .store
            .write_cell(sheet, row, table.rank_col, label)
            .await
        {
            warn!(
                sheet = sheet.name(),
                identity,
                error = %e,
                "rank label write failed; label regenerates on next write"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ladder::tests::test_ladder;
    use crate::store::MemorySheetStore;
    use crate::table::tests::grid;

    async fn ledger_with(rows: &[&[&str]]) -> (Ledger<MemorySheetStore>, Arc<MemorySheetStore>) {
        let store = Arc::new(MemorySheetStore::new());
        store.seed(SheetKind::Main, grid(rows)).await;
        (
            Ledger::new(Arc::clone(&store), Arc::new(test_ladder())),
            store,
        )
    }

    #[tokio::test]
    async fn test_upsert_updates_existing_row() {
        let (ledger, store) = ledger_with(&[
            &["Name", "Merits", "Rank"],
            &["Kael", "12", "Private"],
        ]).await;
        let out = ledger
            .upsert(SheetKind::Main, None, "Kael", 15, 0)
            .await
            .unwrap();
        assert_eq!(out.new_total, 27);
        assert!(!out.created);
        let g = store.snapshot(SheetKind::Main).await;
        assert_eq!(g[1][1], "27");
        assert_eq!(g[1][2], "Corporal");
    }

    #[tokio::test]
    async fn test_upsert_matches_case_insensitively() {
        let (ledger, _store) = ledger_with(&[
            &["Name", "Merits", "Rank"],
            &["KAEL", "12", "Private"],
        ]).await;
        let out = ledger
            .upsert(SheetKind::Main, None, "kael", 3, 0)
            .await
            .unwrap();
        assert_eq!(out.new_total, 15);
        assert!(!out.created);
    }

    #[tokio::test]
    async fn test_upsert_fills_first_blank_slot() {
        let (ledger, store) = ledger_with(&[
            &["Name", "Merits", "Rank"],
            &["Kael", "12", "Private"],
            &["", "", ""],
            &["Mara", "40", "Corporal"],
        ]).await;
        let out = ledger
            .upsert(SheetKind::Main, None, "Venn", 5, 0)
            .await
            .unwrap();
        assert_eq!(out.row, 2);
        assert!(out.created);
        let g = store.snapshot(SheetKind::Main).await;
        assert_eq!(g[2][0], "Venn");
        assert_eq!(g[2][1], "5");
        assert_eq!(g[2][2], "Recruit");
    }

    #[tokio::test]
    async fn test_upsert_inserts_when_no_free_slot() {
        let (ledger, store) = ledger_with(&[
            &["Name", "Merits", "Rank"],
            &["Kael", "12", "Private"],
        ]).await;
        let out = ledger
            .upsert(SheetKind::Main, None, "Venn", 30, 0)
            .await
            .unwrap();
        assert!(out.created);
        let g = store.snapshot(SheetKind::Main).await;
        assert_eq!(g[2], vec!["Venn", "30", "Corporal"]);
    }

    #[tokio::test]
    async fn test_upsert_new_row_stays_inside_its_own_table() {
        let (ledger, store) = ledger_with(&[
            &["SEVENTH REGIMENT"],
            &["Name", "Merits", "Rank"],
            &["Kael", "12", "Private"],
            &["AUXILIARY"],
            &["Name", "Merits", "Rank"],
            &["Mara", "40", "Corporal"],
        ])
        .await;

        // First table is full; the new row must land above AUXILIARY.
        let first = ledger
            .upsert(SheetKind::Main, Some("SEVENTH REGIMENT"), "Venn", 5, 0)
            .await
            .unwrap();
        assert_eq!(first.row, 3);
        assert!(first.created);

        // The second upsert finds that row, so the deltas accumulate.
        let second = ledger
            .upsert(SheetKind::Main, Some("SEVENTH REGIMENT"), "Venn", 5, 0)
            .await
            .unwrap();
        assert!(!second.created);
        assert_eq!(second.new_total, 10);

        let g = store.snapshot(SheetKind::Main).await;
        assert_eq!(g[3], vec!["Venn", "10", "Recruit"]);
        assert_eq!(g[4][0], "AUXILIARY");
        assert_eq!(g[6], vec!["Mara", "40", "Corporal"]);
    }

    #[tokio::test]
    async fn test_upsert_new_row_seeds_from_baseline() {
        let (ledger, _store) = ledger_with(&[&["Name", "Merits", "Rank"]]).await;
        // Member already holds the Corporal role (threshold 25).
        let out = ledger
            .upsert(SheetKind::Main, None, "Venn", 5, 25)
            .await
            .unwrap();
        assert_eq!(out.new_total, 30);
    }

    #[tokio::test]
    async fn test_upsert_unparsable_merits_default_to_zero() {
        let (ledger, _store) = ledger_with(&[
            &["Name", "Merits", "Rank"],
            &["Kael", "n/a", "Private"],
        ]).await;
        let out = ledger
            .upsert(SheetKind::Main, None, "Kael", 7, 0)
            .await
            .unwrap();
        assert_eq!(out.new_total, 7);
    }

    #[tokio::test]
    async fn test_sequential_upserts_accumulate() {
        let (ledger, _store) = ledger_with(&[&["Name", "Merits", "Rank"]]).await;
        ledger
            .upsert(SheetKind::Main, None, "Kael", 4, 0)
            .await
            .unwrap();
        let out = ledger
            .upsert(SheetKind::Main, None, "Kael", 6, 0)
            .await
            .unwrap();
        assert_eq!(out.new_total, 10);
    }

    #[tokio::test]
    async fn test_reconcile_baseline_raises_never_lowers() {
        let (ledger, store) = ledger_with(&[
            &["Name", "Merits", "Rank"],
            &["Kael", "12", "Private"],
        ]).await;
        // Held Sergeant role (threshold 50) outranks the recorded 12.
        let total = ledger
            .reconcile_baseline(SheetKind::Main, None, "Kael", 50)
            .await
            .unwrap();
        assert_eq!(total, Some(50));
        let g = store.snapshot(SheetKind::Main).await;
        assert_eq!(g[1][1], "50");
        assert_eq!(g[1][2], "Sergeant");

        // A lower held threshold leaves the sheet alone.
        let total = ledger
            .reconcile_baseline(SheetKind::Main, None, "Kael", 10)
            .await
            .unwrap();
        assert_eq!(total, Some(50));
    }

    #[tokio::test]
    async fn test_reconcile_unknown_identity_is_none() {
        let (ledger, _store) = ledger_with(&[&["Name", "Merits", "Rank"]]).await;
        let total = ledger
            .reconcile_baseline(SheetKind::Main, None, "Ghost", 25)
            .await
            .unwrap();
        assert_eq!(total, None);
    }

    #[tokio::test]
    async fn test_upsert_missing_headers_fails() {
        let (ledger, _store) = ledger_with(&[&["roster"]]).await;
        let err = ledger
            .upsert(SheetKind::Main, None, "Kael", 5, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::HeadersNotFound { .. }));
    }
}
