//! Spreadsheet access seam.
//!
//! The engine never talks to a spreadsheet service directly; it works
//! against [`SheetStore`], a small async trait the backends implement.
//! [`MemorySheetStore`] is the in-process backend used by tests and
//! dry-run mode.

use crate::error::Result;
use crate::table::Grid;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Which spreadsheet a regiment's ledger lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetKind {
    /// The main regiment ledger
    Main,
    /// The special-detachment ledger
    Special,
}

impl SheetKind {
    /// Stable name used in lock keys, logs and error messages
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            SheetKind::Main => "main",
            SheetKind::Special => "special",
        }
    }

    /// Both sheets, in query-scan order
    #[must_use]
    pub fn all() -> [SheetKind; 2] {
        [SheetKind::Main, SheetKind::Special]
    }
}

/// Cell read/write operations against one of the two ledgers.
///
/// Coordinates are 0-based (row, column) over the same grid that
/// `read_grid` returns; backends translate to their native addressing.
/// The service exposes no transactions: each call is an independent round
/// trip, and a suspension point for the calling task.
#[async_trait]
pub trait SheetStore: Send + Sync {
    /// Bulk "all values" read of a sheet
    async fn read_grid(&self, sheet: SheetKind) -> Result<Grid>;

    /// Overwrite a single cell
    async fn write_cell(&self, sheet: SheetKind, row: usize, col: usize, value: &str)
        -> Result<()>;

    /// Insert a row at `at_row`, shifting every later row down by one.
    /// Stacked tables below the insertion point keep their shape.
    async fn insert_row(&self, sheet: SheetKind, at_row: usize, values: Vec<String>)
        -> Result<()>;
}

/// In-memory [`SheetStore`] backed by per-sheet grids.
///
/// Every operation yields to the scheduler first, so interleaving tests
/// exercise the same suspension points a real backend has.
#[derive(Debug, Default)]
pub struct MemorySheetStore {
    grids: RwLock<HashMap<SheetKind, Grid>>,
}

impl MemorySheetStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed one sheet with a grid
    pub async fn seed(&self, sheet: SheetKind, grid: Grid) {
        self.grids.write().await.insert(sheet, grid);
    }

    /// Snapshot one sheet (test inspection)
    pub async fn snapshot(&self, sheet: SheetKind) -> Grid {
        self.grids.read().await.get(&sheet).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl SheetStore for MemorySheetStore {
    async fn read_grid(&self, sheet: SheetKind) -> Result<Grid> {
        tokio::task::yield_now().await;
        Ok(self.snapshot(sheet).await)
    }

    async fn write_cell(
        &self,
        sheet: SheetKind,
        row: usize,
        col: usize,
        value: &str,
    ) -> Result<()> {
        tokio::task::yield_now().await;
        let mut grids = self.grids.write().await;
        let grid = grids.entry(sheet).or_default();
        while grid.len() <= row {
            grid.push(Vec::new());
        }
        let cells = &mut grid[row];
        while cells.len() <= col {
            cells.push(String::new());
        }
        cells[col] = value.to_string();
        Ok(())
    }

    async fn insert_row(&self, sheet: SheetKind, at_row: usize, values: Vec<String>) -> Result<()> {
        tokio::task::yield_now().await;
        let mut grids = self.grids.write().await;
        let grid = grids.entry(sheet).or_default();
        if at_row >= grid.len() {
            while grid.len() < at_row {
                grid.push(Vec::new());
            }
            grid.push(values);
        } else {
            grid.insert(at_row, values);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::tests::grid;

    #[tokio::test]
    async fn test_write_cell_grows_grid() {
        let store = MemorySheetStore::new();
        store.write_cell(SheetKind::Main, 2, 1, "40").await.unwrap();
        let g = store.snapshot(SheetKind::Main).await;
        assert_eq!(g.len(), 3);
        assert_eq!(g[2][1], "40");
    }

    #[tokio::test]
    async fn test_insert_row_shifts_later_rows_down() {
        let store = MemorySheetStore::new();
        store
            .seed(
                SheetKind::Main,
                grid(&[&["Name", "Merits", "Rank"], &["Mara", "40", "Corporal"]]),
            )
            .await;
        store
            .insert_row(
                SheetKind::Main,
                1,
                vec!["Kael".into(), "5".into(), "Recruit".into()],
            )
            .await
            .unwrap();
        let g = store.snapshot(SheetKind::Main).await;
        assert_eq!(g.len(), 3);
        assert_eq!(g[1][0], "Kael");
        assert_eq!(g[2][0], "Mara");
    }

    #[tokio::test]
    async fn test_insert_row_past_end_pads() {
        let store = MemorySheetStore::new();
        store
            .insert_row(SheetKind::Main, 2, vec!["Kael".into()])
            .await
            .unwrap();
        let g = store.snapshot(SheetKind::Main).await;
        assert_eq!(g.len(), 3);
        assert!(g[0].is_empty());
        assert_eq!(g[2][0], "Kael");
    }
}
