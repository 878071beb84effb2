//! Regiment selection: which sheet and table a member's ledger row lives in.

use crate::store::SheetKind;
use serde::Deserialize;

/// One regiment's ledger placement
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Regiment {
    /// Platform role marking membership
    pub role_id: u64,
    /// Brace tag embedded in display names, e.g. `7TH`
    pub tag: String,
    /// Section label of the regiment's table inside its sheet
    pub display_header: String,
    /// Which spreadsheet hosts the table
    pub sheet: SheetKind,
}

/// Ordered regiment table; the first entry whose role a member holds wins
#[derive(Debug, Clone, Default)]
pub struct RegimentMap {
    regiments: Vec<Regiment>,
}

impl RegimentMap {
    /// Build from the configured list, keeping configuration order
    #[must_use]
    pub fn new(regiments: Vec<Regiment>) -> Self {
        Self { regiments }
    }

    /// Select the regiment for a member's role set, or `None` when no
    /// configured regiment role is held (the `UnsupportedRegiment` case).
    #[must_use]
    pub fn select(&self, role_ids: &[u64]) -> Option<&Regiment> {
        self.regiments
            .iter()
            .find(|r| role_ids.contains(&r.role_id))
    }
}
