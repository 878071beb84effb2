//! Meritum Core - Ledger Synchronization & Rank Computation Engine
//!
//! Everything platform-independent lives here:
//! - rank ladder lookups ([`ladder`])
//! - the display-name tag grammar ([`tag`])
//! - table location inside sheet snapshots ([`table`])
//! - the serialized ledger upsert ([`ledger`])
//! - member resolution strategies ([`resolver`])
//! - award orchestration ([`award`]) and read-only queries ([`query`])
//!
//! The chat platform and the spreadsheet service are reached only through
//! the [`award::GuildGateway`] and [`store::SheetStore`] traits.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod award;
pub mod counters;
pub mod error;
pub mod ladder;
pub mod ledger;
pub mod query;
pub mod regiment;
pub mod resolver;
pub mod store;
pub mod table;
pub mod tag;

pub use error::{Error, Result};

pub use award::{
    AwardEvent, AwardProcessor, AwardSuccess, GuildGateway, PresentationEdit, TargetOutcome,
};
pub use counters::{AwardCounters, AwardLimits};
pub use ladder::{RankLadder, RankTier};
pub use ledger::{Ledger, LedgerRow, UpsertOutcome};
pub use query::{Progress, QueryEngine};
pub use regiment::{Regiment, RegimentMap};
pub use resolver::MemberRef;
pub use store::{MemorySheetStore, SheetKind, SheetStore};
pub use table::{Grid, Table};
pub use tag::{DecodedTag, MAX_TAG_LEN};
