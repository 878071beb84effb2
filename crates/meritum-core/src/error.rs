//! Error types for meritum-core
//!
//! Nothing here is fatal to the process: every variant degrades to a
//! user-visible text line at the command boundary.

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Trailing token of an award command was not a positive integer.
    /// Rejects the whole batch before any side effect.
    #[error("the last argument must be a positive number of points")]
    InvalidPoints,

    /// A target token matched no guild member under any resolver strategy
    #[error("no member matches `{token}`")]
    MemberNotFound {
        /// The raw input token
        token: String,
    },

    /// The member's display name yields no usable ledger identity
    #[error("cannot derive a ledger identity from `{display_name}`")]
    NoIdentity {
        /// The display name that failed both decode and fallback
        display_name: String,
    },

    /// None of the member's roles map to a configured regiment
    #[error("{who} belongs to no supported regiment")]
    UnsupportedRegiment {
        /// Member username for the report line
        who: String,
    },

    /// A sheet is missing one of the Name/Merits/Rank header labels
    #[error("sheet `{sheet}` has no Name/Merits/Rank header row")]
    HeadersNotFound {
        /// Which sheet failed the header scan
        sheet: String,
    },

    /// The sheet carries labeled tables, but none matches the requested
    /// section. Refusing beats writing into another regiment's table.
    #[error("sheet `{sheet}` has no `{section}` table")]
    SectionNotFound {
        /// Which sheet was scanned
        sheet: String,
        /// The requested section label
        section: String,
    },

    /// Bot authority is below the target's highest role; the ledger write
    /// already succeeded, only presentation was skipped
    #[error("cannot edit {who}: their highest role outranks the bot")]
    HierarchyBlocked {
        /// Member username for the report line
        who: String,
    },

    /// Chat platform refused the role/nickname edit
    #[error("missing permission to edit {who}")]
    PermissionDenied {
        /// Member username for the report line
        who: String,
    },

    /// Transient spreadsheet or chat API failure, retryable per target
    #[error("external service error: {0}")]
    ExternalService(String),

    /// Invalid ladder/regiment/limit configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the ledger write survived even though this error occurred.
    ///
    /// Hierarchy and permission failures happen after the spreadsheet
    /// update committed; the divergence is reported, never rolled back.
    #[must_use]
    pub fn ledger_committed(&self) -> bool {
        matches!(
            self,
            Error::HierarchyBlocked { .. } | Error::PermissionDenied { .. }
        )
    }
}
