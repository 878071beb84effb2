//! Identity codec: the display-name tag grammar.
//!
//! A tagged display name looks like `{7TH} SGT | Kael`, optionally led by a
//! decorative prefix token: `✠ {7TH} SGT | Kael`. The identity after the
//! ` | ` separator is the ledger's primary key for the member. One regex
//! implements the grammar so encode/decode round-trip behavior is
//! verifiable in isolation.

use regex::Regex;
use std::sync::LazyLock;

/// Platform display-name length limit; encoding truncates to fit.
pub const MAX_TAG_LEN: usize = 32;

/// Regiment tag used when no regiment is known for the member
pub const UNKNOWN_REGIMENT: &str = "UNK";

// prefix? `{regiment}`? rank ` | ` identity
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?P<prefix>[^{\s]+)\s+)?(?:\{(?P<regiment>[^}]+)\}\s+)?(?P<rank>\S+) \| (?P<identity>.+)$")
        .expect("tag grammar regex is valid")
});

/// A parsed display-name tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTag {
    /// Decorative token before the tag, preserved verbatim on re-encode
    pub prefix: Option<String>,
    /// Brace-delimited regiment tag, without the braces
    pub regiment: Option<String>,
    /// Rank abbreviation token
    pub rank_abbrev: String,
    /// Ledger identity (the remainder after ` | `), trimmed
    pub identity: String,
}

/// Parse a display name into its tag parts.
///
/// Returns `None` when the ` | ` separator is absent, which is how an
/// untagged member is detected.
#[must_use]
pub fn decode(display_name: &str) -> Option<DecodedTag> {
    let caps = TAG_RE.captures(display_name.trim())?;
    let identity = caps["identity"].trim();
    if identity.is_empty() {
        return None;
    }
    Some(DecodedTag {
        prefix: caps.name("prefix").map(|m| m.as_str().to_string()),
        regiment: caps.name("regiment").map(|m| m.as_str().to_string()),
        rank_abbrev: caps["rank"].to_string(),
        identity: identity.to_string(),
    })
}

/// Render a display-name tag, truncated to [`MAX_TAG_LEN`] characters.
///
/// Truncation is a silent, accepted lossy operation: the platform rejects
/// longer nicknames outright, and losing identity tail characters is
/// preferred over losing the update.
#[must_use]
pub fn encode(
    prefix: Option<&str>,
    regiment: Option<&str>,
    rank_abbrev: &str,
    identity: &str,
) -> String {
    let mut out = String::new();
    if let Some(p) = prefix {
        out.push_str(p);
        out.push(' ');
    }
    out.push('{');
    out.push_str(regiment.unwrap_or(UNKNOWN_REGIMENT));
    out.push_str("} ");
    out.push_str(rank_abbrev);
    out.push_str(" | ");
    out.push_str(identity);
    if out.chars().count() > MAX_TAG_LEN {
        out = out.chars().take(MAX_TAG_LEN).collect();
    }
    out
}

/// Fallback identity extraction for an untagged display name: the last
/// whitespace-delimited token. Used when inventing a tag from scratch.
#[must_use]
pub fn fallback_identity(display_name: &str) -> Option<&str> {
    display_name
        .split_whitespace()
        .filter(|t| *t != "|")
        .next_back()
}

/// Ledger identity for a display name: the tagged identity when the name
/// carries a ` | ` tag, else the fallback last token.
#[must_use]
pub fn identity_of(display_name: &str) -> Option<String> {
    match decode(display_name) {
        Some(tag) => Some(tag.identity),
        None => fallback_identity(display_name).map(str::to_string),
    }
}
