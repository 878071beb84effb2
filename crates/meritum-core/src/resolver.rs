//! Member resolution: turning a human-supplied token into one member.
//!
//! Strategies are ordered pure functions tried until one hits, so the
//! precedence rule (mention, then id, then exact name, then
//! case-insensitive name) is testable in isolation.

use serde::Deserialize;

/// The engine's view of a guild member, decoupled from the chat platform
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MemberRef {
    /// Platform user id
    pub user_id: u64,
    /// Account username
    pub username: String,
    /// Display name (server nickname when set, else username)
    pub display_name: String,
    /// Platform role ids held by the member
    pub role_ids: Vec<u64>,
}

type Strategy = fn(&str, &[MemberRef]) -> Option<usize>;

/// Resolution order. First matching strategy wins.
const STRATEGIES: &[Strategy] = &[by_mention, by_id, by_exact_name, by_name_ignore_case];

/// Resolve one token against the member list, or `None` when every
/// strategy misses.
#[must_use]
pub fn resolve<'a>(token: &str, members: &'a [MemberRef]) -> Option<&'a MemberRef> {
    STRATEGIES
        .iter()
        .find_map(|s| s(token, members))
        .map(|i| &members[i])
}

/// `<@123>` / `<@!123>` mention markup
fn by_mention(token: &str, members: &[MemberRef]) -> Option<usize> {
    let inner = token.strip_prefix("<@")?.strip_suffix('>')?;
    let id: u64 = inner.strip_prefix('!').unwrap_or(inner).parse().ok()?;
    members.iter().position(|m| m.user_id == id)
}

/// Bare numeric user id
fn by_id(token: &str, members: &[MemberRef]) -> Option<usize> {
    let id: u64 = token.parse().ok()?;
    members.iter().position(|m| m.user_id == id)
}

/// Exact username or display-name match
fn by_exact_name(token: &str, members: &[MemberRef]) -> Option<usize> {
    members
        .iter()
        .position(|m| m.username == token || m.display_name == token)
}

/// Case-insensitive username or display-name match
fn by_name_ignore_case(token: &str, members: &[MemberRef]) -> Option<usize> {
    members.iter().position(|m| {
        m.username.eq_ignore_ascii_case(token) || m.display_name.eq_ignore_ascii_case(token)
    })
}
