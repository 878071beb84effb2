//! Shared helpers for the Discord adapter

/// Discord message character limit
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

/// Split a report into message-sized chunks, preferring line boundaries
/// so per-target result lines never straddle two messages.
#[must_use]
pub fn chunk_message(text: &str) -> Vec<String> {
    if text.chars().count() <= DISCORD_MESSAGE_LIMIT {
        return vec![text.to_string()];
    }
    let mut chunks = Vec::new();
    let mut current = String::new();
    for line in text.lines() {
        let line: String = if line.chars().count() > DISCORD_MESSAGE_LIMIT {
            line.chars().take(DISCORD_MESSAGE_LIMIT).collect()
        } else {
            line.to_string()
        };
        let needed = line.chars().count() + usize::from(!current.is_empty());
        if current.chars().count() + needed > DISCORD_MESSAGE_LIMIT {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(&line);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
