//! Plain-text rendering of events for tool output.

use chrono::DateTime;

use crate::nostr::Event;
use crate::tools::identifiers::to_npub;

/// Content longer than this many characters is cut with an ellipsis.
pub const CONTENT_PREVIEW_CHARS: usize = 240;

/// Shortens a pubkey for display: `npub1abc...wxyz`, or a hex excerpt if
/// the key does not encode.
#[must_use]
pub fn short_author(pubkey: &str) -> String {
    if pubkey.is_empty() {
        return "unknown".to_string();
    }

    match to_npub(pubkey) {
        Some(npub) => format!(
            "{}...{}",
            npub.get(..8).unwrap_or(&npub),
            npub.get(npub.len().saturating_sub(4)..).unwrap_or_default()
        ),
        None => format!(
            "{}...{}",
            pubkey.get(..4).unwrap_or(pubkey),
            pubkey.get(60..).unwrap_or_default()
        ),
    }
}

fn preview(content: &str) -> String {
    if content.chars().count() > CONTENT_PREVIEW_CHARS {
        let cut: String = content.chars().take(CONTENT_PREVIEW_CHARS).collect();
        format!("{cut}…")
    } else {
        content.to_string()
    }
}

fn created(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0).map_or_else(
        || timestamp.to_string(),
        |date| date.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

/// Renders one event as a block of `Field: value` lines ending in `---`.
#[must_use]
pub fn format_event(event: &Event) -> String {
    let tags = if event.tags.is_empty() {
        "[]".to_string()
    } else {
        serde_json::to_string(&event.tags).unwrap_or_else(|_| "[]".to_string())
    };

    [
        format!("Kind: {}", event.kind),
        format!("ID: {}", event.id),
        format!("Author: {}", short_author(&event.pubkey)),
        format!("Created: {}", created(event.created_at)),
        format!("Content: {}", preview(&event.content)),
        format!("Tags: {tags}"),
        "---".to_string(),
    ]
    .join("\n")
}

/// Renders a list of events, one block each.
#[must_use]
pub fn format_events(events: &[Event]) -> String {
    events
        .iter()
        .map(format_event)
        .collect::<Vec<_>>()
        .join("\n")
}
