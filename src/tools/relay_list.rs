//! NIP-65 relay list metadata (kind 10002).
//!
//! ```json
//! {
//!   "kind": 10002,
//!   "tags": [
//!     ["r", "wss://both.example.com"],
//!     ["r", "wss://inbox.example.com", "read"],
//!     ["r", "wss://outbox.example.com", "write"]
//!   ]
//! }
//! ```

use serde::Serialize;

use crate::nostr::{Event, RelayMarker, TagBuilder};
use crate::relay::{RelayError, RelayResult, RelayUrl};
use crate::tools::params::RelayEntryParams;

/// One relay from a published relay list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelayListEntry {
    /// Relay URL as published.
    pub url: String,
    /// The author reads from this relay.
    pub read: bool,
    /// The author writes to this relay.
    pub write: bool,
}

/// Extracts relay entries from the `r` tags of a kind 10002 event.
///
/// Repeated URLs are merged; an unmarked tag means read and write. Order
/// follows the first appearance of each URL.
#[must_use]
pub fn parse_relay_list(event: &Event) -> Vec<RelayListEntry> {
    let mut entries: Vec<RelayListEntry> = Vec::new();

    for tag in &event.tags {
        if tag.first().map(String::as_str) != Some("r") {
            continue;
        }
        let Some(url) = tag.get(1).map(|url| url.trim()).filter(|url| !url.is_empty()) else {
            continue;
        };
        let marker = tag
            .get(2)
            .map(|marker| marker.trim().to_ascii_lowercase())
            .unwrap_or_default();

        let index = match entries.iter().position(|entry| entry.url == url) {
            Some(index) => index,
            None => {
                entries.push(RelayListEntry {
                    url: url.to_string(),
                    read: false,
                    write: false,
                });
                entries.len() - 1
            }
        };
        let entry = &mut entries[index];

        match marker.as_str() {
            "" => {
                entry.read = true;
                entry.write = true;
            }
            "read" => entry.read = true,
            "write" => entry.write = true,
            _ => {}
        }
    }

    entries
}

/// Builds `r` tags for the requested entries.
///
/// Blank URLs are skipped, entries with neither read nor write are
/// dropped, and a later entry for the same URL replaces an earlier one in
/// place.
///
/// # Errors
///
/// Returns [`RelayError::InvalidUrl`] for a URL that is not `ws://` or
/// `wss://`.
pub fn build_relay_list_tags(entries: &[RelayEntryParams]) -> RelayResult<Vec<Vec<String>>> {
    let mut by_url: Vec<(String, Option<Vec<String>>)> = Vec::new();

    for entry in entries {
        let url = entry.url.trim();
        if url.is_empty() {
            continue;
        }
        RelayUrl::parse(url).map_err(|_| {
            RelayError::InvalidUrl(format!("{url} (expected ws:// or wss://)"))
        })?;

        let read = entry.read.unwrap_or(entry.write.is_none());
        let write = entry.write.unwrap_or(entry.read.is_none());
        let tag = match (read, write) {
            (true, true) => Some(TagBuilder::relay_list_tag(url, RelayMarker::ReadWrite)),
            (true, false) => Some(TagBuilder::relay_list_tag(url, RelayMarker::Read)),
            (false, true) => Some(TagBuilder::relay_list_tag(url, RelayMarker::Write)),
            (false, false) => None,
        };

        match by_url.iter_mut().find(|(existing, _)| existing == url) {
            Some((_, slot)) => *slot = tag,
            None => by_url.push((url.to_string(), tag)),
        }
    }

    Ok(by_url.into_iter().filter_map(|(_, tag)| tag).collect())
}

/// Renders entries as a bullet list for tool output.
#[must_use]
pub fn format_relay_list(entries: &[RelayListEntry]) -> String {
    entries
        .iter()
        .map(|entry| {
            let mode = match (entry.read, entry.write) {
                (true, true) => "read, write",
                (true, false) => "read",
                (false, true) => "write",
                (false, false) => "unused",
            };
            format!("- {} ({mode})", entry.url)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
