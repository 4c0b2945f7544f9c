//! Tag builders for Nostr events.
//!
//! - `relay` / `challenge` tags: NIP-42 client authentication
//! - `r` tags: NIP-65 relay list metadata

/// Read/write marker on a NIP-65 `r` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayMarker {
    /// Relay used for both reading and writing (no marker)
    ReadWrite,
    /// Relay used only for reading
    Read,
    /// Relay used only for writing
    Write,
}

/// Builder for Nostr event tags.
///
/// # Example
///
/// ```
/// use relay_fanout::nostr::TagBuilder;
///
/// let tag = TagBuilder::challenge_tag("abc123");
/// assert_eq!(tag, vec!["challenge", "abc123"]);
/// ```
pub struct TagBuilder;

impl TagBuilder {
    /// Builds the NIP-42 `relay` tag naming the relay being authenticated to.
    #[must_use]
    pub fn relay_tag(relay_url: &str) -> Vec<String> {
        vec!["relay".to_string(), relay_url.to_string()]
    }

    /// Builds the NIP-42 `challenge` tag echoing the relay's challenge string.
    #[must_use]
    pub fn challenge_tag(challenge: &str) -> Vec<String> {
        vec!["challenge".to_string(), challenge.to_string()]
    }

    /// Builds a NIP-65 `r` tag.
    ///
    /// # Example
    ///
    /// ```
    /// use relay_fanout::nostr::{RelayMarker, TagBuilder};
    ///
    /// let tag = TagBuilder::relay_list_tag("wss://nos.lol", RelayMarker::Read);
    /// assert_eq!(tag, vec!["r", "wss://nos.lol", "read"]);
    /// ```
    #[must_use]
    pub fn relay_list_tag(relay_url: &str, marker: RelayMarker) -> Vec<String> {
        let mut tag = vec!["r".to_string(), relay_url.to_string()];
        match marker {
            RelayMarker::ReadWrite => {}
            RelayMarker::Read => tag.push("read".to_string()),
            RelayMarker::Write => tag.push("write".to_string()),
        }
        tag
    }
}
