//! Tool call parameters.
//!
//! Each struct deserializes from the camelCase JSON object a tool caller
//! sends. Rust callers can build them directly; every optional field has
//! a sensible default.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::nostr::{AuthKey, Event};

/// Parameters of `query_events`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryEventsParams {
    /// Relays to query; the configured defaults when absent or empty.
    pub relays: Option<Vec<String>>,
    /// Event kinds.
    pub kinds: Option<Vec<u16>>,
    /// Authors as hex pubkeys, `npub` or `nprofile`.
    pub authors: Option<Vec<String>>,
    /// Event ids as hex, `note` or `nevent`.
    pub ids: Option<Vec<String>>,
    /// Start timestamp (unix seconds).
    pub since: Option<i64>,
    /// End timestamp (unix seconds).
    pub until: Option<i64>,
    /// Maximum number of events to fetch.
    pub limit: Option<usize>,
    /// Tag filters, e.g. `{"p": [pubkey], "t": ["nostr"]}`.
    pub tags: Option<BTreeMap<String, Vec<String>>>,
    /// NIP-50 search string.
    pub search: Option<String>,
    /// Private key (hex or `nsec`) used if a relay demands NIP-42 auth.
    pub auth_private_key: Option<AuthKey>,
    /// Per-relay timeout override in milliseconds.
    pub timeout_ms: Option<u64>,
}

/// Parameters of `publish_event`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishEventParams {
    /// The signed event to publish.
    pub signed_event: Event,
    /// Relays to publish to; the configured defaults when absent. An
    /// explicit empty list publishes nowhere.
    #[serde(default)]
    pub relays: Option<Vec<String>>,
    /// Private key (hex or `nsec`) used if a relay demands NIP-42 auth.
    #[serde(default)]
    pub auth_private_key: Option<AuthKey>,
    /// Per-relay timeout override in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl PublishEventParams {
    /// Publishes `event` to the default relays.
    #[must_use]
    pub const fn new(event: Event) -> Self {
        Self {
            signed_event: event,
            relays: None,
            auth_private_key: None,
            timeout_ms: None,
        }
    }
}

/// Parameters of `get_relay_list`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetRelayListParams {
    /// Author as hex pubkey, `npub` or `nprofile`.
    pub pubkey: String,
    /// Relays to query; the configured defaults when absent or empty.
    #[serde(default)]
    pub relays: Option<Vec<String>>,
    /// Private key (hex or `nsec`) used if a relay demands NIP-42 auth.
    #[serde(default)]
    pub auth_private_key: Option<AuthKey>,
}

/// One requested relay list entry.
///
/// When both `read` and `write` are omitted the relay is used for both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RelayEntryParams {
    /// Relay URL (`ws://` or `wss://`).
    pub url: String,
    /// Use this relay for reads.
    #[serde(default)]
    pub read: Option<bool>,
    /// Use this relay for writes.
    #[serde(default)]
    pub write: Option<bool>,
}

/// Parameters of `set_relay_list`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetRelayListParams {
    /// Private key (hex or `nsec`) of the account; also used for NIP-42.
    pub private_key: AuthKey,
    /// Entries to publish in the kind 10002 event.
    pub relay_list: Vec<RelayEntryParams>,
    /// Relays to read the previous list from and publish to.
    #[serde(default)]
    pub relays: Option<Vec<String>>,
}
