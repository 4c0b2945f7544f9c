//! Types for relay fan-out.
//!
//! This module defines relay URLs, per-relay outcomes, and the request and
//! result shapes of the query and publish coordinators.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::nostr::{AuthKey, Event, Filter};
use crate::relay::error::{RelayError, RelayResult};

/// A validated `ws://` or `wss://` relay endpoint.
///
/// The caller's spelling is preserved (trimmed) because it is echoed back in
/// diagnostics and in the NIP-42 `relay` tag. Equality and hashing use the
/// normalized form, so `WSS://Relay.example.com/` and
/// `wss://relay.example.com` are the same relay.
#[derive(Debug, Clone)]
pub struct RelayUrl {
    url: String,
    normalized: String,
}

impl RelayUrl {
    /// Parses and validates a relay URL.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidUrl`] if the string is not a WebSocket URL.
    pub fn parse(url: &str) -> RelayResult<Self> {
        let url = url.trim();

        let parsed =
            nostr::RelayUrl::parse(url).map_err(|e| RelayError::InvalidUrl(format!("{url}: {e}")))?;
        let normalized = parsed.to_string();

        let scheme = normalized
            .split_once("://")
            .map(|(scheme, _)| scheme.to_ascii_lowercase());
        if !matches!(scheme.as_deref(), Some("ws" | "wss")) {
            return Err(RelayError::InvalidUrl(format!(
                "{url}: relay URLs must use ws:// or wss://"
            )));
        }

        Ok(Self {
            url: url.to_string(),
            normalized,
        })
    }

    /// Parses a list of relay URLs, dropping duplicates and keeping the
    /// first occurrence of each.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidUrl`] for the first invalid entry.
    pub fn parse_many<S: AsRef<str>>(urls: &[S]) -> RelayResult<Vec<Self>> {
        let parsed = urls
            .iter()
            .map(|url| Self::parse(url.as_ref()))
            .collect::<RelayResult<Vec<_>>>()?;
        Ok(Self::dedup(parsed))
    }

    /// Drops relays equal to an earlier entry, keeping input order.
    #[must_use]
    pub fn dedup(urls: impl IntoIterator<Item = Self>) -> Vec<Self> {
        let mut seen = HashSet::new();
        urls.into_iter()
            .filter(|url| seen.insert(url.key().to_string()))
            .collect()
    }

    /// Returns the URL as the caller spelled it.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// Returns the normalized URL used to open the socket.
    #[must_use]
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    fn key(&self) -> &str {
        self.normalized
            .strip_suffix('/')
            .unwrap_or(&self.normalized)
    }
}

impl PartialEq for RelayUrl {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for RelayUrl {}

impl std::hash::Hash for RelayUrl {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl Serialize for RelayUrl {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.url)
    }
}

impl fmt::Display for RelayUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// Why a relay connection finished without success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The connection timer expired.
    Timeout,
    /// A frame could not be written to the socket.
    SendFailed(String),
    /// The relay challenged and no auth key was supplied.
    AuthRequired,
    /// Building, signing or sending the auth event failed.
    AuthFailed(String),
    /// The socket closed before the relay answered. Query mode reports this
    /// as a partial success when events were already buffered.
    Closed,
    /// Query mode: the socket closed before `EOSE` with nothing buffered.
    ClosedNoEvents,
    /// The connection could not be established or broke.
    SocketError(String),
    /// The relay rejected the request; text forwarded verbatim.
    Rejected(String),
    /// The relay task panicked or was cancelled.
    TaskFailed,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("timeout"),
            Self::SendFailed(detail) => write!(f, "send_failed: {detail}"),
            Self::AuthRequired => f.write_str("auth_required"),
            Self::AuthFailed(detail) => write!(f, "auth_failed: {detail}"),
            Self::Closed => f.write_str("closed"),
            Self::ClosedNoEvents => f.write_str("closed_no_events"),
            Self::SocketError(detail) => write!(f, "socket_error: {detail}"),
            Self::Rejected(message) if message.is_empty() => f.write_str("rejected"),
            Self::Rejected(message) => f.write_str(message),
            Self::TaskFailed => f.write_str("task_failed"),
        }
    }
}

/// Terminal outcome of one relay connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayOutcome {
    /// The relay this outcome belongs to.
    pub relay: RelayUrl,
    /// Whether the relay answered successfully.
    pub ok: bool,
    /// Events buffered from the relay (query mode only).
    pub events: Vec<Event>,
    /// Set when `ok` is false, and for a partial query success (`closed`,
    /// `timeout`).
    pub reason: Option<FailureReason>,
}

impl RelayOutcome {
    /// Outcome for a relay that failed with nothing to show.
    #[must_use]
    pub const fn failed(relay: RelayUrl, reason: FailureReason) -> Self {
        Self {
            relay,
            ok: false,
            events: Vec::new(),
            reason: Some(reason),
        }
    }

    /// Outcome for a relay that answered successfully.
    #[must_use]
    pub const fn accepted(relay: RelayUrl, events: Vec<Event>) -> Self {
        Self {
            relay,
            ok: true,
            events,
            reason: None,
        }
    }
}

/// Input of a fan-out query.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    /// Relays to query, in diagnostic order.
    pub relay_urls: Vec<RelayUrl>,
    /// Filter sent to every relay.
    pub filter: Arc<Filter>,
    /// Per-connection timeout; the configured default when `None`.
    pub timeout: Option<Duration>,
    /// Key used to answer NIP-42 challenges.
    pub auth_key: Option<AuthKey>,
}

impl QueryRequest {
    /// Creates a request with the default timeout and no auth key.
    #[must_use]
    pub fn new(relay_urls: Vec<RelayUrl>, filter: Filter) -> Self {
        Self {
            relay_urls,
            filter: Arc::new(filter),
            timeout: None,
            auth_key: None,
        }
    }

    /// Overrides the per-connection timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Supplies a key for NIP-42 authentication.
    #[must_use]
    pub fn with_auth_key(mut self, auth_key: AuthKey) -> Self {
        self.auth_key = Some(auth_key);
        self
    }
}

/// Aggregated result of a fan-out query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    /// True iff at least one relay finished ok.
    pub success: bool,
    /// Deduplicated events, newest first, ties broken by descending id.
    pub events: Vec<Event>,
    /// One `"<relay>: ok|fail (<reason>)"` line per relay, in relay order.
    pub diagnostics: Vec<String>,
}

/// Input of a fan-out publish.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    /// The signed event to publish.
    pub event: Arc<Event>,
    /// Relays to publish to, in diagnostic order.
    pub relay_urls: Vec<RelayUrl>,
    /// Per-connection timeout; the configured default when `None`.
    pub timeout: Option<Duration>,
    /// Key used to answer NIP-42 challenges.
    pub auth_key: Option<AuthKey>,
}

impl PublishRequest {
    /// Creates a request with the default timeout and no auth key.
    #[must_use]
    pub fn new(event: Event, relay_urls: Vec<RelayUrl>) -> Self {
        Self {
            event: Arc::new(event),
            relay_urls,
            timeout: None,
            auth_key: None,
        }
    }

    /// Overrides the per-connection timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Supplies a key for NIP-42 authentication.
    #[must_use]
    pub fn with_auth_key(mut self, auth_key: AuthKey) -> Self {
        self.auth_key = Some(auth_key);
        self
    }
}

/// Aggregated result of a fan-out publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResult {
    /// True iff at least one relay accepted, or the relay set was empty.
    pub success: bool,
    /// Id of the published event.
    pub event_id: String,
    /// Number of relays that answered `OK true`.
    pub accepted_by: usize,
    /// Number of relays attempted.
    pub relay_count: usize,
    /// One `"<relay>: ok|fail (<reason>)"` line per relay, in relay order.
    pub diagnostics: Vec<String>,
    /// Relays that accepted the event.
    #[serde(skip)]
    pub accepted_relays: Vec<RelayUrl>,
}

impl PublishResult {
    /// Returns true if the publish succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.success
    }

    /// Returns the number of relays that accepted the event.
    #[must_use]
    pub const fn success_count(&self) -> usize {
        self.accepted_by
    }

    /// Returns the total number of relays attempted.
    #[must_use]
    pub const fn total_attempted(&self) -> usize {
        self.relay_count
    }

    /// Returns true if every attempted relay accepted the event.
    #[must_use]
    pub const fn fully_accepted(&self) -> bool {
        self.accepted_by == self.relay_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> RelayUrl {
        RelayUrl::parse(s).unwrap()
    }

    #[test]
    fn relay_url_accepts_ws_and_wss() {
        assert_eq!(url("wss://relay.damus.io").as_str(), "wss://relay.damus.io");
        assert_eq!(url("ws://127.0.0.1:7777").as_str(), "ws://127.0.0.1:7777");
    }

    #[test]
    fn relay_url_trims_whitespace() {
        assert_eq!(url("  wss://nos.lol \n").to_string(), "wss://nos.lol");
    }

    #[test]
    fn relay_url_rejects_other_schemes() {
        for bad in ["https://relay.damus.io", "relay.damus.io", "not-a-url", ""] {
            assert!(
                matches!(RelayUrl::parse(bad), Err(RelayError::InvalidUrl(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn parse_many_drops_duplicates_in_order() {
        let urls = RelayUrl::parse_many(&["wss://b", "wss://a", "wss://b", " wss://a"]).unwrap();
        let urls: Vec<&str> = urls.iter().map(RelayUrl::as_str).collect();
        assert_eq!(urls, vec!["wss://b", "wss://a"]);
    }

    #[test]
    fn relay_url_scheme_is_case_insensitive() {
        let upper = url("WSS://Relay.Example.com");
        assert_eq!(upper.as_str(), "WSS://Relay.Example.com");
        assert!(upper.normalized().starts_with("wss://relay.example.com"));
        assert_eq!(upper, url("wss://relay.example.com"));
        assert!(url("Ws://127.0.0.1:7777").normalized().starts_with("ws://"));
    }

    #[test]
    fn trailing_slash_is_the_same_relay() {
        assert_eq!(url("wss://relay.example.com"), url("wss://relay.example.com/"));
        assert_ne!(url("wss://relay.example.com"), url("wss://relay.example.com/inbox"));
        assert_ne!(url("wss://relay.example.com"), url("ws://relay.example.com"));
    }

    #[test]
    fn parse_many_collapses_equivalent_spellings() {
        let urls = RelayUrl::parse_many(&[
            "wss://relay.example.com",
            "WSS://RELAY.example.com/",
            "wss://other.example.com",
        ])
        .unwrap();
        let urls: Vec<&str> = urls.iter().map(RelayUrl::as_str).collect();
        assert_eq!(urls, vec!["wss://relay.example.com", "wss://other.example.com"]);
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let urls = RelayUrl::dedup(vec![
            url("wss://b.example.com/"),
            url("wss://a.example.com"),
            url("wss://b.example.com"),
        ]);
        let urls: Vec<&str> = urls.iter().map(RelayUrl::as_str).collect();
        assert_eq!(urls, vec!["wss://b.example.com/", "wss://a.example.com"]);
    }

    #[test]
    fn relay_url_serializes_as_given() {
        let value = serde_json::to_value(url(" WSS://Relay.Example.com ")).unwrap();
        assert_eq!(value, "WSS://Relay.Example.com");
    }

    #[test]
    fn parse_many_fails_on_first_invalid() {
        let result = RelayUrl::parse_many(&["wss://a", "http://b"]);
        assert!(matches!(result, Err(RelayError::InvalidUrl(msg)) if msg.contains("http://b")));
    }

    #[test]
    fn parse_many_empty_list() {
        let empty: [&str; 0] = [];
        assert!(RelayUrl::parse_many(&empty).unwrap().is_empty());
    }

    #[test]
    fn failure_reason_display() {
        assert_eq!(FailureReason::Timeout.to_string(), "timeout");
        assert_eq!(FailureReason::AuthRequired.to_string(), "auth_required");
        assert_eq!(FailureReason::Closed.to_string(), "closed");
        assert_eq!(FailureReason::ClosedNoEvents.to_string(), "closed_no_events");
        assert_eq!(FailureReason::TaskFailed.to_string(), "task_failed");
        assert_eq!(
            FailureReason::SendFailed("broken pipe".to_string()).to_string(),
            "send_failed: broken pipe"
        );
        assert_eq!(
            FailureReason::AuthFailed("bad key".to_string()).to_string(),
            "auth_failed: bad key"
        );
        assert_eq!(
            FailureReason::SocketError("refused".to_string()).to_string(),
            "socket_error: refused"
        );
    }

    #[test]
    fn rejection_text_is_forwarded_verbatim() {
        assert_eq!(
            FailureReason::Rejected("blocked: not on whitelist".to_string()).to_string(),
            "blocked: not on whitelist"
        );
        assert_eq!(FailureReason::Rejected(String::new()).to_string(), "rejected");
    }

    #[test]
    fn outcome_constructors() {
        let failed = RelayOutcome::failed(url("wss://a"), FailureReason::Timeout);
        assert!(!failed.ok);
        assert_eq!(failed.reason, Some(FailureReason::Timeout));

        let accepted = RelayOutcome::accepted(url("wss://a"), vec![]);
        assert!(accepted.ok);
        assert!(accepted.reason.is_none());
    }

    #[test]
    fn publish_result_counts() {
        let result = PublishResult {
            success: true,
            event_id: "a".repeat(64),
            accepted_by: 1,
            relay_count: 2,
            diagnostics: vec![],
            accepted_relays: vec![url("wss://a")],
        };
        assert!(result.is_success());
        assert_eq!(result.success_count(), 1);
        assert_eq!(result.total_attempted(), 2);
        assert!(!result.fully_accepted());
    }

    #[test]
    fn publish_result_serializes_camel_case() {
        let result = PublishResult {
            success: true,
            event_id: "e".to_string(),
            accepted_by: 0,
            relay_count: 0,
            diagnostics: vec![],
            accepted_relays: vec![],
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["acceptedBy"], 0);
        assert_eq!(value["relayCount"], 0);
        assert_eq!(value["eventId"], "e");
        assert!(value.get("acceptedRelays").is_none());
    }

    #[test]
    fn query_request_builders() {
        let request = QueryRequest::new(vec![url("wss://a")], Filter::new().limit(1))
            .with_timeout(Duration::from_millis(50))
            .with_auth_key(AuthKey::new("k"));
        assert_eq!(request.timeout, Some(Duration::from_millis(50)));
        assert!(request.auth_key.is_some());
        assert_eq!(request.filter.result_limit(), Some(1));
    }
}
