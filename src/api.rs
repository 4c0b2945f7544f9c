//! Tool facade over the relay engine.
//!
//! [`RelayTools`] is the entry point embedders call. It validates tool
//! parameters, applies configured defaults, runs the coordinators and
//! turns their results into tool output or a [`RelayError`].

use std::sync::Arc;
use std::time::Duration;

use log::debug;
use serde::Serialize;

use crate::config::ToolsConfig;
use crate::nostr::{
    AuthKey, Event, Filter, SchnorrSigner, Signer, UnsignedEvent, KIND_RELAY_LIST,
};
use crate::relay::{
    PublishCoordinator, PublishRequest, PublishResult, QueryCoordinator, QueryRequest,
    QueryResult, RelayError, RelayResult, RelayUrl,
};
use crate::tools::{
    build_relay_list_tags, format_relay_list, normalize_event_id, normalize_pubkey,
    parse_relay_list, GetRelayListParams, PublishEventParams, QueryEventsParams,
    RelayListEntry, SetRelayListParams,
};

/// Number of candidate events fetched when looking up an author's latest
/// replaceable event.
const LATEST_EVENT_QUERY_LIMIT: usize = 20;

/// Output of [`RelayTools::query_events`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryEventsOutput {
    /// Human-readable summary.
    pub message: String,
    /// Matching events, newest first.
    pub events: Vec<Event>,
    /// Per-relay diagnostic lines.
    pub diagnostics: Vec<String>,
}

/// Output of [`RelayTools::publish_event`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishEventOutput {
    /// Human-readable summary.
    pub message: String,
    /// Id of the published event.
    pub event_id: String,
    /// Relays that accepted the event.
    pub accepted_by: usize,
    /// Relays attempted.
    pub relay_count: usize,
    /// Per-relay diagnostic lines.
    pub diagnostics: Vec<String>,
}

/// Output of [`RelayTools::get_relay_list`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayListOutput {
    /// Human-readable summary.
    pub message: String,
    /// The kind 10002 event the list was read from.
    pub event: Option<Event>,
    /// Parsed relay entries.
    pub relays: Vec<RelayListEntry>,
}

/// Output of [`RelayTools::set_relay_list`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetRelayListOutput {
    /// Human-readable summary including the published list.
    pub message: String,
    /// Id of the published kind 10002 event.
    pub event_id: String,
    /// Relays that accepted the event.
    pub accepted_by: usize,
    /// Relays attempted.
    pub relay_count: usize,
}

/// Entry point for relay tools.
///
/// # Examples
///
/// ```no_run
/// use relay_fanout::config::ToolsConfig;
/// use relay_fanout::tools::QueryEventsParams;
/// use relay_fanout::RelayTools;
///
/// # async fn example() -> relay_fanout::relay::RelayResult<()> {
/// let tools = RelayTools::new(ToolsConfig::default());
/// let output = tools
///     .query_events(QueryEventsParams {
///         kinds: Some(vec![1]),
///         limit: Some(5),
///         ..QueryEventsParams::default()
///     })
///     .await?;
/// println!("{}", output.message);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RelayTools {
    config: ToolsConfig,
    signer: Arc<dyn Signer>,
    queries: QueryCoordinator,
    publishes: PublishCoordinator,
}

impl Default for RelayTools {
    fn default() -> Self {
        Self::new(ToolsConfig::default())
    }
}

impl RelayTools {
    /// Creates a facade that signs with [`SchnorrSigner`].
    #[must_use]
    pub fn new(config: ToolsConfig) -> Self {
        Self::with_signer(config, Arc::new(SchnorrSigner))
    }

    /// Creates a facade with a custom signer, used both for NIP-42 and for
    /// the events the tools build.
    #[must_use]
    pub fn with_signer(config: ToolsConfig, signer: Arc<dyn Signer>) -> Self {
        Self {
            queries: QueryCoordinator::with_signer(config.fanout.clone(), Arc::clone(&signer)),
            publishes: PublishCoordinator::with_signer(config.fanout.clone(), Arc::clone(&signer)),
            config,
            signer,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ToolsConfig {
        &self.config
    }

    /// Runs a raw query. Never fails; see [`QueryResult::success`].
    pub async fn query(&self, request: QueryRequest) -> QueryResult {
        self.queries.run(request).await
    }

    /// Runs a raw publish. Never fails; see [`PublishResult::success`].
    pub async fn publish(&self, request: PublishRequest) -> PublishResult {
        self.publishes.run(request).await
    }

    /// Queries events matching the tool parameters.
    ///
    /// # Errors
    ///
    /// - [`RelayError::InvalidParams`] for bad identifiers, tag keys or limit
    /// - [`RelayError::InvalidUrl`] for a bad relay URL
    /// - [`RelayError::AllRelaysFailed`] if no relay answered
    pub async fn query_events(&self, params: QueryEventsParams) -> RelayResult<QueryEventsOutput> {
        let relays = self.read_relays(params.relays.as_deref())?;
        let filter = self.build_filter(&params)?;

        let mut request = QueryRequest::new(relays, filter);
        request.timeout = params.timeout_ms.map(Duration::from_millis);
        request.auth_key = params.auth_private_key;

        let result = self.query(request).await;
        if !result.success {
            return Err(RelayError::AllRelaysFailed {
                summary: "Error querying events: all relays failed.".to_string(),
                diagnostics: result.diagnostics,
            });
        }

        Ok(QueryEventsOutput {
            message: format!("Found {} events.", result.events.len()),
            events: result.events,
            diagnostics: result.diagnostics,
        })
    }

    /// Publishes a signed event.
    ///
    /// With `relays` absent the configured defaults are used; an explicit
    /// empty list publishes nowhere and succeeds.
    ///
    /// # Errors
    ///
    /// - [`RelayError::InvalidUrl`] for a bad relay URL
    /// - [`RelayError::AllRelaysFailed`] if no relay accepted the event
    pub async fn publish_event(&self, params: PublishEventParams) -> RelayResult<PublishEventOutput> {
        let relays = match params.relays.as_deref() {
            Some(relays) => RelayUrl::parse_many(relays)?,
            None => RelayUrl::parse_many(self.config.default_relays.as_slice())?,
        };

        let mut request = PublishRequest::new(params.signed_event, relays);
        request.timeout = params.timeout_ms.map(Duration::from_millis);
        request.auth_key = params.auth_private_key;

        let result = self.publish(request).await;
        publish_output(result, "Failed to publish event to any relay.")
    }

    /// Fetches an author's latest NIP-65 relay list.
    ///
    /// Finding no list is not an error.
    ///
    /// # Errors
    ///
    /// - [`RelayError::InvalidParams`] for a bad pubkey
    /// - [`RelayError::InvalidUrl`] for a bad relay URL
    /// - [`RelayError::AllRelaysFailed`] if no relay answered
    pub async fn get_relay_list(&self, params: GetRelayListParams) -> RelayResult<RelayListOutput> {
        let author = normalize_pubkey(&params.pubkey).ok_or_else(|| {
            RelayError::InvalidParams(
                "Invalid public key format. Please provide a valid hex pubkey or npub.".to_string(),
            )
        })?;
        let relays = self.read_relays(params.relays.as_deref())?;

        let latest = self
            .latest_event(relays, KIND_RELAY_LIST, &author, params.auth_private_key)
            .await?;

        let Some(event) = latest else {
            return Ok(RelayListOutput {
                message: "No relay list (kind 10002) found.".to_string(),
                event: None,
                relays: Vec::new(),
            });
        };

        let relays = parse_relay_list(&event);
        Ok(RelayListOutput {
            message: format!("Found {} relays in kind 10002.", relays.len()),
            event: Some(event),
            relays,
        })
    }

    /// Replaces the account's NIP-65 relay list.
    ///
    /// The previous list is read first so the new event keeps its content
    /// and is strictly newer. The account key also answers NIP-42
    /// challenges.
    ///
    /// # Errors
    ///
    /// - [`RelayError::Signing`] for an invalid private key
    /// - [`RelayError::InvalidUrl`] for a bad entry or relay URL
    /// - [`RelayError::AllRelaysFailed`] if reading or publishing failed
    ///   everywhere
    pub async fn set_relay_list(&self, params: SetRelayListParams) -> RelayResult<SetRelayListOutput> {
        let SetRelayListParams {
            private_key,
            relay_list,
            relays,
        } = params;

        let author = self.signer.derive_public_key(&private_key)?;
        let tags = build_relay_list_tags(&relay_list)?;
        let relays = self.read_relays(relays.as_deref())?;

        let existing = self
            .latest_event(
                relays.clone(),
                KIND_RELAY_LIST,
                &author,
                Some(private_key.clone()),
            )
            .await?;

        let mut created_at = chrono::Utc::now().timestamp();
        let mut content = String::new();
        if let Some(existing) = existing {
            if created_at <= existing.created_at {
                created_at = existing.created_at + 1;
            }
            content = existing.content;
        }

        let unsigned = UnsignedEvent {
            pubkey: author,
            created_at,
            kind: KIND_RELAY_LIST,
            tags,
            content,
        };
        let signed = self.signer.sign_event(unsigned, &private_key)?;
        debug!("publishing relay list {}", signed.id);

        let listing = format_relay_list(&parse_relay_list(&signed));
        let request = PublishRequest::new(signed, relays).with_auth_key(private_key);
        let published = publish_output(
            self.publish(request).await,
            "Failed to publish relay list to any relay.",
        )?;

        Ok(SetRelayListOutput {
            message: format!("Relay list published.\n\n{listing}\n\n{}", published.message),
            event_id: published.event_id,
            accepted_by: published.accepted_by,
            relay_count: published.relay_count,
        })
    }

    /// Relays for reads: the caller's list, or the defaults when it is
    /// absent or empty.
    fn read_relays(&self, relays: Option<&[String]>) -> RelayResult<Vec<RelayUrl>> {
        match relays {
            Some(relays) if !relays.is_empty() => RelayUrl::parse_many(relays),
            _ => RelayUrl::parse_many(self.config.default_relays.as_slice()),
        }
    }

    fn build_filter(&self, params: &QueryEventsParams) -> RelayResult<Filter> {
        let limit = params.limit.unwrap_or(self.config.default_query_limit);
        if limit == 0 || limit > self.config.max_query_limit {
            return Err(RelayError::InvalidParams(format!(
                "limit must be between 1 and {}",
                self.config.max_query_limit
            )));
        }

        let mut filter = Filter::new().limit(limit);

        if let Some(kinds) = &params.kinds {
            filter = filter.kinds(kinds.iter().copied());
        }

        if let Some(authors) = &params.authors {
            let normalized: Option<Vec<String>> =
                authors.iter().map(|a| normalize_pubkey(a)).collect();
            let normalized = normalized.ok_or_else(|| {
                RelayError::InvalidParams(
                    "One or more author identifiers are invalid (expected hex pubkey, npub, or nprofile)."
                        .to_string(),
                )
            })?;
            filter = filter.authors(normalized);
        }

        if let Some(ids) = &params.ids {
            let normalized: Option<Vec<String>> =
                ids.iter().map(|id| normalize_event_id(id)).collect();
            let normalized = normalized.ok_or_else(|| {
                RelayError::InvalidParams(
                    "One or more event identifiers are invalid (expected 64-hex id, note, or nevent)."
                        .to_string(),
                )
            })?;
            filter = filter.ids(normalized);
        }

        if let Some(since) = params.since {
            filter = filter.since(since);
        }
        if let Some(until) = params.until {
            filter = filter.until(until);
        }

        if let Some(tags) = &params.tags {
            for (key, values) in tags {
                let key = key.trim();
                let mut chars = key.chars();
                let letter = match (chars.next(), chars.next()) {
                    (Some(letter), None) => letter,
                    _ => {
                        return Err(RelayError::InvalidParams(format!(
                            "Invalid tag filter key \"{key}\"."
                        )))
                    }
                };
                filter = filter
                    .tag(letter, values.iter().cloned())
                    .map_err(|e| RelayError::InvalidParams(e.to_string()))?;
            }
        }

        if let Some(search) = params.search.as_deref().filter(|s| !s.trim().is_empty()) {
            filter = filter.search(search);
        }

        Ok(filter)
    }

    /// Newest event of `kind` by `author`, if any relay has one.
    async fn latest_event(
        &self,
        relays: Vec<RelayUrl>,
        kind: u16,
        author: &str,
        auth_key: Option<AuthKey>,
    ) -> RelayResult<Option<Event>> {
        let filter = Filter::new()
            .kinds([kind])
            .authors([author])
            .limit(LATEST_EVENT_QUERY_LIMIT);

        let mut request = QueryRequest::new(relays, filter);
        request.auth_key = auth_key;

        let result = self.query(request).await;
        if !result.success {
            return Err(RelayError::AllRelaysFailed {
                summary: format!("Error querying kind {kind} events: all relays failed."),
                diagnostics: result.diagnostics,
            });
        }

        // already sorted newest first
        Ok(result
            .events
            .into_iter()
            .find(|event| event.kind == kind && event.pubkey == author))
    }
}

fn publish_output(result: PublishResult, failure: &str) -> RelayResult<PublishEventOutput> {
    if !result.success {
        return Err(RelayError::AllRelaysFailed {
            summary: failure.to_string(),
            diagnostics: result.diagnostics,
        });
    }

    let message = if result.relay_count == 0 {
        "No relays specified; nothing was published.".to_string()
    } else {
        format!(
            "Event published to {}/{} relays.",
            result.accepted_by, result.relay_count
        )
    };

    Ok(PublishEventOutput {
        message,
        event_id: result.event_id,
        accepted_by: result.accepted_by,
        relay_count: result.relay_count,
        diagnostics: result.diagnostics,
    })
}

impl std::fmt::Debug for RelayTools {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayTools")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tools() -> RelayTools {
        RelayTools::new(ToolsConfig::default())
    }

    fn params() -> QueryEventsParams {
        QueryEventsParams::default()
    }

    fn unreachable_event() -> Event {
        Event {
            id: "e".repeat(64),
            pubkey: "p".repeat(64),
            created_at: 1,
            kind: 1,
            tags: vec![],
            content: String::new(),
            sig: "s".repeat(128),
        }
    }

    #[test]
    fn default_limit_applied() {
        let filter = tools().build_filter(&params()).unwrap();
        assert_eq!(filter.result_limit(), Some(25));
    }

    #[test]
    fn limit_out_of_range_rejected() {
        for limit in [0, 201] {
            let result = tools().build_filter(&QueryEventsParams {
                limit: Some(limit),
                ..params()
            });
            assert!(matches!(result, Err(RelayError::InvalidParams(_))), "limit {limit}");
        }
    }

    #[test]
    fn authors_are_normalized() {
        let hex = "AB".repeat(32);
        let filter = tools()
            .build_filter(&QueryEventsParams {
                authors: Some(vec![hex]),
                ..params()
            })
            .unwrap();
        assert!(filter.author_set().contains(&"ab".repeat(32)));
    }

    #[test]
    fn invalid_author_rejected() {
        let result = tools().build_filter(&QueryEventsParams {
            authors: Some(vec!["ab".repeat(32), "npub1nope".to_string()]),
            ..params()
        });
        assert!(matches!(result, Err(RelayError::InvalidParams(msg)) if msg.contains("author")));
    }

    #[test]
    fn invalid_event_id_rejected() {
        let result = tools().build_filter(&QueryEventsParams {
            ids: Some(vec!["xyz".to_string()]),
            ..params()
        });
        assert!(matches!(result, Err(RelayError::InvalidParams(msg)) if msg.contains("event")));
    }

    #[test]
    fn tag_filters_need_single_letter_keys() {
        let mut tags = std::collections::BTreeMap::new();
        tags.insert(" t ".to_string(), vec!["nostr".to_string()]);
        let filter = tools()
            .build_filter(&QueryEventsParams {
                tags: Some(tags),
                ..params()
            })
            .unwrap();
        assert!(filter.tag_values('t').unwrap().contains("nostr"));

        for bad in ["title", "", "#"] {
            let mut tags = std::collections::BTreeMap::new();
            tags.insert(bad.to_string(), vec!["x".to_string()]);
            let result = tools().build_filter(&QueryEventsParams {
                tags: Some(tags),
                ..params()
            });
            assert!(matches!(result, Err(RelayError::InvalidParams(_))), "key {bad:?}");
        }
    }

    #[test]
    fn read_relays_fall_back_to_defaults() {
        let tools = tools();
        let defaults = tools.read_relays(None).unwrap();
        assert_eq!(defaults.len(), tools.config().default_relays.len());
        assert_eq!(tools.read_relays(Some(&[])).unwrap(), defaults);

        let custom = tools.read_relays(Some(&["ws://127.0.0.1:1".to_string()])).unwrap();
        assert_eq!(custom.len(), 1);
    }

    #[tokio::test]
    async fn query_events_rejects_bad_relay_url() {
        let result = tools()
            .query_events(QueryEventsParams {
                relays: Some(vec!["http://example.com".to_string()]),
                ..params()
            })
            .await;
        assert!(matches!(result, Err(RelayError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn publish_to_explicit_empty_list_is_noop() {
        let mut params = PublishEventParams::new(unreachable_event());
        params.relays = Some(vec![]);

        let output = tools().publish_event(params).await.unwrap();
        assert_eq!(output.accepted_by, 0);
        assert_eq!(output.relay_count, 0);
        assert_eq!(output.message, "No relays specified; nothing was published.");
    }

    #[tokio::test]
    async fn get_relay_list_rejects_bad_pubkey() {
        let result = tools()
            .get_relay_list(GetRelayListParams {
                pubkey: "not-a-key".to_string(),
                relays: None,
                auth_private_key: None,
            })
            .await;
        assert!(matches!(result, Err(RelayError::InvalidParams(_))));
    }

    #[tokio::test]
    async fn set_relay_list_rejects_bad_key_before_network() {
        let result = tools()
            .set_relay_list(SetRelayListParams {
                private_key: AuthKey::new("nope"),
                relay_list: vec![],
                relays: Some(vec!["ws://127.0.0.1:1".to_string()]),
            })
            .await;
        assert!(matches!(result, Err(RelayError::Signing(_))));
    }

    #[test]
    fn publish_output_failure_lists_relays() {
        let result = PublishResult {
            success: false,
            event_id: "e".to_string(),
            accepted_by: 0,
            relay_count: 1,
            diagnostics: vec!["wss://a: fail (timeout)".to_string()],
            accepted_relays: vec![],
        };
        let error = publish_output(result, "Failed to publish event to any relay.").unwrap_err();
        assert_eq!(
            error.to_string(),
            "Failed to publish event to any relay.\n\nResults:\nwss://a: fail (timeout)"
        );
    }

    #[test]
    fn debug_trait_implementation() {
        let debug_str = format!("{:?}", tools());
        assert!(debug_str.contains("RelayTools"));
    }
}
