//! Query coordinator.

use std::sync::Arc;

use log::info;

use crate::config::FanoutConfig;
use crate::nostr::{SchnorrSigner, Signer};
use crate::relay::aggregate::{merge_events, Tally};
use crate::relay::connection::RelayConnection;
use crate::relay::fanout::run_all;
use crate::relay::session::{Mode, RelaySession};
use crate::relay::types::{QueryRequest, QueryResult, RelayUrl};

/// Fans a filter out to every relay and merges the answers.
///
/// # Example
///
/// ```no_run
/// use relay_fanout::config::FanoutConfig;
/// use relay_fanout::nostr::Filter;
/// use relay_fanout::relay::{QueryCoordinator, QueryRequest, RelayUrl};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let relays = RelayUrl::parse_many(&["wss://relay.damus.io", "wss://nos.lol"])?;
/// let request = QueryRequest::new(relays, Filter::new().kinds([1]).limit(10));
///
/// let result = QueryCoordinator::new(FanoutConfig::default()).run(request).await;
/// for line in &result.diagnostics {
///     println!("{line}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct QueryCoordinator {
    config: FanoutConfig,
    signer: Arc<dyn Signer>,
}

impl QueryCoordinator {
    /// Creates a coordinator that signs auth events with [`SchnorrSigner`].
    #[must_use]
    pub fn new(config: FanoutConfig) -> Self {
        Self::with_signer(config, Arc::new(SchnorrSigner))
    }

    /// Creates a coordinator with a custom signer.
    #[must_use]
    pub fn with_signer(config: FanoutConfig, signer: Arc<dyn Signer>) -> Self {
        Self { config, signer }
    }

    /// Runs one query.
    ///
    /// Every distinct relay gets its own connection and timer. The call returns once
    /// all of them have finished. Success means at least one relay
    /// finished ok; per-relay failures only show up in the diagnostics.
    pub async fn run(&self, request: QueryRequest) -> QueryResult {
        let QueryRequest {
            relay_urls,
            filter,
            timeout,
            auth_key,
        } = request;
        let timeout = timeout.unwrap_or(self.config.timeout);
        let limit = filter.result_limit();

        let connections = RelayUrl::dedup(relay_urls)
            .into_iter()
            .map(|relay| {
                let mode = Mode::Query {
                    filter: Arc::clone(&filter),
                    subscription_id: self.config.subscription_id(),
                };
                let session = RelaySession::new(
                    relay.clone(),
                    mode,
                    auth_key.clone(),
                    Arc::clone(&self.signer),
                );
                (
                    relay,
                    RelayConnection::new(session, timeout, self.config.teardown_grace),
                )
            })
            .collect();

        let outcomes = run_all(connections).await;
        let tally = Tally::from_outcomes(&outcomes);
        let events = merge_events(outcomes, limit);

        info!(
            "query finished: {}/{} relays ok, {} events",
            tally.ok_count,
            tally.relay_count,
            events.len()
        );

        QueryResult {
            success: tally.any_ok(),
            events,
            diagnostics: tally.diagnostics,
        }
    }
}

impl std::fmt::Debug for QueryCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCoordinator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
