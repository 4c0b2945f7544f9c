//! Publish coordinator.

use std::sync::Arc;

use log::info;

use crate::config::FanoutConfig;
use crate::nostr::{SchnorrSigner, Signer};
use crate::relay::aggregate::Tally;
use crate::relay::connection::RelayConnection;
use crate::relay::fanout::run_all;
use crate::relay::session::{Mode, RelaySession};
use crate::relay::types::{PublishRequest, PublishResult, RelayUrl};

/// Fans one signed event out to every relay and tallies acceptance.
#[derive(Clone)]
pub struct PublishCoordinator {
    config: FanoutConfig,
    signer: Arc<dyn Signer>,
}

impl PublishCoordinator {
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

    /// Publishes the event.
    ///
    /// An empty relay set succeeds immediately without opening a socket.
    /// Otherwise success means at least one relay answered `OK true`.
    pub async fn run(&self, request: PublishRequest) -> PublishResult {
        let PublishRequest {
            event,
            relay_urls,
            timeout,
            auth_key,
        } = request;
        let event_id = event.id.clone();
        let relay_urls = RelayUrl::dedup(relay_urls);

        if relay_urls.is_empty() {
            info!("publish of {event_id} skipped: no relays");
            return PublishResult {
                success: true,
                event_id,
                accepted_by: 0,
                relay_count: 0,
                diagnostics: Vec::new(),
                accepted_relays: Vec::new(),
            };
        }

        let timeout = timeout.unwrap_or(self.config.timeout);
        let connections = relay_urls
            .into_iter()
            .map(|relay| {
                let session = RelaySession::new(
                    relay.clone(),
                    Mode::Publish {
                        event: Arc::clone(&event),
                    },
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

        info!(
            "publish of {event_id} finished: accepted by {}/{} relays",
            tally.ok_count, tally.relay_count
        );

        PublishResult {
            success: tally.any_ok(),
            event_id,
            accepted_by: tally.ok_count,
            relay_count: tally.relay_count,
            diagnostics: tally.diagnostics,
            accepted_relays: outcomes
                .into_iter()
                .filter(|o| o.ok)
                .map(|o| o.relay)
                .collect(),
        }
    }
}

impl std::fmt::Debug for PublishCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishCoordinator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
