//! Runtime configuration for the relay engine and the tool facade.
//!
//! Nothing here is read from disk or the environment; embedders build the
//! structs directly and override individual fields with the `with_*`
//! helpers.

use std::time::Duration;

/// Default lifetime of one relay connection (connect + auth + response).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(8000);

/// Upper bound on the best-effort `CLOSE` and socket close during teardown.
pub const DEFAULT_TEARDOWN_GRACE: Duration = Duration::from_secs(1);

/// Prefix for generated subscription ids.
pub const DEFAULT_SUBSCRIPTION_PREFIX: &str = "fanout-";

/// Relays used by the tool facade when the caller does not name any.
pub const DEFAULT_RELAYS: &[&str] = &[
    "wss://relay.damus.io",
    "wss://relay.nostr.band",
    "wss://relay.primal.net",
    "wss://nos.lol",
    "wss://purplerelay.com",
    "wss://nostr.land",
];

/// Default `limit` for `query_events` when the caller gives none.
pub const DEFAULT_QUERY_LIMIT: usize = 25;

/// Largest `limit` accepted by `query_events`.
pub const MAX_QUERY_LIMIT: usize = 200;

/// Relay engine settings shared by the query and publish coordinators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanoutConfig {
    /// Per-connection timeout used when a call does not supply one.
    pub timeout: Duration,
    /// Bound on the teardown of each connection.
    pub teardown_grace: Duration,
    /// Prefix for subscription ids sent in `REQ`/`CLOSE`.
    pub subscription_prefix: String,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            teardown_grace: DEFAULT_TEARDOWN_GRACE,
            subscription_prefix: DEFAULT_SUBSCRIPTION_PREFIX.to_string(),
        }
    }
}

impl FanoutConfig {
    /// Sets the default per-connection timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the teardown bound.
    #[must_use]
    pub const fn with_teardown_grace(mut self, grace: Duration) -> Self {
        self.teardown_grace = grace;
        self
    }

    /// Sets the subscription id prefix.
    #[must_use]
    pub fn with_subscription_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.subscription_prefix = prefix.into();
        self
    }

    /// Generates a fresh subscription id for one connection.
    ///
    /// The random suffix keeps ids unique per connection within a call.
    #[must_use]
    pub fn subscription_id(&self) -> String {
        format!("{}{:016x}", self.subscription_prefix, rand::random::<u64>())
    }
}

/// Settings for the tool facade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolsConfig {
    /// Relay engine settings.
    pub fanout: FanoutConfig,
    /// Relays used when a tool call names none.
    pub default_relays: Vec<String>,
    /// `limit` applied to `query_events` when the caller gives none.
    pub default_query_limit: usize,
    /// Largest accepted `limit` for `query_events`.
    pub max_query_limit: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            fanout: FanoutConfig::default(),
            default_relays: DEFAULT_RELAYS.iter().map(ToString::to_string).collect(),
            default_query_limit: DEFAULT_QUERY_LIMIT,
            max_query_limit: MAX_QUERY_LIMIT,
        }
    }
}

impl ToolsConfig {
    /// Replaces the relay engine settings.
    #[must_use]
    pub fn with_fanout(mut self, fanout: FanoutConfig) -> Self {
        self.fanout = fanout;
        self
    }

    /// Replaces the default relay list.
    #[must_use]
    pub fn with_default_relays<I, S>(mut self, relays: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_relays = relays.into_iter().map(Into::into).collect();
        self
    }
}
