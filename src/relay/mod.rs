//! Relay fan-out over fresh WebSocket connections.
//!
//! Every query or publish call opens one connection per relay, runs them
//! concurrently, and folds their outcomes into one deterministic result.
//! Nothing is pooled or reused across calls.
//!
//! # Failure Model
//!
//! - **Isolated**: a relay's failure is recorded in its diagnostic line and
//!   never affects sibling connections
//! - **Any-ok success**: a call succeeds when at least one relay does
//! - **One timer per relay**: connect, auth and response share a single
//!   deadline; there is no call-level timeout
//!
//! # Architecture
//!
//! ```text
//! Caller
//!     │
//!     ▼
//! QueryCoordinator / PublishCoordinator
//!     │
//!     ▼
//! N × RelayConnection (one tokio task each)
//!     │   └── RelaySession state machine
//!     │          └── NIP-42 auth (once per connection)
//!     ▼
//! Result aggregation (dedup, sort, diagnostics)
//! ```
//!
//! # Connection States
//!
//! | State | Leaves on |
//! |-------|-----------|
//! | `Connecting` | socket open (request sent) |
//! | `Open` | `AUTH` challenge, `EOSE`, `OK`, limit reached |
//! | `AuthRequested` | auth event signed, or no key |
//! | `Authenticating` | auth event and request resent |
//! | `Finished` | terminal |
//!
//! Timeouts, socket errors and closes finish a connection from any state.

mod aggregate;
mod auth;
mod connection;
mod error;
mod fanout;
mod message;
mod publish;
mod query;
mod session;
mod types;

pub use aggregate::{diagnostic_line, merge_events, newest_first, Tally};
pub use auth::{build_auth_event, is_auth_required, AUTH_REQUIRED_PREFIX};
pub use connection::RelayConnection;
pub use error::{RelayError, RelayResult};
pub use fanout::run_all;
pub use message::{ClientMessage, MessageError, RelayMessage};
pub use publish::PublishCoordinator;
pub use query::QueryCoordinator;
pub use session::{Finish, Mode, RelaySession, SessionState, Step};
pub use types::{
    FailureReason, PublishRequest, PublishResult, QueryRequest, QueryResult, RelayOutcome,
    RelayUrl,
};
