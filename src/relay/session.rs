//! Per-relay protocol state machine.
//!
//! [`RelaySession`] holds everything one relay connection knows about its
//! call: the pending request, the auth key, buffered events, and the
//! current [`SessionState`]. It performs no I/O. The connection driver
//! feeds it decoded [`RelayMessage`]s and socket events and writes the
//! frames it hands back.
//!
//! ```text
//! Connecting -> Open -> (AuthRequested -> Authenticating -> Open)? -> Finished
//! ```
//!
//! `Finished` is reachable from every state and is entered exactly once;
//! later transitions are ignored.

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, trace};

use crate::nostr::{AuthKey, Event, Filter, Signer};
use crate::relay::auth::{build_auth_event, is_auth_required};
use crate::relay::message::{ClientMessage, RelayMessage};
use crate::relay::types::{FailureReason, RelayOutcome, RelayUrl};

/// What the connection was opened to do.
#[derive(Debug, Clone)]
pub enum Mode {
    /// Subscribe with a filter and collect events until `EOSE`.
    Query {
        /// Shared filter
        filter: Arc<Filter>,
        /// Subscription id used for `REQ` and `CLOSE`
        subscription_id: String,
    },
    /// Send one event and wait for its `OK`.
    Publish {
        /// Shared signed event
        event: Arc<Event>,
    },
}

impl Mode {
    const fn is_query(&self) -> bool {
        matches!(self, Self::Query { .. })
    }
}

/// Terminal result recorded when a session finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finish {
    /// Whether the relay answered successfully.
    pub ok: bool,
    /// Why the session ended, when it was not a clean success.
    pub reason: Option<FailureReason>,
}

/// Connection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Socket handshake in progress.
    Connecting,
    /// Request sent, waiting for the relay.
    Open,
    /// An `AUTH` challenge arrived.
    AuthRequested,
    /// The auth event is being sent; the original request follows.
    Authenticating,
    /// Terminal.
    Finished(Finish),
}

/// What the driver must do after handing a message to the session.
#[derive(Debug)]
pub enum Step {
    /// Keep reading.
    Continue,
    /// Send `auth`, then `resend`, then call [`RelaySession::on_resent`].
    Authenticate {
        /// The signed `AUTH` message
        auth: ClientMessage,
        /// The original request, sent again once
        resend: ClientMessage,
    },
    /// The session finished; tear the connection down.
    Finished,
}

/// Protocol state of one relay connection for one call.
pub struct RelaySession {
    relay: RelayUrl,
    mode: Mode,
    auth_key: Option<AuthKey>,
    signer: Arc<dyn Signer>,
    limit: Option<usize>,
    state: SessionState,
    opened: bool,
    auth_attempted: bool,
    /// Copies of the request sent and not yet answered.
    outstanding: usize,
    events: Vec<Event>,
    seen: HashSet<String>,
}

impl RelaySession {
    /// Creates a session in the `Connecting` state.
    #[must_use]
    pub fn new(
        relay: RelayUrl,
        mode: Mode,
        auth_key: Option<AuthKey>,
        signer: Arc<dyn Signer>,
    ) -> Self {
        let limit = match &mode {
            Mode::Query { filter, .. } => filter.result_limit(),
            Mode::Publish { .. } => None,
        };

        Self {
            relay,
            mode,
            auth_key,
            signer,
            limit,
            state: SessionState::Connecting,
            opened: false,
            auth_attempted: false,
            outstanding: 0,
            events: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Returns the relay this session talks to.
    #[must_use]
    pub const fn relay(&self) -> &RelayUrl {
        &self.relay
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// Returns true once the session has finished.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        matches!(self.state, SessionState::Finished(_))
    }

    /// Returns the number of distinct events buffered so far.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Marks the socket as open and returns the request to send.
    pub fn open(&mut self) -> ClientMessage {
        self.state = SessionState::Open;
        self.opened = true;
        self.outstanding = 1;
        self.request()
    }

    /// Records that the post-auth resend went out.
    pub fn on_resent(&mut self) {
        if self.is_finished() {
            return;
        }
        self.outstanding += 1;
        self.state = SessionState::Open;
    }

    /// Applies one incoming relay message.
    pub fn handle(&mut self, message: RelayMessage) -> Step {
        if self.is_finished() {
            return Step::Finished;
        }

        match message {
            RelayMessage::Auth { challenge } => return self.on_challenge(&challenge),
            RelayMessage::Event {
                subscription_id,
                event,
            } => self.on_event(&subscription_id, *event),
            RelayMessage::Eose { subscription_id } => {
                if self.is_own_subscription(&subscription_id) {
                    self.finish(true, None);
                }
            }
            RelayMessage::Ok {
                event_id,
                accepted,
                message,
            } => self.on_ok(&event_id, accepted, message.unwrap_or_default()),
            RelayMessage::Closed {
                subscription_id,
                message,
            } => {
                if self.is_own_subscription(&subscription_id) {
                    self.on_rejected(message);
                }
            }
            RelayMessage::Notice { message } => {
                debug!("{}: notice: {message}", self.relay);
            }
        }

        if self.is_finished() {
            Step::Finished
        } else {
            Step::Continue
        }
    }

    /// The connection timer expired.
    pub fn on_timeout(&mut self) {
        self.finish_partial(FailureReason::Timeout);
    }

    /// Writing the request to the socket failed.
    pub fn on_send_failed(&mut self, detail: impl Into<String>) {
        self.finish(false, Some(FailureReason::SendFailed(detail.into())));
    }

    /// Writing the auth event to the socket failed.
    pub fn on_auth_failed(&mut self, detail: impl Into<String>) {
        self.finish(false, Some(FailureReason::AuthFailed(detail.into())));
    }

    /// The socket could not be opened or broke.
    pub fn on_socket_error(&mut self, detail: impl Into<String>) {
        self.finish_partial(FailureReason::SocketError(detail.into()));
    }

    /// The socket closed before the relay answered.
    pub fn on_close(&mut self) {
        if self.mode.is_query() && self.events.is_empty() {
            self.finish(false, Some(FailureReason::ClosedNoEvents));
        } else {
            self.finish_partial(FailureReason::Closed);
        }
    }

    /// Returns the best-effort unsubscribe to send during teardown.
    #[must_use]
    pub fn teardown_message(&self) -> Option<ClientMessage> {
        match &self.mode {
            Mode::Query {
                subscription_id, ..
            } if self.opened => Some(ClientMessage::Close {
                subscription_id: subscription_id.clone(),
            }),
            _ => None,
        }
    }

    /// Consumes the session and returns its terminal outcome.
    ///
    /// A session that never finished is treated as closed.
    #[must_use]
    pub fn into_outcome(mut self) -> RelayOutcome {
        if !self.is_finished() {
            self.on_close();
        }

        let Finish { ok, reason } = match self.state {
            SessionState::Finished(finish) => finish,
            _ => Finish {
                ok: false,
                reason: Some(FailureReason::Closed),
            },
        };

        RelayOutcome {
            relay: self.relay,
            ok,
            events: self.events,
            reason,
        }
    }

    fn request(&self) -> ClientMessage {
        match &self.mode {
            Mode::Query {
                filter,
                subscription_id,
            } => ClientMessage::Req {
                subscription_id: subscription_id.clone(),
                filter: Arc::clone(filter),
            },
            Mode::Publish { event } => ClientMessage::Event(Arc::clone(event)),
        }
    }

    fn is_own_subscription(&self, subscription_id: &str) -> bool {
        match &self.mode {
            Mode::Query {
                subscription_id: own,
                ..
            } => own == subscription_id,
            Mode::Publish { .. } => false,
        }
    }

    fn on_challenge(&mut self, challenge: &str) -> Step {
        if self.auth_attempted {
            trace!("{}: ignoring repeated AUTH challenge", self.relay);
            return Step::Continue;
        }
        self.auth_attempted = true;
        self.state = SessionState::AuthRequested;

        let Some(auth_key) = &self.auth_key else {
            debug!("{}: challenged without an auth key", self.relay);
            self.finish(false, Some(FailureReason::AuthRequired));
            return Step::Finished;
        };

        match build_auth_event(self.relay.as_str(), challenge, auth_key, self.signer.as_ref()) {
            Ok(event) => {
                debug!("{}: answering AUTH challenge", self.relay);
                self.state = SessionState::Authenticating;
                Step::Authenticate {
                    auth: ClientMessage::Auth(Box::new(event)),
                    resend: self.request(),
                }
            }
            Err(e) => {
                self.finish(false, Some(FailureReason::AuthFailed(e.to_string())));
                Step::Finished
            }
        }
    }

    fn on_event(&mut self, subscription_id: &str, event: Event) {
        if !self.is_own_subscription(subscription_id) {
            trace!("{}: event for foreign subscription {subscription_id}", self.relay);
            return;
        }

        if self.seen.insert(event.id.clone()) {
            self.events.push(event);
        }

        if self.limit.is_some_and(|limit| self.events.len() >= limit) {
            self.finish(true, None);
        }
    }

    fn on_ok(&mut self, event_id: &str, accepted: bool, message: String) {
        let Mode::Publish { event } = &self.mode else {
            trace!("{}: OK for {event_id} ignored in query mode", self.relay);
            return;
        };
        if event.id != event_id {
            trace!("{}: OK for unrelated event {event_id}", self.relay);
            return;
        }

        if accepted {
            self.finish(true, None);
        } else {
            self.on_rejected(message);
        }
    }

    /// Handles `OK false` (publish) and `CLOSED` (query).
    fn on_rejected(&mut self, message: String) {
        if is_auth_required(&message) {
            if self.outstanding > 1 {
                trace!("{}: stale auth-required rejection ignored", self.relay);
                self.outstanding -= 1;
                return;
            }
            if !self.auth_attempted {
                if self.auth_key.is_none() {
                    self.finish(false, Some(FailureReason::AuthRequired));
                } else {
                    // wait for the challenge; the resend answers this request
                    self.outstanding = 0;
                }
                return;
            }
        }

        if self.mode.is_query() && !self.events.is_empty() {
            self.finish(true, Some(FailureReason::Rejected(message)));
        } else {
            self.finish(false, Some(FailureReason::Rejected(message)));
        }
    }

    /// Finishes after an interruption. Buffered query events make it a
    /// partial success.
    fn finish_partial(&mut self, reason: FailureReason) {
        let ok = self.mode.is_query() && !self.events.is_empty();
        self.finish(ok, Some(reason));
    }

    fn finish(&mut self, ok: bool, reason: Option<FailureReason>) {
        if self.is_finished() {
            return;
        }

        match &reason {
            Some(reason) => debug!(
                "{}: finished ok={ok} ({reason}) with {} events",
                self.relay,
                self.events.len()
            ),
            None => debug!(
                "{}: finished ok={ok} with {} events",
                self.relay,
                self.events.len()
            ),
        }

        self.state = SessionState::Finished(Finish { ok, reason });
    }
}
