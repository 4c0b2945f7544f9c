//! WebSocket driver for one relay session.
//!
//! A [`RelayConnection`] owns one socket for the lifetime of one call. One
//! deadline, taken when the connection starts, bounds the connect, the
//! optional auth handshake and the wait for the answer. Teardown runs on
//! every exit path after the socket opened and is bounded separately.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use log::{debug, trace};
use tokio::net::TcpStream;
use tokio::time::{sleep_until, timeout, timeout_at, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use crate::relay::message::{ClientMessage, RelayMessage};
use crate::relay::session::{RelaySession, Step};
use crate::relay::types::RelayOutcome;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Why a frame could not be written.
#[derive(Debug)]
enum SendError {
    /// The connection deadline passed while sending.
    Timeout,
    /// Encoding or socket failure.
    Failed(String),
}

/// Drives a [`RelaySession`] over a real WebSocket.
pub struct RelayConnection {
    session: RelaySession,
    timeout: Duration,
    teardown_grace: Duration,
}

impl RelayConnection {
    /// Creates a connection that will run `session` within `timeout`.
    #[must_use]
    pub const fn new(session: RelaySession, timeout: Duration, teardown_grace: Duration) -> Self {
        Self {
            session,
            timeout,
            teardown_grace,
        }
    }

    /// Connects, runs the session to completion, and tears down.
    ///
    /// Never fails: every error becomes the session's terminal outcome.
    pub async fn run(mut self) -> RelayOutcome {
        let deadline = Instant::now() + self.timeout;
        let url = self.session.relay().normalized().to_string();

        debug!("{url}: connecting");
        let mut ws = match timeout_at(deadline, connect_async(url.as_str())).await {
            Ok(Ok((ws, _response))) => ws,
            Ok(Err(e)) => {
                self.session.on_socket_error(e.to_string());
                return self.session.into_outcome();
            }
            Err(_) => {
                self.session.on_timeout();
                return self.session.into_outcome();
            }
        };

        self.drive(&mut ws, deadline).await;
        self.teardown(&mut ws).await;

        self.session.into_outcome()
    }

    async fn drive(&mut self, ws: &mut WsStream, deadline: Instant) {
        let request = self.session.open();
        debug!("{}: sending {}", self.session.relay(), request.kind());
        match send(ws, &request, deadline).await {
            Ok(()) => {}
            Err(SendError::Timeout) => return self.session.on_timeout(),
            Err(SendError::Failed(e)) => return self.session.on_send_failed(e),
        }

        loop {
            let frame = tokio::select! {
                () = sleep_until(deadline) => None,
                frame = ws.next() => Some(frame),
            };

            let Some(frame) = frame else {
                return self.session.on_timeout();
            };

            let text = match frame {
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(Message::Close(_))) | None => return self.session.on_close(),
                Some(Err(e)) => return self.session.on_socket_error(e.to_string()),
                Some(Ok(_)) => continue,
            };

            let message = match RelayMessage::from_json(text.as_str()) {
                Ok(message) => message,
                Err(e) => {
                    trace!("{}: ignoring frame: {e}", self.session.relay());
                    continue;
                }
            };

            match self.session.handle(message) {
                Step::Continue => {}
                Step::Finished => return,
                Step::Authenticate { auth, resend } => {
                    match send(ws, &auth, deadline).await {
                        Ok(()) => {}
                        Err(SendError::Timeout) => return self.session.on_timeout(),
                        Err(SendError::Failed(e)) => return self.session.on_auth_failed(e),
                    }
                    match send(ws, &resend, deadline).await {
                        Ok(()) => {}
                        Err(SendError::Timeout) => return self.session.on_timeout(),
                        Err(SendError::Failed(e)) => return self.session.on_send_failed(e),
                    }
                    debug!("{}: authenticated, resent {}", self.session.relay(), resend.kind());
                    self.session.on_resent();
                }
            }
        }
    }

    /// Best-effort `CLOSE` and socket close, bounded by the teardown grace.
    async fn teardown(&self, ws: &mut WsStream) {
        let close_message = self.session.teardown_message();
        let relay = self.session.relay();

        let result = timeout(self.teardown_grace, async {
            if let Some(message) = close_message {
                if let Ok(json) = message.to_json() {
                    let _ = ws.send(Message::text(json)).await;
                }
            }
            let _ = ws.close(None).await;
        })
        .await;

        if result.is_err() {
            trace!("{relay}: teardown exceeded grace period");
        }
    }
}

async fn send(ws: &mut WsStream, message: &ClientMessage, deadline: Instant) -> Result<(), SendError> {
    let json = message
        .to_json()
        .map_err(|e| SendError::Failed(e.to_string()))?;

    match timeout_at(deadline, ws.send(Message::text(json))).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(SendError::Failed(e.to_string())),
        Err(_) => Err(SendError::Timeout),
    }
}
