//! Reusable test helpers for relay fan-out integration tests.
//!
//! [`MockRelay`] is a REAL WebSocket relay bound to `127.0.0.1` on an
//! ephemeral port. Each instance follows a [`RelayScript`] and records every
//! client frame it receives, so tests can assert on the wire traffic as well
//! as on the fan-out result. No network access beyond loopback is needed.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use relay_fanout::config::{FanoutConfig, ToolsConfig};
use relay_fanout::nostr::{AuthKey, Event, SchnorrSigner, Signer, UnsignedEvent, KIND_CLIENT_AUTH};
use relay_fanout::relay::RelayUrl;
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

/// Secret key of the first test identity.
pub const ALICE_SECRET: &str = "0000000000000000000000000000000000000000000000000000000000000003";

/// Secret key of the second test identity.
pub const BOB_SECRET: &str = "0000000000000000000000000000000000000000000000000000000000000007";

/// Per-connection timeout for tests expecting an answer.
pub const ANSWER_TIMEOUT: Duration = Duration::from_secs(3);

/// Per-connection timeout for tests that wait out a silent relay.
pub const SILENT_TIMEOUT: Duration = Duration::from_millis(400);

/// Rejection text used by relays that demand NIP-42 auth.
pub const AUTH_REQUIRED_MESSAGE: &str = "auth-required: please authenticate";

/// How a [`MockRelay`] answers its clients.
#[derive(Debug, Clone, Default)]
pub struct RelayScript {
    /// Events served to matching `REQ`s. Accepted publishes are added.
    pub events: Vec<Event>,
    /// Demand NIP-42 auth before serving or accepting anything.
    pub require_auth: bool,
    /// Number of `AUTH` challenges sent on connect when auth is required.
    pub challenges: usize,
    /// Answer every `EVENT` with `OK false` and this message.
    pub reject_publish: Option<String>,
    /// Read frames but never answer.
    pub silent: bool,
    /// Send the matching events, then close without `EOSE`.
    pub close_after_events: bool,
    /// Close the socket right after the handshake.
    pub close_immediately: bool,
}

impl RelayScript {
    /// A relay that serves `events` and accepts every publish.
    pub fn serving(events: Vec<Event>) -> Self {
        Self {
            events,
            ..Self::default()
        }
    }

    /// A relay that never answers.
    pub fn silent() -> Self {
        Self {
            silent: true,
            ..Self::default()
        }
    }

    /// A relay that rejects every publish with `message`.
    pub fn rejecting(message: &str) -> Self {
        Self {
            reject_publish: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Requires NIP-42 auth, sending one challenge on connect.
    pub fn with_auth(mut self) -> Self {
        self.require_auth = true;
        self.challenges = self.challenges.max(1);
        self
    }

    /// Sends `count` challenges on connect.
    pub fn with_challenges(mut self, count: usize) -> Self {
        self.require_auth = true;
        self.challenges = count;
        self
    }
}

#[derive(Debug, Default)]
struct RelayState {
    stored: Vec<Event>,
    received: Vec<Value>,
    auth_events: Vec<Event>,
    connections: usize,
}

/// A scripted relay served on a loopback port.
///
/// The accept loop is aborted when the relay is dropped.
pub struct MockRelay {
    url: String,
    state: Arc<Mutex<RelayState>>,
    handle: JoinHandle<()>,
}

impl MockRelay {
    /// Binds a listener and starts serving `script`.
    pub async fn start(script: RelayScript) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("should bind loopback listener");
        let port = listener.local_addr().expect("should have address").port();
        let url = format!("ws://127.0.0.1:{port}");

        let state = Arc::new(Mutex::new(RelayState {
            stored: script.events.clone(),
            ..RelayState::default()
        }));

        let handle = {
            let state = Arc::clone(&state);
            let url = url.clone();
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let state = Arc::clone(&state);
                    let script = script.clone();
                    let url = url.clone();
                    tokio::spawn(async move {
                        serve_connection(stream, script, state, url).await;
                    });
                }
            })
        };

        Self { url, state, handle }
    }

    /// The relay URL clients connect to.
    pub fn url(&self) -> String {
        self.url.clone()
    }

    /// The relay URL parsed for the engine.
    pub fn relay_url(&self) -> RelayUrl {
        RelayUrl::parse(&self.url).expect("mock url should parse")
    }

    /// Every client frame received so far, across connections.
    pub fn received(&self) -> Vec<Value> {
        self.state.lock().unwrap().received.clone()
    }

    /// The message type of every client frame received so far.
    pub fn received_types(&self) -> Vec<String> {
        self.received()
            .iter()
            .filter_map(|frame| frame.get(0).and_then(Value::as_str).map(ToString::to_string))
            .collect()
    }

    /// Number of received frames of the given type.
    pub fn count_of(&self, message_type: &str) -> usize {
        self.received_types()
            .iter()
            .filter(|t| t.as_str() == message_type)
            .count()
    }

    /// Auth events that passed verification.
    pub fn auth_events(&self) -> Vec<Event> {
        self.state.lock().unwrap().auth_events.clone()
    }

    /// Events currently stored, including accepted publishes.
    pub fn stored(&self) -> Vec<Event> {
        self.state.lock().unwrap().stored.clone()
    }

    /// Number of WebSocket connections accepted.
    pub fn connections(&self) -> usize {
        self.state.lock().unwrap().connections
    }

    /// Waits until a frame of `message_type` arrives, or `within` elapses.
    ///
    /// The relay reads frames on its own task, so a frame the client sent
    /// may not be recorded yet when the call returns.
    pub async fn wait_for(&self, message_type: &str, within: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + within;
        loop {
            if self.count_of(message_type) > 0 {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Drop for MockRelay {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve_connection(
    stream: TcpStream,
    script: RelayScript,
    state: Arc<Mutex<RelayState>>,
    url: String,
) {
    let Ok(mut ws) = accept_async(stream).await else {
        return;
    };
    state.lock().unwrap().connections += 1;

    if script.close_immediately {
        let _ = ws.close(None).await;
        return;
    }

    let challenges: Vec<String> = if script.require_auth {
        (0..script.challenges.max(1))
            .map(|n| format!("challenge-{n}-{}", rand_suffix()))
            .collect()
    } else {
        Vec::new()
    };
    for challenge in &challenges {
        if send_json(&mut ws, &json!(["AUTH", challenge])).await.is_err() {
            return;
        }
    }

    let mut authenticated = false;

    while let Some(frame) = ws.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text.as_str().to_string(),
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };
        let Ok(value) = serde_json::from_str::<Value>(&text) else {
            continue;
        };
        state.lock().unwrap().received.push(value.clone());

        if script.silent {
            continue;
        }

        let replies = match value.get(0).and_then(Value::as_str) {
            Some("AUTH") => {
                let (ok, replies) = handle_auth(&value, &challenges, &url, &state);
                authenticated |= ok;
                replies
            }
            Some("REQ") => {
                let sub = value.get(1).and_then(Value::as_str).unwrap_or_default();
                if script.require_auth && !authenticated {
                    vec![json!(["CLOSED", sub, AUTH_REQUIRED_MESSAGE])]
                } else {
                    let filter = value.get(2).cloned().unwrap_or_else(|| json!({}));
                    let mut replies: Vec<Value> = matching_events(&state, &filter)
                        .into_iter()
                        .map(|event| json!(["EVENT", sub, event]))
                        .collect();
                    if !script.close_after_events {
                        replies.push(json!(["EOSE", sub]));
                    }
                    replies
                }
            }
            Some("EVENT") => handle_publish(&value, &script, authenticated, &state),
            _ => Vec::new(),
        };

        for reply in &replies {
            if send_json(&mut ws, reply).await.is_err() {
                return;
            }
        }

        if script.close_after_events && value.get(0).and_then(Value::as_str) == Some("REQ") {
            let _ = ws.close(None).await;
            return;
        }
    }
}

fn handle_auth(
    frame: &Value,
    challenges: &[String],
    url: &str,
    state: &Arc<Mutex<RelayState>>,
) -> (bool, Vec<Value>) {
    let Some(event) = frame
        .get(1)
        .cloned()
        .and_then(|raw| serde_json::from_value::<Event>(raw).ok())
    else {
        return (false, vec![json!(["NOTICE", "malformed AUTH"])]);
    };

    let valid = event.kind == KIND_CLIENT_AUTH
        && event.tag_value("relay") == Some(url)
        && event
            .tag_value("challenge")
            .is_some_and(|challenge| challenges.iter().any(|c| c == challenge))
        && event.verify_signature().is_ok();

    let reply = if valid {
        json!(["OK", event.id, true, ""])
    } else {
        json!(["OK", event.id, false, "auth-required: invalid auth event"])
    };
    if valid {
        state.lock().unwrap().auth_events.push(event);
    }
    (valid, vec![reply])
}

fn handle_publish(
    frame: &Value,
    script: &RelayScript,
    authenticated: bool,
    state: &Arc<Mutex<RelayState>>,
) -> Vec<Value> {
    let Some(event) = frame
        .get(1)
        .cloned()
        .and_then(|raw| serde_json::from_value::<Event>(raw).ok())
    else {
        return vec![json!(["NOTICE", "malformed EVENT"])];
    };

    if script.require_auth && !authenticated {
        return vec![json!(["OK", event.id, false, AUTH_REQUIRED_MESSAGE])];
    }
    if let Some(reason) = &script.reject_publish {
        return vec![json!(["OK", event.id, false, reason])];
    }

    let id = event.id.clone();
    state.lock().unwrap().stored.push(event);
    vec![json!(["OK", id, true, ""])]
}

fn matching_events(state: &Arc<Mutex<RelayState>>, filter: &Value) -> Vec<Event> {
    let stored = state.lock().unwrap().stored.clone();
    let mut matched: Vec<Event> = stored
        .into_iter()
        .filter(|event| matches_filter(event, filter))
        .collect();
    matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    if let Some(limit) = filter.get("limit").and_then(Value::as_u64) {
        matched.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
    }
    matched
}

fn matches_filter(event: &Event, filter: &Value) -> bool {
    let contains = |key: &str, value: &Value| {
        filter
            .get(key)
            .and_then(Value::as_array)
            .map_or(true, |allowed| allowed.contains(value))
    };

    if !contains("ids", &json!(event.id))
        || !contains("authors", &json!(event.pubkey))
        || !contains("kinds", &json!(event.kind))
    {
        return false;
    }

    let Some(object) = filter.as_object() else {
        return true;
    };
    object
        .iter()
        .filter_map(|(key, values)| Some((key.strip_prefix('#')?, values.as_array()?)))
        .all(|(letter, values)| {
            event.tags.iter().any(|tag| {
                tag.first().map(String::as_str) == Some(letter)
                    && tag
                        .get(1)
                        .is_some_and(|value| values.contains(&json!(value)))
            })
        })
}

async fn send_json(
    ws: &mut WebSocketStream<TcpStream>,
    value: &Value,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    ws.send(Message::text(value.to_string())).await
}

fn rand_suffix() -> u32 {
    rand::random()
}

/// A loopback URL nothing listens on.
pub async fn unreachable_relay() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("should bind loopback listener");
    let port = listener.local_addr().expect("should have address").port();
    drop(listener);
    format!("ws://127.0.0.1:{port}")
}

/// Engine settings with short timeouts for tests.
pub fn test_fanout(timeout: Duration) -> FanoutConfig {
    FanoutConfig::default()
        .with_timeout(timeout)
        .with_teardown_grace(Duration::from_millis(200))
}

/// Tool settings whose default relays are `relays`.
pub fn test_tools(relays: &[String], timeout: Duration) -> ToolsConfig {
    ToolsConfig::default()
        .with_fanout(test_fanout(timeout))
        .with_default_relays(relays.iter().cloned())
}

/// Public key of a test identity.
pub fn pubkey_of(secret: &str) -> String {
    SchnorrSigner
        .derive_public_key(&AuthKey::new(secret))
        .expect("test key should be valid")
}

/// Builds and signs an event for a test identity.
pub fn signed_event(
    secret: &str,
    kind: u16,
    created_at: i64,
    tags: Vec<Vec<String>>,
    content: &str,
) -> Event {
    let unsigned = UnsignedEvent {
        pubkey: pubkey_of(secret),
        created_at,
        kind,
        tags,
        content: content.to_string(),
    };
    SchnorrSigner
        .sign_event(unsigned, &AuthKey::new(secret))
        .expect("should sign test event")
}

/// A signed kind 1 note.
pub fn note(secret: &str, created_at: i64, content: &str) -> Event {
    signed_event(secret, 1, created_at, Vec::new(), content)
}

/// Returns the diagnostic line for `url`, if any.
pub fn diagnostic_for<'a>(diagnostics: &'a [String], url: &str) -> Option<&'a str> {
    let prefix = format!("{url}: ");
    diagnostics
        .iter()
        .find(|line| line.starts_with(&prefix))
        .map(String::as_str)
}
