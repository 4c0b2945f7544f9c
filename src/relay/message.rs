//! Relay wire protocol messages.
//!
//! - Client to relay: `REQ`, `CLOSE`, `EVENT`, `AUTH`
//! - Relay to client: `EVENT`, `EOSE`, `OK`, `AUTH`, `CLOSED`, `NOTICE`
//!
//! Every message is a JSON array whose first element names its type.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::nostr::{Event, Filter};

/// Errors that can occur when encoding or decoding wire messages.
#[derive(Debug, Error)]
pub enum MessageError {
    /// The frame is not a JSON array with a string type tag.
    #[error("invalid message format: {0}")]
    InvalidFormat(String),

    /// The type tag is not one this client understands.
    #[error("unknown message type: {0}")]
    UnknownType(String),

    /// A required element is missing or has the wrong JSON type.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Messages sent from client to relay.
#[derive(Debug, Clone)]
pub enum ClientMessage {
    /// Subscribe: `["REQ", <subscription_id>, <filter>]`
    Req {
        /// Subscription correlation id
        subscription_id: String,
        /// Shared query descriptor
        filter: Arc<Filter>,
    },

    /// Unsubscribe: `["CLOSE", <subscription_id>]`
    Close {
        /// Subscription correlation id
        subscription_id: String,
    },

    /// Publish: `["EVENT", <event>]`
    Event(Arc<Event>),

    /// NIP-42 authentication: `["AUTH", <signed auth event>]`
    Auth(Box<Event>),
}

impl ClientMessage {
    /// Serializes to the JSON array sent on the socket.
    ///
    /// # Errors
    ///
    /// Returns an error if the filter or event cannot be serialized.
    pub fn to_json(&self) -> Result<String, MessageError> {
        let json = match self {
            Self::Req {
                subscription_id,
                filter,
            } => serde_json::to_string(&("REQ", subscription_id, filter.as_ref()))?,
            Self::Close { subscription_id } => serde_json::to_string(&("CLOSE", subscription_id))?,
            Self::Event(event) => serde_json::to_string(&("EVENT", event.as_ref()))?,
            Self::Auth(event) => serde_json::to_string(&("AUTH", event.as_ref()))?,
        };
        Ok(json)
    }

    /// Returns the wire type tag.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Req { .. } => "REQ",
            Self::Close { .. } => "CLOSE",
            Self::Event(_) => "EVENT",
            Self::Auth(_) => "AUTH",
        }
    }
}

/// Messages sent from relay to client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayMessage {
    /// Event matching a subscription: `["EVENT", <subscription_id>, <event>]`
    Event {
        /// Subscription the event belongs to
        subscription_id: String,
        /// The event
        event: Box<Event>,
    },

    /// End of stored events: `["EOSE", <subscription_id>]`
    Eose {
        /// Subscription that reached the end of stored events
        subscription_id: String,
    },

    /// Command result: `["OK", <event_id>, <accepted>, <message>?]`
    Ok {
        /// Id of the event the result refers to
        event_id: String,
        /// Whether the relay accepted the event
        accepted: bool,
        /// Optional relay-supplied reason
        message: Option<String>,
    },

    /// Authentication challenge (NIP-42): `["AUTH", <challenge>]`
    Auth {
        /// Challenge string to sign
        challenge: String,
    },

    /// Subscription closed by relay: `["CLOSED", <subscription_id>, <message>]`
    Closed {
        /// Subscription the relay closed
        subscription_id: String,
        /// Relay-supplied reason
        message: String,
    },

    /// Human-readable notice: `["NOTICE", <message>]`
    Notice {
        /// Notice text
        message: String,
    },
}

impl RelayMessage {
    /// Parses a text frame received from a relay.
    ///
    /// # Errors
    ///
    /// Returns an error for frames that are not well-formed relay messages.
    pub fn from_json(json: &str) -> Result<Self, MessageError> {
        let value: Value = serde_json::from_str(json)?;
        let Value::Array(mut arr) = value else {
            return Err(MessageError::InvalidFormat("expected JSON array".to_string()));
        };

        let msg_type = match arr.first() {
            Some(Value::String(t)) => t.clone(),
            Some(_) => return Err(MessageError::InvalidFormat("type must be a string".to_string())),
            None => return Err(MessageError::InvalidFormat("empty array".to_string())),
        };

        match msg_type.as_str() {
            "EVENT" => {
                let subscription_id = string_at(&arr, 1, "subscription_id")?;
                let raw = arr.get_mut(2).map(Value::take).ok_or(MessageError::MissingField("event"))?;
                let event: Event = serde_json::from_value(raw)?;
                Ok(Self::Event {
                    subscription_id,
                    event: Box::new(event),
                })
            }
            "EOSE" => Ok(Self::Eose {
                subscription_id: string_at(&arr, 1, "subscription_id")?,
            }),
            "OK" => {
                let event_id = string_at(&arr, 1, "event_id")?;
                let accepted = arr
                    .get(2)
                    .and_then(Value::as_bool)
                    .ok_or(MessageError::MissingField("accepted"))?;
                let message = arr.get(3).and_then(Value::as_str).map(ToString::to_string);
                Ok(Self::Ok {
                    event_id,
                    accepted,
                    message,
                })
            }
            "AUTH" => Ok(Self::Auth {
                challenge: string_at(&arr, 1, "challenge")?,
            }),
            "CLOSED" => Ok(Self::Closed {
                subscription_id: string_at(&arr, 1, "subscription_id")?,
                message: arr
                    .get(2)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            }),
            "NOTICE" => Ok(Self::Notice {
                message: string_at(&arr, 1, "message")?,
            }),
            other => Err(MessageError::UnknownType(other.to_string())),
        }
    }
}

fn string_at(arr: &[Value], index: usize, field: &'static str) -> Result<String, MessageError> {
    arr.get(index)
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .ok_or(MessageError::MissingField(field))
}
