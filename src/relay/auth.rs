//! NIP-42 client authentication.
//!
//! When a relay sends `["AUTH", <challenge>]`, the client answers with a
//! signed kind 22242 event carrying the relay URL and the challenge:
//!
//! ```json
//! {
//!   "kind": 22242,
//!   "tags": [["relay", "wss://relay.example.com"], ["challenge", "<challenge>"]],
//!   "content": ""
//! }
//! ```
//!
//! Building the event is synchronous; the connection sends it and then
//! resends its original request once.

use crate::nostr::{self, AuthKey, Event, Signer, TagBuilder, UnsignedEvent, KIND_CLIENT_AUTH};

/// Prefix relays use in `OK`/`CLOSED` messages to signal missing auth.
pub const AUTH_REQUIRED_PREFIX: &str = "auth-required:";

/// Builds and signs the NIP-42 authentication event for one challenge.
///
/// # Errors
///
/// Returns an error if the key cannot be parsed or signing fails.
pub fn build_auth_event(
    relay_url: &str,
    challenge: &str,
    auth_key: &AuthKey,
    signer: &dyn Signer,
) -> nostr::Result<Event> {
    let pubkey = signer.derive_public_key(auth_key)?;

    let unsigned = UnsignedEvent {
        pubkey,
        created_at: chrono::Utc::now().timestamp(),
        kind: KIND_CLIENT_AUTH,
        tags: vec![
            TagBuilder::relay_tag(relay_url),
            TagBuilder::challenge_tag(challenge),
        ],
        content: String::new(),
    };

    signer.sign_event(unsigned, auth_key)
}

/// Returns true if a relay rejection is a machine-readable auth demand.
#[must_use]
pub fn is_auth_required(message: &str) -> bool {
    message.starts_with(AUTH_REQUIRED_PREFIX)
}
