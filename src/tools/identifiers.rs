//! Public key and event id normalization.
//!
//! Tool callers may name authors and events in any common NIP-19 form.
//! These helpers reduce them to the lowercase hex a filter carries.

use nostr::nips::nip19::{Nip19Event, Nip19Profile};
use nostr::prelude::{FromBech32, ToBech32};
use nostr::{EventId, PublicKey};

fn is_hex64(value: &str) -> bool {
    value.len() == 64 && value.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Normalizes a hex pubkey, `npub` or `nprofile` to lowercase hex.
///
/// Returns `None` if the input is none of those.
#[must_use]
pub fn normalize_pubkey(input: &str) -> Option<String> {
    let input = input.trim();

    if is_hex64(input) {
        return Some(input.to_ascii_lowercase());
    }
    if let Ok(public_key) = PublicKey::from_bech32(input) {
        return Some(public_key.to_hex());
    }
    Nip19Profile::from_bech32(input)
        .ok()
        .map(|profile| profile.public_key.to_hex())
}

/// Normalizes a hex id, `note` or `nevent` to lowercase hex.
///
/// Returns `None` if the input is none of those.
#[must_use]
pub fn normalize_event_id(input: &str) -> Option<String> {
    let input = input.trim();

    if is_hex64(input) {
        return Some(input.to_ascii_lowercase());
    }
    if let Ok(event_id) = EventId::from_bech32(input) {
        return Some(event_id.to_hex());
    }
    Nip19Event::from_bech32(input)
        .ok()
        .map(|event| event.event_id.to_hex())
}

/// Encodes a hex pubkey as `npub`, if it is a valid key.
#[must_use]
pub fn to_npub(pubkey_hex: &str) -> Option<String> {
    PublicKey::from_hex(pubkey_hex)
        .ok()
        .and_then(|public_key| public_key.to_bech32().ok())
}
