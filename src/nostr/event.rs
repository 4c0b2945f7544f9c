//! Nostr event records.
//!
//! The relay fan-out engine treats [`Event`] as an opaque value identified
//! by its `id`. Construction and signing live here so that NIP-42 auth
//! events and tool-built events share the NIP-01 id calculation.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::nostr::error::{NostrError, Result};
use crate::nostr::keys::SECP;

/// Event kind for NIP-42 client authentication.
pub const KIND_CLIENT_AUTH: u16 = 22242;

/// Event kind for NIP-65 relay list metadata.
pub const KIND_RELAY_LIST: u16 = 10002;

/// Event kind for short text notes.
pub const KIND_TEXT_NOTE: u16 = 1;

/// An event that has not been signed yet.
///
/// The author's public key is part of the id preimage, so it is fixed
/// before signing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnsignedEvent {
    /// Author public key (32 bytes, hex-encoded)
    pub pubkey: String,

    /// Unix timestamp in seconds
    pub created_at: i64,

    /// Event kind
    pub kind: u16,

    /// Ordered tag arrays
    pub tags: Vec<Vec<String>>,

    /// Event content
    pub content: String,
}

impl UnsignedEvent {
    /// Calculates the NIP-01 event id for this template.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn id(&self) -> Result<String> {
        calculate_id(
            &self.pubkey,
            self.created_at,
            self.kind,
            &self.tags,
            &self.content,
        )
    }

    /// Attaches an id and signature produced by a signer.
    #[must_use]
    pub fn into_signed(self, id: String, sig: String) -> Event {
        Event {
            id,
            pubkey: self.pubkey,
            created_at: self.created_at,
            kind: self.kind,
            tags: self.tags,
            content: self.content,
            sig,
        }
    }
}

/// A signed Nostr event as carried on the wire.
///
/// ```json
/// {
///   "id": "...",           // SHA256 of serialized event
///   "pubkey": "...",       // Author public key
///   "created_at": 123456,  // Unix timestamp
///   "kind": 1,
///   "tags": [["p", "..."]],
///   "content": "...",
///   "sig": "..."           // Schnorr signature
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    /// Event id (32-byte SHA256 hash, hex-encoded)
    pub id: String,

    /// Author public key (32 bytes, hex-encoded)
    pub pubkey: String,

    /// Unix timestamp when the event was created
    pub created_at: i64,

    /// Event kind
    pub kind: u16,

    /// Ordered tag arrays
    pub tags: Vec<Vec<String>>,

    /// Event content
    pub content: String,

    /// Schnorr signature (64 bytes, hex-encoded)
    pub sig: String,
}

impl Event {
    /// Serializes this event to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(NostrError::from)
    }

    /// Deserializes an event from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(NostrError::from)
    }

    /// Returns the second element of the first tag named `name`.
    #[must_use]
    pub fn tag_value(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|tag| tag.first().map(String::as_str) == Some(name))
            .and_then(|tag| tag.get(1).map(String::as_str))
    }

    /// Verifies the event id and signature.
    ///
    /// # Errors
    ///
    /// Returns an error if the id does not match the content or the
    /// signature is invalid.
    pub fn verify_signature(&self) -> Result<()> {
        use nostr::secp256k1::{schnorr::Signature, Message, XOnlyPublicKey};

        let pubkey_bytes: [u8; 32] = hex::decode(&self.pubkey)?
            .try_into()
            .map_err(|_| NostrError::InvalidEvent("Invalid pubkey length".to_string()))?;
        let pubkey = XOnlyPublicKey::from_slice(&pubkey_bytes)
            .map_err(|e| NostrError::InvalidEvent(format!("Invalid pubkey: {e}")))?;

        let sig_bytes: [u8; 64] = hex::decode(&self.sig)?
            .try_into()
            .map_err(|_| NostrError::InvalidEvent("Invalid signature length".to_string()))?;
        let signature = Signature::from_slice(&sig_bytes)
            .map_err(|e| NostrError::InvalidEvent(format!("Invalid signature: {e}")))?;

        let calculated_id = calculate_id(
            &self.pubkey,
            self.created_at,
            self.kind,
            &self.tags,
            &self.content,
        )?;

        if !bool::from(calculated_id.as_bytes().ct_eq(self.id.as_bytes())) {
            return Err(NostrError::InvalidEvent("Event ID mismatch".to_string()));
        }

        let id_bytes: [u8; 32] = hex::decode(&self.id)?
            .try_into()
            .map_err(|_| NostrError::InvalidEvent("Invalid ID length".to_string()))?;
        let message = Message::from_digest(id_bytes);

        SECP.verify_schnorr(&signature, &message, &pubkey)
            .map_err(|_| NostrError::InvalidSignature)
    }
}

/// Calculates the event id per NIP-01.
///
/// The id is the SHA256 hash of `[0, pubkey, created_at, kind, tags, content]`.
fn calculate_id(
    pubkey: &str,
    created_at: i64,
    kind: u16,
    tags: &[Vec<String>],
    content: &str,
) -> Result<String> {
    let serialized = serde_json::to_string(&(0, pubkey, created_at, kind, tags, content))
        .map_err(NostrError::from)?;

    let mut hasher = Sha256::new();
    hasher.update(serialized.as_bytes());

    Ok(hex::encode(hasher.finalize()))
}
