//! Signing collaborator.
//!
//! The relay engine never touches key material directly. It asks a
//! [`Signer`] for the public key of a caller-supplied private key and for an
//! id/signature pair over an unsigned event. [`SchnorrSigner`] is the
//! BIP-340 implementation used by default; tests and embedders may plug in
//! their own (a remote signer, for example).

use crate::nostr::error::{NostrError, Result};
use crate::nostr::event::{Event, UnsignedEvent};
use crate::nostr::keys::{AuthKey, SigningKey};

/// Id and signature produced for an [`UnsignedEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSignature {
    /// NIP-01 event id, hex-encoded
    pub id: String,
    /// Schnorr signature over the id, hex-encoded
    pub sig: String,
}

/// Produces signatures for events on behalf of a private key.
pub trait Signer: Send + Sync {
    /// Derives the hex x-only public key for `private_key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be parsed.
    fn derive_public_key(&self, private_key: &AuthKey) -> Result<String>;

    /// Computes the id of `event` and signs it with `private_key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid, does not match
    /// `event.pubkey`, or signing fails.
    fn sign(&self, event: &UnsignedEvent, private_key: &AuthKey) -> Result<EventSignature>;

    /// Signs `event` and returns the complete signed event.
    ///
    /// # Errors
    ///
    /// Propagates any error from [`Signer::sign`].
    fn sign_event(&self, event: UnsignedEvent, private_key: &AuthKey) -> Result<Event> {
        let EventSignature { id, sig } = self.sign(&event, private_key)?;
        Ok(event.into_signed(id, sig))
    }
}

/// secp256k1 Schnorr signer over hex or `nsec` private keys.
#[derive(Debug, Default, Clone, Copy)]
pub struct SchnorrSigner;

impl Signer for SchnorrSigner {
    fn derive_public_key(&self, private_key: &AuthKey) -> Result<String> {
        Ok(SigningKey::parse(private_key.expose_secret())?.pubkey_hex())
    }

    fn sign(&self, event: &UnsignedEvent, private_key: &AuthKey) -> Result<EventSignature> {
        let key = SigningKey::parse(private_key.expose_secret())?;

        if !key.pubkey_hex().eq_ignore_ascii_case(&event.pubkey) {
            return Err(NostrError::Signing(
                "event pubkey does not match private key".to_string(),
            ));
        }

        let id = event.id()?;
        let id_bytes: [u8; 32] = hex::decode(&id)?
            .try_into()
            .map_err(|_| NostrError::InvalidEvent("Invalid ID length".to_string()))?;
        let sig = key.sign(&id_bytes)?;

        Ok(EventSignature { id, sig })
    }
}
