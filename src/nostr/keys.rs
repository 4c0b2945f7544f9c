//! Secret key handling for event signing.
//!
//! Private keys arrive from callers as hex or `nsec` strings. They are kept
//! in zeroizing containers and only turned into a secp256k1 keypair for the
//! duration of a single signing operation.

use std::sync::LazyLock;

use nostr::secp256k1::{Keypair, Message, Secp256k1, SecretKey};
use nostr::Keys;
use serde::Deserialize;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::nostr::error::{NostrError, Result};

/// Global secp256k1 context for cryptographic operations.
///
/// Creating a `Secp256k1` context is expensive as it precomputes tables
/// for signing and verification. This shared context is initialized once
/// and reused across all operations.
pub static SECP: LazyLock<Secp256k1<nostr::secp256k1::All>> = LazyLock::new(Secp256k1::new);

/// A caller-supplied private key used to answer NIP-42 challenges.
///
/// The key is held as the raw string the caller supplied (hex or `nsec`)
/// and is only parsed when a relay actually issues a challenge, so a
/// malformed key surfaces as an auth failure on that relay rather than
/// failing the whole call up front.
#[derive(Clone, Deserialize)]
#[serde(from = "String")]
pub struct AuthKey(Zeroizing<String>);

impl AuthKey {
    /// Wraps a hex or `nsec` private key string.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Zeroizing::new(secret.into()))
    }

    /// Returns the raw secret string.
    #[must_use]
    pub fn expose_secret(&self) -> &str {
        self.0.as_str()
    }
}

impl From<String> for AuthKey {
    fn from(secret: String) -> Self {
        Self(Zeroizing::new(secret))
    }
}

impl std::fmt::Debug for AuthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthKey(<redacted>)")
    }
}

/// A parsed secp256k1 signing key.
///
/// The secret key bytes are automatically zeroized when dropped.
///
/// # Example
///
/// ```
/// use relay_fanout::nostr::SigningKey;
///
/// let key = SigningKey::parse(
///     "0000000000000000000000000000000000000000000000000000000000000001",
/// )
/// .unwrap();
/// assert_eq!(key.pubkey_hex().len(), 64);
/// ```
#[derive(ZeroizeOnDrop)]
pub struct SigningKey {
    /// The secret key bytes (zeroized on drop)
    secret_bytes: [u8; 32],

    /// Cached x-only public key bytes (not sensitive, skip zeroization)
    #[zeroize(skip)]
    pubkey_bytes: [u8; 32],
}

impl SigningKey {
    /// Parses a private key given as 64 hex characters or a NIP-19 `nsec`.
    ///
    /// # Errors
    ///
    /// Returns [`NostrError::InvalidKey`] if the string is neither.
    pub fn parse(secret: &str) -> Result<Self> {
        let keys = Keys::parse(secret.trim()).map_err(|e| NostrError::InvalidKey(e.to_string()))?;

        Ok(Self {
            secret_bytes: keys.secret_key().secret_bytes(),
            pubkey_bytes: keys.public_key().to_bytes(),
        })
    }

    /// Creates a `SigningKey` from raw secret key bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes don't represent a valid secret key.
    pub fn from_bytes(secret_bytes: [u8; 32]) -> Result<Self> {
        let secret_key = SecretKey::from_slice(&secret_bytes)
            .map_err(|e| NostrError::InvalidKey(e.to_string()))?;
        let keypair = Keypair::from_secret_key(&SECP, &secret_key);
        let (public_key, _parity) = keypair.x_only_public_key();

        Ok(Self {
            secret_bytes,
            pubkey_bytes: public_key.serialize(),
        })
    }

    /// Returns the x-only public key as a 64-character hex string.
    #[must_use]
    pub fn pubkey_hex(&self) -> String {
        hex::encode(self.pubkey_bytes)
    }

    /// Signs a 32-byte event id with a BIP-340 Schnorr signature.
    ///
    /// Returns the 64-byte signature hex-encoded.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored secret cannot be rebuilt into a keypair.
    pub fn sign(&self, message_hash: &[u8; 32]) -> Result<String> {
        let mut secret_bytes_copy = self.secret_bytes;

        let result = (|| {
            let secret_key = SecretKey::from_slice(&secret_bytes_copy)
                .map_err(|e| NostrError::Signing(e.to_string()))?;
            let keypair = Keypair::from_secret_key(&SECP, &secret_key);
            let message = Message::from_digest(*message_hash);
            let signature = SECP.sign_schnorr(&message, &keypair);
            Ok(hex::encode(signature.serialize()))
        })();

        secret_bytes_copy.zeroize();

        result
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the secret key
        f.debug_struct("SigningKey")
            .field("pubkey", &self.pubkey_hex())
            .finish()
    }
}
