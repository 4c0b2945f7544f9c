//! Nostr data model and signing.
//!
//! This module holds the plain data the relay engine moves around and the
//! signing collaborator it calls for NIP-42 authentication:
//!
//! - [`Event`] / [`UnsignedEvent`]: NIP-01 event records and id calculation
//! - [`Filter`]: `REQ` query descriptor with `#<letter>` tag filters
//! - [`Signer`] / [`SchnorrSigner`]: id + signature production
//! - [`AuthKey`] / [`SigningKey`]: zeroizing private key containers
//! - [`TagBuilder`]: NIP-42 and NIP-65 tags

mod error;
mod event;
mod filter;
mod keys;
mod signer;
mod tags;

pub use error::{NostrError, Result};
pub use event::{Event, UnsignedEvent, KIND_CLIENT_AUTH, KIND_RELAY_LIST, KIND_TEXT_NOTE};
pub use filter::Filter;
pub use keys::{AuthKey, SigningKey};
pub use signer::{EventSignature, SchnorrSigner, Signer};
pub use tags::{RelayMarker, TagBuilder};
