//! Relay Fan-out Library
//!
//! Queries and publishes Nostr events across many relays at once. Each call
//! opens a fresh WebSocket per relay, answers NIP-42 auth challenges when a
//! key is supplied, and merges the per-relay outcomes into one result with
//! a diagnostic line per relay.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![deny(unsafe_code)]

mod api;
pub mod config;
pub mod nostr;
pub mod relay;
pub mod tools;

pub use api::{
    PublishEventOutput, QueryEventsOutput, RelayListOutput, RelayTools, SetRelayListOutput,
};
