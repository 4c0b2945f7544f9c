//! Tool-layer helpers around the relay engine.
//!
//! - [`params`]: camelCase tool parameters
//! - [`identifiers`]: hex / NIP-19 normalization for authors and ids
//! - [`relay_list`]: NIP-65 relay list parsing and tag building
//! - [`format`]: plain-text event rendering

pub mod format;
pub mod identifiers;
pub mod params;
pub mod relay_list;

pub use format::{format_event, format_events};
pub use identifiers::{normalize_event_id, normalize_pubkey};
pub use params::{
    GetRelayListParams, PublishEventParams, QueryEventsParams, RelayEntryParams,
    SetRelayListParams,
};
pub use relay_list::{build_relay_list_tags, format_relay_list, parse_relay_list, RelayListEntry};
