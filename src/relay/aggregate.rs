//! Turns per-relay outcomes into one report.
//!
//! Shared by the query and publish coordinators: diagnostic lines, the
//! ok tally, and the deterministic event merge.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::nostr::Event;
use crate::relay::types::RelayOutcome;

/// Formats `"<relay>: ok"` or `"<relay>: fail (<reason>)"`.
///
/// A partial success (events received before a timeout, close or socket
/// error) reads `"<relay>: ok (<reason>)"` so the cause stays visible.
#[must_use]
pub fn diagnostic_line(outcome: &RelayOutcome) -> String {
    if outcome.ok {
        match &outcome.reason {
            Some(reason) => format!("{}: ok ({reason})", outcome.relay),
            None => format!("{}: ok", outcome.relay),
        }
    } else {
        let reason = outcome
            .reason
            .as_ref()
            .map_or_else(|| "unknown".to_string(), ToString::to_string);
        format!("{}: fail ({reason})", outcome.relay)
    }
}

/// Ok count and diagnostics over a set of outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tally {
    /// Relays that finished ok.
    pub ok_count: usize,
    /// Relays attempted.
    pub relay_count: usize,
    /// One line per relay, in outcome order.
    pub diagnostics: Vec<String>,
}

impl Tally {
    /// Tallies `outcomes`, preserving their order.
    #[must_use]
    pub fn from_outcomes(outcomes: &[RelayOutcome]) -> Self {
        Self {
            ok_count: outcomes.iter().filter(|o| o.ok).count(),
            relay_count: outcomes.len(),
            diagnostics: outcomes.iter().map(diagnostic_line).collect(),
        }
    }

    /// True iff at least one relay finished ok.
    #[must_use]
    pub const fn any_ok(&self) -> bool {
        self.ok_count > 0
    }
}

/// Orders events newest first, breaking ties by descending id.
#[must_use]
pub fn newest_first(a: &Event, b: &Event) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}

/// Merges the events of every outcome, dropping duplicate ids.
///
/// The result is sorted with [`newest_first`] and truncated to `limit`
/// when one is given. The order depends only on the set of events, not
/// on which relay delivered them first.
#[must_use]
pub fn merge_events(outcomes: Vec<RelayOutcome>, limit: Option<usize>) -> Vec<Event> {
    let mut by_id: HashMap<String, Event> = HashMap::new();

    for outcome in outcomes {
        for event in outcome.events {
            by_id.entry(event.id.clone()).or_insert(event);
        }
    }

    let mut events: Vec<Event> = by_id.into_values().collect();
    events.sort_by(newest_first);

    if let Some(limit) = limit {
        events.truncate(limit);
    }

    events
}
