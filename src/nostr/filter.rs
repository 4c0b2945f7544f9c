//! Query descriptor sent in `REQ` messages.
//!
//! A [`Filter`] is built once and then shared read-only by every relay
//! connection of a query. Serialization follows NIP-01: tag filters are
//! keyed `#<letter>` and empty fields are omitted.

use std::collections::{BTreeMap, BTreeSet};

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::nostr::error::{NostrError, Result};

/// A NIP-01 subscription filter.
///
/// # Example
///
/// ```
/// use relay_fanout::nostr::Filter;
///
/// let filter = Filter::new()
///     .kinds([1])
///     .tag('t', ["nostr"])
///     .unwrap()
///     .limit(20);
///
/// let json = serde_json::to_value(&filter).unwrap();
/// assert_eq!(json["#t"][0], "nostr");
/// assert_eq!(json["limit"], 20);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    ids: BTreeSet<String>,
    authors: BTreeSet<String>,
    kinds: BTreeSet<u16>,
    tags: BTreeMap<char, BTreeSet<String>>,
    since: Option<i64>,
    until: Option<i64>,
    limit: Option<usize>,
    search: Option<String>,
}

impl Filter {
    /// Creates an empty filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds event ids (64-char hex).
    #[must_use]
    pub fn ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Adds author public keys (64-char hex).
    #[must_use]
    pub fn authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authors.extend(authors.into_iter().map(Into::into));
        self
    }

    /// Adds event kinds.
    #[must_use]
    pub fn kinds<I>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = u16>,
    {
        self.kinds.extend(kinds);
        self
    }

    /// Adds values for a single-letter tag filter, serialized as `#<letter>`.
    ///
    /// # Errors
    ///
    /// Returns [`NostrError::InvalidFilter`] if `letter` is not an ASCII
    /// alphanumeric character.
    pub fn tag<I, S>(mut self, letter: char, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if !letter.is_ascii_alphanumeric() {
            return Err(NostrError::InvalidFilter(format!(
                "tag filter key must be a single alphanumeric character, got {letter:?}"
            )));
        }
        self.tags
            .entry(letter)
            .or_default()
            .extend(values.into_iter().map(Into::into));
        Ok(self)
    }

    /// Only match events created at or after `timestamp`.
    #[must_use]
    pub const fn since(mut self, timestamp: i64) -> Self {
        self.since = Some(timestamp);
        self
    }

    /// Only match events created at or before `timestamp`.
    #[must_use]
    pub const fn until(mut self, timestamp: i64) -> Self {
        self.until = Some(timestamp);
        self
    }

    /// Caps the number of events each relay returns.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets a NIP-50 full-text search string.
    #[must_use]
    pub fn search(mut self, query: impl Into<String>) -> Self {
        self.search = Some(query.into());
        self
    }

    /// Returns the requested per-relay limit, if any.
    ///
    /// A limit of zero is treated as "no cap" by the relay engine.
    #[must_use]
    pub const fn result_limit(&self) -> Option<usize> {
        match self.limit {
            Some(0) | None => None,
            Some(limit) => Some(limit),
        }
    }

    /// Returns the kinds this filter selects.
    #[must_use]
    pub const fn kind_set(&self) -> &BTreeSet<u16> {
        &self.kinds
    }

    /// Returns the authors this filter selects.
    #[must_use]
    pub const fn author_set(&self) -> &BTreeSet<String> {
        &self.authors
    }

    /// Returns the values for tag filter `letter`.
    #[must_use]
    pub fn tag_values(&self, letter: char) -> Option<&BTreeSet<String>> {
        self.tags.get(&letter)
    }
}

impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;

        if !self.ids.is_empty() {
            map.serialize_entry("ids", &self.ids)?;
        }
        if !self.authors.is_empty() {
            map.serialize_entry("authors", &self.authors)?;
        }
        if !self.kinds.is_empty() {
            map.serialize_entry("kinds", &self.kinds)?;
        }
        for (letter, values) in &self.tags {
            map.serialize_entry(&format!("#{letter}"), values)?;
        }
        if let Some(since) = self.since {
            map.serialize_entry("since", &since)?;
        }
        if let Some(until) = self.until {
            map.serialize_entry("until", &until)?;
        }
        if let Some(limit) = self.limit {
            map.serialize_entry("limit", &limit)?;
        }
        if let Some(search) = &self.search {
            map.serialize_entry("search", search)?;
        }

        map.end()
    }
}
