//! Domain types stored by the factoid and response stores.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A trigger phrase plus the responses learned for it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Factoid {
    /// Assigned by the allocator at creation; never changes afterwards.
    pub id: u64,
    /// Clean trigger (see [`crate::clean_trigger`]); unique across factoids.
    pub trigger: String,
    /// Protected factoids are not meant to be edited by chat users.
    pub protected: bool,
    pub date_created: DateTime<Utc>,
    pub date_edited: DateTime<Utc>,
    /// Responses keyed by a per-factoid id assigned as `max + 1`.
    pub responses: BTreeMap<u64, FactoidResponse>,
}

impl Factoid {
    /// A fresh, unsaved factoid for `trigger` with no responses.
    pub fn new(trigger: impl Into<String>) -> Self {
        Self {
            trigger: trigger.into(),
            ..Self::default()
        }
    }

    /// Key the next added response will get: current max + 1.
    pub fn next_response_key(&self) -> u64 {
        self.responses.keys().next_back().map_or(1, |max| max + 1)
    }

    /// Whether a response with exactly this text is already present.
    pub fn response_key(&self, text: &str) -> Option<u64> {
        self.responses
            .iter()
            .find(|(_, r)| r.response == text)
            .map(|(k, _)| *k)
    }
}

/// A response embedded in a [`Factoid`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoidResponse {
    pub date_created: DateTime<Utc>,
    pub date_edited: DateTime<Utc>,
    pub response: String,
}

impl FactoidResponse {
    pub fn new(response: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            date_created: now,
            date_edited: now,
            response: response.into(),
        }
    }
}

/// A standalone response record, foreign-keyed to a factoid id.
///
/// The foreign key is not enforced by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub id: u64,
    pub factoid_id: u64,
    pub date_created: DateTime<Utc>,
    pub date_edited: DateTime<Utc>,
    pub response: String,
}

impl ResponseRecord {
    /// An unsaved record for `factoid_id`.
    pub fn new(factoid_id: u64, response: impl Into<String>) -> Self {
        Self {
            factoid_id,
            response: response.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_response_key_starts_at_one() {
        assert_eq!(Factoid::new("x").next_response_key(), 1);
    }

    #[test]
    fn next_response_key_follows_max_not_len() {
        let mut f = Factoid::new("x");
        f.responses.insert(2, FactoidResponse::default());
        f.responses.insert(7, FactoidResponse::default());
        assert_eq!(f.next_response_key(), 8);
    }

    #[test]
    fn response_key_finds_exact_text() {
        let mut f = Factoid::new("x");
        f.responses
            .insert(3, FactoidResponse::new("hi there", Utc::now()));
        assert_eq!(f.response_key("hi there"), Some(3));
        assert_eq!(f.response_key("Hi there"), None);
    }
}
