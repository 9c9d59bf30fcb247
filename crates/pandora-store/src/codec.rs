//! Record encoding and the legacy response migration.
//!
//! Every stored value is one schema tag byte followed by a `bincode`
//! payload. Factoids come in two shapes:
//!
//! | tag | shape     | responses                                        |
//! |-----|-----------|--------------------------------------------------|
//! | 1   | legacy    | id-keyed map **and** a deprecated ordered list   |
//! | 2   | canonical | id-keyed map only                                |
//!
//! The decoder accepts both and always hands back the canonical form; the
//! encoder only ever writes tag 2. Upgrading a legacy record happens in
//! memory during decode and becomes permanent on the next write.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{StoreError, StoreResult};
use crate::model::{Factoid, FactoidResponse, ResponseRecord};

const LEGACY_TAG: u8 = 1;
const CANONICAL_TAG: u8 = 2;

/// Factoid as written by older versions, with responses still in a list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct LegacyFactoid {
    pub id: u64,
    pub trigger: String,
    pub protected: bool,
    pub date_created: DateTime<Utc>,
    pub date_edited: DateTime<Utc>,
    pub responses: BTreeMap<u64, FactoidResponse>,
    pub deprecated_responses: Vec<FactoidResponse>,
}

/// A decoded factoid, tagged with the shape it was stored in.
#[derive(Debug, Clone)]
pub(crate) enum StoredFactoid {
    Legacy(LegacyFactoid),
    Canonical(Factoid),
}

impl StoredFactoid {
    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Legacy(_))
    }

    /// Normalise to the canonical shape, merging any legacy responses.
    pub fn into_factoid(self) -> Factoid {
        match self {
            Self::Canonical(f) => f,
            Self::Legacy(legacy) => {
                let mut responses = legacy.responses;
                let added = merge_legacy_responses(&mut responses, legacy.deprecated_responses);
                warn!(
                    factoid_id = legacy.id,
                    added, "upgraded legacy response list in memory"
                );
                Factoid {
                    id: legacy.id,
                    trigger: legacy.trigger,
                    protected: legacy.protected,
                    date_created: legacy.date_created,
                    date_edited: legacy.date_edited,
                    responses,
                }
            }
        }
    }
}

/// Merge a deprecated response list into the id-keyed map.
///
/// Texts already present (in the map, or earlier in the list) are dropped;
/// every new text is inserted at `current max + 1`. Returns how many
/// responses were added. Applying the same list twice adds nothing the
/// second time.
pub fn merge_legacy_responses(
    responses: &mut BTreeMap<u64, FactoidResponse>,
    legacy: Vec<FactoidResponse>,
) -> usize {
    let mut seen: HashSet<String> = responses.values().map(|r| r.response.clone()).collect();
    let mut highest = responses.keys().next_back().copied().unwrap_or(0);
    let mut added = 0;

    for r in legacy {
        if seen.insert(r.response.clone()) {
            highest += 1;
            responses.insert(highest, r);
            added += 1;
        }
    }
    added
}

// ── factoids ─────────────────────────────────────────────────────────

/// Encode a factoid in the canonical shape.
pub fn encode_factoid(factoid: &Factoid) -> StoreResult<Vec<u8>> {
    tagged(CANONICAL_TAG, factoid)
}

/// Decode factoid bytes of either shape into the canonical form.
pub fn decode_factoid(bytes: &[u8]) -> StoreResult<Factoid> {
    decode_stored_factoid(bytes).map(StoredFactoid::into_factoid)
}

pub(crate) fn decode_stored_factoid(bytes: &[u8]) -> StoreResult<StoredFactoid> {
    match split_tag(bytes)? {
        (LEGACY_TAG, payload) => Ok(StoredFactoid::Legacy(bincode::deserialize(payload)?)),
        (CANONICAL_TAG, payload) => Ok(StoredFactoid::Canonical(bincode::deserialize(payload)?)),
        (tag, _) => Err(unknown_tag(tag)),
    }
}

/// Write a record the way older versions did. Only tests need this.
#[cfg(test)]
pub(crate) fn encode_legacy_factoid(legacy: &LegacyFactoid) -> StoreResult<Vec<u8>> {
    tagged(LEGACY_TAG, legacy)
}

// ── standalone responses ─────────────────────────────────────────────

pub fn encode_response(record: &ResponseRecord) -> StoreResult<Vec<u8>> {
    tagged(CANONICAL_TAG, record)
}

pub fn decode_response(bytes: &[u8]) -> StoreResult<ResponseRecord> {
    match split_tag(bytes)? {
        (CANONICAL_TAG, payload) => Ok(bincode::deserialize(payload)?),
        (tag, _) => Err(unknown_tag(tag)),
    }
}

// ── helpers ──────────────────────────────────────────────────────────

fn tagged<T: Serialize>(tag: u8, value: &T) -> StoreResult<Vec<u8>> {
    let mut buf = vec![tag];
    bincode::serialize_into(&mut buf, value)?;
    Ok(buf)
}

fn split_tag(bytes: &[u8]) -> StoreResult<(u8, &[u8])> {
    bytes
        .split_first()
        .map(|(tag, payload)| (*tag, payload))
        .ok_or_else(|| StoreError::Serialization("empty record".into()))
}

fn unknown_tag(tag: u8) -> StoreError {
    StoreError::Serialization(format!("unknown schema tag {tag}"))
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn response(text: &str) -> FactoidResponse {
        FactoidResponse::new(text, at(1_000))
    }

    fn sample() -> Factoid {
        let mut f = Factoid::new("hello");
        f.id = 7;
        f.protected = true;
        f.date_created = at(946_684_800);
        f.date_edited = Utc.timestamp_opt(946_684_900, 123_456_789).unwrap();
        f.responses.insert(1, response("hi there"));
        f.responses.insert(4, response("hey"));
        f
    }

    fn legacy(map: &[(u64, &str)], list: &[&str]) -> LegacyFactoid {
        LegacyFactoid {
            id: 3,
            trigger: "old".into(),
            protected: false,
            date_created: at(10),
            date_edited: at(20),
            responses: map.iter().map(|(k, t)| (*k, response(t))).collect(),
            deprecated_responses: list.iter().map(|t| response(t)).collect(),
        }
    }

    fn texts(f: &Factoid) -> Vec<(u64, &str)> {
        f.responses
            .iter()
            .map(|(k, r)| (*k, r.response.as_str()))
            .collect()
    }

    #[test]
    fn canonical_round_trip_is_exact() {
        let f = sample();
        let bytes = encode_factoid(&f).unwrap();
        assert_eq!(bytes[0], CANONICAL_TAG);
        assert_eq!(decode_factoid(&bytes).unwrap(), f);
    }

    #[test]
    fn empty_factoid_round_trips() {
        let f = Factoid::default();
        assert_eq!(decode_factoid(&encode_factoid(&f).unwrap()).unwrap(), f);
    }

    #[test]
    fn legacy_list_is_merged_after_map() {
        let bytes = encode_legacy_factoid(&legacy(&[(1, "a"), (2, "b")], &["c", "a", "d"])).unwrap();
        let stored = decode_stored_factoid(&bytes).unwrap();
        assert!(stored.is_legacy());

        let f = stored.into_factoid();
        assert_eq!(texts(&f), vec![(1, "a"), (2, "b"), (3, "c"), (4, "d")]);
        assert_eq!(f.id, 3);
        assert_eq!(f.trigger, "old");
        assert_eq!(f.date_edited, at(20));
    }

    #[test]
    fn legacy_list_duplicates_within_list_are_dropped() {
        let f = decode_factoid(&encode_legacy_factoid(&legacy(&[], &["x", "x", "y"])).unwrap())
            .unwrap();
        assert_eq!(texts(&f), vec![(1, "x"), (2, "y")]);
    }

    #[test]
    fn legacy_ids_continue_after_sparse_max() {
        let f = decode_factoid(&encode_legacy_factoid(&legacy(&[(9, "a")], &["b"])).unwrap())
            .unwrap();
        assert_eq!(texts(&f), vec![(9, "a"), (10, "b")]);
    }

    #[test]
    fn migrating_twice_equals_migrating_once() {
        let list = vec![response("a"), response("b"), response("a")];
        let mut once = BTreeMap::from([(1, response("b"))]);
        merge_legacy_responses(&mut once, list.clone());

        let mut twice = once.clone();
        let added = merge_legacy_responses(&mut twice, list);
        assert_eq!(added, 0);
        assert_eq!(twice, once);
    }

    #[test]
    fn upgraded_record_reencodes_as_canonical() {
        let f = decode_factoid(&encode_legacy_factoid(&legacy(&[], &["z"])).unwrap()).unwrap();
        let bytes = encode_factoid(&f).unwrap();
        let stored = decode_stored_factoid(&bytes).unwrap();
        assert!(!stored.is_legacy());
        assert_eq!(stored.into_factoid(), f);
    }

    #[test]
    fn response_record_round_trip() {
        let r = ResponseRecord {
            id: 5,
            factoid_id: 2,
            date_created: at(1),
            date_edited: at(2),
            response: "Honk".into(),
        };
        assert_eq!(decode_response(&encode_response(&r).unwrap()).unwrap(), r);
    }

    #[test]
    fn corrupt_bytes_are_serialization_errors() {
        assert!(matches!(decode_factoid(&[]), Err(StoreError::Serialization(_))));
        assert!(matches!(decode_factoid(&[9, 0, 0]), Err(StoreError::Serialization(_))));
        assert!(matches!(
            decode_factoid(&[CANONICAL_TAG, 0xff]),
            Err(StoreError::Serialization(_))
        ));
        assert!(matches!(
            decode_response(&[LEGACY_TAG]),
            Err(StoreError::Serialization(_))
        ));
    }
}
