//! Service traits consumed by chat handlers, the web view and the CLI.
//!
//! Consumers only ever see these operations; bucket and key layout stay
//! private to the redb-backed implementations.

use crate::error::StoreResult;
use crate::model::{Factoid, ResponseRecord};

/// Factoids and their embedded responses, indexed by trigger.
pub trait FactoidService {
    /// Point lookup by id.
    fn get_by_id(&self, id: u64) -> StoreResult<Option<Factoid>>;

    /// Lookup by trigger; the trigger is cleaned first.
    fn get_by_trigger(&self, trigger: &str) -> StoreResult<Option<Factoid>>;

    /// Up to `count` factoids (clamped) with id ≥ `from_id`, ascending.
    fn range(&self, from_id: u64, count: u64) -> StoreResult<Vec<Factoid>>;

    /// Store a new factoid and return its freshly allocated id.
    fn create(&self, factoid: Factoid) -> StoreResult<u64>;

    /// Insert or overwrite the factoid stored under `id`.
    fn put(&self, id: u64, factoid: Factoid) -> StoreResult<()>;

    /// Overwrite an existing factoid, identified by `factoid.id`.
    fn update(&self, factoid: Factoid) -> StoreResult<()>;

    /// Insert or overwrite the factoid owning `trigger`; returns its id.
    fn put_by_trigger(&self, trigger: &str, factoid: Factoid) -> StoreResult<u64>;

    /// Remove a factoid and its index entry; returns what was removed.
    fn delete(&self, id: u64) -> StoreResult<Factoid>;

    /// Add `response` to the factoid for `trigger`, creating it if needed.
    /// Returns the key the response was stored under.
    fn teach(&self, trigger: &str, response: &str) -> StoreResult<u64>;

    /// A uniformly random response for `trigger`, if any.
    fn random_response(&self, trigger: &str) -> StoreResult<Option<String>>;
}

/// Standalone responses foreign-keyed to factoid ids.
pub trait ResponseService {
    fn get(&self, id: u64) -> StoreResult<Option<ResponseRecord>>;

    /// Store a new record and return its freshly allocated id.
    fn create(&self, record: ResponseRecord) -> StoreResult<u64>;

    /// Overwrite (or insert) the record stored under `id`.
    fn put(&self, id: u64, record: ResponseRecord) -> StoreResult<()>;

    /// Remove a record; returns whether one existed.
    fn delete(&self, id: u64) -> StoreResult<bool>;

    fn exist(&self, id: u64) -> StoreResult<bool>;

    /// Remove every record for `factoid_id`; returns how many went.
    fn delete_for_factoid(&self, factoid_id: u64) -> StoreResult<usize>;

    fn response_count(&self, factoid_id: u64) -> StoreResult<usize>;

    /// The `n`-th (0-based) record for `factoid_id` in key order.
    fn response_by_index(&self, factoid_id: u64, n: u64) -> StoreResult<ResponseRecord>;

    /// Records for `factoid_id` in key order, skipping `start`, at most `count`.
    fn response_range(
        &self,
        factoid_id: u64,
        start: u64,
        count: u64,
    ) -> StoreResult<Vec<ResponseRecord>>;
}
