//! Factoid persistence: the primary bucket plus the trigger index.
//!
//! Each public operation runs in exactly one redb transaction. Write
//! operations touch the primary record and its index entry together, so
//! the two buckets can only ever be observed in agreement: every index
//! entry names a stored factoid carrying that trigger, and every stored
//! factoid has exactly one index entry.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::seq::IteratorRandom;
use redb::{ReadableTable, Table, WriteTransaction};
use tracing::{debug, info, instrument};

use crate::clock::Clock;
use crate::codec::{self, StoredFactoid};
use crate::db::{self, Database, FACTOIDS, TRIGGER_INDEX, TRIGGER_INDEX_BUCKET, btoi, itob};
use crate::error::{StoreError, StoreResult};
use crate::model::{Factoid, FactoidResponse};
use crate::service::FactoidService;
use crate::trigger::clean_trigger;

/// The maximum number of factoids [`FactoidService::range`] returns at once.
pub const MAX_FACTOID_FETCH: u64 = 100;

type FactoidTable<'txn> = Table<'txn, &'static [u8], &'static [u8]>;
type IndexTable<'txn> = Table<'txn, &'static str, &'static [u8]>;

/// redb-backed [`FactoidService`].
#[derive(Clone)]
pub struct FactoidStore {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl FactoidStore {
    /// Create a factoid store backed by `db`, stamping dates from `clock`.
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Persist the response-map upgrade for every record still stored in
    /// the legacy shape. Returns how many records were rewritten.
    ///
    /// Reads upgrade records in memory only; this is the bulk write that
    /// makes the upgrade permanent. `date_edited` is left untouched.
    #[instrument(skip(self))]
    pub fn rewrite_legacy(&self) -> StoreResult<usize> {
        let txn = self.db.begin_write()?;
        let rewritten = {
            let mut factoids = txn.open_table(FACTOIDS)?;

            let mut upgraded = Vec::new();
            for entry in factoids.iter()? {
                let (key, value) = entry?;
                let stored = codec::decode_stored_factoid(value.value())?;
                if stored.is_legacy() {
                    upgraded.push((key.value().to_vec(), stored.into_factoid()));
                }
            }

            for (key, factoid) in &upgraded {
                let buf = codec::encode_factoid(factoid)?;
                factoids.insert(key.as_slice(), buf.as_slice())?;
                debug!(factoid_id = factoid.id, "legacy record rewritten");
            }
            upgraded.len()
        };
        txn.commit()?;

        info!(rewritten, "legacy response migration persisted");
        Ok(rewritten)
    }

    /// Validate and clean the trigger carried by `factoid`.
    fn prepare(factoid: &mut Factoid) -> StoreResult<()> {
        factoid.trigger = require_trigger(&factoid.trigger)?;
        Ok(())
    }

    /// Allocate an id for `factoid` and write it with fresh timestamps.
    fn insert_new(
        txn: &WriteTransaction,
        factoids: &mut FactoidTable<'_>,
        index: &mut IndexTable<'_>,
        mut factoid: Factoid,
        now: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let id = db::next_sequence(txn, TRIGGER_INDEX_BUCKET)?;
        factoid.id = id;
        factoid.date_created = now;
        factoid.date_edited = now;
        write_record(factoids, index, &factoid)?;
        debug!(factoid_id = id, trigger = %factoid.trigger, "factoid created");
        Ok(id)
    }

    /// Write `factoid` under `factoid.id`, moving its index entry if the
    /// trigger changed. Fails with `Conflict` if the trigger belongs to a
    /// different factoid.
    fn upsert(
        txn: &WriteTransaction,
        factoids: &mut FactoidTable<'_>,
        index: &mut IndexTable<'_>,
        mut factoid: Factoid,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let id = factoid.id;
        if let Some(owner) = lookup_id(&*index, &factoid.trigger)?
            && owner != id
        {
            return Err(StoreError::Conflict {
                trigger: factoid.trigger,
                id: owner,
            });
        }

        match load(&*factoids, id)? {
            Some(previous) => {
                let previous = previous.into_factoid();
                factoid.date_created = previous.date_created;
                if previous.trigger != factoid.trigger {
                    index.remove(previous.trigger.as_str())?;
                    debug!(
                        factoid_id = id,
                        from = %previous.trigger,
                        to = %factoid.trigger,
                        "trigger renamed"
                    );
                }
            }
            None => factoid.date_created = now,
        }

        factoid.date_edited = now;
        db::bump_sequence(txn, TRIGGER_INDEX_BUCKET, id)?;
        write_record(factoids, index, &factoid)
    }
}

impl FactoidService for FactoidStore {
    #[instrument(skip(self))]
    fn get_by_id(&self, id: u64) -> StoreResult<Option<Factoid>> {
        let txn = self.db.begin_read()?;
        let factoids = txn.open_table(FACTOIDS)?;
        Ok(load(&factoids, id)?.map(StoredFactoid::into_factoid))
    }

    #[instrument(skip(self))]
    fn get_by_trigger(&self, trigger: &str) -> StoreResult<Option<Factoid>> {
        let trigger = clean_trigger(trigger);
        if trigger.is_empty() {
            return Ok(None);
        }

        let txn = self.db.begin_read()?;
        let index = txn.open_table(TRIGGER_INDEX)?;
        let Some(id) = lookup_id(&index, &trigger)? else {
            return Ok(None);
        };
        let factoids = txn.open_table(FACTOIDS)?;
        Ok(load(&factoids, id)?.map(StoredFactoid::into_factoid))
    }

    #[instrument(skip(self))]
    fn range(&self, from_id: u64, count: u64) -> StoreResult<Vec<Factoid>> {
        let count = count.min(MAX_FACTOID_FETCH) as usize;
        if count == 0 {
            return Ok(Vec::new());
        }

        let txn = self.db.begin_read()?;
        let factoids = txn.open_table(FACTOIDS)?;

        let start = itob(from_id);
        let mut out = Vec::with_capacity(count);
        for entry in factoids.range(start.as_slice()..)? {
            let (_, value) = entry?;
            out.push(codec::decode_factoid(value.value())?);
            if out.len() == count {
                break;
            }
        }
        Ok(out)
    }

    #[instrument(skip(self, factoid), fields(trigger = %factoid.trigger))]
    fn create(&self, mut factoid: Factoid) -> StoreResult<u64> {
        Self::prepare(&mut factoid)?;
        let now = self.clock.now();

        let txn = self.db.begin_write()?;
        let id = {
            let mut factoids = txn.open_table(FACTOIDS)?;
            let mut index = txn.open_table(TRIGGER_INDEX)?;

            if let Some(existing) = lookup_id(&index, &factoid.trigger)? {
                return Err(StoreError::AlreadyExists {
                    entity: "factoid",
                    key: factoid.trigger,
                    id: existing,
                });
            }
            Self::insert_new(&txn, &mut factoids, &mut index, factoid, now)?
        };
        txn.commit()?;
        Ok(id)
    }

    #[instrument(skip(self, factoid), fields(trigger = %factoid.trigger))]
    fn put(&self, id: u64, mut factoid: Factoid) -> StoreResult<()> {
        if id == 0 {
            return Err(StoreError::Validation("factoid id must not be 0".into()));
        }
        Self::prepare(&mut factoid)?;
        factoid.id = id;
        let now = self.clock.now();

        let txn = self.db.begin_write()?;
        {
            let mut factoids = txn.open_table(FACTOIDS)?;
            let mut index = txn.open_table(TRIGGER_INDEX)?;
            Self::upsert(&txn, &mut factoids, &mut index, factoid, now)?;
        }
        txn.commit()?;
        Ok(())
    }

    #[instrument(skip(self, factoid), fields(id = factoid.id, trigger = %factoid.trigger))]
    fn update(&self, mut factoid: Factoid) -> StoreResult<()> {
        Self::prepare(&mut factoid)?;
        let now = self.clock.now();

        let txn = self.db.begin_write()?;
        {
            let mut factoids = txn.open_table(FACTOIDS)?;
            let mut index = txn.open_table(TRIGGER_INDEX)?;
            if load(&factoids, factoid.id)?.is_none() {
                return Err(StoreError::not_found("factoid", factoid.id));
            }
            Self::upsert(&txn, &mut factoids, &mut index, factoid, now)?;
        }
        txn.commit()?;
        Ok(())
    }

    #[instrument(skip(self, factoid))]
    fn put_by_trigger(&self, trigger: &str, mut factoid: Factoid) -> StoreResult<u64> {
        factoid.trigger = require_trigger(trigger)?;
        let now = self.clock.now();

        let txn = self.db.begin_write()?;
        let id = {
            let mut factoids = txn.open_table(FACTOIDS)?;
            let mut index = txn.open_table(TRIGGER_INDEX)?;
            match lookup_id(&index, &factoid.trigger)? {
                Some(id) => {
                    factoid.id = id;
                    Self::upsert(&txn, &mut factoids, &mut index, factoid, now)?;
                    id
                }
                None => Self::insert_new(&txn, &mut factoids, &mut index, factoid, now)?,
            }
        };
        txn.commit()?;
        Ok(id)
    }

    #[instrument(skip(self))]
    fn delete(&self, id: u64) -> StoreResult<Factoid> {
        let txn = self.db.begin_write()?;
        let factoid = {
            let mut factoids = txn.open_table(FACTOIDS)?;
            let mut index = txn.open_table(TRIGGER_INDEX)?;

            let factoid = load(&factoids, id)?
                .ok_or_else(|| StoreError::not_found("factoid", id))?
                .into_factoid();
            index.remove(factoid.trigger.as_str())?;
            factoids.remove(itob(id).as_slice())?;
            factoid
        };
        txn.commit()?;

        debug!(factoid_id = id, trigger = %factoid.trigger, "factoid deleted");
        Ok(factoid)
    }

    #[instrument(skip(self, response))]
    fn teach(&self, trigger: &str, response: &str) -> StoreResult<u64> {
        let trigger = require_trigger(trigger)?;
        let response = response.trim();
        if response.is_empty() {
            return Err(StoreError::Validation("response must not be empty".into()));
        }
        let now = self.clock.now();

        let txn = self.db.begin_write()?;
        let key = {
            let mut factoids = txn.open_table(FACTOIDS)?;
            let mut index = txn.open_table(TRIGGER_INDEX)?;

            let existing = match lookup_id(&index, &trigger)? {
                Some(id) => load(&factoids, id)?.map(StoredFactoid::into_factoid),
                None => None,
            };
            let mut factoid = existing.unwrap_or_else(|| Factoid::new(trigger.as_str()));

            if let Some(key) = factoid.response_key(response) {
                return Err(StoreError::AlreadyExists {
                    entity: "response",
                    key: response.to_string(),
                    id: key,
                });
            }
            let key = factoid.next_response_key();
            factoid
                .responses
                .insert(key, FactoidResponse::new(response, now));

            if factoid.id == 0 {
                Self::insert_new(&txn, &mut factoids, &mut index, factoid, now)?;
            } else {
                factoid.date_edited = now;
                write_record(&mut factoids, &mut index, &factoid)?;
            }
            key
        };
        txn.commit()?;

        debug!(%trigger, response_key = key, "response learned");
        Ok(key)
    }

    #[instrument(skip(self))]
    fn random_response(&self, trigger: &str) -> StoreResult<Option<String>> {
        let Some(factoid) = self.get_by_trigger(trigger)? else {
            return Ok(None);
        };
        Ok(factoid
            .responses
            .into_values()
            .choose(&mut rand::thread_rng())
            .map(|r| r.response))
    }
}

// ── bucket helpers ───────────────────────────────────────────────────

/// Clean `trigger`, rejecting it if nothing is left.
fn require_trigger(trigger: &str) -> StoreResult<String> {
    let clean = clean_trigger(trigger);
    if clean.is_empty() {
        return Err(StoreError::Validation("trigger must not be empty".into()));
    }
    Ok(clean)
}

fn load<T>(factoids: &T, id: u64) -> StoreResult<Option<StoredFactoid>>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    match factoids.get(itob(id).as_slice())? {
        Some(bytes) => codec::decode_stored_factoid(bytes.value()).map(Some),
        None => Ok(None),
    }
}

fn lookup_id<T>(index: &T, trigger: &str) -> StoreResult<Option<u64>>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    match index.get(trigger)? {
        Some(id) => btoi(id.value()).map(Some),
        None => Ok(None),
    }
}

fn write_record(
    factoids: &mut FactoidTable<'_>,
    index: &mut IndexTable<'_>,
    factoid: &Factoid,
) -> StoreResult<()> {
    let key = itob(factoid.id);
    let buf = codec::encode_factoid(factoid)?;
    factoids.insert(key.as_slice(), buf.as_slice())?;
    index.insert(factoid.trigger.as_str(), key.as_slice())?;
    Ok(())
}

// ── tests ────────────────────────────────────────────────────────────
