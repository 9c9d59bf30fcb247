//! Standalone response records, foreign-keyed to factoid ids.
//!
//! There is no factoid→response index: the per-factoid queries below scan
//! the whole bucket in key (allocation) order. That is fine at chat-bot
//! scale; a bigger deployment would want a secondary index here.

use std::sync::Arc;

use redb::ReadableTable;
use tracing::{debug, instrument};

use crate::clock::Clock;
use crate::codec;
use crate::db::{self, Database, RESPONSE_BUCKET, RESPONSES, itob};
use crate::error::{StoreError, StoreResult};
use crate::model::ResponseRecord;
use crate::service::ResponseService;

/// redb-backed [`ResponseService`].
#[derive(Clone)]
pub struct ResponseStore {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl ResponseStore {
    /// Create a response store backed by `db`, stamping dates from `clock`.
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Decode every record for `factoid_id` in key order, handing each to
    /// `visit` until it returns `false`.
    fn scan<F>(&self, factoid_id: u64, mut visit: F) -> StoreResult<()>
    where
        F: FnMut(ResponseRecord) -> bool,
    {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(RESPONSES)?;
        for entry in table.iter()? {
            let (_, value) = entry?;
            let record = codec::decode_response(value.value())?;
            if record.factoid_id == factoid_id && !visit(record) {
                break;
            }
        }
        Ok(())
    }
}

fn require_factoid_id(record: &ResponseRecord) -> StoreResult<()> {
    if record.factoid_id == 0 {
        return Err(StoreError::Validation(
            "response record needs a factoid id".into(),
        ));
    }
    Ok(())
}

impl ResponseService for ResponseStore {
    #[instrument(skip(self))]
    fn get(&self, id: u64) -> StoreResult<Option<ResponseRecord>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(RESPONSES)?;
        let record = match table.get(itob(id).as_slice())? {
            Some(bytes) => Some(codec::decode_response(bytes.value())?),
            None => None,
        };
        Ok(record)
    }

    #[instrument(skip(self, record), fields(factoid_id = record.factoid_id))]
    fn create(&self, mut record: ResponseRecord) -> StoreResult<u64> {
        require_factoid_id(&record)?;
        let now = self.clock.now();

        let txn = self.db.begin_write()?;
        let id = db::next_sequence(&txn, RESPONSE_BUCKET)?;
        record.id = id;
        record.date_created = now;
        record.date_edited = now;
        {
            let mut table = txn.open_table(RESPONSES)?;
            let buf = codec::encode_response(&record)?;
            table.insert(itob(id).as_slice(), buf.as_slice())?;
        }
        txn.commit()?;

        debug!(response_id = id, "response record created");
        Ok(id)
    }

    #[instrument(skip(self, record), fields(factoid_id = record.factoid_id))]
    fn put(&self, id: u64, mut record: ResponseRecord) -> StoreResult<()> {
        if id == 0 {
            return Err(StoreError::Validation(
                "response record id must not be 0".into(),
            ));
        }
        require_factoid_id(&record)?;
        record.id = id;
        record.date_edited = self.clock.now();

        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(RESPONSES)?;
            let buf = codec::encode_response(&record)?;
            table.insert(itob(id).as_slice(), buf.as_slice())?;
        }
        db::bump_sequence(&txn, RESPONSE_BUCKET, id)?;
        txn.commit()?;
        Ok(())
    }

    #[instrument(skip(self))]
    fn delete(&self, id: u64) -> StoreResult<bool> {
        let txn = self.db.begin_write()?;
        let existed = {
            let mut table = txn.open_table(RESPONSES)?;
            let removed = table.remove(itob(id).as_slice())?.is_some();
            removed
        };
        txn.commit()?;
        Ok(existed)
    }

    fn exist(&self, id: u64) -> StoreResult<bool> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(RESPONSES)?;
        let exists = table.get(itob(id).as_slice())?.is_some();
        Ok(exists)
    }

    #[instrument(skip(self))]
    fn delete_for_factoid(&self, factoid_id: u64) -> StoreResult<usize> {
        let txn = self.db.begin_write()?;
        let deleted = {
            let mut table = txn.open_table(RESPONSES)?;

            let mut doomed = Vec::new();
            for entry in table.iter()? {
                let (key, value) = entry?;
                if codec::decode_response(value.value())?.factoid_id == factoid_id {
                    doomed.push(key.value().to_vec());
                }
            }
            for key in &doomed {
                table.remove(key.as_slice())?;
            }
            doomed.len()
        };
        txn.commit()?;

        debug!(factoid_id, deleted, "responses deleted for factoid");
        Ok(deleted)
    }

    fn response_count(&self, factoid_id: u64) -> StoreResult<usize> {
        let mut count = 0;
        self.scan(factoid_id, |_| {
            count += 1;
            true
        })?;
        Ok(count)
    }

    fn response_by_index(&self, factoid_id: u64, n: u64) -> StoreResult<ResponseRecord> {
        let mut seen = 0u64;
        let mut found = None;
        self.scan(factoid_id, |record| {
            if seen == n {
                found = Some(record);
                return false;
            }
            seen += 1;
            true
        })?;
        found.ok_or(StoreError::OutOfRange {
            index: n,
            count: seen,
        })
    }

    fn response_range(
        &self,
        factoid_id: u64,
        start: u64,
        count: u64,
    ) -> StoreResult<Vec<ResponseRecord>> {
        let mut out = Vec::new();
        if count == 0 {
            return Ok(out);
        }
        let mut skipped = 0u64;
        self.scan(factoid_id, |record| {
            if skipped < start {
                skipped += 1;
                return true;
            }
            out.push(record);
            (out.len() as u64) < count
        })?;
        Ok(out)
    }
}

// ── tests ────────────────────────────────────────────────────────────
