//! redb database handle, bucket definitions, key encoding and sequences.
//!
//! The [`Database`] struct wraps a `redb::Database` behind an `Arc` so the
//! factoid and response stores can share one file handle. Every bucket the
//! stores touch is created when the database is opened, so later
//! transactions can assume the namespace exists.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use redb::backends::InMemoryBackend;
use redb::{DatabaseError, ReadTransaction, ReadableTable, TableDefinition, WriteTransaction};
use tracing::{debug, info, instrument, warn};

use crate::error::{StoreError, StoreResult};

// ── bucket identifiers ───────────────────────────────────────────────
//
// These names are the on-disk contract. Renaming one orphans the data
// already stored under it.

/// Primary factoid bucket: `itob(id)` → encoded factoid.
pub const FACTOID_BUCKET: &str = "Factoids";

/// Trigger index bucket: clean trigger → `itob(id)`.
pub const TRIGGER_INDEX_BUCKET: &str = "FactoidTriggerIndex";

/// Standalone response bucket: `itob(id)` → encoded response record.
pub const RESPONSE_BUCKET: &str = "FactoidResponse";

/// Per-bucket sequence counters: bucket name → last issued id.
pub const SEQUENCE_BUCKET: &str = "Sequences";

pub(crate) const FACTOIDS: TableDefinition<&[u8], &[u8]> = TableDefinition::new(FACTOID_BUCKET);
pub(crate) const TRIGGER_INDEX: TableDefinition<&str, &[u8]> =
    TableDefinition::new(TRIGGER_INDEX_BUCKET);
pub(crate) const RESPONSES: TableDefinition<&[u8], &[u8]> = TableDefinition::new(RESPONSE_BUCKET);
pub(crate) const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new(SEQUENCE_BUCKET);

/// How long [`Database::open`] waits for another handle to release the file.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(1);

const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(25);

/// Shared handle to the embedded key-value engine.
///
/// Cloning is cheap; all clones refer to the same open file. Read
/// transactions run concurrently against snapshots, write transactions are
/// serialised by redb.
#[derive(Clone)]
pub struct Database {
    db: Arc<redb::Database>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("path", &self.path).finish()
    }
}

impl Database {
    /// Open (or create) a database at `path` using [`DEFAULT_LOCK_TIMEOUT`].
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with_timeout(path, DEFAULT_LOCK_TIMEOUT)
    }

    /// Open (or create) a database at `path`, waiting up to `lock_timeout`
    /// for another handle to release its lock on the file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open_with_timeout(path: impl AsRef<Path>, lock_timeout: Duration) -> StoreResult<Self> {
        let path = path.as_ref();
        info!("opening database");

        let started = Instant::now();
        let db = loop {
            match redb::Database::create(path) {
                Ok(db) => break db,
                Err(DatabaseError::DatabaseAlreadyOpen) if started.elapsed() < lock_timeout => {
                    debug!("database file is locked, retrying");
                    thread::sleep(LOCK_RETRY_INTERVAL);
                }
                Err(DatabaseError::DatabaseAlreadyOpen) => {
                    warn!(timeout = ?lock_timeout, "gave up waiting for database lock");
                    return Err(StoreError::Unavailable(format!(
                        "timed out after {lock_timeout:?} waiting for lock on {}",
                        path.display()
                    )));
                }
                Err(e) => return Err(e.into()),
            }
        };

        let db = Self {
            db: Arc::new(db),
            path: Some(path.to_path_buf()),
        };
        db.ensure_buckets()?;
        Ok(db)
    }

    /// Create an in-memory database, for tests.
    pub fn open_in_memory() -> StoreResult<Self> {
        debug!("opening in-memory database");

        let db = redb::Database::builder().create_with_backend(InMemoryBackend::new())?;
        let db = Self {
            db: Arc::new(db),
            path: None,
        };
        db.ensure_buckets()?;
        Ok(db)
    }

    /// Path of the backing file, `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Begin a read-only snapshot transaction.
    pub(crate) fn begin_read(&self) -> StoreResult<ReadTransaction> {
        Ok(self.db.begin_read()?)
    }

    /// Begin the (single) write transaction. Dropping it without calling
    /// `commit` rolls every change back.
    pub(crate) fn begin_write(&self) -> StoreResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ── namespace ────────────────────────────────────────────────────

    /// Create every bucket the stores use, if absent. Idempotent.
    fn ensure_buckets(&self) -> StoreResult<()> {
        let txn = self.begin_write()?;
        txn.open_table(FACTOIDS)?;
        txn.open_table(TRIGGER_INDEX)?;
        txn.open_table(RESPONSES)?;
        txn.open_table(SEQUENCES)?;
        txn.commit()?;

        info!(
            buckets = ?[FACTOID_BUCKET, TRIGGER_INDEX_BUCKET, RESPONSE_BUCKET, SEQUENCE_BUCKET],
            "buckets ready"
        );
        Ok(())
    }
}

// ── sequences ────────────────────────────────────────────────────────

/// Issue the next id for `bucket` inside `txn`. The first id is 1.
pub(crate) fn next_sequence(txn: &WriteTransaction, bucket: &str) -> StoreResult<u64> {
    let mut table = txn.open_table(SEQUENCES)?;
    let current = table.get(bucket)?.map(|v| v.value()).unwrap_or(0);
    let next = current
        .checked_add(1)
        .ok_or_else(|| StoreError::Engine(format!("sequence for {bucket} exhausted")))?;
    table.insert(bucket, next)?;
    Ok(next)
}

/// Raise the counter for `bucket` to at least `id`, so an explicitly chosen
/// id is never handed out again by [`next_sequence`].
pub(crate) fn bump_sequence(txn: &WriteTransaction, bucket: &str, id: u64) -> StoreResult<()> {
    let mut table = txn.open_table(SEQUENCES)?;
    let current = table.get(bucket)?.map(|v| v.value()).unwrap_or(0);
    if id > current {
        table.insert(bucket, id)?;
    }
    Ok(())
}

// ── key encoding ─────────────────────────────────────────────────────

/// 8-byte big-endian representation of `v`; byte order equals numeric order.
pub fn itob(v: u64) -> [u8; 8] {
    v.to_be_bytes()
}

/// Inverse of [`itob`]. Anything but exactly 8 bytes is corrupt.
pub fn btoi(b: &[u8]) -> StoreResult<u64> {
    let bytes: [u8; 8] = b.try_into().map_err(|_| {
        StoreError::Serialization(format!("expected 8-byte id, got {} bytes", b.len()))
    })?;
    Ok(u64::from_be_bytes(bytes))
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn itob_is_big_endian() {
        let cases: [(u64, [u8; 8]); 5] = [
            (0, [0, 0, 0, 0, 0, 0, 0, 0]),
            (1, [0, 0, 0, 0, 0, 0, 0, 1]),
            (256, [0, 0, 0, 0, 0, 0, 1, 0]),
            (512, [0, 0, 0, 0, 0, 0, 2, 0]),
            (1023, [0, 0, 0, 0, 0, 0, 3, 0xff]),
        ];
        for (num, bytes) in cases {
            assert_eq!(itob(num), bytes, "itob({num})");
            assert_eq!(btoi(&bytes).unwrap(), num);
        }
    }

    #[test]
    fn itob_preserves_numeric_order() {
        assert!(itob(255) < itob(256));
        assert!(itob(9) < itob(10));
        assert!(itob(u64::MAX - 1) < itob(u64::MAX));
    }

    #[test]
    fn btoi_rejects_wrong_length() {
        assert!(matches!(btoi(&[1, 2, 3]), Err(StoreError::Serialization(_))));
    }

    #[test]
    fn open_in_memory_creates_buckets() {
        let db = Database::open_in_memory().unwrap();
        let txn = db.begin_read().unwrap();
        assert!(txn.open_table(FACTOIDS).is_ok());
        assert!(txn.open_table(TRIGGER_INDEX).is_ok());
        assert!(txn.open_table(RESPONSES).is_ok());
        assert!(txn.open_table(SEQUENCES).is_ok());
        assert!(db.path().is_none());
    }

    #[test]
    fn sequences_are_monotonic_per_bucket() {
        let db = Database::open_in_memory().unwrap();
        let txn = db.begin_write().unwrap();
        assert_eq!(next_sequence(&txn, "a").unwrap(), 1);
        assert_eq!(next_sequence(&txn, "a").unwrap(), 2);
        assert_eq!(next_sequence(&txn, "b").unwrap(), 1);
        txn.commit().unwrap();

        let txn = db.begin_write().unwrap();
        assert_eq!(next_sequence(&txn, "a").unwrap(), 3);
    }

    #[test]
    fn bump_sequence_never_lowers() {
        let db = Database::open_in_memory().unwrap();
        let txn = db.begin_write().unwrap();
        bump_sequence(&txn, "a", 10).unwrap();
        assert_eq!(next_sequence(&txn, "a").unwrap(), 11);
        bump_sequence(&txn, "a", 3).unwrap();
        assert_eq!(next_sequence(&txn, "a").unwrap(), 12);
    }

    #[test]
    fn dropped_write_transaction_rolls_back() {
        let db = Database::open_in_memory().unwrap();
        {
            let txn = db.begin_write().unwrap();
            next_sequence(&txn, "a").unwrap();
        }
        let txn = db.begin_write().unwrap();
        assert_eq!(next_sequence(&txn, "a").unwrap(), 1);
    }
}
