//! One handle for the whole namespace.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::db::{DEFAULT_LOCK_TIMEOUT, Database};
use crate::error::StoreResult;
use crate::factoid::FactoidStore;
use crate::response::ResponseStore;

/// A [`Database`] together with the factoid and response stores that share
/// it. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    db: Database,
    factoids: FactoidStore,
    responses: ResponseStore,
}

impl Store {
    /// Open (or create) the database at `path` using the wall clock and the
    /// default lock timeout.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with(path, DEFAULT_LOCK_TIMEOUT, Arc::new(SystemClock))
    }

    pub fn open_with(
        path: impl AsRef<Path>,
        lock_timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> StoreResult<Self> {
        let db = Database::open_with_timeout(path, lock_timeout)?;
        Ok(Self::new(db, clock))
    }

    /// Wrap an already opened database.
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self {
            factoids: FactoidStore::new(db.clone(), Arc::clone(&clock)),
            responses: ResponseStore::new(db.clone(), clock),
            db,
        }
    }

    pub fn factoids(&self) -> &FactoidStore {
        &self.factoids
    }

    pub fn responses(&self) -> &ResponseStore {
        &self.responses
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Factoid, ResponseRecord};
    use crate::service::{FactoidService, ResponseService};

    #[test]
    fn stores_share_one_database() {
        let db = Database::open_in_memory().unwrap();
        let store = Store::new(db, Arc::new(SystemClock));

        let id = store.factoids().create(Factoid::new("hello")).unwrap();
        let rid = store
            .responses()
            .create(ResponseRecord::new(id, "hi there"))
            .unwrap();

        assert_eq!(id, 1);
        assert_eq!(rid, 1);
        assert_eq!(store.responses().response_count(id).unwrap(), 1);
        assert!(store.database().path().is_none());
    }
}
