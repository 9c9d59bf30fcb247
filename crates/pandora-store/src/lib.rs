//! # pandora-store
//!
//! Persistent factoid and response storage for the Pandora chat bot.
//!
//! Everything lives in a single embedded `redb` file. Records are keyed by
//! 8-byte big-endian ids so that key order and id order agree, and every
//! public operation runs in exactly one transaction.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  FactoidService / ResponseService (traits)   │
//! ├──────────────────────────────────────────────┤
//! │  FactoidStore        ResponseStore           │
//! │  (Factoids +         (FactoidResponse)       │
//! │   FactoidTriggerIndex)                       │
//! ├──────────────────────────────────────────────┤
//! │  codec (tag byte + bincode, legacy upgrade)  │
//! ├──────────────────────────────────────────────┤
//! │  Database (redb, Sequences allocator)        │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use pandora_store::{FactoidService, Store};
//!
//! # fn main() -> Result<(), pandora_store::StoreError> {
//! let store = Store::open("pandora.redb")?;
//! store.factoids().teach("Hello!", "hi there")?;
//! let reply = store.factoids().random_response("hello")?;
//! assert_eq!(reply.as_deref(), Some("hi there"));
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod codec;
pub mod db;
pub mod error;
pub mod factoid;
pub mod model;
pub mod response;
pub mod service;
pub mod store;
pub mod trigger;

// ── re-exports ───────────────────────────────────────────────────────

pub use clock::{Clock, FixedClock, SystemClock};
pub use codec::{
    decode_factoid, decode_response, encode_factoid, encode_response, merge_legacy_responses,
};
pub use db::{DEFAULT_LOCK_TIMEOUT, Database, btoi, itob};
pub use error::{StoreError, StoreResult};
pub use factoid::{FactoidStore, MAX_FACTOID_FETCH};
pub use model::{Factoid, FactoidResponse, ResponseRecord};
pub use response::ResponseStore;
pub use service::{FactoidService, ResponseService};
pub use store::Store;
pub use trigger::clean_trigger;
