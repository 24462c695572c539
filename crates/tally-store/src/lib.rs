//! tally-store — the server-side metric aggregate.
//!
//! [`MetricStore`] keeps counters (accumulated) and gauges (replaced)
//! behind a single lock. [`PersistenceManager`] copies a [`Snapshot`] out
//! of the store and writes it to disk, either after every mutating request
//! (write-through) or on a timer, and always once more on shutdown.
//!
//! # Architecture
//!
//! ```text
//! MetricStore (Arc<RwLock<..>>, Clone)
//!   ├── update_counter() / update_gauge() ← HTTP handlers
//!   └── snapshot() → Snapshot {"Gauges": .., "Counters": ..}
//!
//! PersistenceManager
//!   ├── store()   → snapshot, release lock, write temp file, rename
//!   ├── restore() → read file, replace store contents
//!   └── run()     → periodic flush loop + final flush on shutdown
//! ```

pub mod error;
pub mod persistence;
pub mod snapshot;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use persistence::{PersistMode, PersistenceManager};
pub use snapshot::Snapshot;
pub use store::MetricStore;
