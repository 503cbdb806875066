//! Champion Roster - client library
//!
//! Write-through local cache, the HTTP client for the sync gateway and the
//! optimistic roster that ties them together.

pub mod bulk;
pub mod error;
pub mod images;
pub mod local_cache;
pub mod roster;
pub mod storage;
pub mod sync;

pub use bulk::parse_bulk_names;
pub use error::{ClientError, ClientResult};
pub use images::image_data_uri_from_file;
pub use local_cache::{ClassSummary, LocalCache, COLLECTION_KEY};
pub use roster::{BulkOutcome, RefreshReport, SyncedRoster};
pub use storage::{CacheStorage, FileStorage, MemoryStorage};
pub use sync::{SyncClient, SyncConfig};
