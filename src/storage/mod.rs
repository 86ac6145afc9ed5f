pub mod cache;
pub mod models;
pub mod records;
pub mod store;

pub use models::{BanExpiry, BanRecord, CacheEntry, HistoryEntry, MediaKind, Stats, WarnEntry, WarnSource};
pub use records::{Domain, Table};
pub use store::{RecordStore, UserIdentity, MAX_ADMIN_LEVEL};
