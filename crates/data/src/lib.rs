//! Data repository for portfolio content.
//!
//! All content lives in static JSON files under a configured data directory.
//! Files are treated as immutable for the lifetime of the process and are
//! re-read on every call, so the store is trivially safe under concurrent
//! reads and needs no locking or invalidation.

pub mod filters;
pub mod store;

pub use filters::{paginate, PageInfo, RecordFilters};
pub use store::{DataStore, SearchSection, Section};
