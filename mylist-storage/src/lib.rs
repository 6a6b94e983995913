//! MyList Storage - Membership Store, Cursors and Cache
//!
//! Defines the membership store abstraction with an in-memory implementation,
//! an in-memory content catalog, the pagination cursor codec and the advisory
//! cache layer. The Postgres implementations live in mylist-api.

pub mod cache;
pub mod catalog;
pub mod cursor;
pub mod store;

pub use cache::{
    CacheBackend, CacheKind, CacheObserver, CacheOutcome, CacheStats, InMemoryCacheBackend,
    ListCache, LmdbCacheBackend, LmdbCacheError, NoopObserver, PageCache, PageKey, VersionCache,
};
pub use catalog::{CatalogError, InMemoryCatalog};
pub use store::{InMemoryMembershipStore, MembershipStore, PageQuery};
