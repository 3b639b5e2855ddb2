//! Fetch Cache and the snapshot fetcher built on it.

pub mod cache;
pub mod fetcher;

pub use cache::{FetchCache, FetchCacheStats, SharedFetch};
pub use fetcher::SnapshotFetcher;
