//! Response cache keyed by a digest of the request parameters.

mod key;
mod store;

pub use key::{ABSENT_FIELD, CacheKey, compute_key};
pub use store::{CacheConfig, CacheEntry, DEFAULT_MAX_ENTRIES, ResponseCache};
