//! Schema metadata: explorer tree, search and completions.
//!
//! - `queries` - rendered `EXA_ALL_*` lookups and record-browsing SQL
//! - `cache` - TTL + LRU cache of lookup rows, keyed by query text
//! - `explorer` - tree node and item types
//! - `service` - explorer and search dispatch over the cache
//! - `keywords` - static keyword completions

pub mod cache;
pub mod explorer;
pub mod keywords;
pub mod queries;
pub mod service;

pub use cache::{CacheStats, CachedRows, MetadataCache};
pub use explorer::{ExplorerItem, ExplorerNode, ItemKind, SearchKind, TableRef};
pub use keywords::{keyword_completions, CompletionItem};
pub use service::MetadataService;
