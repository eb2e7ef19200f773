//! Content-addressed purge result caching for sitepurge
//!
//! This crate provides the caching layer that lets repeated builds skip the
//! purge engine:
//! - Cache keys derived from the bytes of a page's dependency files
//! - A JSON store of purge results, one file per cache key
//! - Content-hashed renaming of purged stylesheets
//!
//! # Cache Key Computation
//!
//! A cache key is the first 8 hex digits of a SHA-256 over the concatenated
//! contents of every contributing file. Paths never enter the digest, so two
//! pages whose dependencies render from identical bytes share an entry.
//!
//! # Failure Model
//!
//! The store never fails a build. Unreadable entries are misses and failed
//! writes are logged and dropped.

mod error;
pub mod hash;
pub mod store;

// Re-export error types at crate root
pub use error::{Error, Result};

// Re-export main types
pub use hash::{CacheKey, CacheKeyBuilder, content_hash, derive_cache_key, hashed_css_path};
pub use store::{CacheEntry, DEFAULT_CACHE_SUBDIR, PurgeCache};
