//! Generic cache-entry MCP tools.
//!
//! This module provides tools for reading, writing and purging the
//! key/value side of the offline cache.

pub mod get;
pub mod purge;
pub mod put;

pub use get::{CacheGetParams, get_impl};
pub use purge::{CachePurgeParams, purge_impl};
pub use put::{CachePutParams, put_impl};
