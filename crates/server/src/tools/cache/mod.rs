//! Cache-related MCP tools.
//!
//! This module provides read-only inspection of the SQLite stores.

pub mod get;
pub mod list;

pub use get::{CacheGetParams, get_impl};
pub use list::list_impl;
