//! Core types and shared functionality for ephone-sw.
//!
//! This crate provides:
//! - Request/response model
//! - Named cache stores (SQLite and in-memory backends)
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;

pub use cache::{Cache, CacheDb, CacheStorage, CachedEntry, MemoryCacheStorage};
pub use config::{AppConfig, ConfigError, NotificationConfig};
pub use error::Error;
pub use http::{Destination, Request, Response};
