//! Client code for ephone-sw.
//!
//! This crate provides the network fetch capability the worker falls back to
//! on cache misses, plus URL helpers for resolving the static manifest.

pub mod fetch;

pub use fetch::{FetchConfig, Fetcher, HttpFetcher, UrlError, resolve, same_origin};
