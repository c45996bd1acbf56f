//! Request classification.
//!
//! Decides, per request, whether the worker intercepts it and which store
//! serves it:
//!
//! | Request                              | Route                    |
//! |--------------------------------------|--------------------------|
//! | method other than GET                | `Passthrough`            |
//! | same origin as the app               | `Intercept(Static)`      |
//! | matches a dynamic allowlist pattern  | `Intercept(Dynamic)`     |
//! | anything else                        | `Passthrough`            |
//!
//! Same-origin is checked first, so a same-origin URL that also matches a
//! pattern still goes to the static store.

use ephone_client::same_origin;
use ephone_core::{AppConfig, Error, Request};
use regex::Regex;
use url::Url;

use crate::naming::StoreRole;

/// Where a request goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Not intercepted; the runtime performs the request normally.
    Passthrough,
    /// Served cache-first from the store with this role.
    Intercept(StoreRole),
}

impl Route {
    pub fn role(&self) -> Option<StoreRole> {
        match self {
            Route::Passthrough => None,
            Route::Intercept(role) => Some(*role),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Router {
    origin: Url,
    patterns: Vec<Regex>,
}

impl Router {
    /// Build from the app origin and the dynamic allowlist.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if any pattern fails to compile.
    pub fn new<S: AsRef<str>>(origin: Url, patterns: &[S]) -> Result<Self, Error> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p.as_ref())
                    .map_err(|e| Error::InvalidInput(format!("bad dynamic pattern {}: {}", p.as_ref(), e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { origin, patterns })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Self::new(origin, &config.dynamic_patterns)
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Whether the URL matches any dynamic allowlist pattern.
    pub fn is_allowlisted(&self, url: &Url) -> bool {
        self.patterns.iter().any(|p| p.is_match(url.as_str()))
    }

    pub fn route(&self, request: &Request) -> Route {
        if !request.is_get() {
            return Route::Passthrough;
        }

        if same_origin(&request.url, &self.origin) {
            Route::Intercept(StoreRole::Static)
        } else if self.is_allowlisted(&request.url) {
            Route::Intercept(StoreRole::Dynamic)
        } else {
            Route::Passthrough
        }
    }
}
