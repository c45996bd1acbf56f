//! Versioned store identifiers.
//!
//! Every deployment gets exactly two current stores, `static` and `dynamic`,
//! named `<prefix>-<role>-v<version>`. Any other store name is stale.

use std::fmt;

use ephone_core::AppConfig;
use ephone_core::config::CACHE_VERSION;
use serde::Serialize;

/// Logical role of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreRole {
    /// Bundled and same-origin assets.
    Static,
    /// Allowlisted cross-origin resources.
    Dynamic,
}

impl StoreRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreRole::Static => "static",
            StoreRole::Dynamic => "dynamic",
        }
    }
}

impl fmt::Display for StoreRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The current pair of store identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreNames {
    pub static_store: String,
    pub dynamic_store: String,
}

impl StoreNames {
    pub fn new(prefix: &str, version: &str) -> Self {
        Self {
            static_store: format!("{prefix}-{}-v{version}", StoreRole::Static),
            dynamic_store: format!("{prefix}-{}-v{version}", StoreRole::Dynamic),
        }
    }

    /// Names for the embedded deployment version.
    pub fn current() -> Self {
        Self::new("ephone", CACHE_VERSION)
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.cache_prefix, &config.cache_version)
    }

    pub fn for_role(&self, role: StoreRole) -> &str {
        match role {
            StoreRole::Static => &self.static_store,
            StoreRole::Dynamic => &self.dynamic_store,
        }
    }

    pub fn is_current(&self, name: &str) -> bool {
        name == self.static_store || name == self.dynamic_store
    }

    /// Names from `existing` that are not part of this pair, in input order.
    pub fn stale<'a>(&self, existing: &'a [String]) -> Vec<&'a str> {
        existing
            .iter()
            .map(String::as_str)
            .filter(|name| !self.is_current(name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_names() {
        let names = StoreNames::current();
        assert_eq!(names.static_store, "ephone-static-v1.0.0");
        assert_eq!(names.dynamic_store, "ephone-dynamic-v1.0.0");
    }

    #[test]
    fn test_same_version_same_names() {
        assert_eq!(StoreNames::new("ephone", "2.1.0"), StoreNames::new("ephone", "2.1.0"));
    }

    #[test]
    fn test_different_version_different_names() {
        let a = StoreNames::new("ephone", "1.0.0");
        let b = StoreNames::new("ephone", "1.0.1");
        assert_ne!(a.static_store, b.static_store);
        assert_ne!(a.dynamic_store, b.dynamic_store);
    }

    #[test]
    fn test_roles_never_collide() {
        let names = StoreNames::current();
        assert_ne!(names.for_role(StoreRole::Static), names.for_role(StoreRole::Dynamic));
    }

    #[test]
    fn test_from_config() {
        let config = AppConfig { cache_prefix: "chat".into(), cache_version: "3".into(), ..Default::default() };
        let names = StoreNames::from_config(&config);
        assert_eq!(names.static_store, "chat-static-v3");
    }

    #[test]
    fn test_stale_filters_current_pair() {
        let names = StoreNames::current();
        let existing = vec![
            "ephone-v1.0.0".to_string(),
            "ephone-static-v1.0.0".to_string(),
            "ephone-static-v0.9.0".to_string(),
            "ephone-dynamic-v1.0.0".to_string(),
        ];
        assert_eq!(names.stale(&existing), vec!["ephone-v1.0.0", "ephone-static-v0.9.0"]);
    }
}
