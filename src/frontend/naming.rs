//! Replica name resolution
//!
//! The front-end only knows logical replica names (`Points1`, `Points2`, ...).
//! A [`NameResolver`] turns each one into an [`Endpoint`] right before it is
//! contacted.

use crate::common::{Error, RegistryEntry, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Base URL of a replica's RPC surface, without trailing slash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint(String);

impl Endpoint {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        Self(url.trim_end_matches('/').to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A replica resolved for the duration of one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaHandle {
    pub name: String,
    pub endpoint: Endpoint,
}

pub trait NameResolver: Send + Sync {
    /// Fails with `NotFound` for unregistered names and `Resolution` when the
    /// registered address is unusable.
    fn lookup(&self, name: &str) -> Result<Endpoint>;
}

impl<T: NameResolver + ?Sized> NameResolver for Arc<T> {
    fn lookup(&self, name: &str) -> Result<Endpoint> {
        (**self).lookup(name)
    }
}

/// In-process registry filled from configuration or at runtime.
#[derive(Debug, Default)]
pub struct StaticResolver {
    entries: RwLock<HashMap<String, String>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: &[RegistryEntry]) -> Self {
        let resolver = Self::new();
        for entry in entries {
            resolver.register(&entry.name, &entry.url);
        }
        resolver
    }

    /// Register (or replace) a name
    pub fn register(&self, name: &str, url: &str) {
        self.entries
            .write()
            .insert(name.to_string(), url.to_string());
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.entries.write().remove(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl NameResolver for StaticResolver {
    fn lookup(&self, name: &str) -> Result<Endpoint> {
        let url = self
            .entries
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(name.to_string()))?;

        let parsed = reqwest::Url::parse(&url)
            .map_err(|e| Error::Resolution(format!("{} -> {}: {}", name, url, e)))?;
        if parsed.cannot_be_a_base() {
            return Err(Error::Resolution(format!(
                "{} -> {}: not a base URL",
                name, url
            )));
        }
        Ok(Endpoint::new(url))
    }
}
