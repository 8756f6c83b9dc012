//! Session store trait
//!
//! The `SessionStore` trait abstracts the flat, string-keyed session record
//! written by the external SSO redirect and read by the tenant resolver and
//! the request augmentor. The whole record is wiped on logout or when a
//! backend answers 401.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use crate::Result;

/// Opaque bearer token issued by the login service.
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Email address of the signed-in user.
pub const USER_EMAIL_KEY: &str = "userEmail";
/// Tenant realm, used verbatim as the tenant id.
pub const TENANT_REALM_KEY: &str = "tenantRealm";

/// Session store trait
///
/// Implementations:
/// - `MemorySessionStore`: process-local map (tests, embedding)
/// - `FileSessionStore`: JSON file on disk (`learnportal-session-file`)
pub trait SessionStore: Send + Sync {
    /// Read a value. Missing keys yield `None`.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a single key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Remove every key.
    fn clear(&self) -> Result<()>;

    /// Read a value, treating empty and whitespace-only strings as absent.
    fn get_non_empty(&self, key: &str) -> Option<String> {
        self.get(key).filter(|value| !value.trim().is_empty())
    }
}

/// In-memory session store
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with the given entries.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        Ok(())
    }
}

/// Capture the session handed over by the SSO redirect.
///
/// The login service sends the browser back with `token`, `email` and
/// `realm` query parameters. Each one present is written to its session key;
/// absent parameters leave the existing value alone. Returns `true` when all
/// three were present.
pub fn capture_login_redirect(store: &dyn SessionStore, redirect_url: &str) -> Result<bool> {
    let query = match redirect_url.split_once('?') {
        Some((_, rest)) => rest.split('#').next().unwrap_or_default(),
        None => return Ok(false),
    };

    let params: Vec<(String, String)> = serde_urlencoded::from_str(query)
        .map_err(|e| crate::Error::SessionStore(format!("Invalid redirect query: {}", e)))?;

    let mut captured = 0;
    for (param, key) in [
        ("token", ACCESS_TOKEN_KEY),
        ("email", USER_EMAIL_KEY),
        ("realm", TENANT_REALM_KEY),
    ] {
        if let Some((_, value)) = params.iter().find(|(name, v)| name == param && !v.is_empty()) {
            store.set(key, value)?;
            captured += 1;
        }
    }

    debug!(captured = captured, "Captured login redirect parameters");
    Ok(captured == 3)
}
