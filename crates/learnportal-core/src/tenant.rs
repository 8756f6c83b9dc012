//! Tenant types and context resolution
//!
//! The tenant context is derived once per session from the session store and
//! then shared by reference. It is only recomputed after the cache has been
//! invalidated, which happens whenever the session is wiped.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

use crate::session_store::{SessionStore, TENANT_REALM_KEY, USER_EMAIL_KEY};
use crate::{Error, Result};

/// Role assigned to every user until role claims are read from the token.
pub const DEFAULT_ROLE: &str = "USER";

/// Identifier of an isolated customer organization.
///
/// The tenant realm from the session is used verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Create a tenant ID, rejecting blank values
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::InvalidTenant("Tenant ID must not be empty".to_string()));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-readable organization name for known tenants.
    pub fn display_name(&self) -> &str {
        match self.0.as_str() {
            "techcorp" => "TechCorp Inc.",
            "acme" => "Acme Corporation",
            "globex" => "Globex Industries",
            "gograbjob-b2b" => "GoGrabJob Platform",
            other => other,
        }
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identity every outbound call is scoped by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantContext {
    pub tenant_id: TenantId,
    pub user_id: String,
    pub user_email: String,
    pub roles: BTreeSet<String>,
}

impl TenantContext {
    /// Derive a context from the session store.
    ///
    /// Fails with `Error::MissingSessionData` when the tenant realm or the
    /// user email is absent. Roles are not read from the token yet; every
    /// user gets `USER`.
    pub fn from_session(store: &dyn SessionStore) -> Result<Self> {
        let tenant_realm = store.get_non_empty(TENANT_REALM_KEY);
        let user_email = store.get_non_empty(USER_EMAIL_KEY);

        let (tenant_realm, user_email) = match (tenant_realm, user_email) {
            (Some(realm), Some(email)) => (realm, email),
            (None, _) => return Err(Error::MissingSessionData(TENANT_REALM_KEY.to_string())),
            (_, None) => return Err(Error::MissingSessionData(USER_EMAIL_KEY.to_string())),
        };

        Ok(Self {
            tenant_id: TenantId::new(tenant_realm)?,
            user_id: user_id_from_email(&user_email),
            user_email,
            roles: BTreeSet::from([DEFAULT_ROLE.to_string()]),
        })
    }

    pub fn display_name(&self) -> &str {
        self.tenant_id.display_name()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

/// Upper-cased local part of an email address.
fn user_id_from_email(email: &str) -> String {
    email
        .split_once('@')
        .map_or(email, |(local, _)| local)
        .to_uppercase()
}

/// Lazily derives and caches the tenant context for one session store.
///
/// Each client owns its own resolver, so isolated instances can run against
/// distinct session stores.
pub struct TenantContextResolver {
    store: Arc<dyn SessionStore>,
    cached: RwLock<Option<Arc<TenantContext>>>,
}

impl TenantContextResolver {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            cached: RwLock::new(None),
        }
    }

    /// The session store contexts are derived from.
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Derive a fresh context from the session and cache it.
    ///
    /// On failure any previously cached context is dropped.
    pub fn initialize(&self) -> Result<Arc<TenantContext>> {
        let mut cached = self.cached.write().unwrap_or_else(|e| e.into_inner());
        match TenantContext::from_session(self.store.as_ref()) {
            Ok(context) => {
                let context = Arc::new(context);
                debug!(
                    tenant_id = %context.tenant_id,
                    user_id = %context.user_id,
                    "Initialized tenant context"
                );
                *cached = Some(context.clone());
                Ok(context)
            }
            Err(e) => {
                *cached = None;
                Err(e)
            }
        }
    }

    /// Return the cached context, deriving it on first use.
    pub fn get(&self) -> Result<Arc<TenantContext>> {
        if let Some(context) = self.cached() {
            return Ok(context);
        }

        let mut cached = self.cached.write().unwrap_or_else(|e| e.into_inner());
        // Another caller may have won the race for the write lock
        if let Some(context) = cached.as_ref() {
            return Ok(context.clone());
        }

        let context = Arc::new(TenantContext::from_session(self.store.as_ref())?);
        debug!(tenant_id = %context.tenant_id, "Resolved tenant context");
        *cached = Some(context.clone());
        Ok(context)
    }

    /// Currently cached context, without deriving one.
    pub fn cached(&self) -> Option<Arc<TenantContext>> {
        self.cached
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Drop the cached context so the next `get` re-derives it.
    pub fn invalidate(&self) {
        let previous = self
            .cached
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(context) = previous {
            info!(tenant_id = %context.tenant_id, "Dropped cached tenant context");
        }
    }

    /// Drop the cached context and wipe the session store.
    pub fn clear_session(&self) -> Result<()> {
        let mut cached = self.cached.write().unwrap_or_else(|e| e.into_inner());
        *cached = None;
        self.store.clear()
    }

    /// End the session `context` was derived from.
    ///
    /// Returns `Ok(false)` without touching the store when that session has
    /// already ended, so concurrent callers rejected with the same context
    /// wipe it only once. The cache lock is held across the wipe, so no
    /// caller can re-derive the old identity in between.
    pub fn expire(&self, context: &Arc<TenantContext>) -> Result<bool> {
        let mut cached = self.cached.write().unwrap_or_else(|e| e.into_inner());
        match cached.as_ref() {
            Some(current) if Arc::ptr_eq(current, context) => {}
            _ => return Ok(false),
        }

        *cached = None;
        self.store.clear()?;
        info!(tenant_id = %context.tenant_id, "Session expired");
        Ok(true)
    }
}

impl fmt::Debug for TenantContextResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantContextResolver")
            .field("cached", &self.cached())
            .finish_non_exhaustive()
    }
}
