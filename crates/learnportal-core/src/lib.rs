//! LearnPortal Core Types and Traits
//!
//! This crate provides the fundamental types shared by the LearnPortal client:
//! - Session store abstraction and the in-memory store
//! - Tenant context derivation and caching
//! - Backend domain enumeration
//! - Core error types

pub mod domain;
pub mod error;
pub mod navigator;
pub mod session_store;
pub mod tenant;

pub use domain::BackendDomain;
pub use error::{Error, Result};
pub use navigator::{LoginNavigator, TracingNavigator};
pub use session_store::{MemorySessionStore, SessionStore};
pub use tenant::{TenantContext, TenantContextResolver, TenantId};
