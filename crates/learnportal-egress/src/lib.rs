//! LearnPortal Egress
//!
//! This crate talks to the learning platform's backend services:
//! - HTTP client construction
//! - Domain-to-service routing
//! - Request augmentation (bearer token, tenant id, 401/403 handling)
//! - Typed business operations (`LearningApi`)

pub mod augmentor;
pub mod client;
pub mod error;
pub mod facade;
pub mod requests;
pub mod router;

pub use augmentor::{ApiRequest, RequestAugmentor};
pub use client::HttpClientConfig;
pub use error::{EgressError, Result};
pub use facade::{LearningApi, LearningApiConfig, or_fallback};
pub use router::EndpointMap;
