//! Shared fixtures for the wiremock integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use learnportal_core::session_store::{ACCESS_TOKEN_KEY, TENANT_REALM_KEY, USER_EMAIL_KEY};
use learnportal_core::{LoginNavigator, MemorySessionStore};
use learnportal_egress::{EndpointMap, HttpClientConfig, LearningApi, LearningApiConfig};

pub const LOGIN_URL: &str = "http://localhost:3005/login";

/// Navigator that remembers every redirect it was asked to perform.
#[derive(Default)]
pub struct RecordingNavigator {
    redirects: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn redirects(&self) -> Vec<String> {
        self.redirects.lock().unwrap().clone()
    }
}

impl LoginNavigator for RecordingNavigator {
    fn redirect(&self, login_url: &str) {
        self.redirects.lock().unwrap().push(login_url.to_string());
    }
}

/// Session of jane.doe@corp.com in the acme tenant.
pub fn jane_session() -> Arc<MemorySessionStore> {
    Arc::new(MemorySessionStore::with_entries([
        (ACCESS_TOKEN_KEY, "t1"),
        (USER_EMAIL_KEY, "jane.doe@corp.com"),
        (TENANT_REALM_KEY, "acme"),
    ]))
}

pub struct Harness {
    pub api: LearningApi,
    pub store: Arc<MemorySessionStore>,
    pub navigator: Arc<RecordingNavigator>,
}

/// Client routing every domain to `base_url`.
pub fn harness(base_url: &str, store: Arc<MemorySessionStore>) -> Harness {
    harness_with(EndpointMap::uniform(base_url), HttpClientConfig::default(), store)
}

pub fn harness_with(
    endpoints: EndpointMap,
    client_config: HttpClientConfig,
    store: Arc<MemorySessionStore>,
) -> Harness {
    let navigator = Arc::new(RecordingNavigator::default());
    let config = LearningApiConfig::new(endpoints)
        .with_login_url(LOGIN_URL)
        .with_client_config(client_config);
    let api = LearningApi::with_navigator(config, store.clone(), navigator.clone()).unwrap();

    Harness {
        api,
        store,
        navigator,
    }
}
