//! Request augmentation
//!
//! Every backend call goes through `RequestAugmentor::send`, which
//! - routes the call to the domain's service,
//! - attaches the bearer token when the session has one,
//! - scopes the call to the tenant (query parameter for GET/DELETE, body
//!   field for POST/PUT/PATCH),
//! - wipes the session and redirects to login once on 401,
//! - logs 403 and hands it back like any other backend error.
//!
//! Calls are never retried.

use std::sync::Arc;

use learnportal_core::session_store::ACCESS_TOKEN_KEY;
use learnportal_core::{
    BackendDomain, LoginNavigator, SessionStore, TenantContext, TenantContextResolver, TenantId,
};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error, info, instrument, warn};

use crate::client::{HttpClientConfig, create_client};
use crate::router::EndpointMap;
use crate::{EgressError, Result};

/// Query/body field carrying the tenant id.
pub const TENANT_ID_FIELD: &str = "tenantId";

/// Description of one backend call, before tenant scoping.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    method: Method,
    domain: BackendDomain,
    segments: Vec<String>,
    query: Vec<(String, String)>,
    body: Option<Value>,
}

impl ApiRequest {
    pub fn new<I, S>(method: Method, domain: BackendDomain, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            domain,
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get<I, S>(domain: BackendDomain, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::GET, domain, segments)
    }

    pub fn post<I, S>(domain: BackendDomain, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::POST, domain, segments)
    }

    pub fn put<I, S>(domain: BackendDomain, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::PUT, domain, segments)
    }

    pub fn delete<I, S>(domain: BackendDomain, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::DELETE, domain, segments)
    }

    /// Append a query parameter. Order is preserved.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Append a query parameter only when a value is present.
    pub fn query_opt<V: Into<String>>(self, name: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.query(name, value),
            None => self,
        }
    }

    /// Set the JSON body. Must be an object (or null) when sent.
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize `body` as the JSON body.
    pub fn json<T: Serialize + ?Sized>(self, body: &T) -> Result<Self> {
        Ok(self.body(serde_json::to_value(body)?))
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn domain(&self) -> BackendDomain {
        self.domain
    }

    /// Path below the domain's base URL, unencoded.
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }

    fn carries_body(&self) -> bool {
        self.method == Method::POST || self.method == Method::PUT || self.method == Method::PATCH
    }
}

/// Wraps the HTTP client with identity, tenant scoping and error interception.
pub struct RequestAugmentor {
    client: Client,
    endpoints: EndpointMap,
    resolver: TenantContextResolver,
    navigator: Arc<dyn LoginNavigator>,
    login_url: String,
    timeout_secs: u64,
}

impl RequestAugmentor {
    pub fn new(
        endpoints: EndpointMap,
        http: &HttpClientConfig,
        login_url: impl Into<String>,
        store: Arc<dyn SessionStore>,
        navigator: Arc<dyn LoginNavigator>,
    ) -> Result<Self> {
        endpoints.validate()?;
        let client = create_client(http)?;

        Ok(Self {
            client,
            endpoints,
            resolver: TenantContextResolver::new(store),
            navigator,
            login_url: login_url.into(),
            timeout_secs: http.timeout_secs,
        })
    }

    pub fn endpoints(&self) -> &EndpointMap {
        &self.endpoints
    }

    pub fn login_url(&self) -> &str {
        &self.login_url
    }

    pub fn resolver(&self) -> &TenantContextResolver {
        &self.resolver
    }

    pub fn session_store(&self) -> &Arc<dyn SessionStore> {
        self.resolver.store()
    }

    /// Tenant context for the current session, derived on first use.
    pub fn tenant_context(&self) -> Result<Arc<TenantContext>> {
        Ok(self.resolver.get()?)
    }

    /// Wipe the session and drop the cached tenant context.
    pub fn end_session(&self) -> Result<()> {
        self.resolver.clear_session()?;
        info!("Session cleared");
        Ok(())
    }

    /// Dispatch one call and decode the JSON response body.
    ///
    /// A 2xx with an empty body decodes to `Value::Null`.
    #[instrument(
        skip(self, request),
        fields(method = %request.method, domain = %request.domain, path = %request.path())
    )]
    pub async fn send(&self, request: ApiRequest) -> Result<Value> {
        let context = self.tenant_context()?;
        let mut url = self
            .endpoints
            .url_for(request.domain, request.segments.as_slice())?;

        // Tenant scoping: body field for mutations, query parameter otherwise
        let body = if request.carries_body() {
            Some(merge_tenant_id(request.body, &context.tenant_id)?)
        } else {
            url.set_query(Some(&encode_query(&context.tenant_id, &request.query)?));
            None
        };

        let mut builder = self
            .client
            .request(request.method.clone(), url.clone())
            .header(CONTENT_TYPE, "application/json");
        if let Some(ref body) = body {
            builder = builder.json(body);
        }

        if let Some(token) = self.session_store().get_non_empty(ACCESS_TOKEN_KEY) {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        debug!(url = %url, "Dispatching backend request");

        let response = builder.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        debug!(status = %status, "Backend responded");

        if status == StatusCode::UNAUTHORIZED {
            self.expire_session(&context);
            return Err(EgressError::SessionExpired {
                login_url: self.login_url.clone(),
            });
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());

            if status == StatusCode::FORBIDDEN {
                warn!(
                    tenant_id = %context.tenant_id,
                    "Access forbidden: tenant mismatch or insufficient permissions"
                );
            }

            return Err(EgressError::Backend {
                status_code: status.as_u16(),
                message,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&bytes)
            .map_err(|e| EgressError::Parse(format!("Invalid JSON from {}: {}", request.domain, e)))
    }

    /// 401 handling: wipe everything, then send the user to login.
    ///
    /// Only the first rejection of a session redirects; calls that were in
    /// flight with the same context find it already gone.
    fn expire_session(&self, context: &Arc<TenantContext>) {
        match self.resolver.expire(context) {
            Ok(true) => {}
            Ok(false) => {
                debug!("Session already ended by another call");
                return;
            }
            Err(e) => error!("Failed to clear session after 401: {}", e),
        }
        info!(login_url = %self.login_url, "Unauthorized, redirecting to login");
        self.navigator.redirect(&self.login_url);
    }

    fn transport_error(&self, e: reqwest::Error) -> EgressError {
        if e.is_timeout() {
            EgressError::Timeout(self.timeout_secs)
        } else {
            EgressError::Http(e)
        }
    }
}

impl std::fmt::Debug for RequestAugmentor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestAugmentor")
            .field("endpoints", &self.endpoints)
            .field("login_url", &self.login_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

/// Query string with `tenantId` first, followed by the call's parameters.
fn encode_query(tenant_id: &TenantId, params: &[(String, String)]) -> Result<String> {
    let mut pairs: Vec<(&str, &str)> = Vec::with_capacity(params.len() + 1);
    pairs.push((TENANT_ID_FIELD, tenant_id.as_str()));
    pairs.extend(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));

    serde_urlencoded::to_string(&pairs)
        .map_err(|e| EgressError::InvalidRequest(format!("Unencodable query: {}", e)))
}

/// Body object with `tenantId` set. The session's tenant always wins over a
/// caller-supplied field.
fn merge_tenant_id(body: Option<Value>, tenant_id: &TenantId) -> Result<Value> {
    let mut object = match body {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(object)) => object,
        Some(other) => {
            return Err(EgressError::InvalidRequest(format!(
                "Request body must be a JSON object, got {}",
                json_kind(&other)
            )));
        }
    };

    object.insert(
        TENANT_ID_FIELD.to_string(),
        Value::String(tenant_id.as_str().to_string()),
    );
    Ok(Value::Object(object))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
