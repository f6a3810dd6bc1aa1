//! Server round trips: nonce, login and logout.
//!
//! Each [`Operation`] has a default path and method. A [`RouteConfig`] can
//! point it somewhere else, change its method, add headers, or replace the
//! HTTP call altogether with a [`CustomOperation`] that receives the same
//! payload. Without a configured host, HTTP-backed operations resolve to
//! nothing and sign-in proceeds on the client alone.

mod transport;
pub use transport::*;

use crate::{ClientSession, EnsResolveOptions, ServerConfig, ServerRoutes};
use async_trait::async_trait;
use keystone_common::{ConditionalSend, ConditionalSync};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{collections::BTreeMap, fmt, future::Future, sync::Arc};
use url::Url;

/// The server operations of the sign-in protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Fetch a nonce for the next sign-in message.
    Nonce,
    /// Submit a signed message.
    Login,
    /// End the server session.
    Logout,
}

impl Operation {
    /// Path used when no route is configured.
    pub fn default_path(&self) -> &'static str {
        match self {
            Self::Nonce => "/ssx-nonce",
            Self::Login => "/ssx-login",
            Self::Logout => "/ssx-logout",
        }
    }

    /// Method used when the route does not set one.
    pub fn default_method(&self) -> HttpMethod {
        match self {
            Self::Nonce => HttpMethod::Get,
            Self::Login | Self::Logout => HttpMethod::Post,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Nonce => "nonce",
            Self::Login => "login",
            Self::Logout => "logout",
        })
    }
}

/// Errors from resolving a route.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RouteError {
    /// The request never completed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// Response status.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The server answered with an empty nonce.
    #[error("server returned an empty nonce")]
    EmptyNonce,

    /// A route URL could not be built.
    #[error("invalid route URL: {0}")]
    InvalidUrl(String),

    /// A payload or response could not be (de)serialized.
    #[error("invalid payload: {0}")]
    Payload(String),

    /// A custom operation failed.
    #[error("custom operation failed: {0}")]
    Custom(String),
}

/// Replaces the HTTP call of an operation.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait CustomOperation: ConditionalSend + ConditionalSync {
    /// Handles `payload`, the body (or query) the HTTP call would have sent.
    async fn call(&self, payload: Value) -> Result<Value, RouteError>;
}

struct FnOperation<F>(F);

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl<F, Fut> CustomOperation for FnOperation<F>
where
    F: Fn(Value) -> Fut + ConditionalSend + ConditionalSync + 'static,
    Fut: Future<Output = Result<Value, RouteError>> + ConditionalSend + 'static,
{
    async fn call(&self, payload: Value) -> Result<Value, RouteError> {
        (self.0)(payload).await
    }
}

/// Wraps an async closure as a [`CustomOperation`].
pub fn custom_operation<F, Fut>(operation: F) -> Arc<dyn CustomOperation>
where
    F: Fn(Value) -> Fut + ConditionalSend + ConditionalSync + 'static,
    Fut: Future<Output = Result<Value, RouteError>> + ConditionalSend + 'static,
{
    Arc::new(FnOperation(operation))
}

/// Where an operation goes.
#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RouteConfig {
    /// A path (or absolute URL) sent with the default method.
    Path(String),
    /// A full description of the call.
    Descriptor(RouteDescriptor),
}

impl fmt::Debug for RouteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Descriptor(descriptor) => f.debug_tuple("Descriptor").field(descriptor).finish(),
        }
    }
}

impl From<&str> for RouteConfig {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

impl From<String> for RouteConfig {
    fn from(path: String) -> Self {
        Self::Path(path)
    }
}

impl From<RouteDescriptor> for RouteConfig {
    fn from(descriptor: RouteDescriptor) -> Self {
        Self::Descriptor(descriptor)
    }
}

/// A route with its method, headers or handler overridden.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDescriptor {
    /// Path or absolute URL. Defaults to the operation's path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Method. Defaults to the operation's method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<HttpMethod>,
    /// Extra request headers.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Handler replacing the HTTP call.
    #[serde(skip)]
    pub custom_operation: Option<Arc<dyn CustomOperation>>,
}

impl fmt::Debug for RouteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDescriptor")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("custom_operation", &self.custom_operation.is_some())
            .finish()
    }
}

impl RouteDescriptor {
    /// Sets the path or URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the method.
    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }

    /// Adds a header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Replaces the HTTP call with `operation`.
    pub fn with_custom_operation(mut self, operation: Arc<dyn CustomOperation>) -> Self {
        self.custom_operation = Some(operation);
        self
    }
}

/// How the server should resolve ENS records during login: `false`, or
/// the records to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerEnsRequest {
    /// Always `false`.
    Off(bool),
    /// Records to resolve on the server.
    Resolve(EnsResolveOptions),
}

impl Default for ServerEnsRequest {
    fn default() -> Self {
        Self::Off(false)
    }
}

/// Body of the login operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Signature over `siwe`.
    pub signature: String,
    /// The signed message.
    pub siwe: String,
    /// Address the session speaks for.
    pub address: String,
    /// Address of the signing wallet.
    pub wallet_address: String,
    /// Chain id.
    pub chain_id: u64,
    /// Set when signing on behalf of a delegator.
    pub dao_login: bool,
    /// Server-side ENS lookup.
    pub resolve_ens: ServerEnsRequest,
    /// Server-side Lens lookup.
    pub resolve_lens: bool,
}

enum Route {
    Custom(Arc<dyn CustomOperation>),
    Http {
        method: HttpMethod,
        url: Url,
        headers: Vec<(String, String)>,
    },
    Unavailable,
}

/// Turns [`Operation`]s into server calls.
#[derive(Clone)]
pub struct RouteResolver {
    host: Option<Url>,
    routes: ServerRoutes,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for RouteResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteResolver")
            .field("host", &self.host)
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}

impl RouteResolver {
    /// Creates a resolver for `server`, sending HTTP through `transport`.
    pub fn new(server: Option<&ServerConfig>, transport: Arc<dyn Transport>) -> Self {
        Self {
            host: server.map(|server| server.host.clone()),
            routes: server.map(|server| server.routes.clone()).unwrap_or_default(),
            transport,
        }
    }

    /// Creates a resolver for `server` over the default HTTP client.
    #[cfg(feature = "reqwest")]
    pub fn over_http(server: Option<&ServerConfig>) -> Self {
        let timeout = server.and_then(|server| server.timeout_seconds);
        Self::new(server, Arc::new(ReqwestTransport::new(timeout)))
    }

    /// Returns `true` when a server host is configured.
    pub fn has_host(&self) -> bool {
        self.host.is_some()
    }

    fn config(&self, operation: Operation) -> Option<&RouteConfig> {
        match operation {
            Operation::Nonce => self.routes.nonce.as_ref(),
            Operation::Login => self.routes.login.as_ref(),
            Operation::Logout => self.routes.logout.as_ref(),
        }
    }

    fn route(&self, operation: Operation) -> Result<Route, RouteError> {
        let (path, method, headers) = match self.config(operation) {
            Some(RouteConfig::Descriptor(descriptor)) => {
                if let Some(custom) = &descriptor.custom_operation {
                    return Ok(Route::Custom(custom.clone()));
                }
                (
                    descriptor.url.as_deref(),
                    descriptor.method,
                    descriptor
                        .headers
                        .iter()
                        .map(|(key, value)| (key.clone(), value.clone()))
                        .collect(),
                )
            }
            Some(RouteConfig::Path(path)) => (Some(path.as_str()), None, Vec::new()),
            None => (None, None, Vec::new()),
        };

        let Some(host) = &self.host else {
            return Ok(Route::Unavailable);
        };
        let path = path.unwrap_or(operation.default_path());
        let url = endpoint(host, path)?;

        Ok(Route::Http {
            method: method.unwrap_or(operation.default_method()),
            url,
            headers,
        })
    }

    /// Resolves `operation` with `payload`.
    ///
    /// Returns `Ok(None)` when there is neither a custom operation nor a
    /// host to call.
    #[tracing::instrument(level = "debug", skip(self, payload))]
    pub async fn resolve(
        &self,
        operation: Operation,
        payload: Value,
    ) -> Result<Option<Value>, RouteError> {
        match self.route(operation)? {
            Route::Custom(custom) => custom.call(payload).await.map(Some),
            Route::Http {
                method,
                url,
                headers,
            } => self.send(method, url, headers, payload).await.map(Some),
            Route::Unavailable => Ok(None),
        }
    }

    async fn send(
        &self,
        method: HttpMethod,
        mut url: Url,
        headers: Vec<(String, String)>,
        payload: Value,
    ) -> Result<Value, RouteError> {
        let body = if method == HttpMethod::Get {
            if let Some(params) = payload.as_object().filter(|params| !params.is_empty()) {
                let mut query = url.query_pairs_mut();
                for (key, value) in params {
                    match value {
                        Value::Null => {}
                        Value::String(text) => {
                            query.append_pair(key, text);
                        }
                        other => {
                            query.append_pair(key, &other.to_string());
                        }
                    }
                }
            }
            None
        } else {
            Some(payload)
        };

        let response = self
            .transport
            .send(HttpRequest {
                method,
                url,
                headers,
                body,
            })
            .await?;

        if !response.is_success() {
            return Err(RouteError::Status {
                status: response.status,
                body: response.body,
            });
        }

        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&response.body).unwrap_or(Value::String(response.body)))
    }

    /// Asks the server for a nonce.
    ///
    /// A custom operation may decline by returning `null` or an empty
    /// string. An HTTP server must answer with a nonce.
    pub async fn nonce(&self, params: &impl Serialize) -> Result<Option<String>, RouteError> {
        let payload = to_payload(params)?;
        let custom = matches!(self.route(Operation::Nonce)?, Route::Custom(_));

        let nonce = match self.resolve(Operation::Nonce, payload).await? {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => Some(text),
            Some(other) => Some(other.to_string()),
        }
        .filter(|nonce| !nonce.is_empty());

        match nonce {
            None if self.has_host() && !custom => Err(RouteError::EmptyNonce),
            nonce => Ok(nonce),
        }
    }

    /// Submits a signed message and returns the session fields the server
    /// answered with, or `None` when there is nothing to submit to.
    pub async fn login(
        &self,
        request: &LoginRequest,
    ) -> Result<Option<Map<String, Value>>, RouteError> {
        let payload = to_payload(request)?;
        Ok(self
            .resolve(Operation::Login, payload)
            .await?
            .map(|response| match response {
                Value::Object(fields) => fields,
                _ => Map::new(),
            }))
    }

    /// Ends the server session.
    pub async fn logout(&self, session: &ClientSession) -> Result<(), RouteError> {
        let payload = to_payload(session)?;
        self.resolve(Operation::Logout, payload).await?;
        Ok(())
    }
}

fn to_payload(value: &impl Serialize) -> Result<Value, RouteError> {
    serde_json::to_value(value).map_err(|e| RouteError::Payload(e.to_string()))
}

/// Resolves `path` under `host`. Absolute `http(s)` URLs replace the host,
/// anything else is appended to the host path.
fn endpoint(host: &Url, path: &str) -> Result<Url, RouteError> {
    let invalid = |e: url::ParseError| RouteError::InvalidUrl(format!("{path}: {e}"));
    if path.starts_with("http://") || path.starts_with("https://") {
        return Url::parse(path).map_err(invalid);
    }

    let mut base = host.clone();
    if !base.path().ends_with('/') {
        let directory = format!("{}/", base.path());
        base.set_path(&directory);
    }
    base.join(path.trim_start_matches('/')).map_err(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Mutex;
    use testresult::TestResult;

    #[derive(Default)]
    struct Recorder {
        requests: Mutex<Vec<HttpRequest>>,
        status: u16,
        body: String,
    }

    impl Recorder {
        fn answering(status: u16, body: &str) -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::default(),
                status,
                body: body.to_string(),
            })
        }

        fn last(&self) -> HttpRequest {
            self.requests
                .lock()
                .unwrap()
                .last()
                .cloned()
                .expect("no request sent")
        }
    }

    #[async_trait]
    impl Transport for Recorder {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.requests.lock().unwrap().push(request);
            Ok(HttpResponse {
                status: self.status,
                body: self.body.clone(),
            })
        }
    }

    fn server(routes: ServerRoutes) -> ServerConfig {
        ServerConfig::new(Url::parse("https://api.example.com").expect("valid url"))
            .with_routes(routes)
    }

    #[tokio::test]
    async fn it_uses_default_paths_and_methods() -> TestResult {
        let transport = Recorder::answering(200, "abc123");
        let resolver = RouteResolver::new(Some(&server(ServerRoutes::default())), transport.clone());

        let nonce = resolver.nonce(&json!({ "address": "0xabc", "chainId": 1 })).await?;
        assert_eq!(nonce.as_deref(), Some("abc123"));

        let request = transport.last();
        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(request.url.path(), "/ssx-nonce");
        assert_eq!(request.url.query(), Some("address=0xabc&chainId=1"));
        assert_eq!(request.body, None);
        Ok(())
    }

    #[tokio::test]
    async fn it_honours_route_overrides() -> TestResult {
        let transport = Recorder::answering(200, r#"{"expiresAt":"soon"}"#);
        let routes = ServerRoutes::default().with_login(
            RouteDescriptor::default()
                .with_url("/auth/login")
                .with_method(HttpMethod::Put)
                .with_header("x-api-key", "secret"),
        );
        let resolver = RouteResolver::new(Some(&server(routes)), transport.clone());

        let fields = resolver.resolve(Operation::Login, json!({ "siwe": "m" })).await?;
        assert_eq!(fields, Some(json!({ "expiresAt": "soon" })));

        let request = transport.last();
        assert_eq!(request.method, HttpMethod::Put);
        assert_eq!(request.url.as_str(), "https://api.example.com/auth/login");
        assert_eq!(
            request.headers,
            vec![("x-api-key".to_string(), "secret".to_string())]
        );
        assert_eq!(request.body, Some(json!({ "siwe": "m" })));
        Ok(())
    }

    #[tokio::test]
    async fn it_keeps_the_host_path_prefix() -> TestResult {
        let transport = Recorder::answering(200, "{}");
        let routes = ServerRoutes::default()
            .with_logout(RouteDescriptor::default().with_url("https://auth.example.com/bye"));
        let server = ServerConfig::new(Url::parse("https://api.example.com/v1")?).with_routes(routes);
        let resolver = RouteResolver::new(Some(&server), transport.clone());

        resolver.resolve(Operation::Login, json!({})).await?;
        assert_eq!(
            transport.last().url.as_str(),
            "https://api.example.com/v1/ssx-login"
        );

        resolver.resolve(Operation::Logout, json!({})).await?;
        assert_eq!(transport.last().url.as_str(), "https://auth.example.com/bye");
        Ok(())
    }

    #[tokio::test]
    async fn it_hands_custom_operations_the_same_payload() -> TestResult {
        let transport = Recorder::answering(200, "");
        let seen = Arc::new(Mutex::new(None));
        let captured = seen.clone();
        let routes = ServerRoutes::default().with_logout(
            RouteDescriptor::default().with_custom_operation(custom_operation(move |payload| {
                let captured = captured.clone();
                async move {
                    *captured.lock().unwrap() = Some(payload);
                    Ok(Value::Null)
                }
            })),
        );
        let resolver = RouteResolver::new(Some(&server(routes)), transport.clone());

        resolver.resolve(Operation::Logout, json!({ "address": "0xabc" })).await?;

        assert_eq!(*seen.lock().unwrap(), Some(json!({ "address": "0xabc" })));
        assert!(transport.requests.lock().unwrap().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn it_resolves_nothing_without_a_host() -> TestResult {
        let transport = Recorder::answering(200, "abc123");
        let resolver = RouteResolver::new(None, transport.clone());

        assert!(!resolver.has_host());
        assert_eq!(resolver.nonce(&json!({})).await?, None);
        assert_eq!(resolver.resolve(Operation::Login, json!({})).await?, None);
        assert!(transport.requests.lock().unwrap().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn it_prefers_custom_operations_over_http() -> TestResult {
        let transport = Recorder::answering(500, "");
        let routes = ServerRoutes::default().with_nonce(
            RouteDescriptor::default()
                .with_url("/ignored")
                .with_custom_operation(custom_operation(|_| async { Ok(json!("custom")) })),
        );
        let resolver = RouteResolver::new(Some(&server(routes)), transport.clone());

        assert_eq!(resolver.nonce(&json!({})).await?.as_deref(), Some("custom"));
        assert!(transport.requests.lock().unwrap().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn it_lets_custom_nonce_operations_decline() -> TestResult {
        let routes = ServerRoutes::default().with_nonce(
            RouteDescriptor::default()
                .with_custom_operation(custom_operation(|_| async { Ok(Value::Null) })),
        );
        let resolver = RouteResolver::new(Some(&server(routes)), Recorder::answering(200, ""));

        assert_eq!(resolver.nonce(&json!({})).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn it_rejects_empty_server_nonces() {
        let resolver = RouteResolver::new(
            Some(&server(ServerRoutes::default())),
            Recorder::answering(200, "  "),
        );
        assert!(matches!(
            resolver.nonce(&json!({})).await,
            Err(RouteError::EmptyNonce)
        ));
    }

    #[tokio::test]
    async fn it_surfaces_error_statuses() {
        let resolver = RouteResolver::new(
            Some(&server(ServerRoutes::default())),
            Recorder::answering(401, "unauthorized"),
        );
        let result = resolver.resolve(Operation::Logout, json!({})).await;
        assert!(matches!(result, Err(RouteError::Status { status: 401, .. })));
    }

    #[test]
    fn it_reads_route_configs_from_json() -> TestResult {
        let routes: ServerRoutes = serde_json::from_value(json!({
            "nonce": "/n",
            "logout": { "method": "delete", "headers": { "a": "b" } }
        }))?;

        assert!(matches!(routes.nonce, Some(RouteConfig::Path(ref path)) if path == "/n"));
        let Some(RouteConfig::Descriptor(logout)) = routes.logout else {
            panic!("expected a descriptor");
        };
        assert_eq!(logout.method, Some(HttpMethod::Delete));
        assert_eq!(logout.headers.get("a").map(String::as_str), Some("b"));
        assert!(logout.custom_operation.is_none());
        Ok(())
    }
}
