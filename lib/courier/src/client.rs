//! HTTP client implementation using hyper-util.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures_util::TryStreamExt;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, BodyStream, Empty, Full, StreamBody};
use hyper::body::Frame;
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use tower::Layer;
use tower::util::BoxCloneService;
use tower_service::Service;

use crate::middleware::LoggingLayer;
use crate::{
    Body, Error, Method, Request, RequestBuilder, Response, Result, StreamingBody,
    config::{ClientConfig, ClientConfigBuilder},
    connector::{default_tls_config, https_connector_with},
};

// ============================================================================
// Type-Erased Service for Middleware Composition
// ============================================================================

/// Type-erased service for middleware composition.
///
/// This type allows storing and composing arbitrary Tower layers without
/// exposing complex generic types to users.
pub type BoxedService = BoxCloneService<Request, Response, Error>;

/// Future type for Tower Service implementation.
pub type ServiceFuture = Pin<Box<dyn Future<Output = Result<Response>> + Send + 'static>>;

type LayerFn = Arc<dyn Fn(BoxedService) -> BoxedService + Send + Sync>;

/// Body type sent through hyper.
pub(crate) type HyperBody = UnsyncBoxBody<Bytes, std::io::Error>;

/// Thread-safe wrapper for `BoxedService`.
///
/// This wrapper uses a Mutex to make the service Sync, which is required
/// by the `HttpClient` trait.
#[derive(Clone)]
struct SyncService {
    inner: Arc<Mutex<BoxedService>>,
}

impl SyncService {
    fn new(service: BoxedService) -> Self {
        Self {
            inner: Arc::new(Mutex::new(service)),
        }
    }

    fn call(&self, request: Request) -> ServiceFuture {
        // Lock, clone the service, and release the lock immediately
        let mut service = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();

        Box::pin(async move { service.call(request).await })
    }
}

// ============================================================================
// Conversions between courier and hyper types
// ============================================================================

/// Build a hyper request from a courier request.
pub(crate) fn build_hyper_request(request: Request) -> Result<http::Request<HyperBody>> {
    let (method, url, headers, body) = request.into_parts();

    let mut builder = http::Request::builder()
        .method(http::Method::from(method))
        .uri(url.as_str());

    for (name, value) in &headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    builder
        .body(hyper_body(body))
        .map_err(|e| Error::invalid_request(e.to_string()))
}

pub(crate) fn hyper_body(body: Body) -> HyperBody {
    match body {
        Body::Empty => Empty::new().map_err(|never| match never {}).boxed_unsync(),
        Body::Bytes(bytes) => Full::new(bytes).map_err(|never| match never {}).boxed_unsync(),
        Body::Stream(stream) => StreamBody::new(stream.map_ok(Frame::data)).boxed_unsync(),
    }
}

/// Extract response headers as a `HashMap`.
pub(crate) fn extract_headers(headers: &http::HeaderMap) -> HashMap<String, String> {
    let mut extracted: HashMap<String, String> = HashMap::new();
    for (name, value) in headers {
        if let Ok(value) = value.to_str() {
            extracted
                .entry(name.to_string())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(value);
                })
                .or_insert_with(|| value.to_string());
        }
    }
    extracted
}

/// Wrap a hyper response into a courier response with an unread body.
pub(crate) fn into_response(response: http::Response<hyper::body::Incoming>) -> Response {
    let status = response.status().as_u16();
    let headers = extract_headers(response.headers());

    let body: StreamingBody = Box::pin(
        BodyStream::new(response.into_body())
            .map_ok(|frame| frame.into_data().unwrap_or_default())
            .map_err(|e| Error::connection(e.to_string())),
    );

    Response::new(status, headers, body)
}

// ============================================================================
// Raw Client (internal, used for direct hyper access)
// ============================================================================

/// Raw HTTP client using hyper-util (internal implementation).
#[derive(Clone)]
struct RawHyperClient {
    inner: Client<HttpsConnector<HttpConnector>, HyperBody>,
    timeout: Duration,
}

impl RawHyperClient {
    fn new(config: &ClientConfig, tls_config: rustls::ClientConfig, http1_only: bool) -> Self {
        let connector = https_connector_with(tls_config, http1_only, Some(config.connect_timeout));

        let inner = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_idle_per_host)
            .build(connector);

        Self {
            inner,
            timeout: config.timeout,
        }
    }

    async fn execute(&self, request: Request) -> Result<Response> {
        let hyper_request = build_hyper_request(request)?;

        let response = tokio::time::timeout(self.timeout, self.inner.request(hyper_request))
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(map_hyper_error)?;

        Ok(into_response(response))
    }
}

#[allow(clippy::needless_pass_by_value)]
fn map_hyper_error(err: hyper_util::client::legacy::Error) -> Error {
    let msg = format!("{err:?}");

    if err.is_connect() {
        return Error::connection(msg);
    }

    let lower = msg.to_lowercase();
    if lower.contains("ssl") || lower.contains("tls") || lower.contains("certificate") {
        return Error::tls(msg);
    }

    Error::connection(msg)
}

impl Service<Request> for RawHyperClient {
    type Response = Response;
    type Error = Error;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let client = self.clone();
        Box::pin(async move { client.execute(request).await })
    }
}

// ============================================================================
// Public Client
// ============================================================================

/// HTTP client using hyper-util with connection pooling, TLS, and middleware support.
///
/// The client is also the entry point of the fluent API: [`HyperClient::get`]
/// and friends return a [`RequestBuilder`] bound to this client.
///
/// # Example
///
/// ```ignore
/// use courier::HyperClient;
/// use std::time::Duration;
///
/// let client = HyperClient::builder()
///     .timeout(Duration::from_secs(10))
///     .with_logging()
///     .build();
///
/// let mut response = client.get("https://api.example.com/users").execute().await?;
/// ```
#[derive(Clone)]
pub struct HyperClient {
    service: SyncService,
    config: ClientConfig,
    layers: Arc<[LayerFn]>,
}

impl std::fmt::Debug for HyperClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperClient")
            .field("config", &self.config)
            .field("layers_count", &self.layers.len())
            .finish_non_exhaustive()
    }
}

impl HyperClient {
    /// Create a new client with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration (no middleware).
    #[must_use]
    pub fn with_config(config: ClientConfig) -> Self {
        Self::builder().config(config).build()
    }

    /// Create a new client builder.
    #[must_use]
    pub fn builder() -> HyperClientBuilder {
        HyperClientBuilder::default()
    }

    /// Get the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Same configuration and layers over a different base transport.
    pub(crate) fn with_transport(&self, base: BoxedService) -> Self {
        Self {
            service: SyncService::new(apply_layers(&self.layers, base)),
            config: self.config.clone(),
            layers: Arc::clone(&self.layers),
        }
    }

    /// Same configuration and layers over a transport using `tls_config`.
    pub(crate) fn with_tls(&self, tls_config: rustls::ClientConfig, http1_only: bool) -> Self {
        let raw = RawHyperClient::new(&self.config, tls_config, http1_only);
        self.with_transport(BoxCloneService::new(raw))
    }

    // ========================================================================
    // Fluent entry points
    // ========================================================================

    /// Start a request bound to this client.
    #[must_use]
    pub fn request(&self, method: Method, url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::with_client(self.clone(), method, url)
    }

    /// Start a GET request.
    #[must_use]
    pub fn get(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(Method::Get, url)
    }

    /// Start a POST request.
    #[must_use]
    pub fn post(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(Method::Post, url)
    }

    /// Start a PUT request.
    #[must_use]
    pub fn put(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(Method::Put, url)
    }

    /// Start a PATCH request.
    #[must_use]
    pub fn patch(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(Method::Patch, url)
    }

    /// Start a DELETE request.
    #[must_use]
    pub fn delete(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(Method::Delete, url)
    }
}

impl Default for HyperClient {
    fn default() -> Self {
        Self::new()
    }
}

impl courier_core::HttpClient for HyperClient {
    async fn execute(&self, request: Request) -> Result<Response> {
        self.service.call(request).await
    }
}

// ============================================================================
// Tower Service Implementation
// ============================================================================

impl Service<Request> for HyperClient {
    type Response = Response;
    type Error = Error;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        // SyncService is always ready (the underlying service is polled when called)
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        self.service.call(request)
    }
}

/// Builder for [`HyperClient`].
///
/// # Example
///
/// ```ignore
/// use courier::HyperClient;
/// use std::time::Duration;
///
/// let client = HyperClient::builder()
///     .timeout(Duration::from_secs(30))
///     .user_agent("my-app/1.0")
///     .with_logging()
///     .build();
/// ```
#[derive(Default)]
pub struct HyperClientBuilder {
    config: ClientConfigBuilder,
    tls_config: Option<rustls::ClientConfig>,
    http1_only: bool,
    transport: Option<BoxedService>,
    layers: Vec<LayerFn>,
}

impl std::fmt::Debug for HyperClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperClientBuilder")
            .field("config", &self.config)
            .field("http1_only", &self.http1_only)
            .field("custom_tls", &self.tls_config.is_some())
            .field("custom_transport", &self.transport.is_some())
            .field("layers_count", &self.layers.len())
            .finish()
    }
}

impl HyperClientBuilder {
    // ========================================================================
    // Core Configuration
    // ========================================================================

    /// Start from a complete configuration.
    ///
    /// Individual setters called afterwards take precedence.
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = ClientConfigBuilder::from(config);
        self
    }

    /// Set the request timeout (applied at the connection level, not middleware).
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.timeout(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.connect_timeout(timeout);
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.config = self.config.pool_idle_per_host(count);
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.pool_idle_timeout(timeout);
        self
    }

    /// Set the User-Agent injected into requests that do not set one.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config = self.config.user_agent(user_agent);
        self
    }

    /// Use a custom rustls configuration.
    #[must_use]
    pub fn tls_config(mut self, tls_config: rustls::ClientConfig) -> Self {
        self.tls_config = Some(tls_config);
        self
    }

    /// Only negotiate HTTP/1.1.
    #[must_use]
    pub fn http1_only(mut self) -> Self {
        self.http1_only = true;
        self
    }

    /// Replace the network transport with a custom service.
    ///
    /// Layers still wrap the custom service. Useful for test doubles.
    #[must_use]
    pub fn transport<S>(mut self, service: S) -> Self
    where
        S: Service<Request, Response = Response, Error = Error> + Clone + Send + 'static,
        S::Future: Send + 'static,
    {
        self.transport = Some(BoxCloneService::new(service));
        self
    }

    // ========================================================================
    // Generic Middleware API
    // ========================================================================

    /// Add a Tower layer to the client.
    ///
    /// Layers are applied in order: first added = outermost (processes requests first).
    #[must_use]
    pub fn layer<L>(mut self, layer: L) -> Self
    where
        L: Layer<BoxedService> + Send + Sync + 'static,
        L::Service: Service<Request, Response = Response, Error = Error> + Clone + Send + 'static,
        <L::Service as Service<Request>>::Future: Send + 'static,
    {
        self.layers.push(Arc::new(move |service| {
            BoxCloneService::new(layer.layer(service))
        }));
        self
    }

    /// Add request/response logging.
    #[must_use]
    pub fn with_logging(self) -> Self {
        self.layer(LoggingLayer::new())
    }

    /// Add debug-level logging (includes headers and more detail).
    #[must_use]
    pub fn with_debug_logging(self) -> Self {
        self.layer(LoggingLayer::debug())
    }

    // ========================================================================
    // Build
    // ========================================================================

    /// Build the client with all configured middleware.
    #[must_use]
    pub fn build(self) -> HyperClient {
        let config = self.config.build();

        let base = match self.transport {
            Some(transport) => transport,
            None => {
                let tls_config = self.tls_config.unwrap_or_else(default_tls_config);
                BoxCloneService::new(RawHyperClient::new(&config, tls_config, self.http1_only))
            }
        };

        let layers: Arc<[LayerFn]> = self.layers.into();
        HyperClient {
            service: SyncService::new(apply_layers(&layers, base)),
            config,
            layers,
        }
    }
}

/// First layer added ends up outermost.
fn apply_layers(layers: &[LayerFn], base: BoxedService) -> BoxedService {
    layers
        .iter()
        .rev()
        .fold(base, |service, layer_fn| layer_fn(service))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_default() {
        let client = HyperClient::new();
        assert_eq!(client.config().timeout, Duration::from_secs(30));
    }

    #[test]
    fn client_builder() {
        let client = HyperClient::builder()
            .timeout(Duration::from_secs(60))
            .pool_idle_per_host(16)
            .build();

        assert_eq!(client.config().timeout, Duration::from_secs(60));
        assert_eq!(client.config().pool_idle_per_host, 16);
    }

    #[test]
    fn builder_config_then_overrides() {
        let base = ClientConfig::builder()
            .timeout(Duration::from_secs(5))
            .user_agent("base/1.0")
            .build();
        let client = HyperClient::builder()
            .config(base)
            .connect_timeout(Duration::from_secs(2))
            .build();

        assert_eq!(client.config().timeout, Duration::from_secs(5));
        assert_eq!(client.config().connect_timeout, Duration::from_secs(2));
        assert_eq!(client.config().user_agent, "base/1.0");
    }

    #[test]
    fn derived_transport_keeps_config_and_layers() {
        let client = HyperClient::builder()
            .user_agent("derived/1.0")
            .with_logging()
            .build();
        let derived = client.with_tls(default_tls_config(), true);

        assert_eq!(derived.config().user_agent, "derived/1.0");
        assert_eq!(derived.layers.len(), 1);
    }

    #[test]
    fn merged_response_headers() {
        let mut headers = http::HeaderMap::new();
        headers.append("set-cookie", http::HeaderValue::from_static("a=1"));
        headers.append("set-cookie", http::HeaderValue::from_static("b=2"));

        let extracted = extract_headers(&headers);
        assert_eq!(extracted.get("set-cookie").map(String::as_str), Some("a=1, b=2"));
    }

    #[test]
    fn client_is_debug() {
        let client = HyperClient::new();
        let debug = format!("{client:?}");
        assert!(debug.contains("HyperClient"));
    }
}
