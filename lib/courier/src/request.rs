//! Fluent request builder.
//!
//! Configuration mistakes never interrupt the chain: they are recorded and
//! reported together by [`RequestBuilder::validate`], which
//! [`RequestBuilder::execute`] runs first.
//!
//! ```ignore
//! use std::collections::HashMap;
//!
//! let mut response = courier::post("https://api.example.com/users")
//!     .with_header("X-Request-Id", 42)
//!     .with_query_param("notify", true)
//!     .with_json_body(&HashMap::from([("name", "Alice")]))
//!     .execute()
//!     .await?;
//!
//! let created: serde_json::Value = response.json().await?;
//! ```

use std::collections::HashMap;

use bytes::Bytes;
use courier_core::{
    Body, ContentType, Error, ErrorList, HttpClient, Method, Multipart, MultipartField, ParamValue,
    Params, Request, Response, Result, ToHeaderValue, ToParams, to_form, to_json, to_xml,
};
use tokio::io::AsyncRead;
use tracing::debug;
use url::Url;

use crate::HyperClient;
use crate::auth::{AuthTarget, Authorization};

const CONTENT_TYPE: &str = "Content-Type";
const USER_AGENT: &str = "User-Agent";

/// Set `name`, replacing any entry whose key matches case-insensitively.
/// Reject names that are not HTTP tokens and values with control characters.
pub(crate) fn check_header(name: &str, value: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_header("header key cannot be empty"));
    }
    if value.is_empty() {
        return Err(Error::invalid_header(format!(
            "header value for '{name}' cannot be empty"
        )));
    }
    if http::HeaderName::from_bytes(name.as_bytes()).is_err() {
        return Err(Error::invalid_header(format!("invalid header name '{name}'")));
    }
    if http::HeaderValue::from_str(value).is_err() {
        return Err(Error::invalid_header(format!("invalid header value for '{name}'")));
    }
    Ok(())
}

pub(crate) fn set_header(headers: &mut HashMap<String, String>, name: String, value: String) {
    headers.retain(|key, _| !key.eq_ignore_ascii_case(&name));
    headers.insert(name, value);
}

/// Builder for a single HTTP request.
///
/// Created by [`RequestBuilder::new`], the per-method shorthands, or
/// [`HyperClient::get`] and friends. Consumed by [`RequestBuilder::execute`].
#[derive(Debug)]
#[must_use = "a request builder does nothing until executed"]
pub struct RequestBuilder {
    client: HyperClient,
    method: std::result::Result<Method, String>,
    url: String,
    headers: HashMap<String, String>,
    query: Option<Params>,
    body: Option<Body>,
    errors: ErrorList,
}

impl RequestBuilder {
    // ========================================================================
    // Construction
    // ========================================================================

    /// Start a request sent through a new default [`HyperClient`].
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self::with_client(HyperClient::new(), method, url)
    }

    /// Start a request sent through `client`.
    pub fn with_client(client: HyperClient, method: Method, url: impl Into<String>) -> Self {
        Self {
            client,
            method: Ok(method),
            url: url.into(),
            headers: HashMap::new(),
            query: None,
            body: None,
            errors: ErrorList::new(),
        }
    }

    /// Start a request from a method name such as `"GET"`.
    ///
    /// Unknown names are reported by [`RequestBuilder::validate`].
    pub fn with_method_name(client: HyperClient, method: &str, url: impl Into<String>) -> Self {
        let mut builder = Self::with_client(client, Method::Get, url);
        builder.method = method.parse().map_err(|_| method.to_string());
        builder
    }

    /// Start a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    /// Start a POST request.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    /// Start a PUT request.
    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::Put, url)
    }

    /// Start a PATCH request.
    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(Method::Patch, url)
    }

    /// Start a DELETE request.
    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::Delete, url)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// The request method, if it is a supported one.
    #[must_use]
    pub fn method(&self) -> Option<Method> {
        self.method.as_ref().ok().copied()
    }

    /// The URL as given, before query parameters are appended.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Headers set so far.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Header value, matched case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Query parameters accumulated so far.
    #[must_use]
    pub fn query(&self) -> Option<&Params> {
        self.query.as_ref()
    }

    /// The body set so far.
    #[must_use]
    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// The client the request will be sent with.
    #[must_use]
    pub fn client(&self) -> &HyperClient {
        &self.client
    }

    /// Errors recorded so far.
    #[must_use]
    pub fn errors(&self) -> &ErrorList {
        &self.errors
    }

    fn record(&mut self, error: Error) {
        debug!(error = %error, "request configuration error");
        self.errors.push(error);
    }

    // ========================================================================
    // Headers
    // ========================================================================

    /// Set a header.
    ///
    /// The value may be any string-like, numeric or boolean scalar. Empty
    /// keys, empty values and other values are recorded as errors. The last
    /// write for a key wins, keys being compared case-insensitively.
    pub fn with_header(mut self, key: impl Into<String>, value: impl ToHeaderValue) -> Self {
        self.insert_header(key.into(), &value);
        self
    }

    /// Set several headers with the same rules as [`RequestBuilder::with_header`].
    ///
    /// Each rejected value is recorded with its key; the others are applied.
    pub fn with_headers<K, V>(mut self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: ToHeaderValue,
    {
        for (key, value) in headers {
            self.insert_header(key.into(), &value);
        }
        self
    }

    fn insert_header(&mut self, key: String, value: &impl ToHeaderValue) {
        if key.is_empty() {
            self.record(Error::invalid_header("header key cannot be empty"));
            return;
        }

        match value.to_header_value() {
            Ok(value) => match check_header(&key, &value) {
                Ok(()) => set_header(&mut self.headers, key, value),
                Err(err) => self.record(err),
            },
            Err(kind) => self.record(Error::unsupported_value(key, kind)),
        }
    }

    // ========================================================================
    // Query
    // ========================================================================

    /// Append a query parameter. List values append one pair per item.
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl ParamValue) -> Self {
        let key = key.into();
        match value.to_values() {
            Ok(values) => {
                let query = self.query.get_or_insert_with(Params::new);
                for value in values {
                    query.append(key.clone(), value);
                }
            }
            Err(kind) => self.record(Error::unsupported_value(key, kind)),
        }
        self
    }

    /// Append every pair of a key/value collection to the query.
    ///
    /// See [`ToParams`] for the accepted shapes. Each rejected value is
    /// recorded with its key; the others are appended.
    pub fn with_query_params(mut self, params: impl ToParams) -> Self {
        let query = self.query.get_or_insert_with(Params::new);
        let errors = params.append_to(query);
        for error in errors {
            self.record(error);
        }
        self
    }

    // ========================================================================
    // Body
    // ========================================================================

    fn accepts_body(&mut self) -> bool {
        match self.method {
            Ok(method) if !method.accepts_body() => {
                self.record(Error::BodyNotAllowed { method });
                false
            }
            _ => true,
        }
    }

    fn set_body(&mut self, content_type: impl Into<String>, body: Body) {
        set_header(&mut self.headers, CONTENT_TYPE.to_string(), content_type.into());
        self.body = Some(body);
    }

    fn set_untyped_body(&mut self, default_content_type: ContentType, body: Body) {
        if self.header(CONTENT_TYPE).is_none() {
            set_header(
                &mut self.headers,
                CONTENT_TYPE.to_string(),
                default_content_type.to_string(),
            );
        }
        self.body = Some(body);
    }

    /// Send raw bytes.
    ///
    /// Defaults the Content-Type to `application/octet-stream` unless one is set.
    pub fn with_byte_body(mut self, body: impl Into<Bytes>) -> Self {
        if self.accepts_body() {
            self.set_untyped_body(ContentType::OctetStream, Body::Bytes(body.into()));
        }
        self
    }

    /// Send a string.
    ///
    /// Defaults the Content-Type to `text/plain` unless one is set.
    pub fn with_string_body(mut self, body: impl Into<String>) -> Self {
        if self.accepts_body() {
            self.set_untyped_body(ContentType::PlainText, Body::from(body.into()));
        }
        self
    }

    /// Stream the content of an async reader without buffering it.
    ///
    /// Defaults the Content-Type to `application/octet-stream` unless one is set.
    pub fn with_reader_body<R>(mut self, reader: R) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        if self.accepts_body() {
            self.set_untyped_body(ContentType::OctetStream, Body::from_reader(reader));
        }
        self
    }

    /// Serialize `value` as JSON.
    pub fn with_json_body<T: serde::Serialize + ?Sized>(mut self, value: &T) -> Self {
        if self.accepts_body() {
            match to_json(value) {
                Ok(bytes) => self.set_body(ContentType::Json.as_str(), Body::Bytes(bytes)),
                Err(err) => self.record(err),
            }
        }
        self
    }

    /// Send pre-serialized JSON verbatim.
    pub fn with_raw_json_body(mut self, json: impl Into<Bytes>) -> Self {
        if self.accepts_body() {
            self.set_body(ContentType::Json.as_str(), Body::Bytes(json.into()));
        }
        self
    }

    /// Serialize `value` as XML.
    pub fn with_xml_body<T: serde::Serialize + ?Sized>(mut self, value: &T) -> Self {
        if self.accepts_body() {
            match to_xml(value) {
                Ok(bytes) => self.set_body(ContentType::Xml.as_str(), Body::Bytes(bytes)),
                Err(err) => self.record(err),
            }
        }
        self
    }

    /// Send pre-serialized XML verbatim.
    pub fn with_raw_xml_body(mut self, xml: impl Into<Bytes>) -> Self {
        if self.accepts_body() {
            self.set_body(ContentType::Xml.as_str(), Body::Bytes(xml.into()));
        }
        self
    }

    /// Encode a key/value collection as `application/x-www-form-urlencoded`.
    ///
    /// If any value is rejected, every rejection is recorded and no body is set.
    pub fn with_urlencoded_form_body(mut self, form: impl ToParams) -> Self {
        if !self.accepts_body() {
            return self;
        }

        let mut params = Params::new();
        let errors = form.append_to(&mut params);
        if !errors.is_empty() {
            for error in errors {
                self.record(error);
            }
            return self;
        }

        match to_form(&params) {
            Ok(bytes) => self.set_body(ContentType::FormUrlEncoded.as_str(), Body::from(bytes)),
            Err(err) => self.record(err),
        }
        self
    }

    /// Encode fields as `multipart/form-data`.
    ///
    /// Reader fields are streamed while the request is sent.
    pub fn with_multipart_form_body(mut self, fields: Vec<MultipartField>) -> Self {
        if self.accepts_body() {
            let multipart = Multipart::new(fields);
            let content_type = multipart.content_type();
            self.set_body(content_type, multipart.into_body());
        }
        self
    }

    /// Override the Content-Type chosen by a body setter.
    pub fn with_body_content_type(mut self, content_type: impl ToHeaderValue) -> Self {
        self.insert_header(CONTENT_TYPE.to_string(), &content_type);
        self
    }

    // ========================================================================
    // Authorization
    // ========================================================================

    /// Prepare `auth`, then let it apply its credentials to this request.
    ///
    /// Failures of either phase are recorded and reported by
    /// [`RequestBuilder::validate`].
    pub async fn with_auth<A: Authorization>(mut self, auth: &A) -> Self {
        if let Err(err) = auth.prepare().await {
            self.record(Error::authorization(err));
            return self;
        }

        let mut target = AuthTarget::new(&mut self.headers, &mut self.client);
        if let Err(err) = auth.apply(&mut target).await {
            self.record(Error::authorization(err));
        }
        self
    }

    // ========================================================================
    // Validation & execution
    // ========================================================================

    /// Check the accumulated configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::Invalid`] listing every recorded error.
    /// - [`Error::EmptyUrl`] if the URL, or its part before `?`, is empty.
    /// - [`Error::UnsupportedMethod`] for an unknown method name.
    pub fn validate(&self) -> Result<()> {
        if !self.errors.is_empty() {
            return Err(Error::Invalid(self.errors.clone()));
        }

        let before_query = self.url.split('?').next().unwrap_or_default();
        if before_query.is_empty() {
            return Err(Error::EmptyUrl);
        }

        if let Err(name) = &self.method {
            return Err(Error::UnsupportedMethod(name.clone()));
        }

        Ok(())
    }

    /// Validate, finalize and send the request.
    ///
    /// Query parameters are appended to any query already in the URL. A
    /// `User-Agent` header is added from the client configuration unless one
    /// is already set.
    ///
    /// # Errors
    ///
    /// Returns the validation error, an [`Error::InvalidUrl`], or the
    /// transport error as is.
    pub async fn execute(self) -> Result<Response> {
        let (client, request) = self.build()?;

        debug!(method = %request.method(), url = %request.url(), "executing request");
        client.execute(request).await
    }

    /// Validate and finalize the request without sending it.
    ///
    /// # Errors
    ///
    /// Same as [`RequestBuilder::execute`], without transport errors.
    pub fn build(self) -> Result<(HyperClient, Request)> {
        self.validate()?;

        let Self {
            client,
            method,
            url,
            mut headers,
            query,
            body,
            ..
        } = self;
        let method = method.map_err(Error::UnsupportedMethod)?;

        let mut url = Url::parse(&url)?;
        if let Some(query) = query.filter(|query| !query.is_empty()) {
            url.query_pairs_mut().extend_pairs(query.iter());
        }

        if !headers
            .keys()
            .any(|key| key.eq_ignore_ascii_case(USER_AGENT))
        {
            headers.insert(USER_AGENT.to_string(), client.config().user_agent.clone());
        }

        let request = Request::from_parts(method, url, headers, body.unwrap_or_default());
        Ok((client, request))
    }
}

/// Start a GET request sent through a new default client.
pub fn get(url: impl Into<String>) -> RequestBuilder {
    RequestBuilder::get(url)
}

/// Start a POST request sent through a new default client.
pub fn post(url: impl Into<String>) -> RequestBuilder {
    RequestBuilder::post(url)
}

/// Start a PUT request sent through a new default client.
pub fn put(url: impl Into<String>) -> RequestBuilder {
    RequestBuilder::put(url)
}

/// Start a PATCH request sent through a new default client.
pub fn patch(url: impl Into<String>) -> RequestBuilder {
    RequestBuilder::patch(url)
}

/// Start a DELETE request sent through a new default client.
pub fn delete(url: impl Into<String>) -> RequestBuilder {
    RequestBuilder::delete(url)
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};

    use assert2::{check, let_assert};
    use serde_json::json;

    use super::*;

    fn client() -> HyperClient {
        HyperClient::builder().user_agent("tests/1.0").build()
    }

    fn builder(method: Method) -> RequestBuilder {
        RequestBuilder::with_client(client(), method, "https://example.com/items")
    }

    fn body_text(request: &RequestBuilder) -> Option<&str> {
        request
            .body()
            .and_then(Body::as_bytes)
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
    }

    fn messages(err: &Error) -> Vec<String> {
        err.causes()
            .map(|list| list.iter().map(ToString::to_string).collect())
            .unwrap_or_default()
    }

    #[test]
    fn headers_are_stringified() {
        let request = builder(Method::Get)
            .with_header("X-Str", "value")
            .with_header("X-Int", 42)
            .with_header("X-Float", 1.5)
            .with_header("X-Bool", true)
            .with_header("X-Json", json!(7));

        check!(request.errors().is_empty());
        check!(request.header("x-str") == Some("value"));
        check!(request.header("x-int") == Some("42"));
        check!(request.header("x-float") == Some("1.5"));
        check!(request.header("x-bool") == Some("true"));
        check!(request.header("x-json") == Some("7"));
    }

    #[test]
    fn header_last_write_wins_case_insensitively() {
        let request = builder(Method::Get)
            .with_header("accept", "text/plain")
            .with_header("Accept", "application/json");

        check!(request.headers().len() == 1);
        check!(request.headers().get("Accept").map(String::as_str) == Some("application/json"));
    }

    #[test]
    fn rejected_headers_are_deferred() {
        let request = builder(Method::Get)
            .with_header("", "value")
            .with_header("X-Empty", "")
            .with_header("X-Object", json!({"a": 1}))
            .with_header("X-Ok", "fine");

        check!(request.errors().len() == 3);
        check!(request.header("x-ok") == Some("fine"));
        check!(request.header("x-object").is_none());
    }

    #[test]
    fn unsendable_headers_fail_validation() {
        let request = builder(Method::Get)
            .with_header("Bad Name", "v")
            .with_header("X-Split", "a\r\nb");

        check!(request.header("bad name").is_none());
        check!(request.header("x-split").is_none());
        let_assert!(Err(Error::Invalid(errors)) = request.validate());
        check!(errors.len() == 2);
        check!(errors.iter().all(|err| matches!(err, Error::InvalidHeader(_))));
    }

    #[test]
    fn with_headers_reports_each_rejected_key() {
        let headers = serde_json::Map::from_iter([
            ("X-One".to_string(), json!("1")),
            ("X-Two".to_string(), json!(2)),
            ("X-Null".to_string(), json!(null)),
            ("X-List".to_string(), json!(["a"])),
        ]);
        let request = builder(Method::Get).with_headers(headers);

        check!(request.header("x-one") == Some("1"));
        check!(request.header("x-two") == Some("2"));
        check!(request.errors().len() == 2);

        let_assert!(Err(err) = request.validate());
        let messages = messages(&err);
        check!(messages.iter().any(|m| m.contains("X-Null")));
        check!(messages.iter().any(|m| m.contains("X-List")));
    }

    #[test]
    fn query_shapes_match_direct_encoding() {
        let expected = "a=1&b=2";

        let scalar = BTreeMap::from([("a", "1"), ("b", "2")]);
        let multi = BTreeMap::from([("a", vec!["1"]), ("b", vec!["2"])]);
        let bytes = BTreeMap::from([("a", b"1".to_vec()), ("b", b"2".to_vec())]);
        let mixed = json!({"a": 1, "b": "2"});

        for request in [
            builder(Method::Get).with_query_params(&scalar),
            builder(Method::Get).with_query_params(&multi),
            builder(Method::Get).with_query_params(&bytes),
            builder(Method::Get).with_query_params(&mixed),
            builder(Method::Get).with_query_params(Params::new().with("a", "1").with("b", "2")),
        ] {
            check!(request.errors().is_empty());
            let_assert!(Some(query) = request.query());
            check!(query.to_urlencoded() == expected);
        }
    }

    #[test]
    fn query_param_lists_repeat_the_key() {
        let request = builder(Method::Get)
            .with_query_param("tag", vec!["a", "b"])
            .with_query_param("page", 2);

        let_assert!(Some(query) = request.query());
        check!(query.to_urlencoded() == "tag=a&tag=b&page=2");
    }

    #[test]
    fn query_rejects_unsupported_values() {
        let request = builder(Method::Get)
            .with_query_params(json!({"ok": "yes", "bad": {"nested": true}}))
            .with_query_params(json!(["not", "a", "map"]));

        check!(request.errors().len() == 2);
        let_assert!(Some(query) = request.query());
        check!(query.get("ok") == Some("yes"));
    }

    #[test]
    fn get_and_delete_reject_bodies() {
        for method in [Method::Get, Method::Delete] {
            let request = builder(method).with_string_body("payload");
            check!(request.body().is_none());

            let_assert!(Err(err) = request.validate());
            check!(messages(&err) == vec![format!("{method} requests cannot have a body")]);
        }
    }

    #[test]
    fn body_setters_choose_content_type() {
        let json = builder(Method::Post).with_json_body(&json!({"a": 1}));
        check!(json.header("content-type") == Some("application/json"));
        check!(body_text(&json) == Some(r#"{"a":1}"#));

        let raw = builder(Method::Put).with_raw_xml_body("<a/>");
        check!(raw.header("content-type") == Some("application/xml"));

        let form = builder(Method::Patch).with_urlencoded_form_body([("name", "Ada Lovelace")]);
        check!(form.header("content-type") == Some("application/x-www-form-urlencoded"));
        check!(body_text(&form) == Some("name=Ada+Lovelace"));

        let bytes = builder(Method::Post)
            .with_header("Content-Type", "image/png")
            .with_byte_body(vec![1_u8, 2, 3]);
        check!(bytes.header("content-type") == Some("image/png"));

        let text = builder(Method::Post).with_string_body("hello");
        check!(text.header("content-type") == Some("text/plain"));
    }

    #[test]
    fn multipart_sets_boundary_content_type() {
        let request = builder(Method::Post)
            .with_multipart_form_body(vec![MultipartField::new("name").with_text("value")]);

        let_assert!(Some(content_type) = request.header("content-type"));
        check!(content_type.starts_with("multipart/form-data; boundary="));
    }

    #[test]
    fn content_type_override() {
        let request = builder(Method::Post)
            .with_raw_json_body(r#"{"a":1}"#)
            .with_body_content_type("application/vnd.api+json");

        check!(request.header("content-type") == Some("application/vnd.api+json"));
    }

    #[test]
    fn failed_form_encoding_writes_no_body() {
        let request =
            builder(Method::Post).with_urlencoded_form_body(json!({"ok": 1, "bad": null}));

        check!(request.body().is_none());
        check!(request.errors().len() == 1);
    }

    #[test]
    fn last_body_wins() {
        let request = builder(Method::Post)
            .with_string_body("first")
            .with_raw_json_body("[2]");

        check!(body_text(&request) == Some("[2]"));
    }

    #[test]
    fn validate_is_idempotent() {
        let request = builder(Method::Get)
            .with_header("", "x")
            .with_string_body("nope");

        let_assert!(Err(first) = request.validate());
        let_assert!(Err(second) = request.validate());
        check!(first.to_string() == second.to_string());
        check!(messages(&first).len() == 2);
    }

    #[test]
    fn validate_rejects_empty_urls() {
        for url in ["", "?a=1"] {
            let request = RequestBuilder::with_client(client(), Method::Get, url);
            let_assert!(Err(Error::EmptyUrl) = request.validate());
        }
    }

    #[test]
    fn validate_rejects_unknown_methods() {
        let request = RequestBuilder::with_method_name(client(), "TRACE", "https://example.com");
        check!(request.method().is_none());
        let_assert!(Err(Error::UnsupportedMethod(name)) = request.validate());
        check!(name == "TRACE");

        let known = RequestBuilder::with_method_name(client(), "PATCH", "https://example.com");
        check!(known.method() == Some(Method::Patch));
        check!(known.validate().is_ok());
    }

    #[test]
    fn build_appends_query_to_existing_query() {
        let (_, request) = RequestBuilder::with_client(
            client(),
            Method::Get,
            "https://example.com/search?q=rust",
        )
        .with_query_param("page", 2)
        .build()
        .expect("valid request");

        check!(request.url().as_str() == "https://example.com/search?q=rust&page=2");
    }

    #[test]
    fn build_injects_user_agent_once() {
        let (_, request) = builder(Method::Get).build().expect("valid request");
        check!(request.header("user-agent") == Some("tests/1.0"));

        let (_, request) = builder(Method::Get)
            .with_header("user-agent", "custom/2.0")
            .build()
            .expect("valid request");
        check!(request.header("User-Agent") == Some("custom/2.0"));
        check!(request.headers().len() == 1);
    }

    #[test]
    fn build_rejects_unparseable_urls() {
        let request = RequestBuilder::with_client(client(), Method::Get, "not a url");
        let_assert!(Err(Error::InvalidUrl(_)) = request.build());
    }

    #[test]
    fn shorthands_set_the_method() {
        check!(get("https://example.com").method() == Some(Method::Get));
        check!(post("https://example.com").method() == Some(Method::Post));
        check!(put("https://example.com").method() == Some(Method::Put));
        check!(patch("https://example.com").method() == Some(Method::Patch));
        check!(delete("https://example.com").method() == Some(Method::Delete));

        let headers: HashMap<String, String> = HashMap::new();
        check!(RequestBuilder::get("https://example.com").with_headers(headers).errors().is_empty());
    }
}
