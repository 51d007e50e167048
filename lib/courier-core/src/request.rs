//! Finalized HTTP request, as handed to a transport.
//!
//! The fluent builder in `courier` validates its configuration and produces
//! a [`Request`]; transports only ever see requests in this form.
//!
//! ```
//! use courier_core::{Method, Request};
//!
//! let request = Request::new(Method::Get, "https://api.example.com".parse().unwrap())
//!     .with_header("Accept", "application/json");
//!
//! assert_eq!(request.header("accept"), Some("application/json"));
//! ```

use std::collections::HashMap;

use url::Url;

use crate::{Body, Method};

/// An HTTP request with method, URL, headers, and body.
#[derive(Debug)]
pub struct Request {
    method: Method,
    url: Url,
    headers: HashMap<String, String>,
    body: Body,
}

impl Request {
    /// Creates a request without headers or body.
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HashMap::new(),
            body: Body::Empty,
        }
    }

    /// Reassembles a request from its parts.
    #[must_use]
    pub fn from_parts(method: Method, url: Url, headers: HashMap<String, String>, body: Body) -> Self {
        Self {
            method,
            url,
            headers,
            body,
        }
    }

    /// Sets a header, replacing any value stored under the same name in any case.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Request URL.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Single header value, matched case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Sets a header, replacing any value stored under the same name in any case.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers.retain(|key, _| !key.eq_ignore_ascii_case(&name));
        self.headers.insert(name, value.into());
    }

    /// Request body.
    #[must_use]
    pub const fn body(&self) -> &Body {
        &self.body
    }

    /// Consume into (method, url, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (Method, Url, HashMap<String, String>, Body) {
        (self.method, self.url, self.headers, self.body)
    }
}
