//! HTTP response handling.
//!
//! A [`Response`] exposes status and headers freely, but its body can be
//! read exactly once: through [`Response::bytes`], [`Response::text`],
//! [`Response::stream`], [`Response::json`], [`Response::xml`] or
//! [`Response::close`]. Every later read fails with [`Error::BodyConsumed`].
//!
//! # Example
//!
//! ```ignore
//! let mut response = request.execute().await?;
//! let user: User = response.json().await?;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;

use bytes::Bytes;
use futures_core::Stream;
use futures_util::{TryStreamExt, stream};

use crate::{Error, Result};

/// A streaming body: chunks of bytes arriving over time.
pub type StreamingBody = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// HTTP response with status, headers, and a one-shot body.
pub struct Response {
    status: u16,
    headers: HashMap<String, String>,
    body: Option<StreamingBody>,
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("consumed", &self.body.is_none())
            .finish()
    }
}

impl Response {
    /// Creates a response with an unread streaming body.
    #[must_use]
    pub fn new(status: u16, headers: HashMap<String, String>, body: StreamingBody) -> Self {
        Self {
            status,
            headers,
            body: Some(body),
        }
    }

    /// Creates a response with an unread in-memory body.
    #[must_use]
    pub fn from_bytes(status: u16, headers: HashMap<String, String>, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        Self::new(status, headers, Box::pin(stream::once(async move { Ok(body) })))
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Response headers.
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

    /// Status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Status is 3xx.
    #[must_use]
    pub const fn is_redirection(&self) -> bool {
        self.status >= 300 && self.status < 400
    }

    /// Status is 4xx.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.status >= 400 && self.status < 500
    }

    /// Status is 5xx.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status >= 500 && self.status < 600
    }

    /// Returns `true` once the body was read or closed.
    #[must_use]
    pub const fn is_consumed(&self) -> bool {
        self.body.is_none()
    }

    /// Take the body stream, leaving the response consumed.
    pub fn stream(&mut self) -> Result<StreamingBody> {
        self.body.take().ok_or(Error::BodyConsumed)
    }

    /// Read the whole body.
    pub async fn bytes(&mut self) -> Result<Bytes> {
        let chunks: Vec<Bytes> = self.stream()?.try_collect().await?;
        Ok(Bytes::from(chunks.concat()))
    }

    /// Read the body as UTF-8 text.
    pub async fn text(&mut self) -> Result<String> {
        let bytes = self.bytes().await?;
        String::from_utf8(bytes.to_vec())
            .map_err(|err| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err)))
    }

    /// Deserialize the body as JSON.
    pub async fn json<T: serde::de::DeserializeOwned>(&mut self) -> Result<T> {
        let bytes = self.bytes().await?;
        crate::from_json(&bytes)
    }

    /// Deserialize the body as XML.
    pub async fn xml<T: serde::de::DeserializeOwned>(&mut self) -> Result<T> {
        let bytes = self.bytes().await?;
        crate::from_xml(&bytes)
    }

    /// Release the body without reading it. No-op once consumed.
    pub fn close(&mut self) {
        self.body = None;
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;

    fn response(body: &'static str) -> Response {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        Response::from_bytes(200, headers, body)
    }

    #[test]
    fn response_basic() {
        let response = response("{}");

        check!(response.status() == 200);
        check!(response.header("Content-Type") == Some("application/json"));
        check!(response.is_success());
        check!(!response.is_client_error());
        check!(!response.is_consumed());
    }

    #[test]
    fn response_status_checks() {
        check!(Response::from_bytes(301, HashMap::new(), "").is_redirection());
        check!(Response::from_bytes(404, HashMap::new(), "").is_client_error());
        check!(Response::from_bytes(500, HashMap::new(), "").is_server_error());
    }

    #[tokio::test]
    async fn response_json() {
        #[derive(Debug, PartialEq, serde::Deserialize)]
        struct User {
            id: u64,
            name: String,
        }

        let mut response = response(r#"{"id":1,"name":"test"}"#);
        let_assert!(Ok(user) = response.json::<User>().await);
        check!(
            user == User {
                id: 1,
                name: "test".to_string()
            }
        );
    }

    #[tokio::test]
    async fn response_malformed_json_propagates_codec_error() {
        let mut response = response("not json");
        let_assert!(Err(err) = response.json::<serde_json::Value>().await);
        check!(err.to_string().starts_with("JSON deserialization error"));
        check!(response.is_consumed());
    }

    #[tokio::test]
    async fn response_xml() {
        #[derive(Debug, PartialEq, serde::Deserialize)]
        struct Item {
            id: u64,
        }

        let mut response = response("<item><id>7</id></item>");
        let_assert!(Ok(item) = response.xml::<Item>().await);
        check!(item == Item { id: 7 });
    }

    #[tokio::test]
    async fn second_read_of_any_kind_fails() {
        let mut response = response("hello");
        let_assert!(Ok(text) = response.text().await);
        check!(text == "hello");

        let_assert!(Err(Error::BodyConsumed) = response.bytes().await);
        let_assert!(Err(Error::BodyConsumed) = response.text().await);
        let_assert!(Err(Error::BodyConsumed) = response.json::<serde_json::Value>().await);
        let_assert!(Err(Error::BodyConsumed) = response.xml::<serde_json::Value>().await);
        let_assert!(Err(Error::BodyConsumed) = response.stream());

        response.close();
        check!(response.is_consumed());
    }

    #[tokio::test]
    async fn close_marks_unread_body_consumed() {
        let mut response = response("unused");
        response.close();

        check!(response.is_consumed());
        let_assert!(Err(Error::BodyConsumed) = response.bytes().await);
    }

    #[tokio::test]
    async fn stream_yields_chunks() {
        let chunks = vec![Ok(Bytes::from("a")), Ok(Bytes::from("b"))];
        let mut response = Response::new(200, HashMap::new(), Box::pin(stream::iter(chunks)));

        let_assert!(Ok(body) = response.stream());
        let_assert!(Ok(collected) = body.try_collect::<Vec<_>>().await);
        check!(collected == vec![Bytes::from("a"), Bytes::from("b")]);
        check!(response.is_consumed());
    }
}
