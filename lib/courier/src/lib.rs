//! Fluent HTTP requests for Rust.
//!
//! Build a request step by step, attach an authorization strategy and
//! execute it. Configuration mistakes (an empty header, a body on a GET, an
//! unencodable query value) do not interrupt the chain: they are collected
//! and reported together when the request is validated or executed.
//!
//! # Example
//!
//! ```ignore
//! use courier::auth::BearerAuth;
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! let auth = BearerAuth::new("my-access-token");
//! let mut response = courier::post("https://api.example.com/users")
//!     .with_header("X-Request-Id", 42)
//!     .with_query_param("notify", true)
//!     .with_json_body(&serde_json::json!({"name": "Alice"}))
//!     .with_auth(&auth)
//!     .await
//!     .execute()
//!     .await?;
//!
//! let user: User = response.json().await?;
//! ```
//!
//! The free functions ([`get`], [`post`], ...) build a fresh [`HyperClient`]
//! for every request. To reuse pooled connections, keep a client and start
//! requests from it with [`HyperClient::get`] and friends; build one with
//! [`HyperClient::builder`] to tune timeouts, pooling or middleware.

pub mod auth;
mod client;
mod config;
mod connector;
pub mod middleware;
pub mod prelude;
mod request;

// Re-export client types
pub use client::{BoxedService, HyperClient, HyperClientBuilder, ServiceFuture};
pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_USER_AGENT};
pub use connector::{default_tls_config, https_connector, https_connector_with, webpki_root_store};

// Fluent API
pub use request::{RequestBuilder, delete, get, patch, post, put};

// Re-export tower for middleware composition
pub use tower;

// Re-export core types
pub use courier_core::{
    Body, BodyStream, BoxError, ContentType, Error, ErrorList, HttpClient, Method, Multipart,
    MultipartField, ParamValue, Params, Request, Response, Result, Serialized, StreamingBody,
    ToHeaderValue, ToParams, from_json, from_xml, to_form, to_json, to_xml,
};

// Re-export http types for status codes and headers
pub use courier_core::{StatusCode, header};
