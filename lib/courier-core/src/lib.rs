//! Core types for the courier fluent HTTP request builder.
//!
//! This crate provides the transport-independent building blocks:
//! - [`Method`] - HTTP method enum
//! - [`Request`] - finalized request handed to a transport
//! - [`Response`] - response with a body that can be read once
//! - [`Error`], [`ErrorList`] and [`Result`] - Error handling
//! - [`HttpClient`] - Core client trait for HTTP execution
//! - [`Params`], [`ToParams`], [`ParamValue`], [`ToHeaderValue`] - key/value encoding
//! - [`Multipart`] and [`MultipartField`] - multipart bodies
//! - [`StatusCode`] - HTTP status codes (re-exported from `http` crate)
//! - [`header`] - HTTP header names (re-exported from `http` crate)

mod body;
mod client;
mod error;
mod method;
mod multipart;
mod params;
pub mod prelude;
mod request;
mod response;

pub use body::{Body, BodyStream, ContentType, from_json, from_xml, to_form, to_json, to_xml};
pub use client::HttpClient;
pub use error::{BoxError, Error, ErrorList, Result};
pub use method::Method;
pub use multipart::{Multipart, MultipartField};
pub use params::{ParamValue, Params, Serialized, ToHeaderValue, ToParams};
pub use request::Request;
pub use response::{Response, StreamingBody};

// Re-export http crate types for status codes and headers
pub use http::{StatusCode, header};
