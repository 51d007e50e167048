//! Prelude module for convenient imports.
//!
//! ```ignore
//! use courier::prelude::*;
//! ```

pub use crate::auth::{
    AnyAuth, Authorization, BasicAuth, BearerAuth, ClientCertificateAuth, HeaderAuth, JwtAuth, JwtKey,
    NtlmAuth, OAuth2Auth,
};
pub use crate::{
    Body, ContentType, Error, HttpClient, HyperClient, Method, MultipartField, RequestBuilder,
    Response, Result, StatusCode, delete, get, header, patch, post, put,
};
pub use serde::{Deserialize, Serialize};
