//! Prelude module for convenient imports.
//!
//! ```ignore
//! use courier_core::prelude::*;
//! ```

pub use crate::{
    Body, ContentType, Error, HttpClient, Method, Multipart, MultipartField, Params, Request,
    Response, Result, Serialized, ToParams, from_json, to_json,
};
