//! HTTP transport trait.

use std::future::Future;

use crate::{Request, Response, Result};

/// Core HTTP client trait.
///
/// A transport executes a finalized [`Request`] and hands back a
/// [`Response`] whose body has not been read yet.
pub trait HttpClient: Send + Sync {
    /// Execute an HTTP request and return the response.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails for any reason:
    /// - Network errors
    /// - TLS errors
    /// - Timeouts
    fn execute(&self, request: Request) -> impl Future<Output = Result<Response>> + Send;
}
