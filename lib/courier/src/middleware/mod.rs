//! Tower middleware layers for the courier HTTP client.
//!
//! Layers wrap the transport of a [`HyperClient`](crate::HyperClient) and see
//! every finalized [`Request`](crate::Request), including the requests issued
//! by authorization strategies through the same client.
//!
//! # Example
//!
//! ```ignore
//! use courier::HyperClient;
//! use courier::middleware::LoggingLayer;
//!
//! let client = HyperClient::builder()
//!     .layer(LoggingLayer::debug())
//!     .build();
//! ```

mod logging;

pub use logging::{LogLevel, Logging, LoggingLayer};

// Re-export tower types for convenience
pub use tower::{Layer, ServiceBuilder};
