//! Error types for courier.

use std::fmt;
use std::sync::Arc;

use derive_more::{Display, Error, From};

use crate::Method;

/// Boxed error used for failures raised by pluggable components.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// ============================================================================
// Error Type
// ============================================================================

/// Main error type for courier operations.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// Configuration problems collected while building a request.
    #[display("invalid request: {_0}")]
    #[from]
    Invalid(#[error(not(source))] ErrorList),

    /// Header key or value rejected.
    #[display("invalid header: {_0}")]
    #[from(skip)]
    InvalidHeader(#[error(not(source))] String),

    /// Value that cannot be rendered as a header, query or form value.
    #[display("unsupported value for key '{key}': {kind}")]
    #[from(skip)]
    UnsupportedValue {
        /// Offending key.
        key: String,
        /// Description of the rejected value.
        kind: String,
    },

    /// Input that is not a key/value collection at all.
    #[display("unsupported shape: {_0}")]
    #[from(skip)]
    UnsupportedShape(#[error(not(source))] String),

    /// A body was set on a method that does not carry one.
    #[display("{method} requests cannot have a body")]
    #[from(skip)]
    BodyNotAllowed {
        /// Request method.
        method: Method,
    },

    /// The request URL is missing.
    #[display("url cannot be empty")]
    #[from(skip)]
    EmptyUrl,

    /// Unknown request method name.
    #[display("unsupported HTTP method: {_0}")]
    #[from(skip)]
    UnsupportedMethod(#[error(not(source))] String),

    /// Network/connection errors.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    #[from(skip)]
    Tls(#[error(not(source))] String),

    /// Request timeout.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// Request that the transport could not build.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// JSON serialization error.
    #[display("JSON serialization error: {_0}")]
    #[from]
    JsonSerialization(serde_json::Error),

    /// JSON deserialization error with path context.
    #[display("JSON deserialization error at '{path}': {message}")]
    #[from(skip)]
    JsonDeserialization {
        /// JSON path to the error (e.g., "user.address.city").
        path: String,
        /// Error message.
        message: String,
    },

    /// XML serialization error.
    #[display("XML serialization error: {_0}")]
    #[from]
    XmlSerialization(quick_xml::SeError),

    /// XML deserialization error.
    #[display("XML deserialization error: {_0}")]
    #[from]
    XmlDeserialization(quick_xml::DeError),

    /// Form URL-encoded serialization error.
    #[display("form serialization error: {_0}")]
    #[from]
    FormSerialization(serde_html_form::ser::Error),

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),

    /// I/O error while reading a body source.
    #[display("I/O error: {_0}")]
    #[from]
    Io(std::io::Error),

    /// The response body was already consumed.
    #[display("body has already been read")]
    #[from(skip)]
    BodyConsumed,

    /// An authorization strategy failed to prepare or apply.
    #[display("authorization failed: {_0}")]
    #[from(skip)]
    Authorization(#[error(not(source))] BoxError),
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create an invalid header error.
    #[must_use]
    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::InvalidHeader(message.into())
    }

    /// Create an unsupported value error for `key`.
    #[must_use]
    pub fn unsupported_value(key: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::UnsupportedValue {
            key: key.into(),
            kind: kind.into(),
        }
    }

    /// Wrap an authorization failure.
    #[must_use]
    pub fn authorization(err: impl Into<BoxError>) -> Self {
        Self::Authorization(err.into())
    }

    /// Create a JSON deserialization error with path context.
    #[must_use]
    pub fn json_deserialization(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::JsonDeserialization {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns `true` if the response body was already consumed.
    #[must_use]
    pub const fn is_body_consumed(&self) -> bool {
        matches!(self, Self::BodyConsumed)
    }

    /// Collected configuration problems, if this is an [`Error::Invalid`].
    #[must_use]
    pub fn causes(&self) -> Option<&ErrorList> {
        match self {
            Self::Invalid(list) => Some(list),
            _ => None,
        }
    }
}

// ============================================================================
// Error List
// ============================================================================

/// Ordered, cheaply cloneable list of deferred errors.
///
/// Entries are shared so that validating the same builder twice reports
/// the same causes.
#[derive(Debug, Clone, Default)]
pub struct ErrorList(Vec<Arc<Error>>);

impl ErrorList {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an error.
    pub fn push(&mut self, error: Error) {
        self.0.push(Arc::new(error));
    }

    /// Number of errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no error was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the recorded errors.
    pub fn iter(&self) -> impl Iterator<Item = &Error> {
        self.0.iter().map(AsRef::as_ref)
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error(s)", self.0.len())?;
        for (idx, err) in self.0.iter().enumerate() {
            let sep = if idx == 0 { ": " } else { "; " };
            write!(f, "{sep}{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorList {}

impl Extend<Error> for ErrorList {
    fn extend<T: IntoIterator<Item = Error>>(&mut self, iter: T) {
        self.0.extend(iter.into_iter().map(Arc::new));
    }
}

impl FromIterator<Error> for ErrorList {
    fn from_iter<T: IntoIterator<Item = Error>>(iter: T) -> Self {
        Self(iter.into_iter().map(Arc::new).collect())
    }
}
