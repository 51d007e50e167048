//! Multipart form data support for file uploads.
//!
//! A [`Multipart`] body is built from a list of [`MultipartField`]s. Each
//! field has exactly one value source (text, bytes or an async reader).
//! Fields with a filename are written as file parts, the others as plain
//! form fields.
//!
//! # Example
//!
//! ```
//! use courier_core::{Multipart, MultipartField};
//!
//! let form = Multipart::new(vec![
//!     MultipartField::new("name").with_text("John Doe"),
//!     MultipartField::new("avatar")
//!         .with_bytes(vec![0xFF, 0xD8])
//!         .with_filename("photo.jpg"),
//! ]);
//!
//! assert!(form.content_type().starts_with("multipart/form-data; boundary="));
//! ```

use std::fmt;
use std::path::Path;

use bytes::{BufMut, Bytes, BytesMut};
use futures_util::{StreamExt, stream};
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

use crate::body::{Body, BodyStream};
use crate::{Error, Params, Result, ToParams};

/// Value source of a multipart field.
enum Source {
    Text(String),
    Bytes(Bytes),
    Stream(BodyStream),
}

impl Source {
    fn in_memory(&self) -> Option<&[u8]> {
        match self {
            Self::Text(text) => Some(text.as_bytes()),
            Self::Bytes(bytes) => Some(bytes),
            Self::Stream(_) => None,
        }
    }
}

/// One part of a multipart body.
pub struct MultipartField {
    key: String,
    value: Source,
    filename: Option<String>,
    content_type: Option<String>,
}

impl fmt::Debug for MultipartField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match &self.value {
            Source::Text(_) => "text",
            Source::Bytes(_) => "bytes",
            Source::Stream(_) => "stream",
        };
        f.debug_struct("MultipartField")
            .field("key", &self.key)
            .field("value", &value)
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .finish()
    }
}

impl MultipartField {
    /// Create a field with an empty text value.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Source::Text(String::new()),
            filename: None,
            content_type: None,
        }
    }

    /// Use a text value.
    #[must_use]
    pub fn with_text(mut self, value: impl Into<String>) -> Self {
        self.value = Source::Text(value.into());
        self
    }

    /// Use a binary value.
    #[must_use]
    pub fn with_bytes(mut self, value: impl Into<Bytes>) -> Self {
        self.value = Source::Bytes(value.into());
        self
    }

    /// Stream the value from an async reader while the request is sent.
    #[must_use]
    pub fn with_reader<R>(mut self, reader: R) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        self.value = Source::Stream(Box::pin(ReaderStream::new(reader)));
        self
    }

    /// Set the filename, turning this field into a file part.
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Set the content type of this part.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Open `path` as a streamed file part named after the file.
    ///
    /// The content type is guessed from the extension unless set later.
    pub fn file(key: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self::new(key)
            .with_filename(filename)
            .with_reader(tokio::fs::File::from_std(file)))
    }

    /// One text field per value; list values expand to repeated fields.
    pub fn from_params(values: impl ToParams) -> Result<Vec<Self>> {
        let mut params = Params::new();
        let errors = values.append_to(&mut params);
        if !errors.is_empty() {
            return Err(Error::Invalid(errors.into_iter().collect()));
        }

        Ok(params
            .into_iter()
            .map(|(key, value)| Self::new(key).with_text(value))
            .collect())
    }

    /// Field name.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Filename, if this is a file part.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Explicit content type, if set.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Returns `true` if the part is written with a filename.
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.filename.is_some()
    }

    fn write_headers(&self, boundary: &str, buf: &mut BytesMut) {
        buf.put_slice(b"--");
        buf.put_slice(boundary.as_bytes());
        buf.put_slice(b"\r\n");

        buf.put_slice(b"Content-Disposition: form-data; name=\"");
        buf.put_slice(escape_quotes(&self.key).as_bytes());
        buf.put_slice(b"\"");

        let content_type = match &self.filename {
            Some(filename) => {
                buf.put_slice(b"; filename=\"");
                buf.put_slice(escape_quotes(filename).as_bytes());
                buf.put_slice(b"\"");
                Some(
                    self.content_type
                        .clone()
                        .unwrap_or_else(|| guess_content_type(filename).to_string()),
                )
            }
            None => self.content_type.clone(),
        };
        buf.put_slice(b"\r\n");

        if let Some(content_type) = content_type {
            buf.put_slice(b"Content-Type: ");
            buf.put_slice(content_type.as_bytes());
            buf.put_slice(b"\r\n");
        }

        buf.put_slice(b"\r\n");
    }
}

fn escape_quotes(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Guess the content type from a filename extension.
fn guess_content_type(filename: &str) -> &'static str {
    let extension = filename
        .rsplit('.')
        .next()
        .map(str::to_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "csv" => "text/csv",
        "json" => "application/json",
        "xml" => "application/xml",
        "zip" => "application/zip",
        "gz" | "gzip" => "application/gzip",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}

// ============================================================================
// Form
// ============================================================================

/// A multipart form containing multiple fields.
#[derive(Debug)]
pub struct Multipart {
    fields: Vec<MultipartField>,
    boundary: String,
}

impl Multipart {
    /// Create a form with a generated boundary.
    #[must_use]
    pub fn new(fields: Vec<MultipartField>) -> Self {
        Self {
            fields,
            boundary: generate_boundary(),
        }
    }

    /// Replace the boundary.
    ///
    /// The boundary should be a unique string that doesn't appear in any part data.
    #[must_use]
    pub fn with_boundary(mut self, boundary: impl Into<String>) -> Self {
        self.boundary = boundary.into();
        self
    }

    /// Get the boundary string.
    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Get the fields in this form.
    #[must_use]
    pub fn fields(&self) -> &[MultipartField] {
        &self.fields
    }

    /// Get the Content-Type header value for this form.
    #[must_use]
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Encode the form.
    ///
    /// Forms with only in-memory values are encoded eagerly; any reader
    /// value makes the whole body streamed.
    #[must_use]
    pub fn into_body(self) -> Body {
        if self.fields.iter().all(|f| f.value.in_memory().is_some()) {
            Body::Bytes(self.encode())
        } else {
            Body::Stream(self.encode_stream())
        }
    }

    fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();

        for field in &self.fields {
            field.write_headers(&self.boundary, &mut buf);
            if let Some(data) = field.value.in_memory() {
                buf.put_slice(data);
            }
            buf.put_slice(b"\r\n");
        }

        buf.put_slice(b"--");
        buf.put_slice(self.boundary.as_bytes());
        buf.put_slice(b"--\r\n");

        buf.freeze()
    }

    fn encode_stream(self) -> BodyStream {
        let mut segments: Vec<BodyStream> = Vec::with_capacity(self.fields.len() * 2 + 1);

        for field in self.fields {
            let mut head = BytesMut::new();
            field.write_headers(&self.boundary, &mut head);
            segments.push(once(head.freeze()));

            match field.value {
                Source::Text(text) => segments.push(once(Bytes::from(text))),
                Source::Bytes(bytes) => segments.push(once(bytes)),
                Source::Stream(stream) => segments.push(stream),
            }
            segments.push(once(Bytes::from_static(b"\r\n")));
        }

        let closing = format!("--{}--\r\n", self.boundary);
        segments.push(once(Bytes::from(closing)));

        Box::pin(stream::iter(segments).flatten())
    }
}

fn once(bytes: Bytes) -> BodyStream {
    Box::pin(stream::once(async move { Ok(bytes) }))
}

/// Generate a boundary string.
fn generate_boundary() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);

    format!("----CourierBoundary{timestamp:x}")
}
