//! Request, error, and response types for the parsing pipeline.

use crate::{
    converter::{ConversionError, ExportError},
    format::{ResolvedFormat, UnsupportedFormat, resolve_filename},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Prefix carried by every in-band error message.
pub const ERROR_PREFIX: &str = "Failed to parse document: ";

/// A payload ready to be staged and converted.
#[derive(Debug, Clone)]
pub struct ParseRequest {
    /// Raw document bytes.
    pub bytes: Vec<u8>,
    /// Converter pipeline and transient-file suffix.
    pub format: ResolvedFormat,
}

impl ParseRequest {
    /// Wrap already-validated bytes.
    pub fn new(bytes: Vec<u8>, format: ResolvedFormat) -> Self {
        Self { bytes, format }
    }

    /// Decode a base64 payload and resolve its format from `filename`.
    ///
    /// ASCII whitespace inside the encoded content (line wrapping) is ignored.
    pub fn from_base64(content: &str, filename: &str) -> Result<Self, ParseError> {
        let compact: String = content
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let bytes = STANDARD.decode(compact)?;
        if bytes.is_empty() {
            return Err(ParseError::EmptyDocument);
        }
        let format = resolve_filename(filename)?;
        Ok(Self { bytes, format })
    }
}

/// Errors emitted by the parsing pipeline. All of them are reported in-band.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Base64 content could not be decoded.
    #[error("invalid base64 content: {0}")]
    Decode(#[from] base64::DecodeError),
    /// The request body did not carry the expected JSON fields.
    #[error("invalid request body: {0}")]
    MalformedRequest(String),
    /// The payload decoded to zero bytes.
    #[error("document content is empty")]
    EmptyDocument,
    /// The filename names a type the converter is not configured for.
    #[error("{0}")]
    UnsupportedFormat(#[from] UnsupportedFormat),
    /// The transient file could not be created or written.
    #[error("could not stage document for conversion: {0}")]
    Staging(#[source] std::io::Error),
    /// The converter failed to process the document.
    #[error("conversion failed: {0}")]
    Conversion(#[from] ConversionError),
    /// The converted document could not be exported to Markdown.
    #[error("markdown export failed: {0}")]
    Export(#[from] ExportError),
    /// The conversion exceeded the configured time limit.
    #[error("conversion timed out after {limit:?}")]
    TimedOut {
        /// Limit that was exceeded.
        limit: Duration,
    },
}

impl ParseError {
    /// Coarse classification reported next to the free-text message.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Decode(_) | Self::MalformedRequest(_) | Self::EmptyDocument => {
                ErrorKind::DecodeError
            }
            Self::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Self::Staging(_) => ErrorKind::IoError,
            Self::Conversion(_) => ErrorKind::ConversionFailure,
            Self::Export(_) => ErrorKind::ExportFailure,
            Self::TimedOut { .. } => ErrorKind::Timeout,
        }
    }
}

/// Machine-readable failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Payload could not be decoded.
    DecodeError,
    /// Payload type is not supported.
    UnsupportedFormat,
    /// Local file-system failure.
    IoError,
    /// Converter failure.
    ConversionFailure,
    /// Markdown export failure.
    ExportFailure,
    /// Conversion time limit exceeded.
    Timeout,
}

impl ErrorKind {
    /// Label matching the serialized form.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DecodeError => "decode_error",
            Self::UnsupportedFormat => "unsupported_format",
            Self::IoError => "io_error",
            Self::ConversionFailure => "conversion_failure",
            Self::ExportFailure => "export_failure",
            Self::Timeout => "timeout",
        }
    }
}

/// Envelope returned by both parse endpoints.
///
/// `success == true` carries `markdown`; `success == false` carries `error` and `error_kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseResponse {
    /// Whether the document was converted.
    pub success: bool,
    /// Extracted Markdown on success.
    pub markdown: Option<String>,
    /// Human-readable failure description.
    pub error: Option<String>,
    /// Failure category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl ParseResponse {
    /// Successful conversion.
    pub fn success(markdown: String) -> Self {
        Self {
            success: true,
            markdown: Some(markdown),
            error: None,
            error_kind: None,
        }
    }

    /// Failed conversion, message prefixed with [`ERROR_PREFIX`].
    pub fn failure(error: &ParseError) -> Self {
        Self {
            success: false,
            markdown: None,
            error: Some(format!("{ERROR_PREFIX}{error}")),
            error_kind: Some(error.kind()),
        }
    }
}

impl From<Result<String, ParseError>> for ParseResponse {
    fn from(result: Result<String, ParseError>) -> Self {
        match result {
            Ok(markdown) => Self::success(markdown),
            Err(error) => Self::failure(&error),
        }
    }
}
