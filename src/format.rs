//! Content-type allow-list and filename-extension fallback.
//!
//! Every accepted payload resolves to an [`InputFormat`], which picks the converter pipeline,
//! and a suffix for the transient file the converter reads.

use std::path::Path;
use thiserror::Error;

/// Suffix used when a filename carries no extension.
pub const DEFAULT_SUFFIX: &str = ".pdf";

/// Filename used by the base64 endpoint when the caller omits one.
pub const DEFAULT_FILENAME: &str = "document.pdf";

const ALLOWED_CONTENT_TYPES: [(&str, ResolvedFormat); 4] = [
    ("application/pdf", ResolvedFormat::new(InputFormat::Pdf, ".pdf")),
    ("image/jpeg", ResolvedFormat::new(InputFormat::Image, ".jpg")),
    ("image/jpg", ResolvedFormat::new(InputFormat::Image, ".jpg")),
    ("image/png", ResolvedFormat::new(InputFormat::Image, ".png")),
];

const ALLOWED_EXTENSIONS: [(&str, ResolvedFormat); 4] = [
    (".pdf", ResolvedFormat::new(InputFormat::Pdf, ".pdf")),
    (".jpg", ResolvedFormat::new(InputFormat::Image, ".jpg")),
    (".jpeg", ResolvedFormat::new(InputFormat::Image, ".jpeg")),
    (".png", ResolvedFormat::new(InputFormat::Image, ".png")),
];

/// Input families understood by the converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// Born-digital or scanned PDF.
    Pdf,
    /// Raster image (JPEG or PNG).
    Image,
}

impl InputFormat {
    /// Short lowercase label used in logs and converter arguments.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Image => "image",
        }
    }
}

/// Outcome of format resolution: the pipeline to use and the transient-file suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedFormat {
    /// Converter input family.
    pub format: InputFormat,
    /// Suffix (with leading dot) for the transient file.
    pub suffix: &'static str,
}

impl ResolvedFormat {
    const fn new(format: InputFormat, suffix: &'static str) -> Self {
        Self { format, suffix }
    }
}

/// Payload type is neither an allowed content type nor carries an allowed extension.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unsupported file type: {declared}. Supported: PDF, JPG, PNG")]
pub struct UnsupportedFormat {
    /// The content type (or extension) that was rejected, verbatim.
    pub declared: String,
}

/// Resolve an uploaded file from its declared content type, falling back to its filename.
///
/// The declared type wins when it is on the allow-list; otherwise the filename extension is
/// checked. The rejection names the declared content type, which may be empty.
pub fn resolve_upload(
    content_type: Option<&str>,
    filename: Option<&str>,
) -> Result<ResolvedFormat, UnsupportedFormat> {
    let declared = content_type.unwrap_or_default();
    let essence = normalize_content_type(declared);
    if let Some((_, resolved)) = ALLOWED_CONTENT_TYPES
        .iter()
        .find(|(allowed, _)| *allowed == essence)
    {
        return Ok(*resolved);
    }

    filename
        .and_then(extension)
        .and_then(|ext| lookup_extension(&ext))
        .ok_or_else(|| UnsupportedFormat {
            declared: declared.to_string(),
        })
}

/// Resolve a named payload from its filename alone; no extension means PDF.
pub fn resolve_filename(filename: &str) -> Result<ResolvedFormat, UnsupportedFormat> {
    match extension(filename) {
        None => Ok(ResolvedFormat::new(InputFormat::Pdf, DEFAULT_SUFFIX)),
        Some(ext) => lookup_extension(&ext).ok_or(UnsupportedFormat { declared: ext }),
    }
}

fn lookup_extension(ext: &str) -> Option<ResolvedFormat> {
    ALLOWED_EXTENSIONS
        .iter()
        .find(|(allowed, _)| *allowed == ext)
        .map(|(_, resolved)| *resolved)
}

/// Lowercased extension with its leading dot, e.g. `".png"`.
fn extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{}", ext.to_lowercase()))
}

/// Strip parameters (`; charset=...`) and normalise case.
fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}
