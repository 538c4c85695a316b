//! Seam to the external document converter.
//!
//! Layout analysis, OCR, table reconstruction and Markdown serialisation all happen inside the
//! converter. The gateway only hands it a file path plus [`PipelineOptions`] and asks the result
//! for Markdown.

mod docling;
mod options;

pub use docling::DoclingCli;
pub use options::{ConversionOptions, PipelineOptions};

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while the converter processes an input file.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The converter process could not be started.
    #[error("could not launch converter '{program}': {source}")]
    Launch {
        /// Program that failed to start.
        program: String,
        /// Underlying spawn error.
        #[source]
        source: std::io::Error,
    },
    /// The converter ran but reported failure.
    #[error("converter exited with {status}: {detail}")]
    Failed {
        /// Exit status as reported by the OS.
        status: String,
        /// Trailing diagnostic output from the converter.
        detail: String,
    },
    /// Scratch space for converter output could not be prepared.
    #[error("could not prepare converter output directory: {0}")]
    Scratch(#[source] std::io::Error),
    /// Converter-specific failure reported in-process.
    #[error("{0}")]
    Other(String),
}

/// Errors raised while serialising a converted document to Markdown.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The converter finished without producing a Markdown rendition.
    #[error("converter produced no markdown output at {}", path.display())]
    MissingOutput {
        /// Location where the rendition was expected.
        path: PathBuf,
    },
    /// The Markdown rendition exists but could not be read.
    #[error("could not read markdown output: {0}")]
    Io(#[from] std::io::Error),
    /// Converter-specific export failure.
    #[error("{0}")]
    Other(String),
}

/// Structured document returned by a converter.
pub trait ConvertedDocument: Send {
    /// Serialise the document to Markdown, preserving table layout.
    fn export_to_markdown(&self) -> Result<String, ExportError>;
}

/// Interface implemented by document converters.
///
/// Implementations must be safe to share across concurrent requests.
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    /// Convert the file at `source` using the supplied pipeline configuration.
    async fn convert(
        &self,
        source: &Path,
        options: &PipelineOptions,
    ) -> Result<Box<dyn ConvertedDocument>, ConversionError>;
}
