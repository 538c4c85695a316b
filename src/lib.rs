#![deny(missing_docs)]

//! Core library for the document parsing gateway.

/// HTTP routing and handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// External document converter seam and the `docling` CLI adapter.
pub mod converter;
/// Content-type allow-list and extension fallback.
pub mod format;
/// Structured logging and tracing setup.
pub mod logging;
/// Parse activity counters.
pub mod metrics;
/// Decode, stage, convert, and export pipeline.
pub mod parsing;
