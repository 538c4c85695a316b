//! Parsing service coordinating staging, conversion, and Markdown export.

use crate::{
    config::Config,
    converter::{ConversionError, ConversionOptions, DocumentConverter, PipelineOptions},
    metrics::{MetricsSnapshot, ParseMetrics},
    parsing::{
        transient::TransientFile,
        types::{ParseError, ParseRequest},
    },
};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Runs one document through the external converter.
///
/// The service owns the shared converter handle, the immutable conversion options, and the
/// optional timeout and concurrency limits. Construct it once near process start and share it
/// through an `Arc`.
pub struct ParsingService {
    converter: Arc<dyn DocumentConverter>,
    options: ConversionOptions,
    temp_dir: Option<PathBuf>,
    timeout: Option<Duration>,
    limiter: Option<Semaphore>,
    metrics: ParseMetrics,
}

/// Abstraction over the parsing pipeline used by the HTTP surface.
#[async_trait]
pub trait ParsingApi: Send + Sync {
    /// Convert a validated payload to Markdown.
    async fn parse(&self, request: ParseRequest) -> Result<String, ParseError>;

    /// Count a request rejected before it reached [`ParsingApi::parse`].
    fn record_rejection(&self);

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl ParsingService {
    /// Build a service with no timeout or concurrency limit, staging under the system temp dir.
    pub fn new(converter: Arc<dyn DocumentConverter>, options: ConversionOptions) -> Self {
        Self {
            converter,
            options,
            temp_dir: None,
            timeout: None,
            limiter: None,
            metrics: ParseMetrics::new(),
        }
    }

    /// Build a service from runtime configuration.
    pub fn from_config(config: &Config, converter: Arc<dyn DocumentConverter>) -> Self {
        let mut service = Self::new(converter, ConversionOptions::from_config(config));
        service.temp_dir = config.temp_dir.clone();
        service.timeout = config.conversion_timeout;
        if let Some(limit) = config.max_concurrent_conversions {
            service = service.with_max_concurrency(limit);
        }
        service
    }

    /// Stage transient files under `dir`.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Abort conversions that run longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Allow at most `limit` conversions at once; further requests wait for a slot.
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.limiter = Some(Semaphore::new(limit.max(1)));
        self
    }

    /// Stage, convert, and export a document.
    pub async fn parse(&self, request: ParseRequest) -> Result<String, ParseError> {
        self.metrics.record_received(request.bytes.len() as u64);
        let result = self.run(request).await;
        match &result {
            Ok(_) => self.metrics.record_success(),
            Err(_) => self.metrics.record_failure(),
        }
        result
    }

    async fn run(&self, request: ParseRequest) -> Result<String, ParseError> {
        let _permit = match &self.limiter {
            Some(limiter) => Some(limiter.acquire().await.map_err(|_| {
                ParseError::Conversion(ConversionError::Other(
                    "conversion limiter closed".to_string(),
                ))
            })?),
            None => None,
        };

        let ParseRequest { bytes, format } = request;
        let size = bytes.len();
        let transient = TransientFile::stage(bytes, format.suffix, self.temp_dir.as_deref())
            .await
            .map_err(ParseError::Staging)?;
        tracing::debug!(
            path = %transient.path().display(),
            bytes = size,
            format = format.format.as_str(),
            "Staged document"
        );

        let pipeline = PipelineOptions::for_format(format.format, &self.options);
        let conversion = self.converter.convert(transient.path(), &pipeline);
        let document = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, conversion)
                .await
                .map_err(|_| ParseError::TimedOut { limit })??,
            None => conversion.await?,
        };
        tracing::debug!(format = format.format.as_str(), "Conversion finished");

        let markdown = document.export_to_markdown()?;
        Ok(markdown)
    }

    /// Count a payload that was refused before staging (bad type, undecodable body).
    pub fn record_rejection(&self) {
        self.metrics.record_failure();
    }

    /// Return the current parse metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl ParsingApi for ParsingService {
    async fn parse(&self, request: ParseRequest) -> Result<String, ParseError> {
        ParsingService::parse(self, request).await
    }

    fn record_rejection(&self) {
        ParsingService::record_rejection(self)
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        ParsingService::metrics_snapshot(self)
    }
}
