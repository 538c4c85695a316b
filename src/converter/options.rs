use crate::{config::Config, format::InputFormat};

/// Feature toggles applied to PDF conversions.
///
/// Built once from configuration and shared by every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionOptions {
    /// Run OCR over scanned pages.
    pub ocr: bool,
    /// Reconstruct table structure.
    pub table_structure: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            ocr: true,
            table_structure: true,
        }
    }
}

impl ConversionOptions {
    /// Derive the toggles from runtime configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            ocr: config.ocr,
            table_structure: config.table_structure,
        }
    }
}

/// Per-request converter configuration for one input family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOptions {
    /// PDF pipeline with its OCR and table toggles.
    Pdf {
        /// Run OCR over scanned pages.
        ocr: bool,
        /// Reconstruct table structure.
        table_structure: bool,
    },
    /// Image pipeline with converter defaults.
    Image,
}

impl PipelineOptions {
    /// Pick the pipeline configuration for `format`.
    pub fn for_format(format: InputFormat, options: &ConversionOptions) -> Self {
        match format {
            InputFormat::Pdf => Self::Pdf {
                ocr: options.ocr,
                table_structure: options.table_structure,
            },
            InputFormat::Image => Self::Image,
        }
    }

    /// Input family this configuration applies to.
    pub fn input_format(&self) -> InputFormat {
        match self {
            Self::Pdf { .. } => InputFormat::Pdf,
            Self::Image => InputFormat::Image,
        }
    }
}
