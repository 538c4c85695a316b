//! Document parsing pipeline: decode, stage, convert, export.

mod service;
mod transient;
pub mod types;

pub use service::{ParsingApi, ParsingService};
pub use transient::TransientFile;
pub use types::{ERROR_PREFIX, ErrorKind, ParseError, ParseRequest, ParseResponse};
