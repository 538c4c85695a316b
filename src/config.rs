use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Origins allowed to call the gateway when `DOCPARSE_CORS_ORIGINS` is unset.
pub const DEFAULT_CORS_ORIGINS: [&str; 4] = [
    "http://localhost:3000",
    "http://127.0.0.1:3000",
    "http://localhost:3001",
    "http://127.0.0.1:3001",
];

/// Converter executable used when `DOCPARSE_CONVERTER_COMMAND` is unset.
pub const DEFAULT_CONVERTER_COMMAND: &str = "docling";

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_LOG_FILE: &str = "logs/docparse-gateway.log";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the parsing gateway.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP listener binds to.
    pub server_host: IpAddr,
    /// Port the HTTP listener binds to.
    pub server_port: u16,
    /// Converter program followed by any leading arguments.
    pub converter_command: Vec<String>,
    /// Run OCR over PDF input.
    pub ocr: bool,
    /// Reconstruct table structure in PDF input.
    pub table_structure: bool,
    /// Browser origins allowed by the CORS layer.
    pub cors_origins: Vec<String>,
    /// Directory that receives transient files; the system temp dir when `None`.
    pub temp_dir: Option<PathBuf>,
    /// Optional wall-clock bound for a single conversion.
    pub conversion_timeout: Option<Duration>,
    /// Optional cap on conversions running at the same time.
    pub max_concurrent_conversions: Option<usize>,
    /// Optional request body limit in bytes.
    pub max_upload_bytes: Option<usize>,
    /// File that mirrors the stdout log.
    pub log_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            server_port: DEFAULT_PORT,
            converter_command: vec![DEFAULT_CONVERTER_COMMAND.to_string()],
            ocr: true,
            table_structure: true,
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
            temp_dir: None,
            conversion_timeout: None,
            max_concurrent_conversions: None,
            max_upload_bytes: None,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

impl Config {
    /// Read `.env` (if present) and then build the configuration from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let converter_command = match get("DOCPARSE_CONVERTER_COMMAND") {
            Some(value) => value.split_whitespace().map(str::to_string).collect(),
            None => defaults.converter_command,
        };

        let cors_origins = match get("DOCPARSE_CORS_ORIGINS") {
            Some(value) => value
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect(),
            None => defaults.cors_origins,
        };

        Ok(Self {
            server_host: parse_optional(get("SERVER_HOST"), "SERVER_HOST")?
                .unwrap_or(defaults.server_host),
            server_port: parse_optional(get("SERVER_PORT"), "SERVER_PORT")?
                .unwrap_or(defaults.server_port),
            converter_command,
            ocr: parse_bool(get("DOCPARSE_OCR"), "DOCPARSE_OCR")?.unwrap_or(defaults.ocr),
            table_structure: parse_bool(get("DOCPARSE_TABLE_STRUCTURE"), "DOCPARSE_TABLE_STRUCTURE")?
                .unwrap_or(defaults.table_structure),
            cors_origins,
            temp_dir: get("DOCPARSE_TEMP_DIR").map(PathBuf::from),
            conversion_timeout: parse_optional::<u64>(
                get("DOCPARSE_CONVERSION_TIMEOUT_SECS"),
                "DOCPARSE_CONVERSION_TIMEOUT_SECS",
            )?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs),
            max_concurrent_conversions: parse_optional::<usize>(
                get("DOCPARSE_MAX_CONCURRENT_CONVERSIONS"),
                "DOCPARSE_MAX_CONCURRENT_CONVERSIONS",
            )?
            .filter(|limit| *limit > 0),
            max_upload_bytes: parse_optional(
                get("DOCPARSE_MAX_UPLOAD_BYTES"),
                "DOCPARSE_MAX_UPLOAD_BYTES",
            )?,
            log_file: get("DOCPARSE_LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_file),
        })
    }
}

fn parse_optional<T: std::str::FromStr>(
    value: Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    value
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

fn parse_bool(value: Option<String>, key: &str) -> Result<Option<bool>, ConfigError> {
    value
        .map(|value| match value.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue(key.to_string())),
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = Config::from_lookup(lookup(&[])).expect("config");
        assert_eq!(config.server_port, 8000);
        assert_eq!(config.converter_command, vec!["docling".to_string()]);
        assert!(config.ocr);
        assert!(config.table_structure);
        assert_eq!(config.cors_origins.len(), 4);
        assert!(config.conversion_timeout.is_none());
        assert!(config.max_concurrent_conversions.is_none());
        assert!(config.max_upload_bytes.is_none());
        assert_eq!(config.log_file, PathBuf::from("logs/docparse-gateway.log"));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_lookup(lookup(&[
            ("SERVER_HOST", "127.0.0.1"),
            ("SERVER_PORT", "9100"),
            ("DOCPARSE_CONVERTER_COMMAND", "uvx  docling"),
            ("DOCPARSE_OCR", "off"),
            ("DOCPARSE_TABLE_STRUCTURE", "No"),
            ("DOCPARSE_CORS_ORIGINS", "https://app.example.com, http://localhost:5173,"),
            ("DOCPARSE_CONVERSION_TIMEOUT_SECS", "90"),
            ("DOCPARSE_MAX_CONCURRENT_CONVERSIONS", "2"),
            ("DOCPARSE_MAX_UPLOAD_BYTES", "1048576"),
        ]))
        .expect("config");

        assert_eq!(config.server_host.to_string(), "127.0.0.1");
        assert_eq!(config.server_port, 9100);
        assert_eq!(config.converter_command, vec!["uvx", "docling"]);
        assert!(!config.ocr);
        assert!(!config.table_structure);
        assert_eq!(
            config.cors_origins,
            vec!["https://app.example.com", "http://localhost:5173"]
        );
        assert_eq!(config.conversion_timeout, Some(Duration::from_secs(90)));
        assert_eq!(config.max_concurrent_conversions, Some(2));
        assert_eq!(config.max_upload_bytes, Some(1_048_576));
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("SERVER_PORT", "  "),
            ("DOCPARSE_CONVERTER_COMMAND", ""),
        ]))
        .expect("config");
        assert_eq!(config.server_port, 8000);
        assert_eq!(config.converter_command, vec!["docling".to_string()]);
    }

    #[test]
    fn zero_limits_mean_unbounded() {
        let config = Config::from_lookup(lookup(&[
            ("DOCPARSE_CONVERSION_TIMEOUT_SECS", "0"),
            ("DOCPARSE_MAX_CONCURRENT_CONVERSIONS", "0"),
        ]))
        .expect("config");
        assert!(config.conversion_timeout.is_none());
        assert!(config.max_concurrent_conversions.is_none());
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = Config::from_lookup(lookup(&[("SERVER_PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("SERVER_PORT"));

        let err = Config::from_lookup(lookup(&[("DOCPARSE_OCR", "maybe")])).unwrap_err();
        assert!(err.to_string().contains("DOCPARSE_OCR"));
    }
}
