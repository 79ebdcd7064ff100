//! Runtime settings read from the environment (and an optional `.env` file)

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::preprocess::TensorLayout;

/// Side of the square model input, matching the 150x150 training resolution
pub const DEFAULT_INPUT_SIZE: u32 = 150;

/// Maximum accepted upload (10MB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("{key} must be greater than zero")]
    Zero { key: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" | "text" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub model_path: PathBuf,
    pub labels_path: Option<PathBuf>,
    pub calories_path: Option<PathBuf>,
    pub input_size: u32,
    pub layout: TensorLayout,
    pub max_upload_bytes: usize,
    pub intra_threads: usize,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            model_path: PathBuf::from("model/model.onnx"),
            labels_path: None,
            calories_path: None,
            input_size: DEFAULT_INPUT_SIZE,
            layout: TensorLayout::Nhwc,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            intra_threads: 4,
            log_format: LogFormat::Compact,
        }
    }
}

impl Config {
    /// Load from process environment variables.
    ///
    /// Call `dotenvy::dotenv()` first if a `.env` file should be honoured.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let config = Config {
            bind_addr: parse_or(&lookup, "BIND_ADDR", defaults.bind_addr)?,
            model_path: lookup("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            labels_path: lookup("LABELS_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            calories_path: lookup("CALORIES_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            input_size: parse_or(&lookup, "INPUT_SIZE", defaults.input_size)?,
            layout: parse_or(&lookup, "INPUT_LAYOUT", defaults.layout)?,
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            intra_threads: parse_or(&lookup, "INTRA_THREADS", defaults.intra_threads)?,
            log_format: parse_or(&lookup, "LOG_FORMAT", defaults.log_format)?,
        };

        if config.input_size == 0 {
            return Err(ConfigError::Zero { key: "INPUT_SIZE" });
        }
        if config.max_upload_bytes == 0 {
            return Err(ConfigError::Zero {
                key: "MAX_UPLOAD_BYTES",
            });
        }
        if config.intra_threads == 0 {
            return Err(ConfigError::Zero {
                key: "INTRA_THREADS",
            });
        }

        Ok(config)
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.model_path, PathBuf::from("model/model.onnx"));
        assert_eq!(config.input_size, 150);
        assert_eq!(config.layout, TensorLayout::Nhwc);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert!(config.labels_path.is_none());
        assert!(config.calories_path.is_none());
        assert_eq!(config.log_format, LogFormat::Compact);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("MODEL_PATH", "/models/food.onnx"),
            ("LABELS_PATH", "/models/labels.txt"),
            ("INPUT_SIZE", "224"),
            ("INPUT_LAYOUT", "NCHW"),
            ("LOG_FORMAT", "json"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.model_path, PathBuf::from("/models/food.onnx"));
        assert_eq!(config.labels_path, Some(PathBuf::from("/models/labels.txt")));
        assert_eq!(config.input_size, 224);
        assert_eq!(config.layout, TensorLayout::Nchw);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_value_names_the_key() {
        let err = Config::from_lookup(lookup_from(&[("INPUT_SIZE", "big")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "INPUT_SIZE",
                value: "big".to_string()
            }
        );

        let err = Config::from_lookup(lookup_from(&[("INPUT_LAYOUT", "chw")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "INPUT_LAYOUT", .. }));
    }

    #[test]
    fn test_zero_rejected() {
        let err = Config::from_lookup(lookup_from(&[("INPUT_SIZE", "0")])).unwrap_err();
        assert_eq!(err, ConfigError::Zero { key: "INPUT_SIZE" });
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config =
            Config::from_lookup(lookup_from(&[("LABELS_PATH", "  "), ("INPUT_SIZE", "")])).unwrap();
        assert!(config.labels_path.is_none());
        assert_eq!(config.input_size, DEFAULT_INPUT_SIZE);
    }
}
