use std::env;
use std::path::PathBuf;

use crate::logging::LogConfig;

/// Process-level settings read from the environment (and `.env`).
/// Detection thresholds live in the JSON file at `threshold_config_path`.
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub threshold_config_path: PathBuf,
    pub output_dir: PathBuf,
    pub attention_model_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            threshold_config_path: PathBuf::from(env_or("THRESHOLD_CONFIG_PATH", "config.json")),
            output_dir: PathBuf::from(env_or("OUTPUT_DIR", "output")),
            attention_model_path: env_opt("ATTENTION_MODEL_PATH").map(PathBuf::from),
        }
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            log_level: self.log_level.clone(),
            enable_file_logs: self.enable_file_logs,
            log_dir: self.log_dir.clone(),
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Unset and blank values are both `None`.
pub fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                tracing::warn!(key, value = %raw, "Unrecognized boolean env var, using default");
                default
            }
        },
        Err(_) => default,
    }
}
