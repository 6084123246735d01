//! Configuration loading from environment variables.

use anyhow::{Context, Result};
use std::path::PathBuf;

const DEFAULT_DB: &str = "scadenze.db";
const DEFAULT_PORT: u16 = 8080;

/// Runtime settings. CLI flags override whatever the environment provides.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// SQLite database file
    pub db_path: PathBuf,
    /// Port for the local web server
    pub port: u16,
    /// Whether streak milestones are celebrated
    pub celebrations: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB),
            port: DEFAULT_PORT,
            celebrations: true,
        }
    }
}

impl Config {
    /// Load settings from the environment.
    ///
    /// Reads `SCADENZE_DB`, `SCADENZE_PORT` and `SCADENZE_CELEBRATIONS`,
    /// either from the environment or from a `.env` file.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let db_path = lookup("SCADENZE_DB")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let port = match lookup("SCADENZE_PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("SCADENZE_PORT is not a valid port: {}", raw))?,
            None => defaults.port,
        };

        let celebrations = match lookup("SCADENZE_CELEBRATIONS") {
            Some(raw) => parse_flag(&raw)
                .with_context(|| format!("SCADENZE_CELEBRATIONS is not a boolean: {}", raw))?,
            None => defaults.celebrations,
        };

        Ok(Self {
            db_path,
            port,
            celebrations,
        })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    // Lookups go through a map instead of the process environment so tests
    // can run in parallel.
    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        assert_eq!(config_from(&[]).unwrap(), Config::default());
    }

    #[test]
    fn test_reads_all_values() {
        let config = config_from(&[
            ("SCADENZE_DB", "/tmp/homework.db"),
            ("SCADENZE_PORT", "9090"),
            ("SCADENZE_CELEBRATIONS", "off"),
        ])
        .unwrap();

        assert_eq!(config.db_path, PathBuf::from("/tmp/homework.db"));
        assert_eq!(config.port, 9090);
        assert!(!config.celebrations);
    }

    #[test]
    fn test_invalid_port() {
        let err = config_from(&[("SCADENZE_PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("SCADENZE_PORT"));
    }

    #[test]
    fn test_invalid_flag() {
        assert!(config_from(&[("SCADENZE_CELEBRATIONS", "maybe")]).is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" 0 "), Some(false));
        assert_eq!(parse_flag(""), None);
    }
}
