use anyhow::Result;
use clap::Parser;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::validation::RequiredField;

#[derive(Parser, Debug)]
#[command(name = "cambio")]
#[command(about = "Runs the cambio conversion history service", long_about = None)]
pub struct Cli {
    #[arg(short = 'c', long = "config")]
    pub config_path: Option<String>,
}

pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".cambio")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.yaml")
}

/// Database name that selects the in-process store instead of libsql.
pub const MEMORY_DATABASE: &str = "memory";

#[derive(Debug, Deserialize, Clone)]
pub struct App {
    #[serde(default = "default_database")]
    database: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    pub turso_url: Option<String>,
    #[serde(default)]
    pub turso_auth_token: Option<String>,
    #[serde(default = "default_sync_interval")]
    pub sync_interval_seconds: u64,
}

fn default_database() -> String {
    "cambio.db".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_sync_interval() -> u64 {
    60
}

impl Default for App {
    fn default() -> Self {
        App {
            database: default_database(),
            port: default_port(),
            turso_url: None,
            turso_auth_token: None,
            sync_interval_seconds: default_sync_interval(),
        }
    }
}

impl App {
    pub fn get_db(&self) -> &str {
        return &self.database;
    }

    pub fn get_port(&self) -> u16 {
        return self.port;
    }

    /// Remote url and token, when both are set to something non-empty.
    /// Unset environment variables substitute to empty strings, so those
    /// count as missing.
    pub fn replica(&self) -> Option<(&str, &str)> {
        let url = self.turso_url.as_deref().filter(|s| !s.is_empty())?;
        let token = self.turso_auth_token.as_deref().filter(|s| !s.is_empty())?;
        Some((url, token))
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Validation {
    #[serde(default)]
    pub required_fields: Vec<RequiredField>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub app: App,
    #[serde(default)]
    pub validation: Validation,
}

impl Config {
    pub fn new(path: &str) -> Result<Self> {
        let cfg = Config::load_config(path)?;
        Ok(cfg)
    }

    pub fn from_yaml(yaml_str: &str) -> Result<Self> {
        let yaml_with_env = Config::substitute_env_vars(yaml_str)?;
        let config: Config = serde_yaml::from_str(&yaml_with_env)?;
        Ok(config)
    }

    fn load_config(path: &str) -> Result<Config> {
        let yaml_str = fs::read_to_string(path)?;
        Config::from_yaml(&yaml_str)
    }

    /// Expands `${VAR}` and `${VAR:-default}`. An unset variable without a
    /// default expands to nothing. An unterminated `${` is left as written.
    fn substitute_env_vars(yaml_str: &str) -> Result<String> {
        let mut out = String::with_capacity(yaml_str.len());
        let mut rest = yaml_str;

        while let Some(start) = rest.find("${") {
            let Some(len) = rest[start + 2..].find('}') else {
                break;
            };
            out.push_str(&rest[..start]);

            let expr = &rest[start + 2..start + 2 + len];
            let value = match expr.split_once(":-") {
                Some((var, default)) => env::var(var).unwrap_or_else(|_| default.to_string()),
                None => env::var(expr).unwrap_or_else(|_| {
                    tracing::warn!(var = expr, "environment variable not found");
                    String::new()
                }),
            };
            out.push_str(&value);
            rest = &rest[start + 2 + len + 1..];
        }

        out.push_str(rest);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = Config::from_yaml("{}").unwrap();
        assert_eq!(cfg.app.get_port(), 3000);
        assert_eq!(cfg.app.get_db(), "cambio.db");
        assert_eq!(cfg.app.sync_interval_seconds, 60);
        assert!(cfg.app.replica().is_none());
        assert!(cfg.validation.required_fields.is_empty());
    }

    #[test]
    fn substitutes_defaults_for_unset_vars() {
        let yaml = r#"
app:
  port: ${CAMBIO_TEST_UNSET_PORT:-4100}
  database: ${CAMBIO_TEST_UNSET_DB:-memory}
"#;
        let cfg = Config::from_yaml(yaml).unwrap();
        assert_eq!(cfg.app.get_port(), 4100);
        assert_eq!(cfg.app.get_db(), MEMORY_DATABASE);
    }

    #[test]
    fn substitution_keeps_surrounding_text() {
        let out = Config::substitute_env_vars("a ${CAMBIO_TEST_UNSET_X:-b} c ${oops").unwrap();
        assert_eq!(out, "a b c ${oops");
    }

    #[test]
    fn unset_replica_vars_disable_replica() {
        let yaml = r#"
app:
  turso_url: "${CAMBIO_TEST_UNSET_URL}"
  turso_auth_token: "${CAMBIO_TEST_UNSET_TOKEN}"
"#;
        let cfg = Config::from_yaml(yaml).unwrap();
        assert_eq!(cfg.app.turso_url.as_deref(), Some(""));
        assert!(cfg.app.replica().is_none());
    }

    #[test]
    fn replica_requires_url_and_token() {
        let yaml = r#"
app:
  turso_url: libsql://cambio.turso.io
  turso_auth_token: secret
"#;
        let cfg = Config::from_yaml(yaml).unwrap();
        assert_eq!(cfg.app.replica(), Some(("libsql://cambio.turso.io", "secret")));
    }

    #[test]
    fn loads_required_fields_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "validation:\n  required_fields: [type, result]").unwrap();

        let cfg = Config::new(file.path().to_str().unwrap()).unwrap();
        assert_eq!(
            cfg.validation.required_fields,
            vec![RequiredField::Type, RequiredField::Result]
        );
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(Config::new("/definitely/not/here/config.yaml").is_err());
    }
}
