//! Process configuration.
//!
//! Loaded from a YAML file whose path is resolved from the
//! `QUARTER_ENGINE_CONFIG` environment variable (falling back to
//! `quarter_engine.yaml` in the working directory), with a handful of
//! secrets overridable from the environment directly. Shape and override
//! mechanics are carried over from `stock_crawler::config`, swapped from its
//! JSON layout to the YAML layout `spec.md` §6.3 calls for.

use std::{env, path::PathBuf};

use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, File as ConfigFile};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const CONFIG_PATH_ENV: &str = "QUARTER_ENGINE_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "quarter_engine.yaml";

const SOURCE_PASSWORD_ENV: &str = "QE_SOURCE_PASSWORD";
const DEST_PASSWORD_ENV: &str = "QE_DEST_PASSWORD";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct App {
    pub data: Data,
    pub update: Update,
    pub instruments: Vec<String>,
    #[serde(default)]
    pub logging: Logging,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Data {
    pub source: Connection,
    pub dest: Connection,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Connection {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub db: String,
}

impl Connection {
    pub fn url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}?application_name=quarter_engine",
            self.user, self.password, self.host, self.port, self.db
        )
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Update {
    /// Days of `mtime` lookback for incremental research builds. Negative
    /// means "full rebuild" (§4.2.1).
    pub timeslot: i64,
    /// Worker pool size for `update_day` (§4.5). Not present in the
    /// original, which hardcodes 5; defaulted the same way here.
    #[serde(default = "default_day_workers")]
    pub day_workers: usize,
}

fn default_day_workers() -> usize {
    5
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Logging {
    #[serde(default = "default_log_dir")]
    pub dir: String,
}

impl Default for Logging {
    fn default() -> Self {
        Logging {
            dir: default_log_dir(),
        }
    }
}

fn default_log_dir() -> String {
    "log".to_string()
}

impl App {
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let raw: App = ConfigBuilder::builder()
            .add_source(ConfigFile::from(path.clone()))
            .build()
            .with_context(|| format!("failed to parse config file {}", path.display()))?
            .try_deserialize()
            .with_context(|| format!("config file {} does not match expected shape", path.display()))?;

        raw.validate()?;
        Ok(raw.override_with_env())
    }

    /// Catches keys that deserialize fine but are semantically empty -- the
    /// schema's `try_deserialize` only enforces shape, not "at least one
    /// instrument file" (§6.3).
    fn validate(&self) -> Result<(), ConfigError> {
        if self.instruments.is_empty() {
            return Err(ConfigError::MissingKey("instruments".to_string()));
        }
        Ok(())
    }

    fn override_with_env(mut self) -> Self {
        if let Ok(password) = env::var(SOURCE_PASSWORD_ENV) {
            self.data.source.password = password;
        }
        if let Ok(password) = env::var(DEST_PASSWORD_ENV) {
            self.data.dest.password = password;
        }
        self
    }
}

fn config_path() -> PathBuf {
    match env::var(CONFIG_PATH_ENV) {
        Ok(p) if !p.is_empty() => PathBuf::from(p),
        _ => PathBuf::from(DEFAULT_CONFIG_PATH),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_minimal_yaml() {
        let yaml = r#"
data:
  source:
    host: genius-src
    port: 5432
    user: reader
    password: secret
    db: genius
  dest:
    host: genius-dest
    port: 5432
    user: writer
    password: secret
    db: derived
update:
  timeslot: 7
instruments:
  - instruments/a_share.csv
"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        std::env::set_var(CONFIG_PATH_ENV, file.path());
        let app = App::load().expect("config should parse");
        std::env::remove_var(CONFIG_PATH_ENV);

        assert_eq!(app.data.source.host, "genius-src");
        assert_eq!(app.update.timeslot, 7);
        assert_eq!(app.update.day_workers, 5);
        assert_eq!(app.instruments, vec!["instruments/a_share.csv".to_string()]);
    }

    #[test]
    fn missing_file_is_fatal() {
        std::env::set_var(CONFIG_PATH_ENV, "/nonexistent/path/quarter_engine.yaml");
        let result = App::load();
        std::env::remove_var(CONFIG_PATH_ENV);
        assert!(result.is_err());
    }

    #[test]
    fn empty_instruments_list_is_rejected() {
        let yaml = r#"
data:
  source:
    host: genius-src
    port: 5432
    user: reader
    password: secret
    db: genius
  dest:
    host: genius-dest
    port: 5432
    user: writer
    password: secret
    db: derived
update:
  timeslot: 7
instruments: []
"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        std::env::set_var(CONFIG_PATH_ENV, file.path());
        let result = App::load();
        std::env::remove_var(CONFIG_PATH_ENV);

        assert!(result.is_err());
    }
}
