//! Integration configuration (TOML).
//!
//! Supplies the protocol-level defaults the digest core takes as explicit arguments:
//! the message charset and the key-storage flags, plus key locations and logging.
//!
//! Discovery precedence: CLI path > `GPWEBPAY_CONFIG` > `<config dir>/gpwebpay/config.toml`
//! > `./gpwebpay.toml` > built-in defaults. `GPWEBPAY_ENCODING` overrides the charset.

use crate::certificate::KeyStorageFlags;
use crate::charset::{self, Charset};
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

pub const DEFAULT_ENCODING: &str = "windows-1250";
pub const CONFIG_ENV: &str = "GPWEBPAY_CONFIG";
pub const ENCODING_ENV: &str = "GPWEBPAY_ENCODING";
pub const PASSWORD_ENV: &str = "GPWEBPAY_KEY_PASSWORD";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebpayConfig {
    pub encoding: String,
    pub key_storage_flags: KeyStorageFlags,
    pub private_key: Option<KeyFileConfig>,
    pub public_certificate: Option<KeyFileConfig>,
    pub logging: LoggingConfig,
}

impl Default for WebpayConfig {
    fn default() -> Self {
        WebpayConfig {
            encoding: DEFAULT_ENCODING.to_string(),
            key_storage_flags: KeyStorageFlags::empty(),
            private_key: None,
            public_certificate: None,
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyFileConfig {
    pub path: PathBuf,
    /// Name of the environment variable holding the file password. Resolved by
    /// [`crate::cli::password_from_env`].
    #[serde(default)]
    pub password_env: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: Option<PathBuf>,
    pub level: Option<String>,
    pub retention: Option<usize>,
    /// log4rs YAML file; takes precedence over the other fields.
    pub config_file: Option<PathBuf>,
}

impl WebpayConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let table: toml::Table = toml::from_str(s)?;
        for key in secret_keys(&table) {
            log::warn!("config key '{key}' looks like a secret; prefer password_env");
        }
        Ok(toml::from_str(s)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let cfg = Self::from_toml_str(&s)?;
        log::debug!("loaded config from {}", path.display());
        Ok(cfg)
    }

    pub fn candidate_paths(
        cli_path: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = vec![];
        if let Some(p) = cli_path {
            paths.push(p.to_path_buf());
        }
        if let Some(p) = env(CONFIG_ENV) {
            paths.push(PathBuf::from(p));
        }
        if let Some(dir) = dirs_next::config_dir() {
            paths.push(dir.join("gpwebpay").join("config.toml"));
        }
        if let Ok(cur) = std::env::current_dir() {
            paths.push(cur.join("gpwebpay.toml"));
        }
        paths
    }

    /// Loads the first existing candidate file, then applies environment overrides.
    pub fn discover_with(
        cli_path: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let found = Self::candidate_paths(cli_path, &env).into_iter().find(|p| p.exists());
        let mut cfg = match found {
            Some(p) => Self::load(p)?,
            None => Self::default(),
        };
        if let Some(enc) = env(ENCODING_ENV) {
            cfg.encoding = enc;
        }
        Ok(cfg)
    }

    pub fn discover(cli_path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::discover_with(cli_path, |k| std::env::var(k).ok())
    }

    /// Resolves the configured encoding, registering code pages first.
    pub fn charset(&self) -> Result<Charset, ConfigError> {
        charset::init();
        Ok(Charset::for_label(&self.encoding)?)
    }
}

fn is_secret_key(key: &str) -> bool {
    let k = key.to_ascii_lowercase();
    !k.ends_with("_env")
        && (k.contains("password") || k.contains("passwd") || k.contains("secret") || k.contains("private_key_pem"))
}

fn secret_keys(table: &toml::Table) -> Vec<String> {
    let mut secrets = Vec::new();
    let mut q: VecDeque<(String, &toml::Value)> = VecDeque::new();
    for (k, v) in table {
        q.push_back((k.clone(), v));
        if is_secret_key(k) {
            secrets.push(k.clone());
        }
    }
    while let Some((prefix, v)) = q.pop_front() {
        match v {
            toml::Value::Table(map) => {
                for (k, vv) in map {
                    let full = format!("{prefix}.{k}");
                    if is_secret_key(k) {
                        secrets.push(full.clone());
                    }
                    q.push_back((full, vv));
                }
            }
            toml::Value::Array(arr) => {
                for (i, vv) in arr.iter().enumerate() {
                    q.push_back((format!("{prefix}[{i}]"), vv));
                }
            }
            _ => {}
        }
    }
    secrets
}
