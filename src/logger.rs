//! log4rs setup: rolling `app.log` for the root logger and `audit.log` for
//! [`crate::diagnostics::AUDIT_TARGET`], where [`crate::diagnostics::LogSink`] writes.

use crate::config::LoggingConfig;
use crate::diagnostics::AUDIT_TARGET;
use crate::errors::ConfigError;
use log::LevelFilter;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::append::rolling_file::policy::compound::{
    CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
};
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::{Path, PathBuf};

const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {t} - {m}{n}";
const ROLL_SIZE: u64 = 10 * 1024 * 1024;
const DEFAULT_RETENTION: usize = 7;

/// Initializes logging from a log4rs YAML file.
pub fn init_path(path: &Path) -> Result<(), ConfigError> {
    log4rs::init_file(path, log4rs::config::Deserializers::default())
        .map_err(|e| ConfigError::Logging(e.to_string()))
}

pub fn parse_level(level: Option<&str>) -> LevelFilter {
    match level.unwrap_or("info").to_ascii_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

/// `<local data dir>/gpwebpay/logs`, or `./logs` when the platform has none.
pub fn default_log_dir() -> PathBuf {
    dirs_next::data_local_dir()
        .map(|d| d.join("gpwebpay").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

fn rolling_appender(
    base: &Path,
    name: &str,
    keep: u32,
) -> Result<RollingFileAppender, ConfigError> {
    let roller = FixedWindowRoller::builder()
        .build(&format!("{}", base.join(format!("{name}.{{}}.log")).display()), keep)
        .map_err(|e| ConfigError::Logging(e.to_string()))?;
    let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(ROLL_SIZE)), Box::new(roller));
    RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build(base.join(format!("{name}.log")), Box::new(policy))
        .map_err(|e| ConfigError::Logging(e.to_string()))
}

/// Builds the app/audit configuration without installing it.
pub fn build_config(
    dir: Option<&Path>,
    level: Option<&str>,
    retention: Option<usize>,
) -> Result<Config, ConfigError> {
    let base = dir.map(PathBuf::from).unwrap_or_else(default_log_dir);
    std::fs::create_dir_all(&base)
        .map_err(|source| ConfigError::Io { path: base.clone(), source })?;
    let keep = retention.unwrap_or(DEFAULT_RETENTION) as u32;
    let lvl = parse_level(level);
    let app = rolling_appender(&base, "app", keep)?;
    let audit = rolling_appender(&base, "audit", keep)?;
    Config::builder()
        .appender(Appender::builder().build("app", Box::new(app)))
        .appender(Appender::builder().build("audit", Box::new(audit)))
        .logger(Logger::builder().appender("audit").additive(false).build(AUDIT_TARGET, lvl))
        .build(Root::builder().appender("app").build(lvl))
        .map_err(|e| ConfigError::Logging(e.to_string()))
}

/// Installs the app/audit configuration for the process. A logger that is already set
/// is left in place; the log files are still created.
pub fn configure_logging(
    dir: Option<&Path>,
    level: Option<&str>,
    retention: Option<usize>,
) -> Result<(), ConfigError> {
    let config = build_config(dir, level, retention)?;
    if let Err(e) = log4rs::init_config(config) {
        log::debug!("logger already initialized: {e}");
    }
    Ok(())
}

/// Applies a [`LoggingConfig`] section.
pub fn configure(cfg: &LoggingConfig) -> Result<(), ConfigError> {
    match &cfg.config_file {
        Some(path) => init_path(path),
        None => configure_logging(cfg.dir.as_deref(), cfg.level.as_deref(), cfg.retention),
    }
}

/// Configures logging from `GPWEBPAY_LOG_DIR`, `GPWEBPAY_LOG_LEVEL` and
/// `GPWEBPAY_LOG_RETENTION`.
pub fn configure_from_env() -> Result<(), ConfigError> {
    let dir = std::env::var("GPWEBPAY_LOG_DIR").ok().map(PathBuf::from);
    let level = std::env::var("GPWEBPAY_LOG_LEVEL").ok();
    let retention =
        std::env::var("GPWEBPAY_LOG_RETENTION").ok().and_then(|s| s.parse::<usize>().ok());
    configure_logging(dir.as_deref(), level.as_deref(), retention)
}
