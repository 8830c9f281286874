use gpwebpay_digest::cli::password_from_env;
use gpwebpay_digest::config::{CONFIG_ENV, DEFAULT_ENCODING, ENCODING_ENV, PASSWORD_ENV, WebpayConfig};
use gpwebpay_digest::errors::{CharsetError, ConfigError};
use gpwebpay_digest::KeyStorageFlags;
use std::path::PathBuf;

const FULL: &str = r#"
encoding = "iso-8859-2"
key_storage_flags = "EXPORTABLE | MACHINE_KEY_SET"

[private_key]
path = "/etc/gpwebpay/merchant.pem"
password_env = "MERCHANT_KEY_PW"

[public_certificate]
path = "/etc/gpwebpay/gpe.signing.pem"

[logging]
dir = "/var/log/gpwebpay"
level = "debug"
retention = 3
"#;

#[test]
fn defaults_when_empty() {
    let cfg = WebpayConfig::from_toml_str("").unwrap();
    assert_eq!(cfg, WebpayConfig::default());
    assert_eq!(cfg.encoding, DEFAULT_ENCODING);
    assert!(cfg.key_storage_flags.is_empty());
    assert_eq!(cfg.charset().unwrap().code_page(), Some(1250));
}

#[test]
fn parses_full_document() {
    let cfg = WebpayConfig::from_toml_str(FULL).unwrap();
    assert_eq!(cfg.charset().unwrap().code_page(), Some(28592));
    assert_eq!(cfg.key_storage_flags, KeyStorageFlags::EXPORTABLE | KeyStorageFlags::MACHINE_KEY_SET);
    let key = cfg.private_key.as_ref().unwrap();
    assert_eq!(key.path, PathBuf::from("/etc/gpwebpay/merchant.pem"));
    assert_eq!(key.password_env.as_deref(), Some("MERCHANT_KEY_PW"));
    assert!(cfg.public_certificate.unwrap().password_env.is_none());
    assert_eq!(cfg.logging.level.as_deref(), Some("debug"));
    assert_eq!(cfg.logging.retention, Some(3));
}

#[test]
fn serializes_back_to_equivalent_toml() {
    let cfg = WebpayConfig::from_toml_str(FULL).unwrap();
    let s = toml::to_string(&cfg).unwrap();
    assert_eq!(WebpayConfig::from_toml_str(&s).unwrap(), cfg);
}

#[test]
fn invalid_documents_are_errors() {
    assert!(matches!(WebpayConfig::from_toml_str("encoding = ["), Err(ConfigError::Toml(_))));
    assert!(matches!(
        WebpayConfig::from_toml_str("key_storage_flags = \"NOT_A_FLAG\""),
        Err(ConfigError::Toml(_))
    ));
    let cfg = WebpayConfig::from_toml_str("encoding = \"klingon\"").unwrap();
    assert!(matches!(cfg.charset(), Err(ConfigError::Charset(CharsetError::UnknownLabel(_)))));
}

#[test]
fn load_reports_missing_path() {
    let dir = tempfile::tempdir().unwrap();
    let err = WebpayConfig::load(dir.path().join("none.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn candidate_order_starts_with_cli_then_env() {
    let cli = PathBuf::from("/tmp/cli.toml");
    let paths = WebpayConfig::candidate_paths(Some(&cli), |k| {
        (k == CONFIG_ENV).then(|| "/tmp/env.toml".to_string())
    });
    assert_eq!(paths[0], cli);
    assert_eq!(paths[1], PathBuf::from("/tmp/env.toml"));
    assert!(paths.last().unwrap().ends_with("gpwebpay.toml"));
}

#[test]
fn discovery_prefers_cli_file_and_applies_env_encoding() {
    let dir = tempfile::tempdir().unwrap();
    let cli = dir.path().join("cli.toml");
    let env_file = dir.path().join("env.toml");
    std::fs::write(&cli, "encoding = \"utf-8\"").unwrap();
    std::fs::write(&env_file, "encoding = \"iso-8859-2\"").unwrap();
    let env_path = env_file.display().to_string();

    let cfg = WebpayConfig::discover_with(Some(&cli), |k| (k == CONFIG_ENV).then(|| env_path.clone()))
        .unwrap();
    assert_eq!(cfg.encoding, "utf-8");

    let cfg = WebpayConfig::discover_with(None, |k| (k == CONFIG_ENV).then(|| env_path.clone())).unwrap();
    assert_eq!(cfg.encoding, "iso-8859-2");

    let cfg = WebpayConfig::discover_with(Some(&cli), |k| match k {
        ENCODING_ENV => Some("cp1252".to_string()),
        _ => None,
    })
    .unwrap();
    assert_eq!(cfg.charset().unwrap().code_page(), Some(1252));
}

#[test]
fn key_password_comes_from_named_variable() {
    let cfg = WebpayConfig::from_toml_str(FULL).unwrap();
    let key = cfg.private_key.unwrap();
    let env = |k: &str| match k {
        "MERCHANT_KEY_PW" => Some("changeit".to_string()),
        PASSWORD_ENV => Some("global".to_string()),
        _ => None,
    };
    let pw = password_from_env(None, key.password_env.as_deref(), env);
    assert_eq!(pw.as_deref().map(String::as_str), Some("changeit"));
    let pw = password_from_env(None, Some("UNSET"), env);
    assert_eq!(pw.as_deref().map(String::as_str), Some("global"));
}

#[test]
fn literal_password_still_parses() {
    let cfg = WebpayConfig::from_toml_str("[private_key]\npath = \"k.pem\"\npassword = \"oops\"\n");
    assert!(cfg.is_ok());
}
