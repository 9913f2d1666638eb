use proxyscan_domain::config::ConfigError;
use proxyscan_domain::{CliOverrides, Config};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_config_default_values() {
    let config = Config::default();

    assert_eq!(config.resolver.fd_limit, 64);
    assert_eq!(config.resolver.timeout, 30);
    assert_eq!(config.resolver.port, 53);
    assert_eq!(config.resolver.servers_file, "/etc/firedns.conf");
    assert_eq!(config.resolver.resolv_conf, "/etc/resolv.conf");
    assert!(config.resolver.nameservers.is_empty());
    assert_eq!(config.negcache.ttl, 0);
    assert_eq!(config.negcache.rebuild_interval, 3600);
    assert!(!config.negcache.is_enabled());
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_config_partial_file_keeps_defaults() {
    let file = write_config(
        r#"
        [resolver]
        fd_limit = 16
        nameservers = ["192.0.2.53"]

        [negcache]
        ttl = 3600
    "#,
    );

    let config = Config::load(file.path().to_str(), CliOverrides::default()).unwrap();

    assert_eq!(config.resolver.fd_limit, 16);
    assert_eq!(config.resolver.timeout, 30);
    assert_eq!(config.resolver.nameservers, vec!["192.0.2.53".to_string()]);
    assert_eq!(config.negcache.ttl_secs(), Some(3600));
    assert_eq!(config.negcache.rebuild_interval, 3600);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_config_cli_overrides_win() {
    let file = write_config(
        r#"
        [resolver]
        timeout = 10
        nameservers = ["192.0.2.53"]

        [logging]
        level = "warn"
    "#,
    );

    let overrides = CliOverrides {
        log_level: Some("debug".to_string()),
        nameservers: vec!["198.51.100.1".to_string()],
        timeout: Some(5),
    };
    let config = Config::load(file.path().to_str(), overrides).unwrap();

    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.resolver.timeout, 5);
    assert_eq!(config.resolver.nameservers, vec!["198.51.100.1".to_string()]);
}

#[test]
fn test_config_rejects_zero_limits() {
    let file = write_config("[resolver]\nfd_limit = 0\n");
    let result = Config::load(file.path().to_str(), CliOverrides::default());
    assert!(matches!(result, Err(ConfigError::Validation(_))));

    let overrides = CliOverrides {
        timeout: Some(0),
        ..Default::default()
    };
    let file = write_config("");
    let result = Config::load(file.path().to_str(), overrides);
    assert!(matches!(result, Err(ConfigError::Validation(_))));
}

#[test]
fn test_config_missing_file_is_read_error() {
    let result = Config::load(Some("/nonexistent/proxyscan.toml"), CliOverrides::default());
    assert!(matches!(result, Err(ConfigError::FileRead(_, _))));
}

#[test]
fn test_config_malformed_toml_is_parse_error() {
    let file = write_config("[resolver\nfd_limit = ");
    let result = Config::from_file(file.path().to_str().unwrap());
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn test_config_negative_ttl_disables_cache() {
    let file = write_config("[negcache]\nttl = -1\n");
    let config = Config::load(file.path().to_str(), CliOverrides::default()).unwrap();

    assert_eq!(config.negcache.ttl_secs(), None);
    assert!(!config.negcache.is_enabled());
}
