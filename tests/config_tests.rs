// Config loading and validation tests

use metricboard::config::AppConfig;

const VALID_CONFIG: &str = r#"
[server]
port = 8081
host = "0.0.0.0"

[database]
path = "data/metrics.db"
max_pool_size = 10

[cache]
expiration_secs = 1800
refresh_interval_secs = 300
max_buckets = 100000

[publishing]
broadcast_capacity = 64
"#;

#[test]
fn test_config_loads_from_str() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("load_from_str");
    assert_eq!(config.server.port, 8081);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.database.path, "data/metrics.db");
    assert_eq!(config.database.max_pool_size, 10);
    assert_eq!(config.cache.expiration_secs, 1800);
    assert_eq!(config.cache.refresh_interval_secs, 300);
    assert_eq!(config.publishing.broadcast_capacity, 64);
    assert_eq!(config.cache.expiration(), chrono::TimeDelta::minutes(30));
}

#[test]
fn test_config_cache_defaults_when_section_omitted() {
    let without_cache = VALID_CONFIG.replace(
        "[cache]\nexpiration_secs = 1800\nrefresh_interval_secs = 300\nmax_buckets = 100000\n",
        "",
    );
    assert!(!without_cache.contains("[cache]"));
    let config = AppConfig::load_from_str(&without_cache).expect("valid");
    assert_eq!(config.cache.expiration_secs, 1800);
    assert_eq!(config.cache.refresh_interval_secs, 300);
    assert_eq!(config.cache.max_buckets, 100_000);
}

#[test]
fn test_config_cache_defaults_for_missing_keys() {
    let partial = VALID_CONFIG.replace("refresh_interval_secs = 300\n", "");
    let config = AppConfig::load_from_str(&partial).expect("valid");
    assert_eq!(config.cache.refresh_interval_secs, 300);
}

#[test]
fn test_config_validation_rejects_invalid_port() {
    let bad = VALID_CONFIG.replace("port = 8081", "port = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("server.port"));
}

#[test]
fn test_config_validation_rejects_empty_db_path() {
    let bad = VALID_CONFIG.replace("path = \"data/metrics.db\"", "path = \"\"");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("database.path"));
}

#[test]
fn test_config_validation_rejects_max_pool_size_zero() {
    let bad = VALID_CONFIG.replace("max_pool_size = 10", "max_pool_size = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("max_pool_size"));
}

#[test]
fn test_config_validation_rejects_expiration_zero() {
    let bad = VALID_CONFIG.replace("expiration_secs = 1800", "expiration_secs = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("expiration_secs"));
}

#[test]
fn test_config_validation_rejects_refresh_interval_zero() {
    let bad = VALID_CONFIG.replace("refresh_interval_secs = 300", "refresh_interval_secs = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("refresh_interval_secs"));
}

#[test]
fn test_config_validation_rejects_max_buckets_zero() {
    let bad = VALID_CONFIG.replace("max_buckets = 100000", "max_buckets = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("max_buckets"));
}

#[test]
fn test_config_validation_rejects_broadcast_capacity_zero() {
    let bad = VALID_CONFIG.replace("broadcast_capacity = 64", "broadcast_capacity = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("broadcast_capacity"));
}

#[test]
fn test_config_validation_rejects_invalid_toml() {
    let err = AppConfig::load_from_str("not valid toml [[[").unwrap_err();
    assert!(!err.to_string().is_empty());
}

#[test]
fn test_config_load_from_file_via_env() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, VALID_CONFIG).unwrap();
    unsafe { std::env::set_var("CONFIG_FILE", path.to_str().unwrap()) };
    let result = AppConfig::load();
    unsafe { std::env::remove_var("CONFIG_FILE") };
    let config = result.expect("load from CONFIG_FILE");
    assert_eq!(config.server.port, 8081);
    assert_eq!(config.database.path, "data/metrics.db");
}
