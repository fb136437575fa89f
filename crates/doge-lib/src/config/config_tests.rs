//
use super::*;
use figment::providers::{Format, Toml};

#[test]
fn test_settings_defaults() {
    let settings = Settings::default();
    assert_eq!(settings.bind_addr.to_string(), "127.0.0.1:8080");
    assert_eq!(settings.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
    assert_eq!(settings.dispatch.min_workers, 4);
    assert_eq!(settings.dispatch.max_workers, 10);
    assert_eq!(settings.graphite.port, 2003);
    assert_eq!(settings.graphite.prefix, "doge.spring.io");
    assert_eq!(settings.graphite.period_secs, 2);
    assert_eq!(settings.broker.application_prefix, "/app");
    assert_eq!(
        settings.broker.broker_prefixes,
        vec!["/queue/".to_string(), "/topic/".to_string()]
    );
    assert!(settings.validate().is_ok());
}

#[test]
fn test_settings_validation() {
    let settings = Settings::default();

    let mut invalid = settings.clone();
    invalid.log_level = "loud".to_string();
    assert!(invalid.validate().is_err());

    let mut invalid = settings.clone();
    invalid.max_upload_bytes = 0;
    assert!(invalid.validate().is_err());

    let mut invalid = settings.clone();
    invalid.dispatch.min_workers = 0;
    assert!(invalid.validate().is_err());

    let mut invalid = settings.clone();
    invalid.dispatch.min_workers = 12;
    assert!(invalid.validate().is_err());

    let mut invalid = settings.clone();
    invalid.graphite.period_secs = 0;
    assert!(invalid.validate().is_err());

    let mut invalid = settings;
    invalid.broker.broker_prefixes.clear();
    assert!(invalid.validate().is_err());
}

#[test]
fn test_load_from_toml() {
    let figment = Figment::new().merge(Toml::string(
        r#"
        bind_addr = "127.0.0.1:9090"
        data_dir = "test_data"
        log_level = "debug"
        max_upload_bytes = 1024

        [dispatch]
        min_workers = 4
        max_workers = 8

        [graphite]
        host = "collector.local"
        port = 2004
        "#,
    ));

    let settings = Settings::from_figment(figment).unwrap();
    assert_eq!(settings.bind_addr.to_string(), "127.0.0.1:9090");
    assert_eq!(settings.data_dir, PathBuf::from("test_data"));
    assert_eq!(settings.log_level, "debug");
    assert_eq!(settings.max_upload_bytes, 1024);
    assert_eq!(settings.dispatch.max_workers, 8);
    assert_eq!(settings.graphite.host, "collector.local");
    assert_eq!(settings.graphite.port, 2004);
    // untouched sections keep their defaults
    assert_eq!(settings.graphite.period_secs, 2);
    assert_eq!(settings.broker.application_prefix, "/app");
}

#[test]
fn test_load_rejects_invalid_file() {
    let figment = Figment::new().merge(Toml::string(
        r#"
        log_level = "info"
        max_upload_bytes = 0
        "#,
    ));
    assert!(Settings::from_figment(figment).is_err());
}
