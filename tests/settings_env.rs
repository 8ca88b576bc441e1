//! Settings loaded from a file with environment overrides.

use apollo_watch::error::WatchError;
use apollo_watch::settings::ClientSettings;
use std::env;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_env_overrides_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("apollo.yaml");
    fs::write(
        &path,
        r#"
server_url: http://config.local:8080
app_id: orders
cluster: default
namespaces:
  - application
poll_interval_ms: 2000
"#,
    )
    .unwrap();

    unsafe {
        env::set_var("APOLLO_ENV_OVERRIDE_CLUSTER", "prod");
        env::set_var("APOLLO_ENV_OVERRIDE_NAMESPACES", "application,db.yaml,flags");
        env::set_var("APOLLO_ENV_OVERRIDE_ERROR_BACKOFF_MS", "750");
    }

    let settings = ClientSettings::load(Some(&path), "APOLLO_ENV_OVERRIDE").unwrap();

    assert_eq!(settings.server_url, "http://config.local:8080"); // From file
    assert_eq!(settings.cluster, "prod"); // From env
    assert_eq!(settings.namespaces, vec!["application", "db.yaml", "flags"]);
    assert_eq!(settings.poll_interval(), Duration::from_secs(2));
    assert_eq!(settings.error_backoff(), Duration::from_millis(750));

    unsafe {
        env::remove_var("APOLLO_ENV_OVERRIDE_CLUSTER");
        env::remove_var("APOLLO_ENV_OVERRIDE_NAMESPACES");
        env::remove_var("APOLLO_ENV_OVERRIDE_ERROR_BACKOFF_MS");
    }
}

#[test]
fn test_env_only() {
    unsafe {
        env::set_var("APOLLO_ENV_ONLY_SERVER_URL", "https://apollo.example.com");
        env::set_var("APOLLO_ENV_ONLY_APP_ID", "billing");
        env::set_var("APOLLO_ENV_ONLY_NAMESPACES", "application");
    }

    let settings = ClientSettings::load(None::<&str>, "APOLLO_ENV_ONLY").unwrap();

    assert_eq!(settings.app_id, "billing");
    assert_eq!(settings.cluster, "default");
    assert_eq!(settings.namespaces, vec!["application"]);
    assert_eq!(settings.request_timeout(), Duration::from_secs(90));

    unsafe {
        env::remove_var("APOLLO_ENV_ONLY_SERVER_URL");
        env::remove_var("APOLLO_ENV_ONLY_APP_ID");
        env::remove_var("APOLLO_ENV_ONLY_NAMESPACES");
    }
}

#[test]
fn test_env_without_namespaces_is_rejected() {
    unsafe {
        env::set_var("APOLLO_ENV_MISSING_SERVER_URL", "http://config.local");
        env::set_var("APOLLO_ENV_MISSING_APP_ID", "orders");
    }

    let result = ClientSettings::load(None::<&str>, "APOLLO_ENV_MISSING");
    assert!(matches!(result, Err(WatchError::Validation(_))));

    unsafe {
        env::remove_var("APOLLO_ENV_MISSING_SERVER_URL");
        env::remove_var("APOLLO_ENV_MISSING_APP_ID");
    }
}
