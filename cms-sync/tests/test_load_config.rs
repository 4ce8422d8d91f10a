use serial_test::serial;
use std::env;
use std::fs::write;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::NamedTempFile;

use cms_sync::load_config::{load_config, DRIVE_API_KEY_ENV, PHOTOS_ACCESS_TOKEN_ENV};

fn config_file(yaml: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), yaml).unwrap();
    file
}

/// A full config with both secrets in the environment.
#[test]
#[serial]
fn test_load_config_full() {
    let file = config_file(
        r#"
drive:
  folder_id: "folder-abc"
photos:
  album_ids: ["alb1", "alb2"]
sync:
  concurrency: 8
  request_timeout_secs: 10
  deadline_secs: 120
store:
  dir: ./tmp/kv
  keys:
    blog: posts
    albums: galleries
"#,
    );
    env::set_var(DRIVE_API_KEY_ENV, "drive-key");
    env::set_var(PHOTOS_ACCESS_TOKEN_ENV, "photos-token");

    let config = load_config(file.path()).expect("Config should load");

    assert_eq!(config.sync.folder_id, "folder-abc");
    assert_eq!(config.sync.album_ids, vec!["alb1", "alb2"]);
    assert_eq!(config.sync.concurrency, 8);
    assert_eq!(config.sync.keys.blog, "posts");
    assert_eq!(config.sync.keys.albums, "galleries");
    assert_eq!(config.http.request_timeout, Duration::from_secs(10));
    assert_eq!(config.deadline, Some(Duration::from_secs(120)));
    assert_eq!(config.store_dir, PathBuf::from("./tmp/kv"));
    assert_eq!(config.credentials.drive_api_key.as_deref(), Some("drive-key"));
    assert_eq!(
        config.credentials.photos_access_token.as_deref(),
        Some("photos-token")
    );

    env::remove_var(DRIVE_API_KEY_ENV);
    env::remove_var(PHOTOS_ACCESS_TOKEN_ENV);
}

/// Optional sections fall back to defaults; absent or blank secrets are `None`.
#[test]
#[serial]
fn test_load_config_defaults_and_missing_secrets() {
    let file = config_file(
        r#"
drive:
  folder_id: "folder-abc"
store:
  dir: ./data
"#,
    );
    env::remove_var(DRIVE_API_KEY_ENV);
    env::set_var(PHOTOS_ACCESS_TOKEN_ENV, "  ");

    let config = load_config(file.path()).expect("Config should load");

    assert!(config.sync.album_ids.is_empty());
    assert_eq!(config.sync.concurrency, 4);
    assert_eq!(config.sync.keys.blog, "blog_data");
    assert_eq!(config.sync.keys.albums, "cosplay_data");
    assert_eq!(config.http.request_timeout, Duration::from_secs(30));
    assert_eq!(config.deadline, None);
    assert!(config.credentials.drive_api_key.is_none());
    assert!(config.credentials.photos_access_token.is_none());

    env::remove_var(PHOTOS_ACCESS_TOKEN_ENV);
}

#[test]
#[serial]
fn test_load_config_invalid_yaml() {
    let file = config_file("drive: [not, a, map\n");
    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config YAML"));
}

#[test]
#[serial]
fn test_load_config_rejects_zero_concurrency() {
    let file = config_file("drive:\n  folder_id: f\nsync:\n  concurrency: 0\nstore:\n  dir: ./d\n");
    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("concurrency"));
}
