//! Integration tests for Settings loading with an explicit config file.
//!
//! Every case passes an explicit config file, so the user's global
//! config is never read.

use std::fs;

use tempfile::TempDir;

use mxlab::application::ApplicationError;
use mxlab::config::Settings;

#[test]
fn given_explicit_config_file_when_load_then_overrides_defaults() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("mxlab.toml");
    fs::write(
        &path,
        r#"
api_base_url = "https://ar.example.com/api"
timeout_secs = 5
"#,
    )
    .unwrap();

    let settings = Settings::load(Some(&path)).expect("load settings");

    assert_eq!(settings.api_base_url, "https://ar.example.com/api");
    assert_eq!(settings.timeout_secs, 5);
    assert_eq!(settings.history_limit, Settings::default().history_limit);
}

#[test]
fn given_draft_dir_with_env_var_when_load_then_expanded() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("mxlab.toml");
    fs::write(&path, "draft_dir = \"$HOME/mxlab-drafts\"\n").unwrap();

    let settings = Settings::load(Some(&path)).unwrap();

    let home = std::env::var("HOME").unwrap();
    assert_eq!(
        settings.draft_dir,
        std::path::PathBuf::from(format!("{home}/mxlab-drafts"))
    );
}

#[test]
fn given_missing_config_file_when_load_then_config_error() {
    let temp = TempDir::new().unwrap();

    let result = Settings::load(Some(&temp.path().join("absent.toml")));

    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_malformed_config_file_when_load_then_config_error_names_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("broken.toml");
    fs::write(&path, "timeout_secs = \"soon\"").unwrap();

    let err = Settings::load(Some(&path)).unwrap_err();

    assert!(err.to_string().contains("broken.toml"), "{}", err);
}

#[test]
fn given_settings_when_rendered_as_toml_then_loads_back() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("mxlab.toml");
    let original = Settings {
        api_base_url: "http://backend:9000".into(),
        draft_dir: temp.path().join("drafts"),
        timeout_secs: 12,
        history_limit: 7,
    };
    fs::write(&path, original.to_toml().unwrap()).unwrap();

    let loaded = Settings::load(Some(&path)).unwrap();

    assert_eq!(loaded, original);
}
