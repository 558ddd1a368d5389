mod common;

use campusvibe::Config;
use pretty_assertions::assert_eq;
use serial_test::serial;

const VARS: &[&str] = &[
    "CAMPUSVIBE_PROJECT_ID",
    "CAMPUSVIBE_API_KEY",
    "CAMPUSVIBE_STORAGE_BUCKET",
    "CAMPUSVIBE_DEFAULT_CAMPUS",
    "CAMPUSVIBE_METADATA_TIMEOUT_SECS",
    "CAMPUSVIBE_UPLOAD_TIMEOUT_SECS",
    "ENVIRONMENT",
];

fn clear_vars() {
    for var in VARS {
        unsafe { std::env::remove_var(var) };
    }
}

#[test]
#[serial]
fn defaults_apply_when_nothing_is_set() {
    common::setup_test_env();
    clear_vars();

    let config = Config::from_env_only().unwrap();
    assert_eq!(config.project_id, "campusvibe-dev");
    assert_eq!(config.default_campus, "RMIT University");
    assert_eq!(config.metadata_timeout_secs, 15);
    assert_eq!(config.upload_timeout_secs, 30);
    assert!(config.is_development());
    assert!(!config.is_production());
}

#[test]
#[serial]
fn environment_overrides_are_honored() {
    common::setup_test_env();
    clear_vars();
    unsafe {
        std::env::set_var("CAMPUSVIBE_PROJECT_ID", "campusvibe-prod");
        std::env::set_var("CAMPUSVIBE_DEFAULT_CAMPUS", "Monash University");
        std::env::set_var("CAMPUSVIBE_METADATA_TIMEOUT_SECS", "5");
        std::env::set_var("ENVIRONMENT", "production");
    }

    let config = Config::from_env_only().unwrap();
    assert_eq!(config.project_id, "campusvibe-prod");
    assert_eq!(config.default_campus, "Monash University");
    assert_eq!(config.metadata_timeout_secs, 5);
    assert!(config.is_production());

    clear_vars();
}

#[test]
#[serial]
fn malformed_timeouts_fall_back_to_defaults() {
    common::setup_test_env();
    clear_vars();
    unsafe { std::env::set_var("CAMPUSVIBE_METADATA_TIMEOUT_SECS", "not-a-number") };

    let config = Config::from_env_only().unwrap();
    assert_eq!(config.metadata_timeout_secs, 15);

    clear_vars();
}
