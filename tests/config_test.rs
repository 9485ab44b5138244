use recover_patterns::core::ConfigProvider;
use recover_patterns::utils::validation::Validate;
use recover_patterns::{FileConfig, RestartPolicy, Settings};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

#[test]
fn test_file_config_drives_restart_policy() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[server]
listen = "127.0.0.1:9090"

[supervisor]
max_restarts = 7
backoff_ms = 15
"#
    )
    .unwrap();

    let config = FileConfig::from_file(file.path()).unwrap();
    config.validate().unwrap();

    let policy = RestartPolicy::from_config(&config);
    assert_eq!(policy.max_restarts, Some(7));
    assert_eq!(policy.backoff, Duration::from_millis(15));

    let settings = Settings::from(config);
    assert_eq!(settings.listen_addr(), "127.0.0.1:9090");
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = FileConfig::from_file(dir.path().join("absent.toml"));
    assert!(result.is_err());
}

#[test]
fn test_unset_env_var_is_left_in_place() {
    let config = FileConfig::from_toml_str(
        "[server]\nlisten = \"${RECOVER_PATTERNS_SURELY_UNSET}\"\n",
    )
    .unwrap();
    assert_eq!(config.server.listen, "${RECOVER_PATTERNS_SURELY_UNSET}");
    assert!(config.validate().is_err());
}
