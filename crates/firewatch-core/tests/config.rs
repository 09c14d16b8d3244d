use std::collections::HashMap;
use std::fs;
use std::time::Duration;

use firewatch_core::config::{ConfigError, FirewatchConfig};

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name: &str| vars.get(name).cloned()
}

#[test]
fn defaults_are_sensible() {
    let config = FirewatchConfig::default();
    assert!(config.user_agent.starts_with("firewatch/"));
    assert_eq!(config.request_timeout(), Duration::from_secs(60));
    assert_eq!(config.cache_max_age(), None);
}

#[test]
fn reads_partial_toml_files() {
    let dir = std::env::temp_dir().join(format!("firewatch-config-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("firewatch.toml");
    fs::write(&path, "request_timeout_secs = 15\ncache_max_age_secs = 600\n").unwrap();

    let config = FirewatchConfig::from_file(&path).unwrap();
    assert_eq!(config.request_timeout_secs, 15);
    assert_eq!(config.cache_max_age(), Some(Duration::from_secs(600)));
    assert_eq!(config.user_agent, FirewatchConfig::default().user_agent);

    fs::write(&path, "request_timeout_secs = \"soon\"\n").unwrap();
    assert!(matches!(
        FirewatchConfig::from_file(&path),
        Err(ConfigError::Parse { .. })
    ));
    fs::remove_dir_all(&dir).ok();
}

#[test]
fn environment_overrides_file_values() {
    let mut config = FirewatchConfig::default();
    config
        .apply_overrides(lookup(&[
            ("FIREWATCH_USER_AGENT", "fire-dashboard/2.0 (ops@example.org)"),
            ("FIREWATCH_REQUEST_TIMEOUT_SECS", " 30 "),
            ("FIREWATCH_CACHE_MAX_AGE_SECS", "900"),
        ]))
        .unwrap();

    assert_eq!(config.user_agent, "fire-dashboard/2.0 (ops@example.org)");
    assert_eq!(config.request_timeout_secs, 30);
    assert_eq!(config.cache_max_age_secs, Some(900));
}

#[test]
fn invalid_environment_values_are_reported() {
    let mut config = FirewatchConfig::default();
    match config.apply_overrides(lookup(&[("FIREWATCH_REQUEST_TIMEOUT_SECS", "-1")])) {
        Err(ConfigError::InvalidEnv { name, value }) => {
            assert_eq!(name, "FIREWATCH_REQUEST_TIMEOUT_SECS");
            assert_eq!(value, "-1");
        }
        other => panic!("expected invalid env error, got {other:?}"),
    }
}
