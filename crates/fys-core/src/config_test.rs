use std::collections::HashMap;
use std::env::VarError;
use std::path::PathBuf;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

/// Returns a map with all required env vars populated with valid defaults.
fn full_env<'a>() -> HashMap<&'a str, &'a str> {
    let mut m = HashMap::new();
    m.insert("FYS_API_URL", "https://api.example.test/api/v1");
    m
}

#[test]
fn parse_environment_known_values() {
    assert_eq!(
        parse_environment("development").unwrap(),
        Environment::Development
    );
    assert_eq!(parse_environment("test").unwrap(), Environment::Test);
    assert_eq!(
        parse_environment("production").unwrap(),
        Environment::Production
    );
}

#[test]
fn parse_environment_unknown_fails() {
    let err = parse_environment("staging").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "FYS_ENV"));
}

#[test]
fn build_app_config_fails_without_api_url() {
    let map: HashMap<&str, &str> = HashMap::new();
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "FYS_API_URL"),
        "expected MissingEnvVar(FYS_API_URL), got: {result:?}"
    );
}

#[test]
fn build_app_config_treats_blank_api_url_as_missing() {
    let mut map = HashMap::new();
    map.insert("FYS_API_URL", "   ");
    let result = build_app_config(lookup_from_map(&map));
    assert!(matches!(result, Err(ConfigError::MissingEnvVar(_))));
}

#[test]
fn build_app_config_applies_defaults() {
    let map = full_env();
    let cfg = build_app_config(lookup_from_map(&map)).expect("config should build");
    assert_eq!(cfg.api_url, "https://api.example.test/api/v1/");
    assert_eq!(cfg.env, Environment::Development);
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.default_distance, 10);
    assert_eq!(cfg.theme, "blue");
    assert_eq!(cfg.state_path, PathBuf::from("./.fys/state.json"));
    assert_eq!(cfg.request_timeout_secs, 30);
    assert_eq!(cfg.user_agent, "fys/0.1 (service-finder)");
    assert_eq!(cfg.reload_delay_ms, 100);
}

#[test]
fn build_app_config_collapses_trailing_slashes() {
    let mut map = full_env();
    map.insert("FYS_API_URL", "http://localhost:8000/api//");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.api_url, "http://localhost:8000/api/");
}

#[test]
fn default_distance_override() {
    let mut map = full_env();
    map.insert("FYS_DEFAULT_DISTANCE", "25");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.default_distance, 25);
}

#[test]
fn default_distance_invalid() {
    let mut map = full_env();
    map.insert("FYS_DEFAULT_DISTANCE", "-3");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "FYS_DEFAULT_DISTANCE"),
        "expected InvalidEnvVar(FYS_DEFAULT_DISTANCE), got: {result:?}"
    );
}

#[test]
fn request_timeout_invalid() {
    let mut map = full_env();
    map.insert("FYS_REQUEST_TIMEOUT_SECS", "soon");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "FYS_REQUEST_TIMEOUT_SECS")
    );
}

#[test]
fn reload_delay_override() {
    let mut map = full_env();
    map.insert("FYS_RELOAD_DELAY_MS", "0");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.reload_delay_ms, 0);
}

#[test]
fn state_path_and_theme_overrides() {
    let mut map = full_env();
    map.insert("FYS_STATE_PATH", "/tmp/fys.json");
    map.insert("FYS_THEME", "green");
    map.insert("FYS_ENV", "production");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.state_path, PathBuf::from("/tmp/fys.json"));
    assert_eq!(cfg.theme, "green");
    assert_eq!(cfg.env, Environment::Production);
}
