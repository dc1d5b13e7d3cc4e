use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Reads `FYS_*` settings, picking up a `.env` file in the working directory
/// first if there is one.
///
/// # Errors
///
/// Returns `ConfigError` when `FYS_API_URL` is unset or a value fails to parse.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Same as [`load_app_config`] but only looks at the process environment.
///
/// # Errors
///
/// See [`load_app_config`].
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Config assembly over an arbitrary lookup; tests pass a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<u32>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let api_url = normalize_api_url(&require("FYS_API_URL")?);
    let env = parse_environment(&or_default("FYS_ENV", "development"))?;
    let log_level = or_default("FYS_LOG_LEVEL", "info");
    let default_distance = parse_u32("FYS_DEFAULT_DISTANCE", "10")?;
    let theme = or_default("FYS_THEME", "blue");
    let state_path = PathBuf::from(or_default("FYS_STATE_PATH", "./.fys/state.json"));
    let request_timeout_secs = parse_u64("FYS_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("FYS_USER_AGENT", "fys/0.1 (service-finder)");
    let reload_delay_ms = parse_u64("FYS_RELOAD_DELAY_MS", "100")?;

    Ok(AppConfig {
        api_url,
        env,
        log_level,
        default_distance,
        theme,
        state_path,
        request_timeout_secs,
        user_agent,
        reload_delay_ms,
    })
}

/// Ensures the base URL ends with exactly one slash so endpoint paths can be
/// appended directly.
fn normalize_api_url(raw: &str) -> String {
    format!("{}/", raw.trim().trim_end_matches('/'))
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "FYS_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
