// Configuration loading and parsing (bot.toml, credentials.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable that overrides the channel access token from
/// credentials.toml.
pub const TOKEN_ENV_VAR: &str = "LINE_TOKEN";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub line: LineConfig,
    pub sessions: SessionConfig,
    pub credentials: CredentialsConfig,
}

// ---------------------------------------------------------------------------
// bot.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire bot.toml file.
#[derive(Debug, Clone, Deserialize)]
struct BotFile {
    server: ServerConfig,
    line: LineConfig,
    sessions: SessionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineConfig {
    /// Messaging API base, e.g. `https://api.line.me/v2/bot`.
    pub api_base: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Sessions untouched for this long are dropped by the sweeper.
    pub idle_timeout_secs: u64,
    /// How often the sweeper runs.
    pub sweep_interval_secs: u64,
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub line_channel_access_token: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/bot.toml` and (optionally)
/// `config/credentials.toml`, both relative to the given `base_dir`.
///
/// `token_override` wins over the credentials file when present and
/// non-empty; `load_config()` passes the `LINE_TOKEN` environment variable.
pub fn load_config_from(
    base_dir: &Path,
    token_override: Option<String>,
) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- bot.toml (required) ---
    let bot_path = config_dir.join("bot.toml");
    let bot_text = read_file(&bot_path)?;
    let bot_file: BotFile = toml::from_str(&bot_text).map_err(|e| ConfigError::ParseError {
        path: bot_path.clone(),
        source: e,
    })?;

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join("credentials.toml");
    let mut credentials: CredentialsConfig = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    if let Some(token) = token_override.filter(|t| !t.trim().is_empty()) {
        credentials.line_channel_access_token = Some(token);
    }

    let config = Config {
        server: bot_file.server,
        line: bot_file.line,
        sessions: bot_file.sessions,
        credentials,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the bonus-app directory or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                // Keep the operator's copy.
            }
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working
/// directory, copying defaults first and applying `LINE_TOKEN`.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd, std::env::var(TOKEN_ENV_VAR).ok())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.server.host.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "server.host".into(),
            message: "must not be empty".into(),
        });
    }

    if config.server.port == 0 {
        return Err(ConfigError::ValidationError {
            field: "server.port".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.line.api_base.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "line.api_base".into(),
            message: "must not be empty".into(),
        });
    }

    let sessions = &config.sessions;
    if sessions.sweep_interval_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "sessions.sweep_interval_secs".into(),
            message: "must be greater than 0".into(),
        });
    }

    if sessions.idle_timeout_secs < sessions.sweep_interval_secs {
        return Err(ConfigError::ValidationError {
            field: "sessions.idle_timeout_secs".into(),
            message: format!(
                "must be at least sweep_interval_secs ({}), got {}",
                sessions.sweep_interval_secs, sessions.idle_timeout_secs
            ),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const VALID_BOT_TOML: &str = r#"
[server]
host = "0.0.0.0"
port = 5000

[line]
api_base = "https://api.line.me/v2/bot"

[sessions]
idle_timeout_secs = 86400
sweep_interval_secs = 600
"#;

    /// Helper: returns the bonus-app crate root (works whether `cargo test`
    /// runs from the crate directory or the workspace root).
    fn project_root() -> PathBuf {
        let cwd = std::env::current_dir().unwrap();
        if cwd.join("defaults").exists() {
            cwd
        } else if cwd.join("crates/bonus-app/defaults").exists() {
            cwd.join("crates/bonus-app")
        } else {
            panic!("Cannot locate defaults/ directory from CWD {:?}", cwd);
        }
    }

    /// Helper: fresh temp dir with `config/bot.toml` set to `bot_toml`.
    fn temp_with_bot(name: &str, bot_toml: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("config/bot.toml"), bot_toml).unwrap();
        tmp
    }

    fn expect_validation_error(result: Result<Config, ConfigError>, expected_field: &str) {
        match result {
            Err(ConfigError::ValidationError { field, .. }) => {
                assert_eq!(field, expected_field);
            }
            other => panic!("expected ValidationError for {expected_field}, got {other:?}"),
        }
    }

    #[test]
    fn load_valid_config_from_project_defaults() {
        let root = project_root();
        let tmp = std::env::temp_dir().join("bonus_config_test_defaults");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::copy(root.join("defaults/bot.toml"), tmp.join("config/bot.toml")).unwrap();

        let config = load_config_from(&tmp, None).expect("should load default config");
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.line.api_base, "https://api.line.me/v2/bot");
        assert_eq!(config.sessions.idle_timeout(), Duration::from_secs(86_400));
        assert_eq!(config.sessions.sweep_interval(), Duration::from_secs(600));
        assert!(config.credentials.line_channel_access_token.is_none());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn credentials_example_is_valid_toml() {
        let root = project_root();
        let text = fs::read_to_string(root.join("defaults/credentials.toml.example")).unwrap();
        let parsed: Result<CredentialsConfig, _> = toml::from_str(&text);
        assert!(parsed.is_ok(), "credentials example failed to parse: {:?}", parsed.err());
    }

    #[test]
    fn credentials_toml_supplies_token() {
        let tmp = temp_with_bot("bonus_config_test_creds", VALID_BOT_TOML);
        fs::write(
            tmp.join("config/credentials.toml"),
            "line_channel_access_token = \"file-token\"\n",
        )
        .unwrap();

        let config = load_config_from(&tmp, None).unwrap();
        assert_eq!(
            config.credentials.line_channel_access_token.as_deref(),
            Some("file-token")
        );

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn token_override_beats_credentials_file() {
        let tmp = temp_with_bot("bonus_config_test_override", VALID_BOT_TOML);
        fs::write(
            tmp.join("config/credentials.toml"),
            "line_channel_access_token = \"file-token\"\n",
        )
        .unwrap();

        let config = load_config_from(&tmp, Some("env-token".into())).unwrap();
        assert_eq!(
            config.credentials.line_channel_access_token.as_deref(),
            Some("env-token")
        );

        // Blank overrides are ignored.
        let config = load_config_from(&tmp, Some("  ".into())).unwrap();
        assert_eq!(
            config.credentials.line_channel_access_token.as_deref(),
            Some("file-token")
        );

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_port_zero() {
        let tmp = temp_with_bot(
            "bonus_config_test_port_zero",
            &VALID_BOT_TOML.replace("port = 5000", "port = 0"),
        );
        expect_validation_error(load_config_from(&tmp, None), "server.port");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_empty_api_base() {
        let tmp = temp_with_bot(
            "bonus_config_test_api_base",
            &VALID_BOT_TOML.replace("\"https://api.line.me/v2/bot\"", "\"\""),
        );
        expect_validation_error(load_config_from(&tmp, None), "line.api_base");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_sweep_interval() {
        let tmp = temp_with_bot(
            "bonus_config_test_sweep_zero",
            &VALID_BOT_TOML.replace("sweep_interval_secs = 600", "sweep_interval_secs = 0"),
        );
        expect_validation_error(load_config_from(&tmp, None), "sessions.sweep_interval_secs");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_idle_timeout_shorter_than_sweep() {
        let tmp = temp_with_bot(
            "bonus_config_test_idle_short",
            &VALID_BOT_TOML.replace("idle_timeout_secs = 86400", "idle_timeout_secs = 60"),
        );
        expect_validation_error(load_config_from(&tmp, None), "sessions.idle_timeout_secs");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn file_not_found_for_missing_bot_toml() {
        let tmp = std::env::temp_dir().join("bonus_config_test_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();

        match load_config_from(&tmp, None) {
            Err(ConfigError::FileNotFound { path }) => assert!(path.ends_with("bot.toml")),
            other => panic!("expected FileNotFound, got {other:?}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let tmp = temp_with_bot("bonus_config_test_invalid", "[server\nhost = ");
        assert!(matches!(
            load_config_from(&tmp, None),
            Err(ConfigError::ParseError { .. })
        ));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_copies_missing_and_skips_examples() {
        let tmp = std::env::temp_dir().join("bonus_config_test_ensure");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::write(tmp.join("defaults/bot.toml"), VALID_BOT_TOML).unwrap();
        fs::write(tmp.join("defaults/credentials.toml.example"), "").unwrap();

        let copied = ensure_config_files(&tmp).unwrap();
        assert_eq!(copied, vec![tmp.join("config/bot.toml")]);
        assert!(!tmp.join("config/credentials.toml.example").exists());

        // Second run leaves the existing copy alone.
        fs::write(tmp.join("config/bot.toml"), "# edited").unwrap();
        assert!(ensure_config_files(&tmp).unwrap().is_empty());
        assert_eq!(fs::read_to_string(tmp.join("config/bot.toml")).unwrap(), "# edited");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_errors_when_both_dirs_missing() {
        let tmp = std::env::temp_dir().join("bonus_config_test_no_dirs");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        assert!(matches!(
            ensure_config_files(&tmp),
            Err(ConfigError::DefaultsCopyError { .. })
        ));

        let _ = fs::remove_dir_all(&tmp);
    }
}
