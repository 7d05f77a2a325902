use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_SPRINTDESK_CONFIG: &str = "SPRINTDESK_CONFIG";
pub const ENV_SPRINTDESK_ACCESS_TOKEN: &str = "SPRINTDESK_ACCESS_TOKEN";

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;
const DEFAULT_CREATOR_ROLE: &str = "creador";
const DEFAULT_MEMBER_ROLE: &str = "miembro";
const DEFAULT_ORPHANED_TEAM_POLICY: &str = "compensate";
const SUPPORTED_ORPHANED_TEAM_POLICIES: &[&str] = &["compensate", "keep"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Message(String),
}

impl ConfigError {
    fn configuration(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SprintdeskConfig {
    #[serde(default)]
    pub api: ApiConfigToml,
    #[serde(default)]
    pub teams: TeamsConfigToml,
    #[serde(default)]
    pub session: SessionConfigToml,
}

impl SprintdeskConfig {
    pub fn session_state_path(&self) -> PathBuf {
        PathBuf::from(&self.session.state_path)
    }

    /// Log file location, next to the session state file.
    pub fn log_path(&self) -> PathBuf {
        let state_path = self.session_state_path();
        match state_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.join("sprintdesk.log"),
            _ => PathBuf::from("sprintdesk.log"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiConfigToml {
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ApiConfigToml {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamsConfigToml {
    #[serde(default = "default_creator_role")]
    pub creator_role: String,
    #[serde(default = "default_member_role")]
    pub member_role: String,
    #[serde(default = "default_orphaned_team_policy")]
    pub orphaned_team_policy: String,
}

impl Default for TeamsConfigToml {
    fn default() -> Self {
        Self {
            creator_role: default_creator_role(),
            member_role: default_member_role(),
            orphaned_team_policy: default_orphaned_team_policy(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionConfigToml {
    #[serde(default = "default_session_state_path")]
    pub state_path: String,
}

impl Default for SessionConfigToml {
    fn default() -> Self {
        Self {
            state_path: default_session_state_path(),
        }
    }
}

/// Bearer token supplied through the environment; never written to the config file.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("AccessToken(<redacted>)")
    }
}

pub fn access_token_from_env() -> Option<AccessToken> {
    std::env::var(ENV_SPRINTDESK_ACCESS_TOKEN)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .map(AccessToken)
}

pub fn load_from_env() -> Result<SprintdeskConfig, ConfigError> {
    let path = config_path_from_env()?;
    load_from_path(path)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<SprintdeskConfig, ConfigError> {
    load_or_create_config(path.as_ref())
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let home = home_dir()
        .ok_or_else(|| ConfigError::configuration("Unable to resolve home directory from HOME"))?;

    Ok(home.join(".config").join("sprintdesk").join("config.toml"))
}

fn config_path_from_env() -> Result<PathBuf, ConfigError> {
    match std::env::var(ENV_SPRINTDESK_CONFIG) {
        Ok(raw) => {
            if raw.trim().is_empty() {
                default_config_path()
            } else {
                Ok(raw.into())
            }
        }
        Err(std::env::VarError::NotPresent) => default_config_path(),
        Err(_) => Err(ConfigError::configuration(
            "SPRINTDESK_CONFIG contained invalid UTF-8",
        )),
    }
}

fn home_dir() -> Option<PathBuf> {
    non_empty_env("HOME").map(PathBuf::from)
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_owned()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_creator_role() -> String {
    DEFAULT_CREATOR_ROLE.to_owned()
}

fn default_member_role() -> String {
    DEFAULT_MEMBER_ROLE.to_owned()
}

fn default_orphaned_team_policy() -> String {
    DEFAULT_ORPHANED_TEAM_POLICY.to_owned()
}

/// `$XDG_DATA_HOME/sprintdesk/session.json`, else under `~/.local/share`.
/// A relative `XDG_DATA_HOME` is ignored.
fn default_session_state_path() -> String {
    non_empty_env("XDG_DATA_HOME")
        .map(PathBuf::from)
        .filter(|path| path.is_absolute())
        .or_else(|| home_dir().map(|home| home.join(".local").join("share")))
        .unwrap_or_else(std::env::temp_dir)
        .join("sprintdesk")
        .join("session.json")
        .to_string_lossy()
        .to_string()
}

fn persist_config(path: &Path, config: &SprintdeskConfig) -> Result<(), ConfigError> {
    let rendered = toml::to_string_pretty(config).map_err(|err| {
        ConfigError::configuration(format!(
            "Failed to serialize SPRINTDESK_CONFIG for {}: {err}",
            path.display()
        ))
    })?;

    std::fs::write(path, rendered.as_bytes()).map_err(|err| {
        ConfigError::configuration(format!(
            "Failed to write SPRINTDESK_CONFIG to {}: {err}",
            path.display()
        ))
    })
}

fn load_or_create_config(path: &Path) -> Result<SprintdeskConfig, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|err| {
                        ConfigError::configuration(format!(
                            "Failed to create parent directory {} for SPRINTDESK_CONFIG: {err}",
                            parent.display()
                        ))
                    })?;
                }
            }

            let default_config = SprintdeskConfig::default();
            persist_config(path, &default_config)?;
            return Ok(default_config);
        }
        Err(err) => {
            return Err(ConfigError::configuration(format!(
                "Failed to read SPRINTDESK_CONFIG from {}: {err}",
                path.display()
            )));
        }
    };

    let mut config: SprintdeskConfig = toml::from_str(&raw).map_err(|err| {
        ConfigError::configuration(format!(
            "Failed to parse SPRINTDESK_CONFIG from {}: {err}",
            path.display()
        ))
    })?;

    if normalize_config(&mut config) {
        persist_config(path, &config)?;
    }

    Ok(config)
}

fn normalize_config(config: &mut SprintdeskConfig) -> bool {
    let mut changed = false;

    changed |= normalize_non_empty_string(&mut config.api.base_url, default_api_base_url());
    let trimmed_url = config.api.base_url.trim_end_matches('/').to_owned();
    if trimmed_url != config.api.base_url {
        config.api.base_url = trimmed_url;
        changed = true;
    }
    if config.api.request_timeout_secs == 0 {
        config.api.request_timeout_secs = default_request_timeout_secs();
        changed = true;
    }

    changed |= normalize_non_empty_string(&mut config.teams.creator_role, default_creator_role());
    changed |= normalize_non_empty_string(&mut config.teams.member_role, default_member_role());
    changed |= normalize_orphaned_team_policy(&mut config.teams.orphaned_team_policy);

    changed |= normalize_non_empty_string(
        &mut config.session.state_path,
        default_session_state_path(),
    );

    changed
}

fn normalize_non_empty_string(value: &mut String, default: String) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        *value = default;
        return true;
    }
    if trimmed.len() != value.len() {
        *value = trimmed.to_owned();
        return true;
    }
    false
}

fn normalize_orphaned_team_policy(value: &mut String) -> bool {
    let normalized = value.trim().to_ascii_lowercase();
    let normalized = if SUPPORTED_ORPHANED_TEAM_POLICIES.contains(&normalized.as_str()) {
        normalized
    } else {
        default_orphaned_team_policy()
    };
    if normalized == *value {
        return false;
    }
    *value = normalized;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, MutexGuard, OnceLock};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn env_lock() -> &'static Mutex<()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    /// Holds the env lock and restores the overridden variables on drop.
    struct EnvOverride {
        saved: Vec<(String, Option<String>)>,
        _guard: MutexGuard<'static, ()>,
    }

    impl EnvOverride {
        fn set(vars: &[(&str, Option<&str>)]) -> Self {
            let guard = env_lock()
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let saved = vars
                .iter()
                .map(|(name, value)| {
                    let previous = std::env::var(name).ok();
                    match value {
                        Some(value) => std::env::set_var(name, value),
                        None => std::env::remove_var(name),
                    }
                    ((*name).to_owned(), previous)
                })
                .collect();
            Self {
                saved,
                _guard: guard,
            }
        }
    }

    impl Drop for EnvOverride {
        fn drop(&mut self) {
            for (name, value) in self.saved.drain(..) {
                match value {
                    Some(value) => std::env::set_var(&name, value),
                    None => std::env::remove_var(&name),
                }
            }
        }
    }

    fn unique_temp_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "sprintdesk-config-{prefix}-{nanos}-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&path).expect("create temp dir");
        path
    }

    fn remove_temp_path(path: &Path) {
        let _ = std::fs::remove_dir_all(path);
    }

    fn write_config_file(path: &Path, raw: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create fixture config parent");
        }
        std::fs::write(path, raw.as_bytes()).expect("write fixture config");
    }

    #[test]
    fn missing_config_file_is_created_with_defaults() {
        let home = unique_temp_dir("create");
        let config_path = home.join("nested").join("config.toml");
        let config_path_raw = config_path.to_string_lossy().to_string();

        {
            let _env = EnvOverride::set(&[(ENV_SPRINTDESK_CONFIG, Some(config_path_raw.as_str()))]);
            let config = load_from_env().expect("load config");
            assert_eq!(config.api.base_url, DEFAULT_API_BASE_URL);
            assert_eq!(config.api.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
            assert_eq!(config.teams.orphaned_team_policy, "compensate");
            assert!(config_path.exists());

            let reloaded = load_from_path(&config_path).expect("reload config");
            assert_eq!(reloaded, config);
        }

        remove_temp_path(&home);
    }

    #[test]
    fn partial_config_fills_missing_sections_with_defaults() {
        let home = unique_temp_dir("partial");
        let config_path = home.join("config.toml");
        write_config_file(
            &config_path,
            "[api]\nbase_url = \"https://pm.example.com/api\"\n\n[session]\nstate_path = \"/tmp/sprintdesk/session.json\"\n",
        );

        let config = load_from_path(&config_path).expect("load partial config");

        assert_eq!(config.api.base_url, "https://pm.example.com/api");
        assert_eq!(config.api.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert_eq!(config.teams, TeamsConfigToml::default());
        assert_eq!(
            config.log_path(),
            PathBuf::from("/tmp/sprintdesk/sprintdesk.log")
        );

        remove_temp_path(&home);
    }

    #[test]
    fn invalid_values_are_normalized_and_persisted() {
        let home = unique_temp_dir("normalize");
        let config_path = home.join("config.toml");
        write_config_file(
            &config_path,
            "[api]\nbase_url = \"  \"\nrequest_timeout_secs = 0\n\n[teams]\ncreator_role = \"\"\nmember_role = \" dev \"\norphaned_team_policy = \"Explode\"\n\n[session]\nstate_path = \"/tmp/s.json\"\n",
        );

        let config = load_from_path(&config_path).expect("load config");

        assert_eq!(config.api.base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.api.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert_eq!(config.teams.creator_role, DEFAULT_CREATOR_ROLE);
        assert_eq!(config.teams.member_role, "dev");
        assert_eq!(config.teams.orphaned_team_policy, "compensate");

        let persisted = std::fs::read_to_string(&config_path).expect("read persisted config");
        assert!(persisted.contains("request_timeout_secs = 20"));
        assert!(persisted.contains("orphaned_team_policy = \"compensate\""));

        remove_temp_path(&home);
    }

    #[test]
    fn orphan_policy_is_case_normalized() {
        let mut policy = " KEEP ".to_owned();
        assert!(normalize_orphaned_team_policy(&mut policy));
        assert_eq!(policy, "keep");
        assert!(!normalize_orphaned_team_policy(&mut policy));
    }

    #[test]
    fn trailing_slash_is_trimmed_from_base_url() {
        let mut config = SprintdeskConfig::default();
        config.api.base_url = "https://pm.example.com/api/".to_owned();

        assert!(normalize_config(&mut config));
        assert_eq!(config.api.base_url, "https://pm.example.com/api");
    }

    #[test]
    fn malformed_toml_reports_the_path() {
        let home = unique_temp_dir("malformed");
        let config_path = home.join("config.toml");
        write_config_file(&config_path, "[api\nbase_url = 1");

        let error = load_from_path(&config_path).expect_err("parse failure");
        assert!(error.to_string().contains("Failed to parse SPRINTDESK_CONFIG"));

        remove_temp_path(&home);
    }

    #[test]
    fn access_token_comes_from_env_and_is_redacted() {
        {
            let _env = EnvOverride::set(&[(ENV_SPRINTDESK_ACCESS_TOKEN, Some("  secret-token  "))]);
            let token = access_token_from_env().expect("token");
            assert_eq!(token.expose(), "secret-token");
            assert!(!format!("{token:?}").contains("secret"));
        }
        let _env = EnvOverride::set(&[(ENV_SPRINTDESK_ACCESS_TOKEN, Some("   "))]);
        assert!(access_token_from_env().is_none());
    }

    #[test]
    fn session_state_defaults_to_xdg_data_home_then_home() {
        {
            let _env = EnvOverride::set(&[
                ("XDG_DATA_HOME", Some("/srv/data")),
                ("HOME", Some("/home/ana")),
            ]);
            assert_eq!(
                PathBuf::from(default_session_state_path()),
                PathBuf::from("/srv/data/sprintdesk/session.json")
            );
        }
        let _env = EnvOverride::set(&[
            ("XDG_DATA_HOME", Some("relative/data")),
            ("HOME", Some("/home/ana")),
        ]);
        assert_eq!(
            PathBuf::from(default_session_state_path()),
            PathBuf::from("/home/ana/.local/share/sprintdesk/session.json")
        );
    }
}
