//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! API keys are never stored in the TOML. Each credential names an env var
//! (`api_key_env`) and/or a file (`api_key_file`); the env var wins when set.

use cloud_api::{AssetType, Creator};
use common::Secret;
use quota_pool::Credential;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub cloud: CloudConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub intake: IntakeConfig,
    #[serde(default)]
    pub credentials: Vec<CredentialConfig>,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

/// Remote asset service settings
#[derive(Debug, Deserialize)]
pub struct CloudConfig {
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Pipeline settings
#[derive(Debug, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_asset_type")]
    pub asset_type: AssetType,
    /// Owning group. Exactly one of `group_id` / `user_id` must be set.
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default = "default_description")]
    pub description: String,
    #[serde(default = "default_max_retry")]
    pub max_retry: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// 0 disables the deadline.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
    #[serde(default = "default_quota_cache_secs")]
    pub quota_cache_secs: u64,
}

/// Inbound filtering
#[derive(Debug, Default, Deserialize)]
pub struct IntakeConfig {
    /// Channels allowed to submit. Empty means every channel.
    #[serde(default)]
    pub allowed_channels: Vec<String>,
}

/// One API key in the pool
#[derive(Debug, Deserialize)]
pub struct CredentialConfig {
    pub name: String,
    /// Lower is tried first. Defaults to declaration order.
    #[serde(default)]
    pub priority: Option<u32>,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub api_key_file: Option<PathBuf>,
    #[serde(skip)]
    pub api_key: Option<Secret<String>>,
}

fn default_timeout() -> u64 {
    60
}

fn default_max_connections() -> usize {
    1000
}

fn default_asset_type() -> AssetType {
    AssetType::Audio
}

fn default_description() -> String {
    "Uploaded by asset-upload-gateway".into()
}

fn default_max_retry() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    2000
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_poll_timeout_secs() -> u64 {
    600
}

fn default_quota_cache_secs() -> u64 {
    86_400
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            asset_type: default_asset_type(),
            group_id: None,
            user_id: None,
            description: default_description(),
            max_retry: default_max_retry(),
            retry_backoff_ms: default_retry_backoff_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            poll_timeout_secs: default_poll_timeout_secs(),
            quota_cache_secs: default_quota_cache_secs(),
        }
    }
}

impl UploadConfig {
    /// Owner recorded on every created asset.
    pub fn creator(&self) -> common::Result<Creator> {
        match (&self.group_id, &self.user_id) {
            (Some(group), None) => Ok(Creator::GroupId(group.clone())),
            (None, Some(user)) => Ok(Creator::UserId(user.clone())),
            (Some(_), Some(_)) => Err(common::Error::Config(
                "set only one of upload.group_id and upload.user_id".into(),
            )),
            (None, None) => Err(common::Error::Config(
                "one of upload.group_id or upload.user_id is required".into(),
            )),
        }
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_deadline(&self) -> Option<Duration> {
        (self.poll_timeout_secs > 0).then(|| Duration::from_secs(self.poll_timeout_secs))
    }

    pub fn quota_cache_period(&self) -> Duration {
        Duration::from_secs(self.quota_cache_secs)
    }
}

impl IntakeConfig {
    pub fn allows(&self, channel_id: &str) -> bool {
        self.allowed_channels.is_empty() || self.allowed_channels.iter().any(|c| c == channel_id)
    }
}

impl Config {
    /// Load configuration from a TOML file, validate it, then resolve every
    /// credential's API key.
    ///
    /// Key resolution order per credential:
    /// 1. the env var named by `api_key_env`
    /// 2. the file at `api_key_file`
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        config.validate()?;
        for credential in &mut config.credentials {
            credential.api_key = Some(credential.resolve_key()?);
        }

        Ok(config)
    }

    fn validate(&self) -> common::Result<()> {
        if !self.cloud.base_url.starts_with("http://")
            && !self.cloud.base_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                self.cloud.base_url
            )));
        }

        let non_zero = [
            ("max_connections", u64::try_from(self.server.max_connections).unwrap_or(u64::MAX)),
            ("timeout_secs", self.cloud.timeout_secs),
            ("max_retry", u64::from(self.upload.max_retry)),
            ("poll_interval_ms", self.upload.poll_interval_ms),
            ("quota_cache_secs", self.upload.quota_cache_secs),
        ];
        for (field, value) in non_zero {
            if value == 0 {
                return Err(common::Error::Config(format!(
                    "{field} must be greater than 0"
                )));
            }
        }

        self.upload.creator()?;

        if self.credentials.is_empty() {
            return Err(common::Error::Config(
                "at least one [[credentials]] entry is required".into(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for credential in &self.credentials {
            if !seen.insert(credential.name.as_str()) {
                return Err(common::Error::Config(format!(
                    "duplicate credential name: {}",
                    credential.name
                )));
            }
        }

        Ok(())
    }

    /// Credentials in declaration order, with priorities filled in.
    ///
    /// Only meaningful after `load`; entries without a resolved key are skipped.
    pub fn pool_credentials(&self) -> Vec<Credential> {
        self.credentials
            .iter()
            .enumerate()
            .filter_map(|(index, c)| {
                let key = c.api_key.clone()?;
                let priority = c.priority.unwrap_or_else(|| declared_priority(index));
                Some(Credential::new(c.name.clone(), key, priority))
            })
            .collect()
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("asset-upload-gateway.toml")
    }
}

/// Priority of the `index`-th declared credential: 1, 2, 3, ...
fn declared_priority(index: usize) -> u32 {
    u32::try_from(index).map_or(u32::MAX, |i| i.saturating_add(1))
}

impl CredentialConfig {
    fn resolve_key(&self) -> common::Result<Secret<String>> {
        let from_env = self
            .api_key_env
            .as_ref()
            .and_then(|var| std::env::var(var).ok())
            .and_then(|value| Secret::from_trimmed(&value));
        if let Some(key) = from_env {
            return Ok(key);
        }

        if let Some(key_file) = &self.api_key_file {
            let raw = std::fs::read_to_string(key_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read api_key_file {}: {e}",
                    key_file.display()
                ))
            })?;
            return Secret::from_trimmed(&raw).ok_or_else(|| common::Error::MissingKey {
                credential: self.name.clone(),
                reason: format!("{} is empty", key_file.display()),
            });
        }

        let reason = match &self.api_key_env {
            Some(var) => format!("{var} is not set and no api_key_file is configured"),
            None => "neither api_key_env nor api_key_file is configured".into(),
        };
        Err(common::Error::MissingKey {
            credential: self.name.clone(),
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mutex to serialize tests that mutate environment variables, preventing
    /// data races when tests run in parallel.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn valid_toml() -> &'static str {
        r#"
[server]
listen_addr = "127.0.0.1:8080"

[cloud]
base_url = "https://apis.example.com"

[upload]
group_id = "4242"

[[credentials]]
name = "primary"
api_key_env = "GATEWAY_TEST_PRIMARY_KEY"

[[credentials]]
name = "backup"
api_key_env = "GATEWAY_TEST_BACKUP_KEY"
"#
    }

    fn with_section(extra_upload: &str) -> String {
        format!(
            r#"
[server]
listen_addr = "127.0.0.1:8080"

[cloud]
base_url = "https://apis.example.com"

[upload]
group_id = "4242"
{extra_upload}

[[credentials]]
name = "primary"
api_key_env = "GATEWAY_TEST_PRIMARY_KEY"
"#
        )
    }

    #[test]
    fn test_load_valid_config_with_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, valid_toml());

        unsafe { set_env("GATEWAY_TEST_PRIMARY_KEY", "key-one") };
        unsafe { set_env("GATEWAY_TEST_BACKUP_KEY", "key-two") };
        let config = Config::load(&path).unwrap();
        unsafe { remove_env("GATEWAY_TEST_PRIMARY_KEY") };
        unsafe { remove_env("GATEWAY_TEST_BACKUP_KEY") };

        assert_eq!(config.server.max_connections, 1000);
        assert_eq!(config.cloud.timeout_secs, 60);
        assert_eq!(config.upload.asset_type, AssetType::Audio);
        assert_eq!(config.upload.max_retry, 3);
        assert_eq!(config.upload.retry_backoff(), Duration::from_millis(2000));
        assert_eq!(config.upload.poll_deadline(), Some(Duration::from_secs(600)));
        assert_eq!(config.upload.quota_cache_period(), Duration::from_secs(86_400));
        assert_eq!(
            config.upload.creator().unwrap(),
            Creator::GroupId("4242".into())
        );
        assert!(config.intake.allowed_channels.is_empty());

        let pool = config.pool_credentials();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool[0].name(), "primary");
        assert_eq!(pool[0].priority(), 1);
        assert_eq!(pool[0].api_key().expose(), "key-one");
        assert_eq!(pool[1].priority(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "not valid {{{{ toml");
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_api_key_from_file_is_trimmed() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let key_path = dir.path().join("key");
        std::fs::write(&key_path, "file-key-456\n").unwrap();

        let toml_content = format!(
            r#"
[server]
listen_addr = "127.0.0.1:8080"

[cloud]
base_url = "https://apis.example.com"

[upload]
user_id = "77"

[[credentials]]
name = "filed"
api_key_file = "{}"
"#,
            key_path.display()
        );
        let path = write_config(&dir, &toml_content);

        let config = Config::load(&path).unwrap();
        let pool = config.pool_credentials();
        assert_eq!(pool[0].api_key().expose(), "file-key-456");
        assert_eq!(config.upload.creator().unwrap(), Creator::UserId("77".into()));
    }

    #[test]
    fn test_api_key_env_overrides_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let key_path = dir.path().join("key");
        std::fs::write(&key_path, "file-value").unwrap();

        let toml_content = format!(
            r#"
[server]
listen_addr = "127.0.0.1:8080"

[cloud]
base_url = "https://apis.example.com"

[upload]
group_id = "1"

[[credentials]]
name = "both"
api_key_env = "GATEWAY_TEST_OVERRIDE_KEY"
api_key_file = "{}"
"#,
            key_path.display()
        );
        let path = write_config(&dir, &toml_content);

        unsafe { set_env("GATEWAY_TEST_OVERRIDE_KEY", "env-value") };
        let config = Config::load(&path).unwrap();
        unsafe { remove_env("GATEWAY_TEST_OVERRIDE_KEY") };

        assert_eq!(config.pool_credentials()[0].api_key().expose(), "env-value");
    }

    #[test]
    fn test_unset_env_without_file_is_missing_key() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, valid_toml());

        unsafe { remove_env("GATEWAY_TEST_PRIMARY_KEY") };
        unsafe { remove_env("GATEWAY_TEST_BACKUP_KEY") };
        let err = Config::load(&path).unwrap_err();
        match err {
            common::Error::MissingKey { credential, reason } => {
                assert_eq!(credential, "primary");
                assert!(reason.contains("GATEWAY_TEST_PRIMARY_KEY"), "got: {reason}");
            }
            other => panic!("expected MissingKey, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_key_file_is_missing_key() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let key_path = dir.path().join("key");
        std::fs::write(&key_path, "  \n  ").unwrap();

        let toml_content = format!(
            r#"
[server]
listen_addr = "127.0.0.1:8080"

[cloud]
base_url = "https://apis.example.com"

[upload]
group_id = "1"

[[credentials]]
name = "blank"
api_key_file = "{}"
"#,
            key_path.display()
        );
        let path = write_config(&dir, &toml_content);

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, common::Error::MissingKey { .. }), "got: {err:?}");
    }

    #[test]
    fn test_nonexistent_key_file_returns_error() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[server]
listen_addr = "127.0.0.1:8080"

[cloud]
base_url = "https://apis.example.com"

[upload]
group_id = "1"

[[credentials]]
name = "gone"
api_key_file = "/nonexistent/path/key"
"#,
        );

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("api_key_file"), "got: {err}");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            &valid_toml().replace("https://apis.example.com", "apis.example.com"),
        );

        let err = format!("{}", Config::load(&path).unwrap_err());
        assert!(
            err.contains("base_url must start with http"),
            "error message should explain the issue, got: {err}"
        );
    }

    #[test]
    fn test_zero_values_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("GATEWAY_TEST_PRIMARY_KEY", "key-one") };

        for (line, field) in [
            ("max_retry = 0", "max_retry"),
            ("poll_interval_ms = 0", "poll_interval_ms"),
            ("quota_cache_secs = 0", "quota_cache_secs"),
        ] {
            let dir = tempfile::tempdir().unwrap();
            let path = write_config(&dir, &with_section(line));
            let err = Config::load(&path).unwrap_err().to_string();
            assert!(err.contains(field), "{line} must be rejected, got: {err}");
        }

        unsafe { remove_env("GATEWAY_TEST_PRIMARY_KEY") };
    }

    #[test]
    fn test_zero_poll_timeout_disables_deadline() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("GATEWAY_TEST_PRIMARY_KEY", "key-one") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, &with_section("poll_timeout_secs = 0"));

        let config = Config::load(&path).unwrap();
        unsafe { remove_env("GATEWAY_TEST_PRIMARY_KEY") };
        assert_eq!(config.upload.poll_deadline(), None);
    }

    #[test]
    fn test_owner_is_required_and_exclusive() {
        let neither = UploadConfig::default();
        assert!(neither.creator().is_err());

        let both = UploadConfig {
            group_id: Some("1".into()),
            user_id: Some("2".into()),
            ..UploadConfig::default()
        };
        assert!(both.creator().is_err());
    }

    #[test]
    fn test_no_credentials_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[server]
listen_addr = "127.0.0.1:8080"

[cloud]
base_url = "https://apis.example.com"

[upload]
group_id = "1"
"#,
        );

        let err = Config::load(&path).unwrap_err().to_string();
        assert!(err.contains("credentials"), "got: {err}");
    }

    #[test]
    fn test_duplicate_credential_names_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            &valid_toml().replace("name = \"backup\"", "name = \"primary\""),
        );

        let err = Config::load(&path).unwrap_err().to_string();
        assert!(err.contains("duplicate credential name"), "got: {err}");
    }

    #[test]
    fn test_explicit_priority_is_kept() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            &valid_toml().replace(
                "name = \"backup\"",
                "name = \"backup\"\npriority = 0",
            ),
        );

        unsafe { set_env("GATEWAY_TEST_PRIMARY_KEY", "key-one") };
        unsafe { set_env("GATEWAY_TEST_BACKUP_KEY", "key-two") };
        let config = Config::load(&path).unwrap();
        unsafe { remove_env("GATEWAY_TEST_PRIMARY_KEY") };
        unsafe { remove_env("GATEWAY_TEST_BACKUP_KEY") };

        let pool = config.pool_credentials();
        assert_eq!(pool[1].name(), "backup");
        assert_eq!(pool[1].priority(), 0);
    }

    #[test]
    fn test_declared_priority_saturates() {
        assert_eq!(declared_priority(0), 1);
        assert_eq!(declared_priority(4), 5);
        assert_eq!(declared_priority(usize::try_from(u32::MAX).unwrap()), u32::MAX);
        assert_eq!(declared_priority(usize::MAX), u32::MAX);
    }

    #[test]
    fn test_allowed_channels() {
        let open = IntakeConfig::default();
        assert!(open.allows("anything"));

        let restricted = IntakeConfig {
            allowed_channels: vec!["uploads".into()],
        };
        assert!(restricted.allows("uploads"));
        assert!(!restricted.allows("general"));
    }

    #[test]
    fn test_resolve_path_cli_arg() {
        let path = Config::resolve_path(Some("/custom/path.toml"));
        assert_eq!(path, PathBuf::from("/custom/path.toml"));
    }

    #[test]
    fn test_resolve_path_env_var() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CONFIG_PATH", "/env/path.toml") };
        let path = Config::resolve_path(None);
        assert_eq!(path, PathBuf::from("/env/path.toml"));
        unsafe { remove_env("CONFIG_PATH") };
    }

    #[test]
    fn test_resolve_path_default() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("CONFIG_PATH") };
        let path = Config::resolve_path(None);
        assert_eq!(path, PathBuf::from("asset-upload-gateway.toml"));
    }

    #[test]
    fn test_resolve_path_cli_overrides_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CONFIG_PATH", "/env/should-lose.toml") };
        let path = Config::resolve_path(Some("/cli/wins.toml"));
        assert_eq!(
            path,
            PathBuf::from("/cli/wins.toml"),
            "CLI arg must take precedence over CONFIG_PATH env var"
        );
        unsafe { remove_env("CONFIG_PATH") };
    }
}
