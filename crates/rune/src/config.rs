use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{RwLock, RwLockReadGuard};

/// Placeholder token written into a fresh template.
pub const TOKEN_PLACEHOLDER: &str = "YOUR_TOKEN_HERE";

// ============================================================================
// Config (root)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub token: String,
    /// Account whose messages may run commands. Accepts a JSON number or
    /// string on load and is always written back as a string.
    #[serde(default, deserialize_with = "deserialize_owner_id")]
    pub owner_id: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub auto_response_enabled: bool,
    #[serde(default = "default_auto_response_phrase")]
    pub auto_response_phrase: String,
    #[serde(default)]
    pub auto_emoji_enabled: bool,
    #[serde(default)]
    pub auto_emoji: String,
    #[serde(default)]
    pub api: ApiConfig,
    /// Keys this version does not know about; kept so saving never drops them.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: String::new(),
            owner_id: String::new(),
            prefix: default_prefix(),
            auto_response_enabled: false,
            auto_response_phrase: default_auto_response_phrase(),
            auto_emoji_enabled: false,
            auto_emoji: String::new(),
            api: ApiConfig::default(),
            extra: Map::new(),
        }
    }
}

impl Config {
    /// Load the config file. A missing file is reported as
    /// [`ConfigError::NotFound`] so the caller can write a template.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = match fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };
        Ok(serde_json::from_str(&contents)?)
    }

    /// A config with a placeholder token, for first runs.
    pub fn template() -> Self {
        Self {
            token: TOKEN_PLACEHOLDER.to_string(),
            ..Self::default()
        }
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let mut data = serde_json::to_vec_pretty(self)?;
        data.push(b'\n');
        atomic_write_file(path.as_ref(), &data).await
    }

    /// Reject configs that cannot possibly connect.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let token = self.token.trim();
        if token.is_empty() || token == TOKEN_PLACEHOLDER {
            return Err(ConfigError::MissingToken);
        }
        Ok(())
    }
}

fn default_prefix() -> String {
    "&".to_string()
}

fn default_auto_response_phrase() -> String {
    "```[RUNE]\n\nHey, <user>!\n\nI am currently not behind my pc or in the mood to respond, \
     please try dming me or message me at a later time instead.```"
        .to_string()
}

fn deserialize_owner_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => match n.as_u64() {
            Some(id) => Ok(id.to_string()),
            // Older files stored the id as a float.
            None => Ok(n.as_f64().map(|f| format!("{f:.0}")).unwrap_or_default()),
        },
        other => Err(serde::de::Error::custom(format!(
            "owner_id must be a string or number, got {other}"
        ))),
    }
}

// ============================================================================
// ApiConfig
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

// ============================================================================
// ConfigStore
// ============================================================================

/// The live config plus the file it persists to.
///
/// Every mutation goes through [`ConfigStore::update`], which applies the
/// change to a copy, writes it to disk, and only then publishes it. A failed
/// write leaves both the file and the in-memory config untouched.
pub struct ConfigStore {
    path: PathBuf,
    inner: RwLock<Config>,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            path: path.into(),
            inner: RwLock::new(config),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, Config> {
        self.inner.read().await
    }

    pub async fn snapshot(&self) -> Config {
        self.inner.read().await.clone()
    }

    pub async fn update<F, R>(&self, f: F) -> Result<R, ConfigError>
    where
        F: FnOnce(&mut Config) -> R,
    {
        let mut guard = self.inner.write().await;
        let mut next = guard.clone();
        let result = f(&mut next);
        next.save(&self.path).await?;
        *guard = next;
        Ok(result)
    }
}

/// Write to a temp file, fsync, then rename over the final path.
async fn atomic_write_file(final_path: &Path, data: &[u8]) -> Result<(), ConfigError> {
    let file_name = final_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("config.json");
    let temp_path = final_path.with_file_name(format!("{}.{}.tmp", file_name, ulid::Ulid::new()));

    let mut file = fs::File::create(&temp_path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    fs::rename(&temp_path, final_path).await?;
    Ok(())
}

// ============================================================================
// ConfigError
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read or write config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no token configured; set \"token\" in the config file")]
    MissingToken,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.prefix, "&");
        assert!(!config.auto_response_enabled);
        assert!(config.auto_response_phrase.contains("<user>"));
        assert_eq!(config.api.host, "127.0.0.1");
        assert_eq!(config.api.port, 8080);
    }

    #[tokio::test]
    async fn test_load_missing_file_is_not_found() {
        let tmp_dir = TempDir::new().unwrap();
        let missing = tmp_dir.path().join("config.json");
        let err = Config::load(&missing).await.unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(p) if p == missing));
    }

    #[tokio::test]
    async fn test_load_numeric_owner_id() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"token": "abc", "owner_id": 123456789012345678, "prefix": "!"}}"#
        )
        .unwrap();

        let config = Config::load(file.path()).await.unwrap();
        assert_eq!(config.owner_id, "123456789012345678");
        assert_eq!(config.prefix, "!");
        assert_eq!(config.api.port, 8080); // default
    }

    #[tokio::test]
    async fn test_load_float_owner_id() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"token": "abc", "owner_id": 42.0}}"#).unwrap();

        let config = Config::load(file.path()).await.unwrap();
        assert_eq!(config.owner_id, "42");
    }

    #[tokio::test]
    async fn test_load_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{{ not json").unwrap();

        let result = Config::load(file.path()).await;
        assert!(matches!(result, Err(ConfigError::Json(_))));
    }

    #[tokio::test]
    async fn test_unknown_keys_survive_save() {
        let tmp_dir = TempDir::new().unwrap();
        let path = tmp_dir.path().join("config.json");
        tokio::fs::write(
            &path,
            r#"{"token": "abc", "owner_id": "42", "rpc": {"enabled": false}}"#,
        )
        .await
        .unwrap();

        let config = Config::load(&path).await.unwrap();
        config.save(&path).await.unwrap();

        let raw: Value = serde_json::from_str(&tokio::fs::read_to_string(&path).await.unwrap())
            .unwrap();
        assert_eq!(raw["rpc"]["enabled"], false);
        assert_eq!(raw["owner_id"], "42");
    }

    #[test]
    fn test_validate_rejects_placeholder_token() {
        assert!(matches!(
            Config::template().validate(),
            Err(ConfigError::MissingToken)
        ));
        assert!(matches!(
            Config::default().validate(),
            Err(ConfigError::MissingToken)
        ));

        let config = Config {
            token: "real".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_store_update_persists_and_reloads() {
        let tmp_dir = TempDir::new().unwrap();
        let path = tmp_dir.path().join("config.json");
        let store = ConfigStore::new(&path, Config::template());

        store.update(|c| c.prefix = "!".to_string()).await.unwrap();
        assert_eq!(store.read().await.prefix, "!");

        let reloaded = Config::load(&path).await.unwrap();
        assert_eq!(reloaded, store.snapshot().await);
    }

    #[tokio::test]
    async fn test_store_failed_write_keeps_previous_value() {
        let tmp_dir = TempDir::new().unwrap();
        let path = tmp_dir.path().join("missing-dir").join("config.json");
        let store = ConfigStore::new(&path, Config::default());

        let result = store.update(|c| c.prefix = "!".to_string()).await;
        assert!(result.is_err());
        assert_eq!(store.read().await.prefix, "&");
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Io(std::io::Error::new(ErrorKind::PermissionDenied, "test"));
        assert!(err.to_string().contains("failed to read or write config file"));
    }
}
