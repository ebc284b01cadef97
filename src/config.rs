use clap::Args;
use serde::Deserialize;
use std::path::PathBuf;
use url::Url;

use crate::error::{ClientError, ClientResult};

/// Options shared by every command that locate and override the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend base URL
    #[arg(long, global = true, env = "CAMPUS_FEED_API")]
    pub base_url: Option<String>,

    /// Path to data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub auth: AuthConfig,
    pub upload: UploadConfig,
    pub storage: StorageConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    /// Roles allowed to sign in before their student ID is verified.
    pub exempt_roles: Vec<String>,
    /// Hours after `password_reset_deadline` before sign-in is refused.
    pub password_grace_hours: i64,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct UploadConfig {
    pub endpoint: Option<String>,
    pub preset: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct StorageConfig {
    pub session_db: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://danhdanghoang.pythonanywhere.com/".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            exempt_roles: vec!["Giảng viên".to_string()],
            password_grace_hours: 24,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            preset: "ml_default".to_string(),
        }
    }
}

impl Config {
    pub fn load(args: &ConfigArgs) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(args);
        let config_path = args
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref base_url) = args.base_url {
            config.api.base_url = base_url.clone();
        }

        // Resolve paths relative to data dir
        if config.storage.session_db.is_none() {
            config.storage.session_db = Some(data_dir.join("session.db"));
        }

        Ok(config)
    }

    pub fn data_dir(args: &ConfigArgs) -> PathBuf {
        args.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".campus-feed")
        })
    }

    /// Base URL with a trailing slash, so relative resource paths join under it.
    pub fn base_url(&self) -> ClientResult<Url> {
        let mut raw = self.api.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Ok(Url::parse(&raw)?)
    }

    pub fn session_db_path(&self) -> ClientResult<&PathBuf> {
        self.storage
            .session_db
            .as_ref()
            .ok_or_else(|| ClientError::Internal("session database path not resolved".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(
            config.api.base_url,
            "https://danhdanghoang.pythonanywhere.com/"
        );
        assert_eq!(config.auth.exempt_roles, vec!["Giảng viên".to_string()]);
        assert_eq!(config.auth.password_grace_hours, 24);
        assert_eq!(config.upload.preset, "ml_default");
        assert!(config.upload.endpoint.is_none());
        assert!(config.storage.session_db.is_none());
    }

    #[test]
    fn data_dir_uses_cli_override() {
        let args = ConfigArgs {
            data_dir: Some(PathBuf::from("/tmp/test-campus-feed")),
            ..Default::default()
        };
        assert_eq!(
            Config::data_dir(&args),
            PathBuf::from("/tmp/test-campus-feed")
        );
    }

    #[test]
    fn data_dir_defaults_to_home_dot_dir() {
        let dir = Config::data_dir(&ConfigArgs::default());
        assert!(dir.ends_with(".campus-feed"));
    }

    #[test]
    fn load_with_no_config_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let args = ConfigArgs {
            data_dir: Some(tmp.path().to_path_buf()),
            ..Default::default()
        };
        let config = Config::load(&args).unwrap();
        assert_eq!(
            config.session_db_path().unwrap(),
            &tmp.path().join("session.db")
        );
    }

    #[test]
    fn load_reads_toml_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[api]
base_url = "http://127.0.0.1:8000"
client_id = "abc"
client_secret = "shh"

[auth]
exempt_roles = ["Giảng viên", "Quản trị"]

[upload]
endpoint = "https://upload.example/image/upload"
"#,
        )
        .unwrap();

        let args = ConfigArgs {
            config: Some(config_path),
            data_dir: Some(tmp.path().to_path_buf()),
            ..Default::default()
        };
        let config = Config::load(&args).unwrap();
        assert_eq!(config.api.client_id, "abc");
        assert_eq!(config.auth.exempt_roles.len(), 2);
        assert_eq!(config.auth.password_grace_hours, 24);
        assert_eq!(config.upload.preset, "ml_default");
        assert_eq!(
            config.base_url().unwrap().as_str(),
            "http://127.0.0.1:8000/"
        );
    }

    #[test]
    fn cli_overrides_beat_toml_values() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(&config_path, "[api]\nbase_url = \"http://a.example/\"\n").unwrap();

        let args = ConfigArgs {
            config: Some(config_path),
            base_url: Some("http://b.example/api".to_string()),
            data_dir: Some(tmp.path().to_path_buf()),
        };
        let config = Config::load(&args).unwrap();
        assert_eq!(config.base_url().unwrap().as_str(), "http://b.example/api/");
    }
}
