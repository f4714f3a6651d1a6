use crate::error::{CloudyError, Result};
use crate::extensions::default_allowed_extensions;
use crate::types::{Credentials, ProviderType};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variables read by [`StorageConfig::apply_env`].
pub const ENV_PREFIX: &str = "CLOUDY_STORAGE_";

/// Top-level configuration file stored as TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudyConfig {
    pub storage: StorageConfig,
}

/// Everything a storage facade needs. Immutable once a facade is built.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Provider name: "local", "s3", "s3compatible", "gcs", "azure", or a
    /// name registered with the driver registry.
    pub provider: String,
    /// Access key (S3/GCS access id, Azure account name).
    #[serde(default)]
    pub key: Option<String>,
    /// Secret key (S3/GCS HMAC secret, Azure access key).
    #[serde(default)]
    pub secret: Option<String>,
    /// Bucket / container name, or a directory for the local provider.
    #[serde(default)]
    pub container: String,
    /// Lowercase extensions accepted for upload. Empty or absent means the
    /// built-in default whitelist.
    #[serde(default)]
    pub allowed_extensions: Option<Vec<String>>,
    /// Serve local objects over HTTP.
    #[serde(default = "default_serve_files")]
    pub serve_files: bool,
    /// Route prefix of the file server.
    #[serde(default = "default_serve_files_url")]
    pub serve_files_url: String,
    /// Scheme + host used for fully-qualified local URLs (e.g. `http://localhost:8080`).
    #[serde(default)]
    pub public_url: Option<String>,
    /// Prefer `https` URLs by default.
    #[serde(default)]
    pub secure_urls: bool,
    /// Region for S3-family providers.
    #[serde(default)]
    pub region: Option<String>,
    /// Custom endpoint URL for S3-compatible providers (MinIO, RustFS, Garage, etc.)
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// Use path-style addressing. Default: true for S3Compatible, false for S3.
    #[serde(default)]
    pub path_style: Option<bool>,
}

fn default_serve_files() -> bool {
    true
}

fn default_serve_files_url() -> String {
    "files".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: String::new(),
            key: None,
            secret: None,
            container: String::new(),
            allowed_extensions: None,
            serve_files: default_serve_files(),
            serve_files_url: default_serve_files_url(),
            public_url: None,
            secure_urls: false,
            region: None,
            endpoint_url: None,
            path_style: None,
        }
    }
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("provider", &self.provider)
            .field("credentials", &self.credentials())
            .field("container", &self.container)
            .field("allowed_extensions", &self.allowed_extensions)
            .field("serve_files", &self.serve_files)
            .field("serve_files_url", &self.serve_files_url)
            .field("public_url", &self.public_url)
            .field("secure_urls", &self.secure_urls)
            .field("region", &self.region)
            .field("endpoint_url", &self.endpoint_url)
            .field("path_style", &self.path_style)
            .finish()
    }
}

impl StorageConfig {
    /// Local-filesystem configuration rooted at an existing directory.
    pub fn local(container: &Path) -> Self {
        Self {
            provider: ProviderType::Local.to_string(),
            container: container.display().to_string(),
            ..Self::default()
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.key.as_deref(), self.secret.as_deref())
    }

    /// Effective upload whitelist, lowercased.
    pub fn allowed_extensions(&self) -> Vec<String> {
        match &self.allowed_extensions {
            Some(exts) if !exts.is_empty() => exts
                .iter()
                .map(|e| e.trim().trim_start_matches('.').to_lowercase())
                .collect(),
            _ => default_allowed_extensions(),
        }
    }

    pub fn provider_type(&self) -> Result<ProviderType> {
        if self.provider.trim().is_empty() {
            return Err(CloudyError::Config("'provider' is missing".to_string()));
        }
        self.provider.parse()
    }

    /// Provider-specific checks for the built-in providers.
    pub fn validate(&self) -> Result<ProviderType> {
        let provider = self.provider_type()?;

        if self.container.trim().is_empty() {
            return Err(CloudyError::Config("'container' is missing".to_string()));
        }

        match provider {
            ProviderType::Local => {
                if !Path::new(&self.container).is_dir() {
                    return Err(CloudyError::Config(format!(
                        "Local container (directory) '{}' is not a directory or doesn't exist",
                        self.container
                    )));
                }
            }
            ProviderType::S3 => {
                if self.key.is_some() != self.secret.is_some() {
                    return Err(CloudyError::Config(
                        "S3 requires both 'key' and 'secret', or neither".to_string(),
                    ));
                }
            }
            ProviderType::S3Compatible => {
                if self.endpoint_url.is_none() {
                    return Err(CloudyError::Config(
                        "S3Compatible requires 'endpoint_url'".to_string(),
                    ));
                }
            }
            ProviderType::Azure => {
                if self.key.is_none() || self.secret.is_none() {
                    return Err(CloudyError::Config(
                        "Azure requires 'key' (account) and 'secret' (access key)".to_string(),
                    ));
                }
            }
            ProviderType::Gcs | ProviderType::Cloudfiles | ProviderType::Other => {}
        }

        Ok(provider)
    }

    /// Overlay `CLOUDY_STORAGE_*` values from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(format!("{ENV_PREFIX}{name}")).ok());
    }

    /// Overlay values from any lookup keyed by the suffix after [`ENV_PREFIX`].
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("PROVIDER") {
            self.provider = v;
        }
        if let Some(v) = lookup("KEY") {
            self.key = Some(v);
        }
        if let Some(v) = lookup("SECRET") {
            self.secret = Some(v);
        }
        if let Some(v) = lookup("CONTAINER") {
            self.container = v;
        }
        if let Some(v) = lookup("ALLOWED_EXTENSIONS") {
            self.allowed_extensions = Some(
                v.split(',')
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .map(str::to_string)
                    .collect(),
            );
        }
        if let Some(v) = lookup("SERVER") {
            self.serve_files = matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
        if let Some(v) = lookup("SERVER_URL") {
            self.serve_files_url = v;
        }
        if let Some(v) = lookup("PUBLIC_URL") {
            self.public_url = Some(v);
        }
    }
}

impl CloudyConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CloudyError::ConfigNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CloudyError::TomlDe(e.to_string()))
    }

    /// Save config to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| CloudyError::TomlSer(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolve the config file path: `<base_dir>/cloudy.toml`
    pub fn default_path(base_dir: &Path) -> PathBuf {
        base_dir.join("cloudy.toml")
    }

    /// Resolve the default home directory: `~/.cloudy`
    pub fn default_base_dir() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|h| h.join(".cloudy"))
            .ok_or_else(|| CloudyError::Config("Cannot determine home directory".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn roundtrip_config() {
        let tmp = TempDir::new().unwrap();
        let path = CloudyConfig::default_path(tmp.path());
        let config = CloudyConfig {
            storage: StorageConfig::local(tmp.path()),
        };
        config.save(&path).unwrap();
        let loaded = CloudyConfig::load(&path).unwrap();
        assert_eq!(loaded.storage, config.storage);
    }

    #[test]
    fn load_nonexistent_returns_error() {
        let result = CloudyConfig::load(Path::new("/nonexistent/cloudy.toml"));
        assert!(matches!(result, Err(CloudyError::ConfigNotFound(_))));
    }

    #[test]
    fn minimal_toml_gets_defaults() {
        let config: CloudyConfig = toml::from_str(
            r#"
            [storage]
            provider = "s3"
            container = "uploads"
            "#,
        )
        .unwrap();
        assert!(config.storage.serve_files);
        assert_eq!(config.storage.serve_files_url, "files");
        assert!(!config.storage.secure_urls);
        assert!(config.storage.allowed_extensions().contains(&"png".to_string()));
    }

    #[test]
    fn configured_whitelist_is_normalized() {
        let config = StorageConfig {
            allowed_extensions: Some(vec!["TXT".into(), ".Md".into()]),
            ..StorageConfig::default()
        };
        assert_eq!(config.allowed_extensions(), vec!["txt", "md"]);
    }

    #[test]
    fn empty_whitelist_falls_back_to_default() {
        let config = StorageConfig {
            allowed_extensions: Some(vec![]),
            ..StorageConfig::default()
        };
        assert!(config.allowed_extensions().contains(&"txt".to_string()));
    }

    #[test]
    fn missing_provider_is_rejected() {
        let config = StorageConfig::default();
        assert!(matches!(config.validate(), Err(CloudyError::Config(_))));
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let config = StorageConfig {
            provider: "ftp".into(),
            container: "x".into(),
            ..StorageConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CloudyError::InvalidProvider(_))
        ));
    }

    #[test]
    fn local_requires_existing_directory() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(
            StorageConfig::local(tmp.path()).validate().unwrap(),
            ProviderType::Local
        );

        let missing = StorageConfig::local(&tmp.path().join("nope"));
        assert!(matches!(missing.validate(), Err(CloudyError::Config(_))));

        let file = tmp.path().join("file.txt");
        std::fs::write(&file, b"x").unwrap();
        assert!(StorageConfig::local(&file).validate().is_err());
    }

    #[test]
    fn provider_credentials_are_checked() {
        let half_s3 = StorageConfig {
            provider: "s3".into(),
            container: "bucket".into(),
            key: Some("AKIA".into()),
            ..StorageConfig::default()
        };
        assert!(half_s3.validate().is_err());

        let azure = StorageConfig {
            provider: "azure".into(),
            container: "blobs".into(),
            key: Some("account".into()),
            ..StorageConfig::default()
        };
        assert!(azure.validate().is_err());

        let compatible = StorageConfig {
            provider: "minio".into(),
            container: "bucket".into(),
            ..StorageConfig::default()
        };
        assert!(compatible.validate().is_err());
    }

    #[test]
    fn overrides_apply_on_top() {
        let env: HashMap<&str, &str> = [
            ("PROVIDER", "gcs"),
            ("CONTAINER", "media"),
            ("ALLOWED_EXTENSIONS", "jpg, png,,gif"),
            ("SERVER", "false"),
            ("SERVER_URL", "static"),
        ]
        .into();
        let mut config = StorageConfig::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.provider, "gcs");
        assert_eq!(config.container, "media");
        assert_eq!(config.allowed_extensions(), vec!["jpg", "png", "gif"]);
        assert!(!config.serve_files);
        assert_eq!(config.serve_files_url, "static");
        assert_eq!(config.validate().unwrap(), ProviderType::Gcs);
    }
}
