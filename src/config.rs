use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A validation error in the configuration
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]: {}", self.field, self.message)
    }
}

/// Remote API settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    "http://localhost:4000/api".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

/// Asset-host settings for image uploads. Both fields must be set for the
/// upload path to be usable; posts can always reference an image by URL.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UploadsConfig {
    #[serde(default)]
    pub cloud_name: Option<String>,
    #[serde(default)]
    pub upload_preset: Option<String>,
}

impl UploadsConfig {
    /// The upload endpoint, when uploads are configured.
    pub fn endpoint(&self) -> Option<String> {
        self.cloud_name
            .as_ref()
            .map(|cloud| format!("https://api.cloudinary.com/v1_1/{}/image/upload", cloud))
    }
}

/// Listing presentation settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UiConfig {
    #[serde(default = "default_page_limit")]
    pub page_limit: u64,
    /// Sort order sent with post listings (e.g. "-createdAt").
    #[serde(default)]
    pub sort: Option<String>,
}

fn default_page_limit() -> u64 {
    10
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            page_limit: default_page_limit(),
            sort: None,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub uploads: UploadsConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

impl Config {
    /// Load configuration from default paths
    /// Priority: local (.vitrina/config.local.toml) > project (.vitrina/config.toml) > user (~/.vitrina/config.toml)
    /// Starts with builtin defaults, then merges each layer that exists
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".vitrina").join("config.toml");
            if user_config.exists() {
                let user = Self::load_from(&user_config)?;
                config.merge(user);
            }
        }

        let project_config = Path::new(".vitrina").join("config.toml");
        if project_config.exists() {
            let project = Self::load_from(&project_config)?;
            config.merge(project);
        }

        // Local overrides, should be gitignored
        let local_config = Path::new(".vitrina").join("config.local.toml");
        if local_config.exists() {
            let local = Self::load_from(&local_config)?;
            config.merge(local);
        }

        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Merge another config into this one (other takes priority)
    /// Scalars are overridden when they differ from the builtin default,
    /// options when set
    pub fn merge(&mut self, other: Config) {
        if other.api.base_url != default_base_url() {
            self.api.base_url = other.api.base_url;
        }

        if other.uploads.cloud_name.is_some() {
            self.uploads.cloud_name = other.uploads.cloud_name;
        }
        if other.uploads.upload_preset.is_some() {
            self.uploads.upload_preset = other.uploads.upload_preset;
        }

        if other.ui.page_limit != default_page_limit() {
            self.ui.page_limit = other.ui.page_limit;
        }
        if other.ui.sort.is_some() {
            self.ui.sort = other.ui.sort;
        }
    }

    /// Validate configuration and return any errors found
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://") {
            errors.push(ValidationError {
                field: "api.base_url".to_string(),
                message: format!("Must be an http(s) URL, got '{}'", self.api.base_url),
            });
        }

        if self.ui.page_limit == 0 {
            errors.push(ValidationError {
                field: "ui.page_limit".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        // Uploads are all-or-nothing: a cloud name without a preset (or the
        // reverse) cannot produce a working upload request.
        match (&self.uploads.cloud_name, &self.uploads.upload_preset) {
            (Some(_), None) => errors.push(ValidationError {
                field: "uploads.upload_preset".to_string(),
                message: "Required when uploads.cloud_name is set".to_string(),
            }),
            (None, Some(_)) => errors.push(ValidationError {
                field: "uploads.cloud_name".to_string(),
                message: "Required when uploads.upload_preset is set".to_string(),
            }),
            _ => {}
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Root directory for per-user state (session, journals, history).
pub fn state_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".vitrina")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:4000/api");
        assert_eq!(config.ui.page_limit, 10);
        assert!(config.ui.sort.is_none());
        assert!(config.uploads.endpoint().is_none());
    }

    #[test]
    fn test_merge_overrides_set_values() {
        let mut base = Config::default();
        let other: Config = toml::from_str(
            r#"
            [api]
            base_url = "https://shop.example.com/api"

            [ui]
            page_limit = 25
        "#,
        )
        .unwrap();

        base.merge(other);
        assert_eq!(base.api.base_url, "https://shop.example.com/api");
        assert_eq!(base.ui.page_limit, 25);
    }

    #[test]
    fn test_merge_keeps_unset_values() {
        let mut base: Config = toml::from_str(
            r#"
            [api]
            base_url = "https://shop.example.com/api"

            [uploads]
            cloud_name = "demo"
            upload_preset = "unsigned"
        "#,
        )
        .unwrap();

        base.merge(Config::default());
        assert_eq!(base.api.base_url, "https://shop.example.com/api");
        assert_eq!(base.uploads.cloud_name.as_deref(), Some("demo"));
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_bad_base_url() {
        let mut config = Config::default();
        config.api.base_url = "localhost:4000".to_string();
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].field.contains("base_url"));
    }

    #[test]
    fn test_validate_zero_page_limit() {
        let mut config = Config::default();
        config.ui.page_limit = 0;
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].field.contains("page_limit"));
    }

    #[test]
    fn test_validate_partial_uploads() {
        let mut config = Config::default();
        config.uploads.cloud_name = Some("demo".to_string());
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].field.contains("upload_preset"));
    }

    #[test]
    fn test_upload_endpoint() {
        let mut config = Config::default();
        config.uploads.cloud_name = Some("demo".to_string());
        config.uploads.upload_preset = Some("unsigned".to_string());
        assert_eq!(
            config.uploads.endpoint().as_deref(),
            Some("https://api.cloudinary.com/v1_1/demo/image/upload")
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            [api]
            base_url = "https://shop.example.com/api"
        "#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.api.base_url, "https://shop.example.com/api");
        // Unset sections fall back to defaults
        assert_eq!(config.ui.page_limit, 10);
    }
}
