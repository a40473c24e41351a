//! Configuration file handling
//!
//! Settings live in `<config dir>/modernize/config.toml`:
//!
//! ```toml
//! [transform]
//! skip_url_rewrite = false
//! asset_folder = "SiteAssets/migrated"
//! blocked_extensions = ["exe", "dll"]
//!
//! [logging]
//! level = "info"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub transform: TransformSettings,
    pub logging: LoggingSettings,
}

impl Config {
    /// `<config dir>/modernize/config.toml`, when the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("modernize").join("config.toml"))
    }

    /// Load from a file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    /// Load from the default location
    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(ConfigError::Toml)
    }
}

/// What a file extension is allowed to do during asset transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetClass {
    Image,
    Document,
    /// Explicitly refused
    Blocked,
    /// Neither listed nor blocked
    Unsupported,
}

/// Knobs for the built-in functions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformSettings {
    /// Leave embedded links pointing at the source site
    pub skip_url_rewrite: bool,
    pub image_extensions: Vec<String>,
    pub document_extensions: Vec<String>,
    pub blocked_extensions: Vec<String>,
    /// Web-relative folder transferred assets are written to
    pub asset_folder: String,
    pub cache_lookups: bool,
    /// Replace taxonomy values already present on the target
    pub overwrite_taxonomy: bool,
}

impl Default for TransformSettings {
    fn default() -> Self {
        fn list(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }
        Self {
            skip_url_rewrite: false,
            image_extensions: list(&["png", "jpg", "jpeg", "gif", "bmp", "svg", "tif", "tiff", "webp"]),
            document_extensions: list(&[
                "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "txt", "csv", "rtf", "mp4",
                "mp3", "zip", "html", "htm",
            ]),
            blocked_extensions: list(&["exe", "dll", "bat", "cmd", "com", "msi", "ps1", "vbs", "js", "asp"]),
            asset_folder: "SiteAssets/migrated".to_string(),
            cache_lookups: true,
            overwrite_taxonomy: false,
        }
    }
}

impl TransformSettings {
    /// Classify a path by its extension; matching is case-insensitive and
    /// list entries may be written with or without the leading dot
    pub fn classify(&self, path: &str) -> AssetClass {
        let Some(ext) = extension_of(path) else {
            return AssetClass::Unsupported;
        };
        let listed = |list: &[String]| {
            list.iter()
                .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(&ext))
        };
        if listed(&self.blocked_extensions) {
            AssetClass::Blocked
        } else if listed(&self.image_extensions) {
            AssetClass::Image
        } else if listed(&self.document_extensions) {
            AssetClass::Document
        } else {
            AssetClass::Unsupported
        }
    }
}

/// Lowercased extension of the last path segment, ignoring query and fragment
pub fn extension_of(path: &str) -> Option<String> {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let file = path.rsplit('/').next().unwrap_or(path);
    let (stem, ext) = file.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: LogLevel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [transform]
            skip_url_rewrite = true
            asset_folder = "SiteAssets/imported"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert!(config.transform.skip_url_rewrite);
        assert_eq!(config.transform.asset_folder, "SiteAssets/imported");
        assert!(config.transform.cache_lookups);
        assert!(!config.transform.image_extensions.is_empty());
        assert_eq!(config.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(matches!(
            Config::from_toml("[transform]\nskip_url_rewrite = 3"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[transform]\noverwrite_taxonomy = true\n").unwrap();
        assert!(Config::load(&path).unwrap().transform.overwrite_taxonomy);
    }

    #[test]
    fn test_classify_extensions() {
        let settings = TransformSettings {
            image_extensions: vec![".PNG".into()],
            ..Default::default()
        };
        assert_eq!(settings.classify("/sites/a/logo.png"), AssetClass::Image);
        assert_eq!(settings.classify("/sites/a/report.PDF"), AssetClass::Document);
        assert_eq!(settings.classify("/sites/a/setup.exe"), AssetClass::Blocked);
        assert_eq!(settings.classify("/sites/a/data.xyz"), AssetClass::Unsupported);
        assert_eq!(settings.classify("/sites/a/folder"), AssetClass::Unsupported);
        assert_eq!(settings.classify("/sites/a/logo.png?rev=2"), AssetClass::Image);
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("/a/b.c/file.JPG"), Some("jpg".into()));
        assert_eq!(extension_of("/a/.hidden"), None);
        assert_eq!(extension_of("/a/noext"), None);
    }
}
