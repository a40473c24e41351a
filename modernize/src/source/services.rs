//! Pluggable services the built-in functions call out to

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use regex::{Captures, Regex};

use super::WebInfo;
use crate::error::{AssetError, ConfigError};

/// Rewrites links embedded in text so they point at the target site
pub trait UrlMapper: Send + Sync {
    fn map_url(&self, text: &str) -> String;
}

/// Maps a source identity to the identity used on the target tenant
pub trait UserMapper: Send + Sync {
    fn map_user(&self, login: &str) -> String;
}

/// Stores a transferred binary and returns its new server-relative path
pub trait AssetPersistence: Send + Sync {
    fn write_asset(&self, content: &[u8], file_name: &str) -> Result<String, AssetError>;
}

/// Normalizes legacy rich text into the modern text model
pub trait HtmlTransformator: Send + Sync {
    /// Whether the fragment renders as nothing but an empty paragraph
    fn is_empty_paragraph(&self, html: &str) -> bool;

    fn transform(&self, html: &str, use_placeholders: bool) -> String;
}

/// Rewrites the source web prefix to the target web prefix.
///
/// Both absolute (`https://host/sites/a/...`) and server-relative
/// (`/sites/a/...`) links are rewritten in one pass, case-insensitively.
/// A root source web is never rewritten since every path would match.
#[derive(Debug, Clone)]
pub struct SiteUrlMapper {
    pattern: Option<Regex>,
    target: WebInfo,
}

impl SiteUrlMapper {
    pub fn new(source: &WebInfo, target: &WebInfo) -> Self {
        let source_path = source.server_relative_url.trim_end_matches('/');
        let pattern = if source_path.is_empty() || source.url == target.url {
            None
        } else {
            let expr = format!(
                r#"(?i)(?P<lead>^|[\s"'(=>])(?P<host>{})?{}(?P<tail>[/"'?#\s<)]|$)"#,
                regex::escape(source.host_url()),
                regex::escape(source_path),
            );
            match Regex::new(&expr) {
                Ok(re) => Some(re),
                Err(e) => {
                    log::warn!("URL rewriting disabled for '{}': {}", source.url, e);
                    None
                }
            }
        };
        SiteUrlMapper {
            pattern,
            target: target.clone(),
        }
    }
}

impl UrlMapper for SiteUrlMapper {
    fn map_url(&self, text: &str) -> String {
        let Some(pattern) = &self.pattern else {
            return text.to_string();
        };
        pattern
            .replace_all(text, |caps: &Captures| {
                let lead = caps.name("lead").map_or("", |m| m.as_str());
                let tail = caps.name("tail").map_or("", |m| m.as_str());
                let prefix = if caps.name("host").is_some() {
                    self.target.url.as_str()
                } else {
                    self.target.server_relative_url.as_str()
                };
                format!("{}{}{}", lead, prefix, tail)
            })
            .into_owned()
    }
}

/// Leaves text untouched; used when no target site is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityUrlMapper;

impl UrlMapper for IdentityUrlMapper {
    fn map_url(&self, text: &str) -> String {
        text.to_string()
    }
}

/// Claims prefix carried by cloud login names
const CLAIMS_PREFIX: &str = "i:0#.f|membership|";

/// Source to target identity table; unknown identities map to themselves
#[derive(Debug, Clone, Default)]
pub struct UserMappingTable {
    entries: HashMap<String, String>,
}

impl UserMappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, source: &str, target: impl Into<String>) -> Self {
        self.entries.insert(source.trim().to_lowercase(), target.into());
        self
    }

    /// Read a two-column `source,target` CSV; a header row is optional
    pub fn from_csv<R: Read>(reader: R) -> Result<Self, ConfigError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut table = Self::new();
        for (index, record) in csv_reader.records().enumerate() {
            let record = record.map_err(ConfigError::Csv)?;
            let (Some(source), Some(target)) = (record.get(0), record.get(1)) else {
                log::debug!("Skipping user mapping row {} with fewer than two columns", index + 1);
                continue;
            };
            if index == 0 && source.eq_ignore_ascii_case("source") {
                continue;
            }
            if source.is_empty() {
                continue;
            }
            table = table.with_entry(source, target);
        }
        Ok(table)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_csv(file)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl UserMapper for UserMappingTable {
    fn map_user(&self, login: &str) -> String {
        let key = login.trim().to_lowercase();
        if let Some(target) = self.entries.get(&key) {
            return target.clone();
        }
        if let Some(bare) = key.strip_prefix(CLAIMS_PREFIX) {
            if let Some(target) = self.entries.get(bare) {
                return target.clone();
            }
        }
        login.to_string()
    }
}

/// Writes transferred assets into a local folder
#[derive(Debug, Clone)]
pub struct FolderAssetPersistence {
    root: PathBuf,
    target_prefix: String,
}

impl FolderAssetPersistence {
    /// `target_prefix` is the server-relative folder the files will be served from
    pub fn new(root: impl Into<PathBuf>, target_prefix: impl Into<String>) -> Self {
        FolderAssetPersistence {
            root: root.into(),
            target_prefix: target_prefix.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetPersistence for FolderAssetPersistence {
    fn write_asset(&self, content: &[u8], file_name: &str) -> Result<String, AssetError> {
        let name = file_name.trim();
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(AssetError::InvalidFileName(file_name.to_string()));
        }

        std::fs::create_dir_all(&self.root)?;

        // Never overwrite: a taken name gets a numeric suffix
        let mut attempt = 0usize;
        loop {
            let candidate = numbered_name(name, attempt);
            let opened = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.root.join(&candidate));
            match opened {
                Ok(mut file) => {
                    file.write_all(content)?;
                    if attempt > 0 {
                        log::info!("Asset name '{}' is taken, persisted as '{}'", name, candidate);
                    }
                    log::debug!("Persisted asset '{}' ({} bytes)", candidate, content.len());
                    return Ok(format!("{}/{}", self.target_prefix.trim_end_matches('/'), candidate));
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// `logo.png`, `logo-1.png`, `logo-2.png`, ...
fn numbered_name(name: &str, attempt: usize) -> String {
    if attempt == 0 {
        return name.to_string();
    }
    match name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => format!("{}-{}.{}", stem, attempt, extension),
        _ => format!("{}-{}", name, attempt),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> SiteUrlMapper {
        SiteUrlMapper::new(
            &WebInfo::new("https://contoso.sharepoint.com/sites/old"),
            &WebInfo::new("https://fabrikam.sharepoint.com/sites/new"),
        )
    }

    #[test]
    fn test_site_url_mapper_rewrites_both_forms() {
        let html = r#"<a href="/sites/old/Pages/a.aspx">a</a> <a href="https://contoso.sharepoint.com/sites/OLD/b.aspx">b</a>"#;
        assert_eq!(
            mapper().map_url(html),
            r#"<a href="/sites/new/Pages/a.aspx">a</a> <a href="https://fabrikam.sharepoint.com/sites/new/b.aspx">b</a>"#
        );
    }

    #[test]
    fn test_site_url_mapper_respects_path_boundaries() {
        let text = r#"<a href="/sites/older/x.aspx">x</a>"#;
        assert_eq!(mapper().map_url(text), text);
        assert_eq!(mapper().map_url("/sites/old"), "/sites/new");
    }

    #[test]
    fn test_root_source_is_not_rewritten() {
        let mapper = SiteUrlMapper::new(
            &WebInfo::new("https://contoso.sharepoint.com"),
            &WebInfo::new("https://contoso.sharepoint.com/sites/new"),
        );
        assert_eq!(mapper.map_url("/Pages/a.aspx"), "/Pages/a.aspx");
    }

    #[test]
    fn test_user_mapping_table_from_csv() {
        let csv = "source,target\nanna@contoso.com, anna@fabrikam.com\nbob@contoso.com,bob@fabrikam.com\n";
        let table = UserMappingTable::from_csv(csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.map_user("Anna@Contoso.com"), "anna@fabrikam.com");
        assert_eq!(
            table.map_user("i:0#.f|membership|bob@contoso.com"),
            "bob@fabrikam.com"
        );
        assert_eq!(table.map_user("carol@contoso.com"), "carol@contoso.com");
    }

    #[test]
    fn test_folder_asset_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let assets = FolderAssetPersistence::new(dir.path().join("out"), "/sites/new/SiteAssets/");
        let path = assets.write_asset(b"png", "logo.png").unwrap();
        assert_eq!(path, "/sites/new/SiteAssets/logo.png");
        assert_eq!(std::fs::read(dir.path().join("out/logo.png")).unwrap(), b"png");

        assert!(matches!(
            assets.write_asset(b"x", "../evil.png"),
            Err(AssetError::InvalidFileName(_))
        ));
    }

    #[test]
    fn test_folder_asset_persistence_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let assets = FolderAssetPersistence::new(dir.path(), "/sites/new/SiteAssets");

        assert_eq!(assets.write_asset(b"news", "logo.png").unwrap(), "/sites/new/SiteAssets/logo.png");
        assert_eq!(assets.write_asset(b"hr", "logo.png").unwrap(), "/sites/new/SiteAssets/logo-1.png");
        assert_eq!(assets.write_asset(b"it", "logo.png").unwrap(), "/sites/new/SiteAssets/logo-2.png");
        assert_eq!(assets.write_asset(b"a", "README").unwrap(), "/sites/new/SiteAssets/README");
        assert_eq!(assets.write_asset(b"b", "README").unwrap(), "/sites/new/SiteAssets/README-1");

        assert_eq!(std::fs::read(dir.path().join("logo.png")).unwrap(), b"news");
        assert_eq!(std::fs::read(dir.path().join("logo-1.png")).unwrap(), b"hr");
    }
}
