//! Map-backed source context for offline runs and tests

use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    FileInfo, ListInfo, SourceContext, SourceResult, TermInfo, UserQuery, UserRecord, WebInfo,
};
use crate::error::ConfigError;

/// A stored file: metadata plus content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoredFile {
    #[serde(flatten)]
    info: FileInfo,
    /// UTF-8 content; binary fixtures are not needed offline
    #[serde(default)]
    content: String,
    #[serde(skip)]
    bytes: Option<Vec<u8>>,
}

/// Source context snapshot held in memory.
///
/// Deserializes from JSON:
///
/// ```json
/// {
///   "web": { "url": "https://contoso.sharepoint.com/sites/a", "server_relative_url": "/sites/a" },
///   "lists": [], "files": [], "users": [], "terms": []
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InMemorySource {
    web: WebInfo,
    #[serde(default)]
    lists: Vec<ListInfo>,
    #[serde(default)]
    files: Vec<StoredFile>,
    #[serde(default)]
    users: Vec<UserRecord>,
    #[serde(default)]
    terms: Vec<TermInfo>,
}

impl InMemorySource {
    pub fn new(web_url: &str) -> Self {
        InMemorySource {
            web: WebInfo::new(web_url),
            lists: Vec::new(),
            files: Vec::new(),
            users: Vec::new(),
            terms: Vec::new(),
        }
    }

    /// Load a JSON snapshot
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(ConfigError::Json)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn with_list(mut self, list: ListInfo) -> Self {
        self.lists.push(list);
        self
    }

    pub fn with_file(mut self, info: FileInfo, content: impl Into<Vec<u8>>) -> Self {
        let bytes = content.into();
        self.files.push(StoredFile {
            info,
            content: String::from_utf8_lossy(&bytes).into_owned(),
            bytes: Some(bytes),
        });
        self
    }

    pub fn with_user(mut self, user: UserRecord) -> Self {
        self.users.push(user);
        self
    }

    pub fn with_term(mut self, id: Uuid, label: impl Into<String>) -> Self {
        self.terms.push(TermInfo {
            id,
            label: label.into(),
        });
        self
    }

    fn stored_file(&self, server_relative_url: &str) -> Option<&StoredFile> {
        let wanted = normalize_path(server_relative_url);
        self.files
            .iter()
            .find(|f| normalize_path(&f.info.server_relative_url) == wanted)
    }
}

fn normalize_path(path: &str) -> String {
    urlencoding::decode(path.trim())
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| path.trim().to_string())
        .to_ascii_lowercase()
}

impl SourceContext for InMemorySource {
    fn web(&self) -> &WebInfo {
        &self.web
    }

    fn list(&self, id: Uuid) -> SourceResult<Option<ListInfo>> {
        Ok(self.lists.iter().find(|l| l.id == id).cloned())
    }

    fn file(&self, server_relative_url: &str) -> SourceResult<Option<FileInfo>> {
        Ok(self.stored_file(server_relative_url).map(|f| f.info.clone()))
    }

    fn file_content(&self, server_relative_url: &str) -> SourceResult<Option<Vec<u8>>> {
        Ok(self.stored_file(server_relative_url).map(|f| {
            f.bytes
                .clone()
                .unwrap_or_else(|| f.content.clone().into_bytes())
        }))
    }

    fn find_users(&self, query: &UserQuery) -> SourceResult<Vec<UserRecord>> {
        let found = self
            .users
            .iter()
            .filter(|u| match query {
                UserQuery::Login(login) => u.login_name.eq_ignore_ascii_case(login),
                UserQuery::Id(id) => u.id == *id,
            })
            .cloned()
            .collect();
        Ok(found)
    }

    fn term(&self, id: Uuid) -> SourceResult<Option<TermInfo>> {
        Ok(self.terms.iter().find(|t| t.id == id).cloned())
    }
}
