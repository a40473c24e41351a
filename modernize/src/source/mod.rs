//! The remote collaboration site, seen through the narrow lookups the
//! function engine needs

mod cache;
mod memory;
mod services;

pub use cache::{LookupCache, ReadThrough};
pub use memory::InMemorySource;
pub use services::{
    AssetPersistence, FolderAssetPersistence, HtmlTransformator, IdentityUrlMapper, SiteUrlMapper,
    UrlMapper, UserMapper, UserMappingTable,
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SourceError;

/// Result of a remote lookup
pub type SourceResult<T> = Result<T, SourceError>;

/// A site (web) as seen by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebInfo {
    /// Absolute URL, e.g. `https://contoso.sharepoint.com/sites/intranet`
    pub url: String,
    /// Server-relative URL, e.g. `/sites/intranet`
    pub server_relative_url: String,
}

impl WebInfo {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into().trim_end_matches('/').to_string();
        let server_relative_url = server_relative_part(&url);
        WebInfo {
            url,
            server_relative_url,
        }
    }

    /// Scheme and host, e.g. `https://contoso.sharepoint.com`
    pub fn host_url(&self) -> &str {
        let host_start = self.url.find("://").map(|i| i + 3).unwrap_or(0);
        match self.url[host_start..].find('/') {
            Some(i) => &self.url[..host_start + i],
            None => self.url.trim_end_matches('/'),
        }
    }

    /// Whether a server-relative path lives inside this web
    pub fn contains_path(&self, server_relative_path: &str) -> bool {
        let web = self.server_relative_url.trim_end_matches('/').to_ascii_lowercase();
        let path = server_relative_path.to_ascii_lowercase();
        web.is_empty() || path == web || path.starts_with(&format!("{}/", web))
    }
}

fn server_relative_part(url: &str) -> String {
    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    match without_scheme.find('/') {
        Some(i) => without_scheme[i..].trim_end_matches('/').to_string(),
        None => String::new(),
    }
}

/// Base type of a list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ListBaseType {
    #[default]
    GenericList,
    DocumentLibrary,
    DiscussionBoard,
    Survey,
    Issue,
    Unknown,
}

/// Well-known list template ids
pub mod list_template {
    pub const GENERIC_LIST: i32 = 100;
    pub const DOCUMENT_LIBRARY: i32 = 101;
    pub const SURVEY: i32 = 102;
    pub const EVENTS: i32 = 106;
    pub const TASKS: i32 = 107;
    pub const DISCUSSION_BOARD: i32 = 108;
    pub const PICTURE_LIBRARY: i32 = 109;
    pub const TASKS_WITH_TIMELINE: i32 = 171;
    pub const ISSUE_TRACKING: i32 = 1100;
}

/// A list view with its schema XML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewInfo {
    pub id: Uuid,
    pub title: String,
    /// `<View>` schema XML
    pub xml: String,
    #[serde(default)]
    pub is_default: bool,
}

/// A list or library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListInfo {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub base_type: ListBaseType,
    pub base_template: i32,
    /// Server-relative root folder URL
    pub server_relative_url: String,
    #[serde(default)]
    pub views: Vec<ViewInfo>,
}

impl ListInfo {
    /// The default view, or the first one when none is flagged
    pub fn default_view(&self) -> Option<&ViewInfo> {
        self.views
            .iter()
            .find(|v| v.is_default)
            .or_else(|| self.views.first())
    }
}

/// A file stored in a library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub server_relative_url: String,
    pub list_id: Uuid,
    pub unique_id: Uuid,
    #[serde(default)]
    pub author_login: String,
    #[serde(default)]
    pub author_name: String,
}

impl FileInfo {
    pub fn file_name(&self) -> &str {
        self.server_relative_url
            .rsplit('/')
            .next()
            .unwrap_or(&self.server_relative_url)
    }
}

/// Principal type in the hidden user list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalType {
    #[default]
    User,
    SecurityGroup,
    SharePointGroup,
}

/// An entry of the site's hidden user information list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i32,
    pub login_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub work_phone: String,
    #[serde(default)]
    pub sip_address: String,
    #[serde(default)]
    pub principal_type: PrincipalType,
}

/// Targeted query against the hidden user list
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UserQuery {
    Login(String),
    Id(i32),
}

impl UserQuery {
    /// Numeric input is a user id, anything else a login name
    pub fn from_input(input: &str) -> Self {
        let input = input.trim();
        match input.parse::<i32>() {
            Ok(id) => UserQuery::Id(id),
            Err(_) => UserQuery::Login(input.to_string()),
        }
    }

    pub fn cache_key(&self) -> String {
        match self {
            UserQuery::Login(login) => format!("login:{}", login.to_ascii_lowercase()),
            UserQuery::Id(id) => format!("id:{}", id),
        }
    }
}

/// A taxonomy term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermInfo {
    pub id: Uuid,
    pub label: String,
}

/// Lookups against the source site.
///
/// Implementations talk to the remote platform; calls block until answered.
pub trait SourceContext: Send + Sync {
    /// The web the content is read from
    fn web(&self) -> &WebInfo;

    fn list(&self, id: Uuid) -> SourceResult<Option<ListInfo>>;

    /// File metadata by server-relative URL
    fn file(&self, server_relative_url: &str) -> SourceResult<Option<FileInfo>>;

    /// Binary content by server-relative URL
    fn file_content(&self, server_relative_url: &str) -> SourceResult<Option<Vec<u8>>>;

    /// Query the hidden user list
    fn find_users(&self, query: &UserQuery) -> SourceResult<Vec<UserRecord>>;

    fn term(&self, id: Uuid) -> SourceResult<Option<TermInfo>>;
}
