//! # Remote Sync Gateway
//!
//! The operations the editing layer needs from the content repository.
//! Implementations own the transport; the editor only sees documents and
//! [`GatewayError`]s.
//!
//! | operation | success | failure |
//! |---|---|---|
//! | `fetch_page` | document + etag | `NotFound` |
//! | `update_page` | new etag | `PreconditionFailed` (stale etag), `Locked` |
//! | `lock_page` | - | `Locked` |
//! | `unlock_page` | - | `Locked` (held by someone else) |
//! | `publish_page` | - | `PreconditionFailed` (invalid references) |

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use weblounge_common::{CommonError, PageDocument, ResourceVersion, User};

/// How a page is addressed
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PageKey {
    Id(String),
    Path(String),
}

impl PageKey {
    pub fn id(id: impl Into<String>) -> Self {
        PageKey::Id(id.into())
    }

    pub fn path(path: impl Into<String>) -> Self {
        PageKey::Path(path.into())
    }
}

impl std::fmt::Display for PageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageKey::Id(id) => write!(f, "{id}"),
            PageKey::Path(path) => write!(f, "{path}"),
        }
    }
}

/// Optional publication period
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl PublishWindow {
    pub fn now() -> Self {
        Self::default()
    }

    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    CreatedAsc,
    CreatedDesc,
    ModifiedAsc,
    ModifiedDesc,
    PublishedAsc,
    PublishedDesc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::CreatedAsc => "created-asc",
            SortOrder::CreatedDesc => "created-desc",
            SortOrder::ModifiedAsc => "modified-asc",
            SortOrder::ModifiedDesc => "modified-desc",
            SortOrder::PublishedAsc => "published-asc",
            SortOrder::PublishedDesc => "published-desc",
        }
    }
}

/// Page listing request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub sort: SortOrder,
    /// `0` means no limit
    pub limit: usize,
    pub offset: usize,
    pub version: Option<ResourceVersion>,
    pub preferred_version: Option<ResourceVersion>,
    pub filter: Option<String>,
    pub search_terms: Option<String>,
    /// Only pages with unpublished changes
    pub pending: bool,
}

impl PageQuery {
    /// Every page, oldest first
    pub fn all() -> Self {
        Self {
            sort: SortOrder::CreatedAsc,
            limit: 0,
            offset: 0,
            version: None,
            preferred_version: None,
            filter: None,
            search_terms: None,
            pending: false,
        }
    }

    /// The eight most recently modified pages
    pub fn recent() -> Self {
        Self {
            sort: SortOrder::ModifiedDesc,
            limit: 8,
            ..Self::all()
        }
    }

    /// Pages waiting to be published
    pub fn pending() -> Self {
        Self {
            pending: true,
            ..Self::all()
        }
    }

    /// Full text search, eight best matches by modification date
    pub fn search(terms: impl Into<String>) -> Self {
        Self {
            search_terms: Some(terms.into()),
            ..Self::recent()
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_version(mut self, version: ResourceVersion) -> Self {
        self.version = Some(version);
        self
    }

    pub fn with_preferred_version(mut self, version: ResourceVersion) -> Self {
        self.preferred_version = Some(version);
        self
    }
}

/// How a file or its language specific content is addressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileKey {
    Id(String),
    Path(String),
    Content { id: String, language: String },
}

/// A file or media resource. The body is kept as the repository sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDocument {
    pub id: String,
    pub path: Option<String>,
    pub etag: Option<String>,
    pub body: String,
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("resource not found")]
    NotFound,

    #[error("resource is locked{}", owner_suffix(.owner))]
    Locked { owner: Option<String> },

    #[error("precondition failed")]
    PreconditionFailed,

    #[error("not authorized")]
    Unauthorized,

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("codec error: {0}")]
    Codec(#[from] CommonError),
}

fn owner_suffix(owner: &Option<String>) -> String {
    owner.as_deref().map(|o| format!(" by {o}")).unwrap_or_default()
}

/// Page operations of the content repository
#[async_trait]
pub trait PageGateway: Send + Sync {
    /// Fetch one version of a page. The returned document carries the etag
    /// of that state.
    async fn fetch_page(
        &self,
        key: &PageKey,
        version: ResourceVersion,
    ) -> Result<PageDocument, GatewayError>;

    async fn search_pages(&self, query: &PageQuery) -> Result<Vec<PageDocument>, GatewayError>;

    /// Pages referencing the page with the given id
    async fn referrers(&self, id: &str) -> Result<Vec<PageDocument>, GatewayError>;

    /// Create a page at `path`, returning its work version
    async fn create_page(
        &self,
        path: &str,
        content: Option<&PageDocument>,
    ) -> Result<PageDocument, GatewayError>;

    /// Replace the whole work version. Returns the new etag when the
    /// repository reports one.
    async fn update_page(
        &self,
        id: &str,
        page: &PageDocument,
        if_match: Option<&str>,
    ) -> Result<Option<String>, GatewayError>;

    async fn delete_page(&self, id: &str) -> Result<(), GatewayError>;

    async fn lock_page(
        &self,
        id: &str,
        user: &User,
        if_match: Option<&str>,
    ) -> Result<(), GatewayError>;

    async fn unlock_page(&self, id: &str) -> Result<(), GatewayError>;

    async fn publish_page(
        &self,
        id: &str,
        window: &PublishWindow,
        if_match: Option<&str>,
    ) -> Result<(), GatewayError>;

    async fn unpublish_page(&self, id: &str) -> Result<(), GatewayError>;
}

/// File and media operations of the content repository
#[async_trait]
pub trait FileGateway: Send + Sync {
    async fn fetch_file(&self, key: &FileKey) -> Result<FileDocument, GatewayError>;

    /// Update the file, or its content in `language`
    async fn update_file(
        &self,
        id: &str,
        language: Option<&str>,
        file: &FileDocument,
        if_match: Option<&str>,
    ) -> Result<Option<String>, GatewayError>;

    async fn create_file(&self, path: Option<&str>, body: &str) -> Result<FileDocument, GatewayError>;

    async fn delete_file(&self, id: &str) -> Result<(), GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_presets() {
        let all = PageQuery::all();
        assert_eq!(all.sort.as_str(), "created-asc");
        assert_eq!(all.limit, 0);

        let search = PageQuery::search("about").with_filter("state:locked");
        assert_eq!(search.sort, SortOrder::ModifiedDesc);
        assert_eq!(search.limit, 8);
        assert_eq!(search.search_terms.as_deref(), Some("about"));
        assert_eq!(search.filter.as_deref(), Some("state:locked"));

        assert!(PageQuery::pending().pending);
    }

    #[test]
    fn test_locked_message_names_owner() {
        let err = GatewayError::Locked {
            owner: Some("Amélie".into()),
        };
        assert_eq!(err.to_string(), "resource is locked by Amélie");
        let err = GatewayError::Locked { owner: None };
        assert_eq!(err.to_string(), "resource is locked");
    }
}
