//! # In-process Repository
//!
//! A content repository held in memory, with the rules a real repository
//! enforces: separate work and live versions, one lock holder per page,
//! etags checked on `If-Match`, and publish validation.
//!
//! Each caller connects with its own identity:
//!
//! ```rust,ignore
//! let repository = MemoryRepository::new();
//! repository.insert_page(document);
//! let gateway = repository.connect(User::new("amelie"));
//! let page = Page::load(&gateway, &PageKey::id("p1"), None).await?;
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;
use weblounge_common::{Lock, PageDocument, ResourceVersion, Stamp, User};

use crate::gateway::{
    FileDocument, FileGateway, FileKey, GatewayError, PageGateway, PageKey, PageQuery, PublishWindow,
    SortOrder,
};

#[derive(Debug, Default)]
struct StoredPage {
    work: Option<PageDocument>,
    live: Option<PageDocument>,
    lock: Option<Lock>,

    /// Bumped on every content write; the etag is derived from it
    revision: u64,
    published_revision: Option<u64>,
    published: Option<DateTime<Utc>>,
    writes: usize,
    invalid: bool,
}

impl StoredPage {
    fn etag(&self) -> String {
        format!("r{}", self.revision)
    }

    fn path(&self) -> Option<&str> {
        self.work
            .as_ref()
            .or(self.live.as_ref())
            .and_then(|d| d.path.as_deref())
    }

    fn document(&self, version: ResourceVersion) -> Option<PageDocument> {
        let stored = match version {
            ResourceVersion::Work => self.work.as_ref(),
            ResourceVersion::Live => self.live.as_ref(),
            ResourceVersion::Historic(_) => None,
        }?;
        let mut document = stored.clone();
        document.version = version;
        document.lock = if version.is_work() {
            self.lock.clone()
        } else {
            None
        };
        document.etag = Some(self.etag());
        Some(document)
    }

    fn is_pending(&self) -> bool {
        self.work.is_some() && self.published_revision != Some(self.revision)
    }

    /// Writes need the lock, or an administrator
    fn check_lock(&self, caller: &User, admin: bool) -> Result<(), GatewayError> {
        match &self.lock {
            Some(lock) if !admin && !lock.is_held_by(&caller.id) => Err(GatewayError::Locked {
                owner: Some(lock.user.display_name().to_string()),
            }),
            _ => Ok(()),
        }
    }

    fn check_etag(&self, if_match: Option<&str>) -> Result<(), GatewayError> {
        match if_match {
            Some(etag) if etag != self.etag() => Err(GatewayError::PreconditionFailed),
            _ => Ok(()),
        }
    }
}

#[derive(Debug)]
struct StoredFile {
    document: FileDocument,
    contents: BTreeMap<String, String>,
    revision: u64,
}

impl StoredFile {
    fn etag(&self) -> String {
        format!("r{}", self.revision)
    }
}

#[derive(Debug, Default)]
struct RepositoryState {
    pages: BTreeMap<String, StoredPage>,
    files: BTreeMap<String, StoredFile>,
}

impl RepositoryState {
    fn resolve(&self, key: &PageKey) -> Option<&str> {
        match key {
            PageKey::Id(id) => self.pages.get_key_value(id).map(|(k, _)| k.as_str()),
            PageKey::Path(path) => self
                .pages
                .iter()
                .find(|(_, p)| p.path() == Some(path.as_str()))
                .map(|(k, _)| k.as_str()),
        }
    }

    fn page_mut(&mut self, id: &str) -> Result<&mut StoredPage, GatewayError> {
        self.pages.get_mut(id).ok_or(GatewayError::NotFound)
    }
}

/// Shared in-memory repository. Clones refer to the same content.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    state: Arc<Mutex<RepositoryState>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RepositoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a document as the version it names. A lock on a work version
    /// becomes the page's lock.
    pub fn insert_page(&self, document: PageDocument) {
        let mut state = self.state();
        let stored = state.pages.entry(document.id.clone()).or_default();
        let mut document = document;
        document.etag = None;
        match document.version {
            ResourceVersion::Live => {
                stored.live = Some(document);
                stored.published_revision = Some(stored.revision);
            }
            _ => {
                stored.lock = document.lock.take();
                stored.work = Some(document);
            }
        }
    }

    /// A gateway acting as `user`
    pub fn connect(&self, user: User) -> MemoryGateway {
        MemoryGateway {
            repository: self.clone(),
            user,
            admin: false,
        }
    }

    /// A gateway acting as administrator `user`. Its writes pass foreign
    /// locks; taking a lock still requires the page to be free.
    pub fn connect_admin(&self, user: User) -> MemoryGateway {
        MemoryGateway {
            admin: true,
            ..self.connect(user)
        }
    }

    pub fn page(&self, id: &str, version: ResourceVersion) -> Option<PageDocument> {
        self.state().pages.get(id)?.document(version)
    }

    /// Number of accepted whole-page writes
    pub fn write_count(&self, id: &str) -> usize {
        self.state().pages.get(id).map_or(0, |p| p.writes)
    }

    pub fn lock_holder(&self, id: &str) -> Option<User> {
        self.state().pages.get(id)?.lock.as_ref().map(|l| l.user.clone())
    }

    /// Make publishing fail as if the page referenced a deleted resource
    pub fn mark_invalid(&self, id: &str) {
        if let Some(page) = self.state().pages.get_mut(id) {
            page.invalid = true;
        }
    }
}

/// [`MemoryRepository`] seen by one user
#[derive(Debug, Clone)]
pub struct MemoryGateway {
    repository: MemoryRepository,
    user: User,
    admin: bool,
}

impl MemoryGateway {
    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn is_admin(&self) -> bool {
        self.admin
    }
}

#[async_trait]
impl PageGateway for MemoryGateway {
    async fn fetch_page(
        &self,
        key: &PageKey,
        version: ResourceVersion,
    ) -> Result<PageDocument, GatewayError> {
        let state = self.repository.state();
        let id = state.resolve(key).ok_or(GatewayError::NotFound)?;
        state
            .pages
            .get(id)
            .and_then(|p| p.document(version))
            .ok_or(GatewayError::NotFound)
    }

    async fn search_pages(&self, query: &PageQuery) -> Result<Vec<PageDocument>, GatewayError> {
        let state = self.repository.state();
        let terms = query.search_terms.as_deref().map(str::to_lowercase);

        let mut hits: Vec<(PageDocument, Option<DateTime<Utc>>)> = state
            .pages
            .values()
            .filter(|p| !query.pending || p.is_pending())
            .filter_map(|p| {
                let document = match (query.version, query.preferred_version) {
                    (Some(version), _) => p.document(version),
                    (None, Some(preferred)) => p
                        .document(preferred)
                        .or_else(|| p.document(ResourceVersion::Work))
                        .or_else(|| p.document(ResourceVersion::Live)),
                    (None, None) => p
                        .document(ResourceVersion::Work)
                        .or_else(|| p.document(ResourceVersion::Live)),
                }?;
                Some((document, p.published))
            })
            .filter(|(d, _)| match &query.filter {
                Some(filter) => d.path.as_deref().is_some_and(|path| path.contains(filter.as_str())),
                None => true,
            })
            .filter(|(d, _)| match &terms {
                Some(terms) => matches_terms(d, terms),
                None => true,
            })
            .collect();

        hits.sort_by(|(a, a_published), (b, b_published)| {
            let created = |d: &PageDocument| d.created.as_ref().map(|s| s.date);
            let modified = |d: &PageDocument| d.modified.as_ref().map(|s| s.date);
            match query.sort {
                SortOrder::CreatedAsc => created(a).cmp(&created(b)),
                SortOrder::CreatedDesc => created(b).cmp(&created(a)),
                SortOrder::ModifiedAsc => modified(a).cmp(&modified(b)),
                SortOrder::ModifiedDesc => modified(b).cmp(&modified(a)),
                SortOrder::PublishedAsc => a_published.cmp(b_published),
                SortOrder::PublishedDesc => b_published.cmp(a_published),
            }
        });

        let limit = if query.limit == 0 {
            usize::MAX
        } else {
            query.limit
        };
        Ok(hits
            .into_iter()
            .map(|(d, _)| d)
            .skip(query.offset)
            .take(limit)
            .collect())
    }

    async fn referrers(&self, id: &str) -> Result<Vec<PageDocument>, GatewayError> {
        let state = self.repository.state();
        if !state.pages.contains_key(id) {
            return Err(GatewayError::NotFound);
        }
        Ok(state
            .pages
            .iter()
            .filter(|(other, _)| other.as_str() != id)
            .filter_map(|(_, p)| {
                p.document(ResourceVersion::Live)
                    .or_else(|| p.document(ResourceVersion::Work))
            })
            .filter(|d| references(d, id))
            .collect())
    }

    async fn create_page(
        &self,
        path: &str,
        content: Option<&PageDocument>,
    ) -> Result<PageDocument, GatewayError> {
        let mut state = self.repository.state();
        if state.resolve(&PageKey::path(path)).is_some() {
            return Err(GatewayError::Status(409));
        }

        let id = Uuid::new_v4().to_string();
        let mut document = content
            .cloned()
            .unwrap_or_else(|| PageDocument::new(id.as_str(), ResourceVersion::Work));
        document.id = id.clone();
        document.path = Some(path.to_string());
        document.version = ResourceVersion::Work;
        document.lock = None;
        document.etag = None;
        document.created = Some(Stamp::now(self.user.clone()));

        let stored = StoredPage {
            work: Some(document),
            revision: 1,
            ..StoredPage::default()
        };
        let created = stored.document(ResourceVersion::Work);
        state.pages.insert(id.clone(), stored);
        debug!(page = %id, path, "page created in memory");
        created.ok_or(GatewayError::NotFound)
    }

    async fn update_page(
        &self,
        id: &str,
        page: &PageDocument,
        if_match: Option<&str>,
    ) -> Result<Option<String>, GatewayError> {
        let mut state = self.repository.state();
        let stored = state.page_mut(id)?;
        stored.check_lock(&self.user, self.admin)?;
        stored.check_etag(if_match)?;

        let mut document = page.clone();
        document.id = id.to_string();
        document.version = ResourceVersion::Work;
        document.lock = None;
        document.etag = None;
        document.modified = Some(Stamp::now(self.user.clone()));

        stored.work = Some(document);
        stored.revision += 1;
        stored.writes += 1;
        Ok(Some(stored.etag()))
    }

    async fn delete_page(&self, id: &str) -> Result<(), GatewayError> {
        let mut state = self.repository.state();
        state.page_mut(id)?.check_lock(&self.user, self.admin)?;
        state.pages.remove(id);
        Ok(())
    }

    async fn lock_page(
        &self,
        id: &str,
        user: &User,
        if_match: Option<&str>,
    ) -> Result<(), GatewayError> {
        let mut state = self.repository.state();
        let stored = state.page_mut(id)?;
        stored.check_lock(user, false)?;
        stored.check_etag(if_match)?;

        if stored.work.is_none() {
            let mut work = stored.live.clone().ok_or(GatewayError::NotFound)?;
            work.version = ResourceVersion::Work;
            stored.work = Some(work);
        }
        stored.lock = Some(Lock {
            user: user.clone(),
            since: Some(Utc::now()),
        });
        Ok(())
    }

    async fn unlock_page(&self, id: &str) -> Result<(), GatewayError> {
        let mut state = self.repository.state();
        let stored = state.page_mut(id)?;
        stored.check_lock(&self.user, self.admin)?;
        stored.lock = None;
        Ok(())
    }

    async fn publish_page(
        &self,
        id: &str,
        window: &PublishWindow,
        if_match: Option<&str>,
    ) -> Result<(), GatewayError> {
        let mut state = self.repository.state();
        let stored = state.page_mut(id)?;
        stored.check_lock(&self.user, self.admin)?;
        stored.check_etag(if_match)?;
        if stored.invalid {
            return Err(GatewayError::PreconditionFailed);
        }

        let mut live = stored.work.clone().ok_or(GatewayError::NotFound)?;
        live.version = ResourceVersion::Live;
        stored.live = Some(live);
        stored.published_revision = Some(stored.revision);
        stored.published = Some(window.start.unwrap_or_else(Utc::now));
        Ok(())
    }

    async fn unpublish_page(&self, id: &str) -> Result<(), GatewayError> {
        let mut state = self.repository.state();
        let stored = state.page_mut(id)?;
        stored.check_lock(&self.user, self.admin)?;
        stored.live = None;
        stored.published_revision = None;
        stored.published = None;
        Ok(())
    }
}

fn matches_terms(document: &PageDocument, terms: &str) -> bool {
    let path = document.path.as_deref().unwrap_or_default();
    path.to_lowercase().contains(terms)
        || document
            .metadata
            .title
            .values()
            .chain(document.metadata.description.values())
            .chain(document.metadata.subjects.iter())
            .any(|value| value.to_lowercase().contains(terms))
}

/// Any property or text value naming `id`
fn references(document: &PageDocument, id: &str) -> bool {
    document.pagelets().any(|pagelet| {
        pagelet
            .properties
            .values()
            .chain(pagelet.locale.iter().flat_map(|l| l.text.values()))
            .flatten()
            .any(|value| value == id)
    })
}

#[async_trait]
impl FileGateway for MemoryGateway {
    async fn fetch_file(&self, key: &FileKey) -> Result<FileDocument, GatewayError> {
        let state = self.repository.state();
        let (stored, language) = match key {
            FileKey::Id(id) => (state.files.get(id), None),
            FileKey::Path(path) => (
                state
                    .files
                    .values()
                    .find(|f| f.document.path.as_deref() == Some(path.as_str())),
                None,
            ),
            FileKey::Content { id, language } => (state.files.get(id), Some(language)),
        };
        let stored = stored.ok_or(GatewayError::NotFound)?;

        let mut document = stored.document.clone();
        document.etag = Some(stored.etag());
        if let Some(language) = language {
            document.body = stored
                .contents
                .get(language)
                .cloned()
                .ok_or(GatewayError::NotFound)?;
        }
        Ok(document)
    }

    async fn update_file(
        &self,
        id: &str,
        language: Option<&str>,
        file: &FileDocument,
        if_match: Option<&str>,
    ) -> Result<Option<String>, GatewayError> {
        let mut state = self.repository.state();
        let stored = state.files.get_mut(id).ok_or(GatewayError::NotFound)?;
        if if_match.is_some_and(|etag| etag != stored.etag()) {
            return Err(GatewayError::PreconditionFailed);
        }
        match language {
            Some(language) => {
                stored.contents.insert(language.to_string(), file.body.clone());
            }
            None => {
                stored.document.body = file.body.clone();
                stored.document.path = file.path.clone();
            }
        }
        stored.revision += 1;
        Ok(Some(stored.etag()))
    }

    async fn create_file(&self, path: Option<&str>, body: &str) -> Result<FileDocument, GatewayError> {
        let mut state = self.repository.state();
        if let Some(path) = path {
            if state.files.values().any(|f| f.document.path.as_deref() == Some(path)) {
                return Err(GatewayError::Status(409));
            }
        }

        let id = Uuid::new_v4().to_string();
        let stored = StoredFile {
            document: FileDocument {
                id: id.clone(),
                path: path.map(str::to_string),
                etag: None,
                body: body.to_string(),
            },
            contents: BTreeMap::new(),
            revision: 1,
        };
        let mut created = stored.document.clone();
        created.etag = Some(stored.etag());
        state.files.insert(id, stored);
        Ok(created)
    }

    async fn delete_file(&self, id: &str) -> Result<(), GatewayError> {
        self.repository
            .state()
            .files
            .remove(id)
            .map(|_| ())
            .ok_or(GatewayError::NotFound)
    }
}
