//! # Page Entity
//!
//! The editing layer's handle on one page. Owns the document as last
//! fetched (or locally modified), and mediates every read and write through
//! a [`PageGateway`].
//!
//! ## States
//!
//! ```text
//! NoWorkVersion --lock--> WorkLockedSelf   (work copied from live)
//! WorkUnlocked  --lock--> WorkLockedSelf
//! WorkLockedSelf --unlock--> WorkUnlocked
//! WorkLockedSelf --publish--> WorkLockedSelf  (live updated)
//! ```
//!
//! Only `WorkLockedSelf` permits composer and pagelet changes; the gate
//! itself lives in [`crate::EditSession`], which knows the acting user.

use std::fmt;

use tracing::{debug, info, warn};
use weblounge_common::{Composer, PageDocument, Pagelet, ResourceVersion, User};

use crate::errors::{EditorError, MutationError, Operation};
use crate::gateway::{GatewayError, PageGateway, PageKey, PublishWindow};
use crate::mutations::{Mutation, MutationResult};
use crate::view::PageletView;

/// Version × lock state of a page, seen from one user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageState {
    /// Only a live version exists
    NoWorkVersion,
    WorkUnlocked,
    WorkLockedSelf,
    WorkLockedOther { owner: String },
    /// A live or historic version is loaded
    Live,
}

impl PageState {
    pub fn is_editable(&self) -> bool {
        matches!(self, PageState::WorkLockedSelf)
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageState::NoWorkVersion => write!(f, "no work version"),
            PageState::WorkUnlocked => write!(f, "work, unlocked"),
            PageState::WorkLockedSelf => write!(f, "work, locked by you"),
            PageState::WorkLockedOther { owner } => write!(f, "work, locked by {owner}"),
            PageState::Live => write!(f, "live"),
        }
    }
}

/// Editable page
#[derive(Debug, Clone)]
pub struct Page {
    document: PageDocument,

    /// Local revision, bumped on every change of `document`
    revision: u64,

    /// The work version was requested but did not exist
    work_missing: bool,
}

impl Page {
    pub fn from_document(document: PageDocument) -> Self {
        Self {
            document,
            revision: 0,
            work_missing: false,
        }
    }

    /// Load a page, by default its work version.
    ///
    /// When the requested version cannot be fetched the live version is
    /// tried once. A missing work version is remembered so that the page
    /// reports [`PageState::NoWorkVersion`].
    pub async fn load<G: PageGateway + ?Sized>(
        gateway: &G,
        key: &PageKey,
        version: Option<ResourceVersion>,
    ) -> Result<Self, EditorError> {
        let requested = version.unwrap_or(ResourceVersion::Work);
        match gateway.fetch_page(key, requested).await {
            Ok(document) => Ok(Self::from_document(document)),
            Err(err) if requested != ResourceVersion::Live => {
                debug!(page = %key, version = %requested, error = %err, "falling back to live version");
                let work_missing =
                    requested == ResourceVersion::Work && matches!(err, GatewayError::NotFound);
                let document = gateway
                    .fetch_page(key, ResourceVersion::Live)
                    .await
                    .map_err(|e| EditorError::from_gateway(Operation::Load, e))?;
                let mut page = Self::from_document(document);
                page.work_missing = work_missing;
                Ok(page)
            }
            Err(err) => Err(EditorError::from_gateway(Operation::Load, err)),
        }
    }

    /// Create a page at `path` and return its work version
    pub async fn create<G: PageGateway + ?Sized>(
        gateway: &G,
        path: &str,
        content: Option<&PageDocument>,
    ) -> Result<Self, EditorError> {
        let document = gateway
            .create_page(path, content)
            .await
            .map_err(|e| EditorError::from_gateway(Operation::Create, e))?;
        info!(page = %document.id, path, "page created");
        Ok(Self::from_document(document))
    }

    pub fn document(&self) -> &PageDocument {
        &self.document
    }

    pub fn into_document(self) -> PageDocument {
        self.document
    }

    pub fn id(&self) -> &str {
        &self.document.id
    }

    pub fn etag(&self) -> Option<&str> {
        self.document.etag.as_deref()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_work_missing(&self) -> bool {
        self.work_missing
    }

    pub fn state_for(&self, user: &User) -> PageState {
        if !self.document.is_work_version() {
            return if self.work_missing {
                PageState::NoWorkVersion
            } else {
                PageState::Live
            };
        }
        match &self.document.lock {
            None => PageState::WorkUnlocked,
            Some(lock) if lock.is_held_by(&user.id) => PageState::WorkLockedSelf,
            Some(lock) => PageState::WorkLockedOther {
                owner: lock.user.display_name().to_string(),
            },
        }
    }

    pub fn composer(&self, id: &str) -> Option<&Composer> {
        self.document.composer(id)
    }

    /// The composer `id`, registered first if the page does not have it.
    /// An existing composer is returned untouched.
    pub fn create_composer(&mut self, id: &str) -> &Composer {
        let index = match self.document.composer_index(id) {
            Some(index) => index,
            None => {
                self.document.composers.push(Composer::new(id));
                self.revision += 1;
                self.document.composers.len() - 1
            }
        };
        &self.document.composers[index]
    }

    /// The pagelet at `index` of composer `composer_id`.
    ///
    /// # Panics
    ///
    /// Panics if the composer does not exist or `index` is out of range.
    /// Callers address pagelets they have seen, so either is a bug.
    pub fn pagelet(&self, composer_id: &str, index: usize) -> &Pagelet {
        match self.get_pagelet(composer_id, index) {
            Some(pagelet) => pagelet,
            None => panic!("no pagelet at index {index} of composer {composer_id}"),
        }
    }

    pub fn get_pagelet(&self, composer_id: &str, index: usize) -> Option<&Pagelet> {
        self.document.composer(composer_id)?.pagelet(index)
    }

    /// Detached copy of a pagelet with its `language` projections
    pub fn editor_pagelet(
        &self,
        composer_id: &str,
        index: usize,
        language: &str,
    ) -> Result<PageletView, MutationError> {
        let composer = self
            .document
            .composer(composer_id)
            .ok_or_else(|| MutationError::ComposerNotFound(composer_id.to_string()))?;
        let pagelet = composer
            .pagelet(index)
            .ok_or_else(|| MutationError::IndexOutOfRange {
                composer: composer_id.to_string(),
                index,
                len: composer.len(),
            })?;
        Ok(PageletView::new(pagelet, language))
    }

    pub fn apply(&mut self, mutation: &Mutation) -> Result<MutationResult, MutationError> {
        mutation.apply(&mut self.document)?;
        self.revision += 1;
        debug!(
            page = %self.document.id,
            composer = mutation.composer_id().unwrap_or("-"),
            revision = self.revision,
            "mutation applied"
        );
        Ok(MutationResult {
            revision: self.revision,
        })
    }

    /// Apply all mutations or none
    pub fn apply_all(&mut self, mutations: &[Mutation]) -> Result<MutationResult, MutationError> {
        let mut staged = self.document.clone();
        for mutation in mutations {
            mutation.apply(&mut staged)?;
        }
        self.document = staged;
        self.revision += 1;
        Ok(MutationResult {
            revision: self.revision,
        })
    }

    /// Ask for the edit lock, then refresh from the work version.
    ///
    /// On a conflict the work version is still fetched when possible so
    /// that the page shows who holds the lock.
    pub async fn lock<G: PageGateway + ?Sized>(
        &mut self,
        gateway: &G,
        user: &User,
    ) -> Result<(), EditorError> {
        let id = self.document.id.clone();
        let if_match = if self.document.is_work_version() {
            self.document.etag.clone()
        } else {
            None
        };

        if let Err(err) = gateway.lock_page(&id, user, if_match.as_deref()).await {
            let mut err = EditorError::from_gateway(Operation::Lock, err);
            if matches!(err, EditorError::LockConflict { .. }) {
                if let Ok(document) = gateway
                    .fetch_page(&PageKey::Id(id.clone()), ResourceVersion::Work)
                    .await
                {
                    if let Some(lock) = &document.lock {
                        err = EditorError::LockConflict {
                            owner: lock.user.display_name().to_string(),
                        };
                    }
                    self.replace(document);
                }
            }
            warn!(page = %id, user = %user.id, error = %err, "lock refused");
            return Err(err);
        }

        let document = gateway
            .fetch_page(&PageKey::Id(id.clone()), ResourceVersion::Work)
            .await
            .map_err(|e| EditorError::from_gateway(Operation::Load, e))?;
        self.replace(document);
        info!(page = %id, user = %user.id, "page locked");
        Ok(())
    }

    /// Release the lock. Local state is cleared before the repository
    /// answers and stays cleared when the remote call fails.
    pub async fn unlock<G: PageGateway + ?Sized>(&mut self, gateway: &G) -> Result<(), EditorError> {
        self.document.lock = None;
        self.revision += 1;

        match gateway.unlock_page(&self.document.id).await {
            Ok(()) => {
                info!(page = %self.document.id, "page unlocked");
                Ok(())
            }
            Err(err) => {
                warn!(page = %self.document.id, error = %err, "unlock failed remotely");
                Err(EditorError::from_gateway(Operation::Unlock, err))
            }
        }
    }

    /// Write the whole document back, conditional on the etag it was
    /// fetched with. Local state is untouched on failure.
    pub async fn persist<G: PageGateway + ?Sized>(&mut self, gateway: &G) -> Result<(), EditorError> {
        debug!(page = %self.document.id, revision = self.revision, "persisting page");
        let etag = gateway
            .update_page(
                &self.document.id,
                &self.document,
                self.document.etag.as_deref(),
            )
            .await
            .map_err(|e| EditorError::from_gateway(Operation::Persist, e))?;
        self.document.etag = etag;
        Ok(())
    }

    pub async fn publish<G: PageGateway + ?Sized>(
        &mut self,
        gateway: &G,
        window: &PublishWindow,
    ) -> Result<(), EditorError> {
        gateway
            .publish_page(&self.document.id, window, self.document.etag.as_deref())
            .await
            .map_err(|e| EditorError::from_gateway(Operation::Publish, e))?;
        info!(page = %self.document.id, "page published");
        Ok(())
    }

    pub async fn unpublish<G: PageGateway + ?Sized>(&mut self, gateway: &G) -> Result<(), EditorError> {
        gateway
            .unpublish_page(&self.document.id)
            .await
            .map_err(|e| EditorError::from_gateway(Operation::Unpublish, e))?;
        info!(page = %self.document.id, "page unpublished");
        Ok(())
    }

    /// Discard local state and fetch the page again
    pub async fn reload<G: PageGateway + ?Sized>(&mut self, gateway: &G) -> Result<(), EditorError> {
        let version = if self.work_missing {
            ResourceVersion::Work
        } else {
            self.document.version
        };
        let key = PageKey::Id(self.document.id.clone());
        let fresh = Self::load(gateway, &key, Some(version)).await?;
        self.work_missing = fresh.work_missing;
        self.replace(fresh.document);
        Ok(())
    }

    /// Pages linking to this one
    pub async fn referrers<G: PageGateway + ?Sized>(
        &self,
        gateway: &G,
    ) -> Result<Vec<PageDocument>, EditorError> {
        gateway
            .referrers(&self.document.id)
            .await
            .map_err(|e| EditorError::from_gateway(Operation::Query, e))
    }

    pub async fn delete<G: PageGateway + ?Sized>(self, gateway: &G) -> Result<(), EditorError> {
        gateway
            .delete_page(&self.document.id)
            .await
            .map_err(|e| EditorError::from_gateway(Operation::Delete, e))?;
        info!(page = %self.document.id, "page deleted");
        Ok(())
    }

    fn replace(&mut self, document: PageDocument) {
        if document.is_work_version() {
            self.work_missing = false;
        }
        self.document = document;
        self.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weblounge_common::{Lock, LocaleVariant};

    fn work_page() -> Page {
        let mut pagelet = Pagelet::new("text", "title");
        let mut de = LocaleVariant::new("de");
        de.original = true;
        de.text.insert("title".into(), vec!["Hallo".into()]);
        pagelet.locale.upsert(de);

        Page::from_document(
            PageDocument::new("p1", ResourceVersion::Work).with_composer(Composer {
                id: "main".into(),
                pagelets: vec![Pagelet::new("text", "intro"), pagelet],
            }),
        )
    }

    #[test]
    fn test_states() {
        let amelie = User::new("amelie").with_name("Amélie");
        let bob = User::new("bob");

        let mut page = work_page();
        assert_eq!(page.state_for(&bob), PageState::WorkUnlocked);

        page.document.lock = Some(Lock::new(amelie.clone()));
        assert_eq!(page.state_for(&amelie), PageState::WorkLockedSelf);
        assert_eq!(
            page.state_for(&bob),
            PageState::WorkLockedOther {
                owner: "Amélie".into()
            }
        );
        assert!(page.state_for(&amelie).is_editable());
        assert!(!page.state_for(&bob).is_editable());

        let mut live = Page::from_document(PageDocument::new("p1", ResourceVersion::Live));
        assert_eq!(live.state_for(&bob), PageState::Live);
        live.work_missing = true;
        assert_eq!(live.state_for(&bob), PageState::NoWorkVersion);
    }

    #[test]
    fn test_create_composer_is_idempotent() {
        let mut page = work_page();
        let revision = page.revision();

        assert_eq!(page.create_composer("main").len(), 2);
        assert_eq!(page.create_composer("main").len(), 2);
        assert_eq!(page.revision(), revision);
        assert_eq!(page.document().composers.len(), 1);

        assert!(page.create_composer("aside").is_empty());
        assert!(page.create_composer("aside").is_empty());
        assert_eq!(page.document().composers.len(), 2);
    }

    #[test]
    fn test_pagelet_lookup() {
        let page = work_page();
        assert_eq!(page.pagelet("main", 0).id, "intro");
        assert!(page.get_pagelet("main", 2).is_none());
        assert!(page.get_pagelet("aside", 0).is_none());
    }

    #[test]
    #[should_panic(expected = "no pagelet at index 5")]
    fn test_pagelet_out_of_range_panics() {
        work_page().pagelet("main", 5);
    }

    #[test]
    fn test_editor_pagelet_projections() {
        let page = work_page();
        let view = page.editor_pagelet("main", 1, "en").unwrap();
        assert!(view.current.is_none());
        assert_eq!(view.original.as_ref().unwrap().language, "de");
        assert_eq!(view.text_placeholder("title", 0), Some("Hallo"));

        assert!(matches!(
            page.editor_pagelet("main", 9, "en"),
            Err(MutationError::IndexOutOfRange { len: 2, .. })
        ));
    }

    #[test]
    fn test_apply_all_is_atomic() {
        let mut page = work_page();
        let before = page.document().clone();

        let result = page.apply_all(&[
            Mutation::DeletePagelet {
                composer_id: "main".into(),
                index: 0,
            },
            Mutation::DeletePagelet {
                composer_id: "main".into(),
                index: 4,
            },
        ]);
        assert!(result.is_err());
        assert_eq!(page.document(), &before);
    }
}
