//! # Edit Session
//!
//! One user's editing context for one page: the page, the gateway it is
//! synchronized through, and the acting user.
//!
//! Every content change is applied locally first, then the whole page is
//! written back. Each write is awaited before the call returns, so a
//! session never has two writes in flight. When a write fails the local
//! change is kept and the session is marked diverged until the next
//! successful write or [`EditSession::reload`].

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, warn};
use weblounge_common::{Composer, PageDocument, Pagelet, ResourceVersion, Stamp, User};

use crate::errors::EditorError;
use crate::gateway::{PageGateway, PageKey, PublishWindow};
use crate::input_converter::{apply_form, bind_fields, FieldBinding, FieldDescriptor, SubmittedField};
use crate::mutations::{parse_tags, Mutation, MutationResult};
use crate::page::{Page, PageState};
use crate::reorder::{plan_drop, DropEvent};
use crate::view::PageletView;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Language pagelets are edited in
    pub language: String,

    /// Edit pages locked by someone else
    pub admin: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            admin: false,
        }
    }
}

/// What a drop did to the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropOutcome {
    pub composer: String,

    /// Final position of the dropped pagelet
    pub index: usize,

    pub composer_created: bool,
    pub became_non_empty: bool,

    /// The dropped pagelet is new and its editor should open
    pub open_editor: bool,
}

/// Result of opening a pagelet editor
#[derive(Debug, Clone, PartialEq)]
pub enum EditorOpening {
    Editor {
        view: PageletView,
        bindings: Vec<FieldBinding>,
    },
    /// The pagelet type has no editor template
    NoEditor,
}

/// Page metadata form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataForm {
    pub path: Option<String>,
    pub template: Option<String>,
    pub title: String,
    pub description: String,

    /// Comma separated
    pub tags: String,
}

pub struct EditSession<G: PageGateway + ?Sized> {
    gateway: Arc<G>,
    user: User,
    options: SessionOptions,
    page: Page,

    /// Pagelet types (`module/id`) known to have no editor
    no_editor: BTreeSet<String>,

    diverged: bool,
}

impl<G: PageGateway + ?Sized> EditSession<G> {
    /// Load a page and start editing it as `user`
    pub async fn open(
        gateway: Arc<G>,
        user: User,
        key: &PageKey,
        options: SessionOptions,
    ) -> Result<Self, EditorError> {
        let page = Page::load(gateway.as_ref(), key, Some(ResourceVersion::Work)).await?;
        Ok(Self::with_page(gateway, user, page, options))
    }

    pub fn with_page(gateway: Arc<G>, user: User, page: Page, options: SessionOptions) -> Self {
        Self {
            gateway,
            user,
            options,
            page,
            no_editor: BTreeSet::new(),
            diverged: false,
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn document(&self) -> &PageDocument {
        self.page.document()
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn state(&self) -> PageState {
        self.page.state_for(&self.user)
    }

    /// Local state differs from what the repository accepted
    pub fn is_diverged(&self) -> bool {
        self.diverged
    }

    pub async fn lock(&mut self) -> Result<(), EditorError> {
        self.page.lock(self.gateway.as_ref(), &self.user).await
    }

    pub async fn unlock(&mut self) -> Result<(), EditorError> {
        self.page.unlock(self.gateway.as_ref()).await
    }

    pub async fn publish(&mut self, window: &PublishWindow) -> Result<(), EditorError> {
        self.ensure_editable()?;
        self.page.publish(self.gateway.as_ref(), window).await
    }

    pub async fn unpublish(&mut self) -> Result<(), EditorError> {
        self.ensure_editable()?;
        self.page.unpublish(self.gateway.as_ref()).await
    }

    /// Drop local changes and fetch the page again
    pub async fn reload(&mut self) -> Result<(), EditorError> {
        self.page.reload(self.gateway.as_ref()).await?;
        self.diverged = false;
        Ok(())
    }

    /// Write the whole page back. Needs the same lock as any other change.
    pub async fn persist(&mut self) -> Result<(), EditorError> {
        self.ensure_editable()?;
        self.write().await
    }

    async fn write(&mut self) -> Result<(), EditorError> {
        match self.page.persist(self.gateway.as_ref()).await {
            Ok(()) => {
                self.diverged = false;
                Ok(())
            }
            Err(err) => {
                self.diverged = true;
                warn!(page = %self.page.id(), error = %err, "write failed, keeping local changes");
                Err(err)
            }
        }
    }

    /// Register a composer. Nothing is written.
    pub fn create_composer(&mut self, id: &str) -> Result<&Composer, EditorError> {
        self.ensure_editable()?;
        Ok(self.page.create_composer(id))
    }

    /// See [`Page::pagelet`]
    pub fn pagelet(&self, composer_id: &str, index: usize) -> &Pagelet {
        self.page.pagelet(composer_id, index)
    }

    /// Detached copy of a pagelet in the session language
    pub fn editor_pagelet(&self, composer_id: &str, index: usize) -> Result<PageletView, EditorError> {
        Ok(self
            .page
            .editor_pagelet(composer_id, index, &self.options.language)?)
    }

    pub async fn delete_pagelet(
        &mut self,
        composer_id: &str,
        index: usize,
    ) -> Result<MutationResult, EditorError> {
        self.mutate(Mutation::DeletePagelet {
            composer_id: composer_id.to_string(),
            index,
        })
        .await
    }

    /// Store `pagelet` at `index`, overwriting what is there. Returns once
    /// the repository has accepted the write.
    pub async fn insert_pagelet(
        &mut self,
        pagelet: Pagelet,
        composer_id: &str,
        index: usize,
    ) -> Result<MutationResult, EditorError> {
        self.mutate(Mutation::InsertPagelet {
            composer_id: composer_id.to_string(),
            index,
            pagelet,
        })
        .await
    }

    /// Replace a composer's pagelet sequence
    pub async fn update_composer(
        &mut self,
        composer_id: &str,
        pagelets: Vec<Pagelet>,
    ) -> Result<MutationResult, EditorError> {
        self.mutate(Mutation::ReplaceComposer {
            composer_id: composer_id.to_string(),
            pagelets,
        })
        .await
    }

    /// Handle one drag-and-drop event with a single write
    pub async fn drop_pagelet(&mut self, event: DropEvent) -> Result<DropOutcome, EditorError> {
        self.ensure_editable()?;

        let existing = self.page.composer(&event.target);
        let composer_created = existing.is_none();
        let was_empty = existing.map_or(true, Composer::is_empty);

        let plan = plan_drop(&self.page, &event, &self.user)?;
        self.page.apply_all(&plan.mutations())?;
        debug!(
            page = %self.page.id(),
            composer = %plan.target,
            index = plan.index,
            new = plan.is_new,
            "pagelet dropped"
        );
        self.write().await?;

        Ok(DropOutcome {
            composer: plan.target,
            index: plan.index,
            composer_created,
            became_non_empty: was_empty && !plan.pagelets.is_empty(),
            open_editor: plan.is_new,
        })
    }

    /// Open the editor of a pagelet. `fields` is the editor template's
    /// form, `None` when the pagelet type has no editor.
    pub fn open_editor(
        &mut self,
        composer_id: &str,
        index: usize,
        fields: Option<&[FieldDescriptor]>,
    ) -> Result<EditorOpening, EditorError> {
        self.ensure_editable()?;
        let view = self.editor_pagelet(composer_id, index)?;
        match fields {
            Some(fields) => {
                let bindings = bind_fields(&view, fields)?;
                Ok(EditorOpening::Editor { view, bindings })
            }
            None => {
                self.no_editor.insert(view.pagelet.type_key());
                Ok(EditorOpening::NoEditor)
            }
        }
    }

    /// Whether the pagelet type offers an editor, as far as known
    pub fn has_editor(&self, pagelet: &Pagelet) -> bool {
        !self.no_editor.contains(&pagelet.type_key())
    }

    /// Apply a submitted editor form and store the pagelet
    pub async fn save_editor(
        &mut self,
        mut view: PageletView,
        composer_id: &str,
        index: usize,
        fields: &[SubmittedField],
    ) -> Result<MutationResult, EditorError> {
        self.ensure_editable()?;
        apply_form(&mut view, fields, Stamp::now(self.user.clone()))?;
        self.insert_pagelet(view.into_pagelet(), composer_id, index)
            .await
    }

    /// Close an editor without saving. A pagelet that was just dropped from
    /// the palette is removed again.
    pub async fn cancel_editor(
        &mut self,
        composer_id: &str,
        index: usize,
        is_new: bool,
    ) -> Result<(), EditorError> {
        if is_new {
            self.delete_pagelet(composer_id, index).await?;
        }
        Ok(())
    }

    /// Update path, template, title, description and tags
    pub async fn save_metadata(&mut self, form: MetadataForm) -> Result<MutationResult, EditorError> {
        self.mutate(Mutation::SaveMetadata {
            path: form.path,
            template: form.template,
            language: self.options.language.clone(),
            title: form.title,
            description: form.description,
            tags: parse_tags(&form.tags),
        })
        .await
    }

    async fn mutate(&mut self, mutation: Mutation) -> Result<MutationResult, EditorError> {
        self.ensure_editable()?;
        let result = self.page.apply(&mutation)?;
        self.write().await?;
        Ok(result)
    }

    fn ensure_editable(&self) -> Result<(), EditorError> {
        match self.state() {
            PageState::WorkLockedSelf => Ok(()),
            PageState::WorkLockedOther { .. } if self.options.admin => Ok(()),
            PageState::WorkLockedOther { owner } => Err(EditorError::LockConflict { owner }),
            state => Err(EditorError::NotEditable(state)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryGateway, MemoryRepository};
    use weblounge_common::Lock;

    fn repository(lock: Option<&str>) -> MemoryRepository {
        let mut document = PageDocument::new("p1", ResourceVersion::Work)
            .with_path("/news")
            .with_composer(Composer {
                id: "main".into(),
                pagelets: vec![Pagelet::new("text", "a"), Pagelet::new("text", "b")],
            });
        document.lock = lock.map(|owner| Lock::new(User::new(owner)));
        let repository = MemoryRepository::new();
        repository.insert_page(document);
        repository
    }

    async fn session(
        repository: &MemoryRepository,
        user: &str,
        options: SessionOptions,
    ) -> EditSession<MemoryGateway> {
        let user = User::new(user);
        let gateway = Arc::new(repository.connect(user.clone()));
        EditSession::open(gateway, user, &PageKey::id("p1"), options)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_unlocked_page_is_not_editable() {
        let repository = repository(None);
        let mut session = session(&repository, "amelie", SessionOptions::default()).await;
        assert_eq!(session.state(), PageState::WorkUnlocked);

        let err = session.delete_pagelet("main", 0).await.unwrap_err();
        assert!(matches!(err, EditorError::NotEditable(PageState::WorkUnlocked)));
        assert!(session.create_composer("aside").is_err());
    }

    #[tokio::test]
    async fn test_admin_overrides_foreign_lock() {
        let repository = repository(Some("bob"));
        let options = SessionOptions {
            admin: true,
            ..SessionOptions::default()
        };
        let session = session(&repository, "amelie", options).await;
        assert!(matches!(session.state(), PageState::WorkLockedOther { .. }));
        assert!(session.ensure_editable().is_ok());
    }

    #[tokio::test]
    async fn test_persist_needs_the_lock() {
        let repository = repository(Some("bob"));
        let mut session = session(&repository, "amelie", SessionOptions::default()).await;

        let err = session.persist().await.unwrap_err();
        assert!(matches!(err, EditorError::LockConflict { ref owner } if owner == "bob"));
        assert!(!session.is_diverged());
        assert_eq!(repository.write_count("p1"), 0);

        let repository = self::repository(None);
        let mut session = self::session(&repository, "amelie", SessionOptions::default()).await;
        assert!(matches!(
            session.persist().await,
            Err(EditorError::NotEditable(PageState::WorkUnlocked))
        ));
    }

    #[tokio::test]
    async fn test_admin_gateway_writes_through_foreign_lock() {
        let repository = repository(Some("bob"));
        let root = User::new("root");
        let options = SessionOptions {
            admin: true,
            ..SessionOptions::default()
        };
        let gateway = Arc::new(repository.connect_admin(root.clone()));
        let mut session = EditSession::open(gateway, root, &PageKey::id("p1"), options)
            .await
            .unwrap();

        session.delete_pagelet("main", 0).await.unwrap();
        assert!(!session.is_diverged());
        assert_eq!(repository.write_count("p1"), 1);
        assert_eq!(repository.lock_holder("p1").map(|u| u.id), Some("bob".into()));
    }

    #[tokio::test]
    async fn test_save_metadata() {
        let repository = repository(Some("amelie"));
        let mut session = session(&repository, "amelie", SessionOptions::default()).await;
        session
            .save_metadata(MetadataForm {
                title: "News".into(),
                tags: "press,, archive ".into(),
                ..MetadataForm::default()
            })
            .await
            .unwrap();

        let stored = repository.page("p1", ResourceVersion::Work).unwrap();
        assert_eq!(stored.title("en"), "News");
        assert_eq!(stored.tags(), ["press".to_string(), "archive".to_string()]);
        assert_eq!(stored.path.as_deref(), Some("/news"));
    }

    #[tokio::test]
    async fn test_open_editor_without_template_marks_type() {
        let repository = repository(Some("amelie"));
        let mut session = session(&repository, "amelie", SessionOptions::default()).await;
        let pagelet = session.pagelet("main", 0).clone();
        assert!(session.has_editor(&pagelet));

        let opening = session.open_editor("main", 0, None).unwrap();
        assert_eq!(opening, EditorOpening::NoEditor);
        assert!(!session.has_editor(&pagelet));
    }

    #[tokio::test]
    async fn test_cancel_existing_pagelet_keeps_it() {
        let repository = repository(Some("amelie"));
        let mut session = session(&repository, "amelie", SessionOptions::default()).await;
        session.cancel_editor("main", 0, false).await.unwrap();
        assert_eq!(session.document().composer("main").unwrap().len(), 2);
        assert_eq!(repository.write_count("p1"), 0);
    }
}
