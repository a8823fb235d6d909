use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::xml::Element;
use crate::{Composer, Pagelet, ResourceVersion, Stamp, User};

/// Exclusive edit claim on a page's work version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lock {
    pub user: User,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,
}

impl Lock {
    pub fn new(user: User) -> Self {
        Self { user, since: None }
    }

    pub fn is_held_by(&self, user_id: &str) -> bool {
        self.user.id == user_id
    }
}

/// Descriptive page metadata, title and description per language
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub title: BTreeMap<String, String>,

    #[serde(default)]
    pub description: BTreeMap<String, String>,

    /// Tags
    #[serde(default)]
    pub subjects: Vec<String>,

    /// Metadata entries carried through unchanged (series, coverage, ...)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extras: Vec<Element>,
}

/// A page as exchanged with the content repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageDocument {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    pub version: ResourceVersion,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,

    #[serde(default)]
    pub metadata: Metadata,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<Stamp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<Stamp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock: Option<Lock>,

    /// Concurrency token of the fetched state; never part of the document body
    #[serde(skip)]
    pub etag: Option<String>,

    #[serde(default)]
    pub composers: Vec<Composer>,

    /// Head sections carried through unchanged (promotion, publishing,
    /// security, layout, ...)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub head_extras: Vec<Element>,
}

impl PageDocument {
    pub fn new(id: impl Into<String>, version: ResourceVersion) -> Self {
        Self {
            id: id.into(),
            path: None,
            version,
            template: None,
            metadata: Metadata::default(),
            created: None,
            modified: None,
            lock: None,
            etag: None,
            composers: Vec::new(),
            head_extras: Vec::new(),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_composer(mut self, composer: Composer) -> Self {
        self.composers.push(composer);
        self
    }

    pub fn is_work_version(&self) -> bool {
        self.version.is_work()
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_some()
    }

    pub fn is_locked_by(&self, user_id: &str) -> bool {
        self.lock.as_ref().is_some_and(|l| l.is_held_by(user_id))
    }

    /// Name of the lock owner, or its login when no name is known
    pub fn lock_owner(&self) -> Option<&str> {
        self.lock.as_ref().map(|l| l.user.display_name())
    }

    pub fn composer(&self, id: &str) -> Option<&Composer> {
        self.composers.iter().find(|c| c.id == id)
    }

    pub fn composer_mut(&mut self, id: &str) -> Option<&mut Composer> {
        self.composers.iter_mut().find(|c| c.id == id)
    }

    pub fn composer_index(&self, id: &str) -> Option<usize> {
        self.composers.iter().position(|c| c.id == id)
    }

    /// All pagelets in document order
    pub fn pagelets(&self) -> impl Iterator<Item = &Pagelet> {
        self.composers.iter().flat_map(|c| c.pagelets.iter())
    }

    /// Title in `language`, empty when unset
    pub fn title(&self, language: &str) -> &str {
        self.metadata.title.get(language).map(String::as_str).unwrap_or("")
    }

    /// Description in `language`, empty when unset
    pub fn description(&self, language: &str) -> &str {
        self.metadata
            .description
            .get(language)
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn tags(&self) -> &[String] {
        &self.metadata.subjects
    }
}
