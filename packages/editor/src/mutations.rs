//! # Page Mutations
//!
//! Structural operations on a page's composers, applied in memory.
//!
//! ## Semantics
//!
//! ### InsertPagelet
//! - Overwrites the entry at `index`; `index == len` appends
//! - Callers splice the sequence first if they want to shift entries
//!
//! ### DeletePagelet
//! - Removes the entry, later entries shift down
//!
//! ### ReplaceComposer
//! - Replaces the whole sequence, creating the composer if needed
//!
//! ### SaveMetadata
//! - Only the given language's title and description change

use serde::{Deserialize, Serialize};
use weblounge_common::{Composer, PageDocument, Pagelet};

use crate::errors::MutationError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Mutation {
    InsertPagelet {
        composer_id: String,
        index: usize,
        pagelet: Pagelet,
    },

    DeletePagelet {
        composer_id: String,
        index: usize,
    },

    ReplaceComposer {
        composer_id: String,
        pagelets: Vec<Pagelet>,
    },

    SaveMetadata {
        path: Option<String>,
        template: Option<String>,
        language: String,
        title: String,
        description: String,
        tags: Vec<String>,
    },
}

impl Mutation {
    /// Apply mutation to the document with validation
    pub fn apply(&self, doc: &mut PageDocument) -> Result<(), MutationError> {
        self.validate(doc)?;

        match self {
            Mutation::InsertPagelet {
                composer_id,
                index,
                pagelet,
            } => {
                let composer = composer_mut(doc, composer_id)?;
                if *index == composer.pagelets.len() {
                    composer.pagelets.push(pagelet.clone());
                } else {
                    composer.pagelets[*index] = pagelet.clone();
                }
            }

            Mutation::DeletePagelet { composer_id, index } => {
                composer_mut(doc, composer_id)?.pagelets.remove(*index);
            }

            Mutation::ReplaceComposer {
                composer_id,
                pagelets,
            } => match doc.composer_mut(composer_id) {
                Some(composer) => composer.pagelets = pagelets.clone(),
                None => doc.composers.push(Composer {
                    id: composer_id.clone(),
                    pagelets: pagelets.clone(),
                }),
            },

            Mutation::SaveMetadata {
                path,
                template,
                language,
                title,
                description,
                tags,
            } => {
                if path.is_some() {
                    doc.path = path.clone();
                }
                if template.is_some() {
                    doc.template = template.clone();
                }
                doc.metadata.title.insert(language.clone(), title.clone());
                doc.metadata
                    .description
                    .insert(language.clone(), description.clone());
                doc.metadata.subjects = tags.clone();
            }
        }
        Ok(())
    }

    /// Validate without applying
    pub fn validate(&self, doc: &PageDocument) -> Result<(), MutationError> {
        match self {
            Mutation::InsertPagelet {
                composer_id, index, ..
            } => check_index(doc, composer_id, *index, true),

            Mutation::DeletePagelet { composer_id, index } => {
                check_index(doc, composer_id, *index, false)
            }

            Mutation::ReplaceComposer { .. } | Mutation::SaveMetadata { .. } => Ok(()),
        }
    }

    /// Composer the mutation touches, if any
    pub fn composer_id(&self) -> Option<&str> {
        match self {
            Mutation::InsertPagelet { composer_id, .. }
            | Mutation::DeletePagelet { composer_id, .. }
            | Mutation::ReplaceComposer { composer_id, .. } => Some(composer_id),
            Mutation::SaveMetadata { .. } => None,
        }
    }
}

fn composer_mut<'a>(
    doc: &'a mut PageDocument,
    composer_id: &str,
) -> Result<&'a mut Composer, MutationError> {
    doc.composer_mut(composer_id)
        .ok_or_else(|| MutationError::ComposerNotFound(composer_id.to_string()))
}

fn check_index(
    doc: &PageDocument,
    composer_id: &str,
    index: usize,
    allow_end: bool,
) -> Result<(), MutationError> {
    let composer = doc
        .composer(composer_id)
        .ok_or_else(|| MutationError::ComposerNotFound(composer_id.to_string()))?;
    let len = composer.len();
    if index < len || (allow_end && index == len) {
        Ok(())
    } else {
        Err(MutationError::IndexOutOfRange {
            composer: composer_id.to_string(),
            index,
            len,
        })
    }
}

/// Result of applying mutations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationResult {
    /// Local revision after the mutation
    pub revision: u64,
}

/// Split a comma separated tag list, dropping empty entries
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
