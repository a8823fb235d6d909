//! # Drop Planning
//!
//! Turns one drag-and-drop event into the new pagelet sequences of the
//! composers involved.
//!
//! The target sequence is not computed as a delta. It is rebuilt from the
//! visual order of nodes after the drop, each node resolving to a pagelet
//! either through the copy it carries or through its pre-drop position:
//!
//! ```text
//! before:  main [P1 P2 P3]          drag P3 → main[0]
//! visual:  main [P3@2 P1@0 P2@1]    (node@pre-drop index)
//! after:   main [P3 P1 P2]
//! ```
//!
//! A palette drop places a placeholder node, which resolves to a freshly
//! created pagelet. A move between composers also yields the source
//! sequence without the moved pagelet, so it is never held twice.

use thiserror::Error;
use weblounge_common::{PageDocument, Pagelet, Stamp, User};

use crate::mutations::Mutation;
use crate::page::Page;

/// Pagelet type offered by the palette
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteItem {
    pub module: String,
    pub id: String,
}

impl PaletteItem {
    pub fn new(module: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            id: id.into(),
        }
    }
}

/// Where a dragged pagelet sat when the drag started
#[derive(Debug, Clone, PartialEq)]
pub struct DragOrigin {
    pub composer_id: String,
    pub index: usize,

    /// Copy with edits not yet written back, used instead of the lookup
    pub cached: Option<Pagelet>,
}

impl DragOrigin {
    pub fn new(composer_id: impl Into<String>, index: usize) -> Self {
        Self {
            composer_id: composer_id.into(),
            index,
            cached: None,
        }
    }

    pub fn with_cached(mut self, pagelet: Pagelet) -> Self {
        self.cached = Some(pagelet);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DraggedItem {
    Palette(PaletteItem),
    Existing(DragOrigin),
}

/// One drop: `item` lands in composer `target` at position `index` of the
/// resulting sequence. Indices past the end append.
#[derive(Debug, Clone, PartialEq)]
pub struct DropEvent {
    pub target: String,
    pub index: usize,
    pub item: DraggedItem,
}

impl DropEvent {
    pub fn palette(target: impl Into<String>, index: usize, item: PaletteItem) -> Self {
        Self {
            target: target.into(),
            index,
            item: DraggedItem::Palette(item),
        }
    }

    pub fn existing(target: impl Into<String>, index: usize, origin: DragOrigin) -> Self {
        Self {
            target: target.into(),
            index,
            item: DraggedItem::Existing(origin),
        }
    }
}

/// A node in the target composer after the drop
#[derive(Debug, Clone, PartialEq)]
pub enum VisualNode {
    Placeholder,
    Pagelet {
        composer_id: String,
        index: usize,
        cached: Option<Pagelet>,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReorderError {
    #[error("no pagelet at index {index} of composer {composer_id}")]
    StaleOrigin { composer_id: String, index: usize },

    #[error("composer {0} does not exist")]
    UnknownComposer(String),

    #[error("more than one placeholder in drop target")]
    MultiplePlaceholders,

    #[error("placeholder without a pagelet to put there")]
    MissingPlaceholder,
}

/// New sequences for the composers touched by a drop
#[derive(Debug, Clone, PartialEq)]
pub struct DropPlan {
    pub target: String,
    pub pagelets: Vec<Pagelet>,

    /// Source composer and its remaining pagelets, for cross-composer moves
    pub source: Option<(String, Vec<Pagelet>)>,

    /// Final position of the dropped pagelet in `pagelets`
    pub index: usize,

    /// The pagelet came from the palette
    pub is_new: bool,
}

impl DropPlan {
    pub fn mutations(&self) -> Vec<Mutation> {
        let mut mutations = vec![Mutation::ReplaceComposer {
            composer_id: self.target.clone(),
            pagelets: self.pagelets.clone(),
        }];
        if let Some((composer_id, pagelets)) = &self.source {
            mutations.push(Mutation::ReplaceComposer {
                composer_id: composer_id.clone(),
                pagelets: pagelets.clone(),
            });
        }
        mutations
    }
}

/// Nodes of `event.target` in their order after the drop
pub fn visual_order(document: &PageDocument, event: &DropEvent) -> Vec<VisualNode> {
    let mut nodes: Vec<VisualNode> = document
        .composer(&event.target)
        .map(|composer| {
            (0..composer.len())
                .map(|index| VisualNode::Pagelet {
                    composer_id: event.target.clone(),
                    index,
                    cached: None,
                })
                .collect()
        })
        .unwrap_or_default();

    let dropped = match &event.item {
        DraggedItem::Palette(_) => VisualNode::Placeholder,
        DraggedItem::Existing(origin) => {
            if origin.composer_id == event.target && origin.index < nodes.len() {
                nodes.remove(origin.index);
            }
            VisualNode::Pagelet {
                composer_id: origin.composer_id.clone(),
                index: origin.index,
                cached: origin.cached.clone(),
            }
        }
    };

    let index = event.index.min(nodes.len());
    nodes.insert(index, dropped);
    nodes
}

/// Resolve visual nodes to pagelets. The placeholder, if any, becomes
/// `new_pagelet`.
pub fn rebuild(
    document: &PageDocument,
    nodes: &[VisualNode],
    new_pagelet: Option<&Pagelet>,
) -> Result<Vec<Pagelet>, ReorderError> {
    let mut placeholder_seen = false;
    let mut pagelets = Vec::with_capacity(nodes.len());

    for node in nodes {
        let pagelet = match node {
            VisualNode::Placeholder => {
                if placeholder_seen {
                    return Err(ReorderError::MultiplePlaceholders);
                }
                placeholder_seen = true;
                new_pagelet.ok_or(ReorderError::MissingPlaceholder)?.clone()
            }
            VisualNode::Pagelet {
                cached: Some(pagelet),
                ..
            } => pagelet.clone(),
            VisualNode::Pagelet {
                composer_id,
                index,
                cached: None,
            } => document
                .composer(composer_id)
                .and_then(|c| c.pagelet(*index))
                .cloned()
                .ok_or_else(|| ReorderError::StaleOrigin {
                    composer_id: composer_id.clone(),
                    index: *index,
                })?,
        };
        pagelets.push(pagelet);
    }

    Ok(pagelets)
}

/// Plan a drop on `page` performed by `user`
pub fn plan_drop(page: &Page, event: &DropEvent, user: &User) -> Result<DropPlan, ReorderError> {
    let document = page.document();

    let new_pagelet = match &event.item {
        DraggedItem::Palette(item) => {
            Some(Pagelet::new(&item.module, &item.id).created_by(Stamp::now(user.clone())))
        }
        DraggedItem::Existing(origin) => {
            let source = document
                .composer(&origin.composer_id)
                .ok_or_else(|| ReorderError::UnknownComposer(origin.composer_id.clone()))?;
            if origin.index >= source.len() {
                return Err(ReorderError::StaleOrigin {
                    composer_id: origin.composer_id.clone(),
                    index: origin.index,
                });
            }
            None
        }
    };

    let nodes = visual_order(document, event);
    let index = nodes
        .iter()
        .position(|node| is_dropped(node, &event.item))
        .unwrap_or(0);
    let pagelets = rebuild(document, &nodes, new_pagelet.as_ref())?;

    let source = match &event.item {
        DraggedItem::Existing(origin) if origin.composer_id != event.target => {
            let mut remaining = document
                .composer(&origin.composer_id)
                .map(|c| c.pagelets.clone())
                .unwrap_or_default();
            remaining.remove(origin.index);
            Some((origin.composer_id.clone(), remaining))
        }
        _ => None,
    };

    Ok(DropPlan {
        target: event.target.clone(),
        pagelets,
        source,
        index,
        is_new: new_pagelet.is_some(),
    })
}

fn is_dropped(node: &VisualNode, item: &DraggedItem) -> bool {
    match (node, item) {
        (VisualNode::Placeholder, DraggedItem::Palette(_)) => true,
        (VisualNode::Pagelet { composer_id, index, .. }, DraggedItem::Existing(origin)) => {
            *composer_id == origin.composer_id && *index == origin.index
        }
        _ => false,
    }
}
