//! # Weblounge Editor
//!
//! Page editing engine: locking, whole-page writes, pagelet placement and
//! editor form marshaling.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ UI: drag events, editor forms               │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: EditSession                         │
//! │  - Gate changes on the page lock            │
//! │  - Plan drops, convert form values          │
//! │  - Apply mutations to the Page              │
//! │  - Write the whole page back (If-Match)     │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ PageGateway: repository (HTTP or in memory) │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Repository is authoritative**: local state is a working copy
//! 2. **Whole-page writes**: every change replaces the work version
//! 3. **Lock before edit**: only the lock holder changes content
//! 4. **No aliasing**: a pagelet lives in exactly one composer
//!
//! ## Usage
//!
//! ```rust,ignore
//! use weblounge_editor::{DragOrigin, DropEvent, EditSession, PageKey, SessionOptions};
//!
//! let mut session = EditSession::open(gateway, user, &PageKey::path("/news"), SessionOptions::default()).await?;
//! session.lock().await?;
//!
//! // Move the third pagelet of "main" to the top
//! session
//!     .drop_pagelet(DropEvent::existing("main", 0, DragOrigin::new("main", 2)))
//!     .await?;
//!
//! session.unlock().await?;
//! ```

mod errors;
mod gateway;
mod input_converter;
mod memory;
mod mutations;
mod page;
mod reorder;
mod session;
mod view;

pub use errors::{EditorError, FieldError, MutationError, Operation};
pub use gateway::{
    FileDocument, FileGateway, FileKey, GatewayError, PageGateway, PageKey, PageQuery,
    PublishWindow, SortOrder,
};
pub use input_converter::{
    apply_form, bind_fields, FieldBinding, FieldDescriptor, FieldKind, FieldTarget, SubmittedField,
};
pub use memory::{MemoryGateway, MemoryRepository};
pub use mutations::{parse_tags, Mutation, MutationResult};
pub use page::{Page, PageState};
pub use reorder::{
    plan_drop, rebuild, visual_order, DragOrigin, DraggedItem, DropEvent, DropPlan, PaletteItem,
    ReorderError, VisualNode,
};
pub use session::{DropOutcome, EditSession, EditorOpening, MetadataForm, SessionOptions};
pub use view::PageletView;

// Re-export the content model for convenience
pub use weblounge_common as model;
