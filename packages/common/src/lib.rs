//! # Weblounge Common
//!
//! Content model shared by the editing layer: pages, their composers, the
//! pagelets inside them and the per-language text each pagelet carries.
//!
//! ```text
//! PageDocument
//!  ├─ head: path, template, metadata, lock, provenance
//!  └─ body: Composer*
//!            └─ Pagelet*  (ordered, rendering order)
//!                 ├─ properties: name → [value]
//!                 └─ locale: LocaleVariant*  (one per language)
//! ```
//!
//! Every relationship is containment. A page can therefore be written back
//! to the repository as one document, see [`codec`].

pub mod codec;
pub mod composer;
pub mod error;
pub mod locale;
pub mod page;
pub mod pagelet;
pub mod result;
pub mod user;
pub mod version;
pub mod xml;

pub use composer::Composer;
pub use error::*;
pub use locale::{LocaleSet, LocaleVariant, ValueMap};
pub use page::{Lock, Metadata, PageDocument};
pub use pagelet::Pagelet;
pub use result::*;
pub use user::{Stamp, User};
pub use version::ResourceVersion;
