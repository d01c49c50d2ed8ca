//! XML Document Model Library
//!
//! Mutable in-memory XML trees with live, filtered views over node content.
//!
//! ## Design
//!
//! - **Data first**: every node lives in one arena, addressed by `NodeId`
//! - **One write path**: all content changes go through a single checked
//!   splice, so a rejected change never leaves a half-applied list
//! - **Views are values**: filtered views and cursors hold no borrow; they
//!   revalidate against the list's modification counter on every call
//!
//! ## Core Design
//!
//! ```text
//! SaxEvent → DomBuilder → XmlArena ← FilteredView / ViewCursor → XmlOutputter
//!                            ↓
//!                 BackingList (content | attributes)
//!                            ↓
//!                     checker (one splice)
//! ```

pub mod arena;
pub mod attributes;
pub mod backing;
pub mod builder;
mod checker;
pub mod cursor;
pub mod descendants;
pub mod document;
pub mod element;
pub mod error;
pub mod filter;
pub mod namespace;
pub mod serializer;
pub mod types;
pub mod utils;
pub mod verifier;
pub mod view;

pub use arena::XmlArena;
pub use backing::{BackingList, ListRef, Slot, SlotKind};
pub use builder::{
    build_document, events_from_json, BuilderConfig, ContentHandler, DomBuilder, SaxAttribute,
    SaxEvent,
};
pub use cursor::ViewCursor;
pub use descendants::{DescendantCursor, Descendants};
pub use error::{AddTarget, DomError, Result};
pub use filter::{ContentKinds, Filter};
pub use namespace::Namespace;
pub use serializer::{Format, TextMode, XmlOutputter};
pub use types::*;
pub use view::FilteredView;
