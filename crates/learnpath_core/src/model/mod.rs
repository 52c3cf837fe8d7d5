//! Learning path domain model.
//!
//! # Responsibility
//! - Define persisted records for paths, columns, items and sections.
//! - Define typed identities and editor-side unsaved/persisted references.
//!
//! # Invariants
//! - Persisted ids are assigned by the repository, never by the editor.
//! - An editor reference is either `Unsaved` or `Persisted`; the variant is the
//!   only way to tell them apart.

pub mod ids;
pub mod path;
