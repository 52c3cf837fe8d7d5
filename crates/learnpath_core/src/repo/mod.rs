//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the persistence contract used by the editor and path services.
//! - Isolate SQLite query details from editor and service orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`*NotFound`) in addition to DB
//!   transport errors.
//! - Deletes are idempotent for rows already removed by cascade.

pub mod path_repo;
