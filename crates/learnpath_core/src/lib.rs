//! Core domain logic for the learning path editor.
//!
//! Holds the persisted model, the SQLite repository, the in-memory editor
//! with its save reconciler, and the path services (create, delete, clone).

pub mod db;
pub mod editor;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use editor::{
    Change, ChangeTracker, EditorError, EditorResult, EntityKey, EntityStore, PathEditor,
    SavePlan, SaveReport, MAX_PATH_DEPTH, NEW_ITEM_TITLE, ROOT_COLUMN_TITLE,
};
pub use logging::{default_log_level, init_logging, logging_status, LogConfig, LoggingError};
pub use model::ids::{
    ColumnId, ColumnRef, ItemId, ItemRef, LocalId, PathId, SectionId, SectionRef,
};
pub use model::path::{Column, ColumnItem, ColumnKind, ContentSection, Path, SectionKind};
pub use repo::path_repo::{
    PathRepoError, PathRepoResult, PathRepository, SqlitePathRepository,
};
pub use service::clone_service::{CloneError, CloneOptions, CloneReport, PathCloner};
pub use service::path_service::{PathService, PathServiceError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
