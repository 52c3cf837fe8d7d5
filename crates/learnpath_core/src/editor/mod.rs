//! Learning path editor document model.
//!
//! # Responsibility
//! - Hold one path tree in memory with unsaved/persisted references.
//! - Apply local mutations and record them in the change tracker.
//! - Lazily fetch children and reconcile local state on explicit save.
//!
//! # Invariants
//! - Mutations never perform I/O.
//! - Unsaved references never reach a repository delete or lookup.
//! - After a successful save the store is reloaded and holds no unsaved
//!   references.
//! - Save is not transactional: a failed phase leaves earlier phases applied
//!   and keeps the change log for retry.

use crate::model::ids::{ColumnRef, ItemRef, LocalIdAllocator, PathId, SectionRef};
use crate::model::path::{ColumnKind, Path};
use crate::repo::path_repo::{PathRepoError, PathRepository};
use std::error::Error;
use std::fmt::{Display, Formatter};

mod changes;
mod fetch;
mod mutations;
mod save;
mod store;

pub use changes::{Change, ChangeTracker, EntityKey, SavePlan};
pub use mutations::{NEW_ITEM_TITLE, ROOT_COLUMN_TITLE};
pub use save::SaveReport;
pub use store::{EditorColumn, EditorItem, EditorSection, EntityStore};

/// Documented nesting limit for columns. Reported by `PathEditor::depth_of`
/// and logged when exceeded, but not enforced.
pub const MAX_PATH_DEPTH: usize = 8;

pub type EditorResult<T> = Result<T, EditorError>;

/// Errors from editor operations.
#[derive(Debug)]
pub enum EditorError {
    /// Repository-level failure.
    Repo(PathRepoError),
    PathNotFound(PathId),
    /// Path has no column without a parent item.
    MissingRootColumn(PathId),
    ColumnNotFound(ColumnRef),
    ItemNotFound(ItemRef),
    SectionNotFound(SectionRef),
    /// Column children must be fetched before they can be edited.
    ChildrenNotLoaded(ColumnRef),
    ColumnKindMismatch {
        column: ColumnRef,
        expected: ColumnKind,
    },
    /// A root column already exists for this path.
    RootColumnExists,
    RootColumnDeletion(ColumnRef),
    /// Item already anchors a child column.
    ItemAlreadyAnchored(ItemRef),
    /// Reorder input is not a permutation of the column's sections.
    InvalidSectionOrder(ColumnRef),
    /// Parent item of a column was neither persisted nor inserted earlier in
    /// the same save.
    UnresolvedParentItem(ItemRef),
    /// Internal consistency mismatch between store, log and repository.
    InconsistentState(&'static str),
}

impl Display for EditorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::PathNotFound(id) => write!(f, "learning path not found: {id}"),
            Self::MissingRootColumn(id) => write!(f, "learning path has no root column: {id}"),
            Self::ColumnNotFound(id) => write!(f, "column not loaded: {id}"),
            Self::ItemNotFound(id) => write!(f, "column item not loaded: {id}"),
            Self::SectionNotFound(id) => write!(f, "content section not loaded: {id}"),
            Self::ChildrenNotLoaded(id) => write!(f, "column children not fetched: {id}"),
            Self::ColumnKindMismatch { column, expected } => write!(
                f,
                "column {column} must be a {} column",
                expected.as_str()
            ),
            Self::RootColumnExists => write!(f, "learning path already has a root column"),
            Self::RootColumnDeletion(id) => write!(f, "root column cannot be deleted: {id}"),
            Self::ItemAlreadyAnchored(id) => {
                write!(f, "column item already anchors a column: {id}")
            }
            Self::InvalidSectionOrder(id) => {
                write!(f, "section order is not a permutation for column {id}")
            }
            Self::UnresolvedParentItem(id) => {
                write!(f, "parent item has no persisted id: {id}")
            }
            Self::InconsistentState(details) => write!(f, "inconsistent editor state: {details}"),
        }
    }
}

impl Error for EditorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PathRepoError> for EditorError {
    fn from(value: PathRepoError) -> Self {
        match value {
            PathRepoError::PathNotFound(path_id) => Self::PathNotFound(path_id),
            other => Self::Repo(other),
        }
    }
}

/// Editor session over one learning path.
pub struct PathEditor<R: PathRepository> {
    repo: R,
    path_id: PathId,
    store: EntityStore,
    changes: ChangeTracker,
    local_ids: LocalIdAllocator,
}

impl<R: PathRepository> PathEditor<R> {
    pub fn path_id(&self) -> PathId {
        self.path_id
    }

    pub fn path(&self) -> Option<&Path> {
        self.store.path()
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn changes(&self) -> &ChangeTracker {
        &self.changes
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.changes.has_unsaved_changes()
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Nesting depth of a loaded column; the root column is depth 1.
    pub fn depth_of(&self, column: ColumnRef) -> Option<usize> {
        let mut depth = 1;
        let mut cursor = self.store.column(column)?;
        while let Some(parent_item) = cursor.parent_item {
            let owner = self.store.item(parent_item)?.column;
            cursor = self.store.column(owner)?;
            depth += 1;
        }
        Some(depth)
    }
}
