//! Learning path use-case service.
//!
//! # Responsibility
//! - Create paths with their root column in one call.
//! - Validate titles and normalize tags above the repository layer.
//!
//! # Invariants
//! - A path created here always has exactly one root branch column.
//! - Tags are trimmed, lowercased, deduplicated and sorted.

use crate::editor::ROOT_COLUMN_TITLE;
use crate::model::ids::PathId;
use crate::model::path::{ColumnKind, NewColumn, NewPath, Path};
use crate::repo::path_repo::{PathRepoError, PathRepository};
use log::{error, info};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from path service operations.
#[derive(Debug)]
pub enum PathServiceError {
    /// Title is blank after trim.
    InvalidTitle,
    PathNotFound(PathId),
    /// Repository-level failure.
    Repo(PathRepoError),
}

impl Display for PathServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTitle => write!(f, "path title must not be blank"),
            Self::PathNotFound(id) => write!(f, "learning path not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PathServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PathRepoError> for PathServiceError {
    fn from(value: PathRepoError) -> Self {
        match value {
            PathRepoError::PathNotFound(path_id) => Self::PathNotFound(path_id),
            other => Self::Repo(other),
        }
    }
}

/// Path service facade.
pub struct PathService<R: PathRepository> {
    repo: R,
}

impl<R: PathRepository> PathService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a private path and its root column.
    ///
    /// The path row is written before the column; a failed column insert
    /// leaves a path without a root.
    pub fn create_path(
        &self,
        title: impl Into<String>,
        subtitle: impl Into<String>,
        tags: &[String],
    ) -> Result<Path, PathServiceError> {
        let title = normalize_title(title.into())?;
        let path = self.repo.create_path(&NewPath {
            title,
            subtitle: subtitle.into().trim().to_string(),
            tags: normalize_tags(tags),
            is_public: false,
            cloned_from: None,
        })?;

        let root = self.repo.insert_column(&NewColumn {
            path_id: path.id,
            parent_item_id: None,
            kind: ColumnKind::Branch,
            title: ROOT_COLUMN_TITLE.to_string(),
            order_index: 0,
        });
        if let Err(err) = root {
            error!(
                "event=path_create module=service status=error path_id={} error={}",
                path.id, err
            );
            return Err(err.into());
        }

        info!(
            "event=path_create module=service status=ok path_id={} tags={}",
            path.id,
            path.tags.len()
        );
        Ok(path)
    }

    pub fn get_path(&self, path_id: PathId) -> Result<Path, PathServiceError> {
        self.repo
            .get_path(path_id)?
            .ok_or(PathServiceError::PathNotFound(path_id))
    }

    /// Lists all paths, newest first.
    pub fn list_paths(&self) -> Result<Vec<Path>, PathServiceError> {
        self.repo.list_paths().map_err(Into::into)
    }

    /// Deletes a path and its whole tree.
    pub fn delete_path(&self, path_id: PathId) -> Result<(), PathServiceError> {
        match self.repo.delete_path(path_id) {
            Ok(()) => {
                info!("event=path_delete module=service status=ok path_id={path_id}");
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=path_delete module=service status=error path_id={path_id} error={}",
                    err
                );
                Err(err.into())
            }
        }
    }
}

fn normalize_title(value: String) -> Result<String, PathServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PathServiceError::InvalidTitle);
    }
    Ok(trimmed.to_string())
}

fn normalize_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
