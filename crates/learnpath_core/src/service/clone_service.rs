//! Deep copy of a stored learning path.
//!
//! # Responsibility
//! - Copy a path with every column, item and section into a new path.
//! - Report old → new identity pairs for the copied tree.
//!
//! # Invariants
//! - Reads the stored tree only; editor state is never consulted.
//! - Copies keep kind, title, content and `order_index` of their source.
//! - Recursion follows the parent-item links, each column has a single
//!   parent, so the walk visits every reachable column once.

use crate::model::ids::{ColumnId, ItemId, PathId, SectionId};
use crate::model::path::{Column, ColumnKind, NewColumn, NewColumnItem, NewContentSection, NewPath};
use crate::repo::path_repo::{PathRepoError, PathRepository};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Options applied to cloned paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneOptions {
    /// Appended to the source title.
    pub title_suffix: String,
}

impl Default for CloneOptions {
    fn default() -> Self {
        Self {
            title_suffix: " (Copy)".to_string(),
        }
    }
}

/// Identity mapping produced by one clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneReport {
    pub path_id: PathId,
    pub columns: Vec<(ColumnId, ColumnId)>,
    pub items: Vec<(ItemId, ItemId)>,
    pub sections: Vec<(SectionId, SectionId)>,
}

impl CloneReport {
    fn new(path_id: PathId) -> Self {
        Self {
            path_id,
            columns: Vec::new(),
            items: Vec::new(),
            sections: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub enum CloneError {
    SourceNotFound(PathId),
    /// Repository-level failure.
    Repo(PathRepoError),
    /// Batch insert returned a different number of rows than submitted.
    InconsistentState(&'static str),
}

impl Display for CloneError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SourceNotFound(id) => write!(f, "source learning path not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent clone state: {details}"),
        }
    }
}

impl Error for CloneError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PathRepoError> for CloneError {
    fn from(value: PathRepoError) -> Self {
        match value {
            PathRepoError::PathNotFound(path_id) => Self::SourceNotFound(path_id),
            other => Self::Repo(other),
        }
    }
}

/// Copies stored paths through a repository.
pub struct PathCloner<R: PathRepository> {
    repo: R,
    options: CloneOptions,
}

impl<R: PathRepository> PathCloner<R> {
    pub fn new(repo: R) -> Self {
        Self::with_options(repo, CloneOptions::default())
    }

    pub fn with_options(repo: R, options: CloneOptions) -> Self {
        Self { repo, options }
    }

    /// Clones `source` into a new private path and bumps the source's clone
    /// counter.
    ///
    /// # Errors
    /// - `SourceNotFound` when the source path does not exist.
    /// - Any repository failure aborts the clone. Rows written before the
    ///   failure are left in place.
    pub fn clone_path(&self, source: PathId) -> Result<CloneReport, CloneError> {
        let started_at = Instant::now();
        info!("event=path_clone module=service status=start source_path_id={source}");

        match self.clone_tree(source) {
            Ok(report) => {
                info!(
                    "event=path_clone module=service status=ok source_path_id={source} path_id={} columns={} items={} sections={} duration_ms={}",
                    report.path_id,
                    report.columns.len(),
                    report.items.len(),
                    report.sections.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(report)
            }
            Err(err) => {
                error!(
                    "event=path_clone module=service status=error source_path_id={source} duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    fn clone_tree(&self, source: PathId) -> Result<CloneReport, CloneError> {
        let source_path = self
            .repo
            .get_path(source)?
            .ok_or(CloneError::SourceNotFound(source))?;

        let path = self.repo.create_path(&NewPath {
            title: format!("{}{}", source_path.title, self.options.title_suffix),
            subtitle: source_path.subtitle.clone(),
            tags: source_path.tags.clone(),
            is_public: false,
            cloned_from: Some(source),
        })?;

        let mut report = CloneReport::new(path.id);
        for column in self.repo.list_root_columns(source)? {
            self.clone_column(&column, path.id, None, &mut report)?;
        }

        self.repo.increment_clones(source)?;
        Ok(report)
    }

    fn clone_column(
        &self,
        source: &Column,
        dest_path: PathId,
        dest_parent_item: Option<ItemId>,
        report: &mut CloneReport,
    ) -> Result<(), CloneError> {
        let column = self.repo.insert_column(&NewColumn {
            path_id: dest_path,
            parent_item_id: dest_parent_item,
            kind: source.kind,
            title: source.title.clone(),
            order_index: source.order_index,
        })?;
        report.columns.push((source.id, column.id));

        match source.kind {
            ColumnKind::Branch => {
                for item in self.repo.list_items(source.id)? {
                    let copies = self.repo.insert_items(&[NewColumnItem {
                        column_id: column.id,
                        title: item.title.clone(),
                        order_index: item.order_index,
                    }])?;
                    let copy = copies
                        .first()
                        .ok_or(CloneError::InconsistentState("item insert returned no row"))?;
                    report.items.push((item.id, copy.id));

                    for child in self.repo.list_child_columns(item.id)? {
                        self.clone_column(&child, dest_path, Some(copy.id), report)?;
                    }
                }
            }
            ColumnKind::Content => {
                let sections = self.repo.list_sections(source.id)?;
                if sections.is_empty() {
                    return Ok(());
                }
                let copies = self.repo.insert_sections(
                    &sections
                        .iter()
                        .map(|section| NewContentSection {
                            column_id: column.id,
                            kind: section.kind,
                            content: section.content.clone(),
                            order_index: section.order_index,
                        })
                        .collect::<Vec<_>>(),
                )?;
                if copies.len() != sections.len() {
                    return Err(CloneError::InconsistentState(
                        "section insert returned a different number of rows",
                    ));
                }
                report.sections.extend(
                    sections
                        .iter()
                        .zip(&copies)
                        .map(|(section, copy)| (section.id, copy.id)),
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{CloneError, CloneOptions};
    use crate::model::ids::PathId;
    use crate::repo::path_repo::PathRepoError;

    #[test]
    fn default_suffix_marks_copies() {
        assert_eq!(CloneOptions::default().title_suffix, " (Copy)");
    }

    #[test]
    fn missing_source_maps_from_repo_error() {
        let path_id = PathId::new_v4();
        let err = CloneError::from(PathRepoError::PathNotFound(path_id));
        assert!(matches!(err, CloneError::SourceNotFound(id) if id == path_id));
    }
}
