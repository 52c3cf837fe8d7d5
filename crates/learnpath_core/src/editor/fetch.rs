//! Loading and lazy fetches for the editor store.
//!
//! # Invariants
//! - Unsaved references never reach the repository.
//! - A fetch that fails leaves the store in its last-known state.
//! - Fetched columns are appended after the column owning their parent item.

use super::changes::{ChangeTracker, EntityKey};
use super::store::{EditorColumn, EditorItem, EditorSection, EntityStore};
use super::{EditorError, EditorResult, PathEditor};
use crate::model::ids::{ColumnId, ColumnRef, ItemRef, LocalIdAllocator, PathId};
use crate::model::path::{Column, ColumnKind};
use crate::repo::path_repo::PathRepository;
use log::{debug, error, info, warn};
use std::collections::VecDeque;
use std::time::Instant;

impl<R: PathRepository> PathEditor<R> {
    /// Opens a path: loads the path record, its root column and the root
    /// column's children.
    ///
    /// # Side effects
    /// - Emits `path_load` logging events with duration and status.
    pub fn open(repo: R, path_id: PathId) -> EditorResult<Self> {
        let started_at = Instant::now();
        info!("event=path_load module=editor status=start path_id={path_id}");

        let mut store = EntityStore::default();
        match load_root(&repo, &mut store, path_id) {
            Ok(()) => {
                info!(
                    "event=path_load module=editor status=ok path_id={path_id} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
            }
            Err(err) => {
                error!(
                    "event=path_load module=editor status=error path_id={path_id} duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(err);
            }
        }

        Ok(Self {
            repo,
            path_id,
            store,
            changes: ChangeTracker::default(),
            local_ids: LocalIdAllocator::default(),
        })
    }

    /// Loads a column's items or sections if they are not present yet.
    ///
    /// Unsaved columns and columns with loaded children perform no I/O.
    pub fn fetch_column(&mut self, column: ColumnRef) -> EditorResult<()> {
        let kind = self
            .store
            .column(column)
            .ok_or(EditorError::ColumnNotFound(column))?
            .kind;
        let ColumnRef::Persisted(column_id) = column else {
            return Ok(());
        };
        if self.store.children_loaded(column) {
            return Ok(());
        }

        let started_at = Instant::now();
        match load_children(&self.repo, &mut self.store, column_id, kind) {
            Ok(()) => {
                debug!(
                    "event=column_fetch module=editor status=ok column_id={column_id} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=column_fetch module=editor status=error column_id={column_id} error={}",
                    err
                );
                Err(err)
            }
        }
    }

    /// Returns the column anchored on `item`, fetching it when needed.
    ///
    /// # Contract
    /// - A locally loaded child column is returned without I/O.
    /// - An unsaved item cannot have a stored child: returns `None` with zero
    ///   repository calls. This holds for temp ids the store no longer knows,
    ///   such as a deleted unsaved item or one replaced by a save.
    /// - A stored child column pending local deletion is ignored.
    pub fn fetch_child_column(&mut self, item: ItemRef) -> EditorResult<Option<ColumnRef>> {
        if let Some(child) = self.store.child_column_of(item) {
            return Ok(Some(child.id));
        }
        let ItemRef::Persisted(item_id) = item else {
            debug!("event=child_column_fetch module=editor status=skipped item={item} reason=unsaved_item");
            return Ok(None);
        };
        if self.store.item(item).is_none() {
            return Err(EditorError::ItemNotFound(item));
        }

        let started_at = Instant::now();
        let children = match self.repo.list_child_columns(item_id) {
            Ok(children) => children,
            Err(err) => {
                error!(
                    "event=child_column_fetch module=editor status=error item_id={item_id} error={}",
                    err
                );
                return Err(err.into());
            }
        };
        if children.len() > 1 {
            warn!(
                "event=child_column_fetch module=editor status=warn item_id={item_id} child_count={} reason=multiple_children",
                children.len()
            );
        }

        let Some(child) = children.into_iter().find(|column| {
            !self
                .changes
                .is_deleted(EntityKey::Column(ColumnRef::Persisted(column.id)))
        }) else {
            return Ok(None);
        };

        let child_ref = ColumnRef::Persisted(child.id);
        if let Err(err) = load_children(&self.repo, &mut self.store, child.id, child.kind) {
            error!(
                "event=child_column_fetch module=editor status=error item_id={item_id} column_id={} error={}",
                child.id, err
            );
            return Err(err);
        }
        self.store.push_column(EditorColumn::from(&child));
        debug!(
            "event=child_column_fetch module=editor status=ok item_id={item_id} column_id={} duration_ms={}",
            child.id,
            started_at.elapsed().as_millis()
        );
        Ok(Some(child_ref))
    }

    /// Replaces the store with a full breadth-first load of the stored tree.
    ///
    /// The current store is kept when the load fails.
    pub fn reload(&mut self) -> EditorResult<()> {
        let started_at = Instant::now();
        let path_id = self.path_id;
        info!("event=path_reload module=editor status=start path_id={path_id}");

        match load_full(&self.repo, path_id) {
            Ok(store) => {
                self.store = store;
                info!(
                    "event=path_reload module=editor status=ok path_id={path_id} columns={} duration_ms={}",
                    self.store.column_refs().len(),
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=path_reload module=editor status=error path_id={path_id} duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }
}

fn load_root<R: PathRepository>(
    repo: &R,
    store: &mut EntityStore,
    path_id: PathId,
) -> EditorResult<()> {
    let path = repo
        .get_path(path_id)?
        .ok_or(EditorError::PathNotFound(path_id))?;
    let roots = repo.list_root_columns(path_id)?;
    if roots.len() > 1 {
        warn!(
            "event=path_load module=editor status=warn path_id={path_id} root_count={} reason=multiple_roots",
            roots.len()
        );
    }
    let root = roots
        .first()
        .ok_or(EditorError::MissingRootColumn(path_id))?;

    load_children(repo, store, root.id, root.kind)?;
    store.set_path(path);
    store.push_column(EditorColumn::from(root));
    Ok(())
}

fn load_full<R: PathRepository>(repo: &R, path_id: PathId) -> EditorResult<EntityStore> {
    let mut store = EntityStore::default();
    let path = repo
        .get_path(path_id)?
        .ok_or(EditorError::PathNotFound(path_id))?;
    store.set_path(path);

    let mut queue: VecDeque<Column> = repo.list_root_columns(path_id)?.into();
    while let Some(column) = queue.pop_front() {
        store.push_column(EditorColumn::from(&column));
        let column_ref = ColumnRef::Persisted(column.id);
        match column.kind {
            ColumnKind::Branch => {
                let items = repo.list_items(column.id)?;
                for item in &items {
                    queue.extend(repo.list_child_columns(item.id)?);
                }
                store.set_items(column_ref, items.iter().map(EditorItem::from).collect());
            }
            ColumnKind::Content => {
                let sections = repo.list_sections(column.id)?;
                store.set_sections(
                    column_ref,
                    sections.iter().map(EditorSection::from).collect(),
                );
            }
        }
    }
    Ok(store)
}

fn load_children<R: PathRepository>(
    repo: &R,
    store: &mut EntityStore,
    column_id: ColumnId,
    kind: ColumnKind,
) -> EditorResult<()> {
    let column = ColumnRef::Persisted(column_id);
    match kind {
        ColumnKind::Branch => {
            let items = repo.list_items(column_id)?;
            store.set_items(column, items.iter().map(EditorItem::from).collect());
        }
        ColumnKind::Content => {
            let sections = repo.list_sections(column_id)?;
            store.set_sections(column, sections.iter().map(EditorSection::from).collect());
        }
    }
    Ok(())
}
