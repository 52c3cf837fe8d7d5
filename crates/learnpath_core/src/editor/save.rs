//! Save reconciler: replays the change log against the repository.
//!
//! # Phases
//! 1. Deletes: columns, then sections, then items.
//! 2. Path header update.
//! 3. Column walk in store order (parents before children): insert or
//!    retitle the column, then batch-insert and batch-update its items or
//!    sections.
//! 4. Re-key inserted entities to their stored ids, clear the tracker and
//!    reload the whole tree.
//!
//! # Invariants
//! - Temp item ids resolve only through submission order: the i-th submitted
//!   item maps to the i-th returned row.
//! - A failed phase aborts the save and keeps the tracker. Phases that already
//!   ran stay applied.

use super::changes::SavePlan;
use super::{EditorError, EditorResult, PathEditor};
use crate::model::ids::{ColumnId, ColumnRef, ItemId, ItemRef, LocalId, SectionId, SectionRef};
use crate::model::path::{ColumnItem, ColumnKind, ContentSection, NewColumn, NewColumnItem, NewContentSection};
use crate::repo::path_repo::PathRepository;
use log::{error, info};
use std::collections::HashMap;
use std::time::Instant;

/// Outcome of one save: counts per phase and resolved temp ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub deleted_columns: usize,
    pub deleted_sections: usize,
    pub deleted_items: usize,
    pub path_updated: bool,
    pub inserted_columns: usize,
    pub updated_columns: usize,
    pub inserted_items: usize,
    pub updated_items: usize,
    pub inserted_sections: usize,
    pub updated_sections: usize,
    /// Temp id → stored id pairs, in insertion order.
    pub column_ids: Vec<(LocalId, ColumnId)>,
    pub item_ids: Vec<(LocalId, ItemId)>,
    pub section_ids: Vec<(LocalId, SectionId)>,
}

impl SaveReport {
    /// Whether the save wrote nothing.
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }

    pub fn resolve_column(&self, local: LocalId) -> Option<ColumnId> {
        lookup(&self.column_ids, local)
    }

    pub fn resolve_item(&self, local: LocalId) -> Option<ItemId> {
        lookup(&self.item_ids, local)
    }

    pub fn resolve_section(&self, local: LocalId) -> Option<SectionId> {
        lookup(&self.section_ids, local)
    }
}

fn lookup<T: Copy>(pairs: &[(LocalId, T)], local: LocalId) -> Option<T> {
    pairs
        .iter()
        .find(|(candidate, _)| *candidate == local)
        .map(|(_, id)| *id)
}

impl<R: PathRepository> PathEditor<R> {
    /// Persists every recorded change, then reloads the tree.
    ///
    /// Without unsaved changes this returns an empty report and performs no
    /// repository calls.
    ///
    /// # Errors
    /// - The first failing repository call aborts the save. The change log
    ///   is kept so the save can be retried.
    /// - A reload failure after the writes is returned as-is. By then the
    ///   log is cleared and the store already carries the stored ids, so the
    ///   session can keep editing and saving.
    pub fn save(&mut self) -> EditorResult<SaveReport> {
        let path_id = self.path_id;
        if !self.changes.has_unsaved_changes() {
            info!("event=path_save module=editor status=skipped path_id={path_id} reason=no_changes");
            return Ok(SaveReport::default());
        }

        let started_at = Instant::now();
        let plan = self.changes.plan();
        info!(
            "event=path_save module=editor status=start path_id={path_id} entries={}",
            self.changes.entries().len()
        );

        let report = match self.apply_plan(&plan) {
            Ok(report) => report,
            Err(err) => {
                error!(
                    "event=path_save module=editor status=error path_id={path_id} duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(err);
            }
        };

        self.adopt_stored_ids(&report);
        self.changes.clear();
        if let Err(err) = self.reload() {
            error!(
                "event=path_save module=editor status=error phase=reload path_id={path_id} duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err);
        }
        info!(
            "event=path_save module=editor status=ok path_id={path_id} inserted_columns={} inserted_items={} inserted_sections={} duration_ms={}",
            report.inserted_columns,
            report.inserted_items,
            report.inserted_sections,
            started_at.elapsed().as_millis()
        );
        Ok(report)
    }

    /// Swaps the temp refs inserted by this save for their stored ids.
    fn adopt_stored_ids(&mut self, report: &SaveReport) {
        for (local, id) in &report.column_ids {
            self.store
                .rebind_column(ColumnRef::Unsaved(*local), ColumnRef::Persisted(*id));
        }
        for (local, id) in &report.item_ids {
            self.store
                .rebind_item(ItemRef::Unsaved(*local), ItemRef::Persisted(*id));
        }
        for (local, id) in &report.section_ids {
            self.store
                .rebind_section(SectionRef::Unsaved(*local), SectionRef::Persisted(*id));
        }
    }

    fn apply_plan(&self, plan: &SavePlan) -> EditorResult<SaveReport> {
        let path_id = self.path_id;
        let mut report = SaveReport::default();

        for column_id in &plan.deleted_columns {
            self.repo.delete_column(*column_id)?;
        }
        for section_id in &plan.deleted_sections {
            self.repo.delete_section(*section_id)?;
        }
        for item_id in &plan.deleted_items {
            self.repo.delete_item(*item_id)?;
        }
        report.deleted_columns = plan.deleted_columns.len();
        report.deleted_sections = plan.deleted_sections.len();
        report.deleted_items = plan.deleted_items.len();
        info!(
            "event=path_save module=editor status=ok phase=delete path_id={path_id} columns={} sections={} items={}",
            report.deleted_columns, report.deleted_sections, report.deleted_items
        );

        if plan.path_header {
            let path = self
                .store
                .path()
                .ok_or(EditorError::InconsistentState("path header is not loaded"))?;
            self.repo
                .update_path_header(path_id, &path.title, &path.subtitle)?;
            report.path_updated = true;
            info!("event=path_save module=editor status=ok phase=path path_id={path_id}");
        }

        let mut item_ids: HashMap<LocalId, ItemId> = HashMap::new();
        for column_ref in self.store.column_refs() {
            let column = self
                .store
                .column(*column_ref)
                .ok_or(EditorError::InconsistentState("column order lists a missing column"))?;

            let column_id = match column.id {
                ColumnRef::Unsaved(local) => {
                    if !plan.new_columns.contains(&local) {
                        return Err(EditorError::InconsistentState(
                            "unsaved column has no pending insert",
                        ));
                    }
                    let parent_item_id = match column.parent_item {
                        None => None,
                        Some(ItemRef::Persisted(id)) => Some(id),
                        Some(parent @ ItemRef::Unsaved(local_item)) => Some(
                            *item_ids
                                .get(&local_item)
                                .ok_or(EditorError::UnresolvedParentItem(parent))?,
                        ),
                    };
                    let inserted = self.repo.insert_column(&NewColumn {
                        path_id,
                        parent_item_id,
                        kind: column.kind,
                        title: column.title.clone(),
                        order_index: self.store.column_order_index(*column_ref),
                    })?;
                    report.column_ids.push((local, inserted.id));
                    report.inserted_columns += 1;
                    inserted.id
                }
                ColumnRef::Persisted(id) => {
                    if plan.updated_columns.contains(&id) {
                        self.repo.update_column_title(id, &column.title)?;
                        report.updated_columns += 1;
                    }
                    id
                }
            };

            match column.kind {
                ColumnKind::Branch => {
                    self.save_items(*column_ref, column_id, plan, &mut item_ids, &mut report)?;
                }
                ColumnKind::Content => {
                    self.save_sections(*column_ref, column_id, plan, &mut report)?;
                }
            }
        }
        info!(
            "event=path_save module=editor status=ok phase=reconcile path_id={path_id} columns={} items={} sections={}",
            report.inserted_columns + report.updated_columns,
            report.inserted_items + report.updated_items,
            report.inserted_sections + report.updated_sections
        );

        Ok(report)
    }

    fn save_items(
        &self,
        column: ColumnRef,
        column_id: ColumnId,
        plan: &SavePlan,
        item_ids: &mut HashMap<LocalId, ItemId>,
        report: &mut SaveReport,
    ) -> EditorResult<()> {
        let mut pending = Vec::new();
        let mut submitted = Vec::new();
        let mut updates = Vec::new();

        for (position, item) in self.store.items(column).into_iter().enumerate() {
            let order_index = position as i64;
            match item.id {
                ItemRef::Unsaved(local) => {
                    if !plan.new_items.contains(&local) {
                        return Err(EditorError::InconsistentState(
                            "unsaved item has no pending insert",
                        ));
                    }
                    pending.push(local);
                    submitted.push(NewColumnItem {
                        column_id,
                        title: item.title.clone(),
                        order_index,
                    });
                }
                ItemRef::Persisted(id) if plan.updated_items.contains(&id) => {
                    updates.push(ColumnItem {
                        id,
                        column_id,
                        title: item.title.clone(),
                        order_index,
                    });
                }
                ItemRef::Persisted(_) => {}
            }
        }

        if !submitted.is_empty() {
            let inserted = self.repo.insert_items(&submitted)?;
            if inserted.len() != pending.len() {
                return Err(EditorError::InconsistentState(
                    "item insert returned a different number of rows",
                ));
            }
            for (local, row) in pending.into_iter().zip(inserted) {
                item_ids.insert(local, row.id);
                report.item_ids.push((local, row.id));
                report.inserted_items += 1;
            }
        }
        if !updates.is_empty() {
            self.repo.update_items(&updates)?;
            report.updated_items += updates.len();
        }
        Ok(())
    }

    fn save_sections(
        &self,
        column: ColumnRef,
        column_id: ColumnId,
        plan: &SavePlan,
        report: &mut SaveReport,
    ) -> EditorResult<()> {
        let mut pending = Vec::new();
        let mut submitted = Vec::new();
        let mut updates = Vec::new();

        for (position, section) in self.store.sections(column).into_iter().enumerate() {
            let order_index = position as i64;
            match section.id {
                SectionRef::Unsaved(local) => {
                    if !plan.new_sections.contains(&local) {
                        return Err(EditorError::InconsistentState(
                            "unsaved section has no pending insert",
                        ));
                    }
                    pending.push(local);
                    submitted.push(NewContentSection {
                        column_id,
                        kind: section.kind,
                        content: section.content.clone(),
                        order_index,
                    });
                }
                SectionRef::Persisted(id) if plan.updated_sections.contains(&id) => {
                    updates.push(ContentSection {
                        id,
                        column_id,
                        kind: section.kind,
                        content: section.content.clone(),
                        order_index,
                    });
                }
                SectionRef::Persisted(_) => {}
            }
        }

        if !submitted.is_empty() {
            let inserted = self.repo.insert_sections(&submitted)?;
            if inserted.len() != pending.len() {
                return Err(EditorError::InconsistentState(
                    "section insert returned a different number of rows",
                ));
            }
            for (local, row) in pending.into_iter().zip(inserted) {
                report.section_ids.push((local, row.id));
                report.inserted_sections += 1;
            }
        }
        if !updates.is_empty() {
            self.repo.update_sections(&updates)?;
            report.updated_sections += updates.len();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::SaveReport;
    use crate::model::ids::{ColumnId, LocalIdAllocator};

    #[test]
    fn default_report_is_noop() {
        assert!(SaveReport::default().is_noop());
    }

    #[test]
    fn resolve_finds_recorded_pairs_only() {
        let mut ids = LocalIdAllocator::default();
        let saved = ids.allocate();
        let other = ids.allocate();
        let column_id = ColumnId::new_v4();
        let report = SaveReport {
            inserted_columns: 1,
            column_ids: vec![(saved, column_id)],
            ..SaveReport::default()
        };

        assert!(!report.is_noop());
        assert_eq!(report.resolve_column(saved), Some(column_id));
        assert_eq!(report.resolve_column(other), None);
        assert_eq!(report.resolve_item(saved), None);
    }
}
