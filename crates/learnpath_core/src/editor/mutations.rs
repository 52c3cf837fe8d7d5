//! Local mutation handlers.
//!
//! Every handler updates the entity store and records the intent in the
//! change tracker. None of them touch the repository.

use super::changes::EntityKey;
use super::store::{EditorColumn, EditorItem, EditorSection};
use super::{EditorError, EditorResult, PathEditor, MAX_PATH_DEPTH};
use crate::model::ids::{ColumnRef, ItemRef, SectionRef};
use crate::model::path::{ColumnKind, SectionKind};
use crate::repo::path_repo::PathRepository;
use log::{debug, warn};
use serde_json::Value;
use std::collections::HashSet;

/// Title given to a path's root column.
pub const ROOT_COLUMN_TITLE: &str = "Main Column";
/// Title given to items created by `add_item`.
pub const NEW_ITEM_TITLE: &str = "New item";

impl<R: PathRepository> PathEditor<R> {
    pub fn set_path_header(&mut self, title: &str, subtitle: &str) -> EditorResult<()> {
        let path_id = self.path_id;
        let path = self
            .store
            .path_mut()
            .ok_or(EditorError::PathNotFound(path_id))?;
        path.title = title.to_string();
        path.subtitle = subtitle.to_string();
        self.changes.record_path_header();
        Ok(())
    }

    /// Creates a column anchored on `parent_item`, or the root column when
    /// `parent_item` is `None`.
    ///
    /// The new column takes the anchoring item's title and starts with its
    /// children loaded and empty.
    pub fn add_column(
        &mut self,
        parent_item: Option<ItemRef>,
        kind: ColumnKind,
    ) -> EditorResult<ColumnRef> {
        let title = match parent_item {
            None => {
                if self.store.root_column().is_some() {
                    return Err(EditorError::RootColumnExists);
                }
                ROOT_COLUMN_TITLE.to_string()
            }
            Some(item) => {
                let anchor = self
                    .store
                    .item(item)
                    .ok_or(EditorError::ItemNotFound(item))?;
                if self.store.child_column_of(item).is_some() {
                    return Err(EditorError::ItemAlreadyAnchored(item));
                }
                anchor.title.clone()
            }
        };

        let column = ColumnRef::Unsaved(self.local_ids.allocate());
        self.store.push_column(EditorColumn {
            id: column,
            parent_item,
            kind,
            title,
        });
        self.store.init_children(column, kind);
        self.changes.record_insert(EntityKey::Column(column));

        if let Some(depth) = self.depth_of(column) {
            if depth > MAX_PATH_DEPTH {
                warn!(
                    "event=path_depth module=editor status=warn column={column} depth={depth} max_depth={MAX_PATH_DEPTH}"
                );
            }
        }
        Ok(column)
    }

    /// Renames a column and the item anchoring it.
    pub fn rename_column(&mut self, column: ColumnRef, title: &str) -> EditorResult<()> {
        let entry = self
            .store
            .column_mut(column)
            .ok_or(EditorError::ColumnNotFound(column))?;
        entry.title = title.to_string();
        let parent_item = entry.parent_item;
        self.changes.record_update(EntityKey::Column(column));

        if let Some(item) = parent_item {
            if let Some(anchor) = self.store.item_mut(item) {
                anchor.title = title.to_string();
                self.changes.record_update(EntityKey::Item(item));
            }
        }
        Ok(())
    }

    /// Removes a non-root column with its whole loaded subtree.
    pub fn delete_column(&mut self, column: ColumnRef) -> EditorResult<()> {
        let entry = self
            .store
            .column(column)
            .ok_or(EditorError::ColumnNotFound(column))?;
        if entry.parent_item.is_none() {
            return Err(EditorError::RootColumnDeletion(column));
        }
        self.remove_column_subtree(column);
        Ok(())
    }

    pub fn add_item(&mut self, column: ColumnRef) -> EditorResult<ItemRef> {
        self.ensure_editable(column, ColumnKind::Branch)?;
        let item = ItemRef::Unsaved(self.local_ids.allocate());
        self.store.push_item(EditorItem {
            id: item,
            column,
            title: NEW_ITEM_TITLE.to_string(),
        });
        self.changes.record_insert(EntityKey::Item(item));
        Ok(item)
    }

    /// Retitles an item and the column anchored on it, if loaded.
    pub fn edit_item(&mut self, item: ItemRef, title: &str) -> EditorResult<()> {
        let entry = self
            .store
            .item_mut(item)
            .ok_or(EditorError::ItemNotFound(item))?;
        entry.title = title.to_string();
        self.changes.record_update(EntityKey::Item(item));

        if let Some(child) = self.store.child_column_of(item).map(|column| column.id) {
            if let Some(column) = self.store.column_mut(child) {
                column.title = title.to_string();
            }
            self.changes.record_update(EntityKey::Column(child));
        }
        Ok(())
    }

    /// Removes an item, cascading into the column anchored on it.
    pub fn delete_item(&mut self, item: ItemRef) -> EditorResult<()> {
        let column = self
            .store
            .item(item)
            .ok_or(EditorError::ItemNotFound(item))?
            .column;
        let position = self.store.position_of_item(item).unwrap_or(0);
        self.remove_item_subtree(item);

        let shifted: Vec<ItemRef> = self.store.item_refs(column)[position..].to_vec();
        for sibling in shifted {
            self.changes.record_update(EntityKey::Item(sibling));
        }
        Ok(())
    }

    pub fn add_section(&mut self, column: ColumnRef, kind: SectionKind) -> EditorResult<SectionRef> {
        self.ensure_editable(column, ColumnKind::Content)?;
        let section = SectionRef::Unsaved(self.local_ids.allocate());
        self.store.push_section(EditorSection {
            id: section,
            column,
            kind,
            content: kind.default_content(),
        });
        self.changes.record_insert(EntityKey::Section(section));
        Ok(section)
    }

    pub fn update_section(&mut self, section: SectionRef, content: Value) -> EditorResult<()> {
        let entry = self
            .store
            .section_mut(section)
            .ok_or(EditorError::SectionNotFound(section))?;
        entry.content = content;
        self.changes.record_update(EntityKey::Section(section));
        Ok(())
    }

    pub fn delete_section(&mut self, section: SectionRef) -> EditorResult<()> {
        let column = self
            .store
            .section(section)
            .ok_or(EditorError::SectionNotFound(section))?
            .column;
        let position = self.store.position_of_section(section).unwrap_or(0);
        self.store.remove_section(section);
        self.changes.record_delete(EntityKey::Section(section));

        let shifted: Vec<SectionRef> = self.store.section_refs(column)[position..].to_vec();
        for sibling in shifted {
            self.changes.record_update(EntityKey::Section(sibling));
        }
        Ok(())
    }

    /// Applies a new section order. `new_order` must be a permutation of the
    /// column's current sections; sections whose position changed are logged.
    pub fn reorder_sections(
        &mut self,
        column: ColumnRef,
        new_order: &[SectionRef],
    ) -> EditorResult<()> {
        self.ensure_editable(column, ColumnKind::Content)?;
        let current = self.store.section_refs(column).to_vec();
        let unique: HashSet<&SectionRef> = new_order.iter().collect();
        if new_order.len() != current.len()
            || unique.len() != new_order.len()
            || !current.iter().all(|section| unique.contains(section))
        {
            return Err(EditorError::InvalidSectionOrder(column));
        }

        for (position, section) in new_order.iter().enumerate() {
            if current[position] != *section {
                self.changes.record_update(EntityKey::Section(*section));
            }
        }
        self.store.set_section_order(column, new_order.to_vec());
        Ok(())
    }

    fn ensure_editable(&self, column: ColumnRef, expected: ColumnKind) -> EditorResult<()> {
        let entry = self
            .store
            .column(column)
            .ok_or(EditorError::ColumnNotFound(column))?;
        if entry.kind != expected {
            return Err(EditorError::ColumnKindMismatch { column, expected });
        }
        if !self.store.children_loaded(column) {
            return Err(EditorError::ChildrenNotLoaded(column));
        }
        Ok(())
    }

    fn remove_column_subtree(&mut self, column: ColumnRef) {
        let items = self.store.item_refs(column).to_vec();
        for item in items {
            self.remove_item_subtree(item);
        }
        let sections = self.store.section_refs(column).to_vec();
        for section in sections {
            self.store.remove_section(section);
            self.changes.record_delete(EntityKey::Section(section));
        }
        self.store.remove_column(column);
        self.changes.record_delete(EntityKey::Column(column));
        debug!("event=column_delete module=editor status=ok column={column}");
    }

    fn remove_item_subtree(&mut self, item: ItemRef) {
        while let Some(child) = self.store.child_column_of(item).map(|column| column.id) {
            self.remove_column_subtree(child);
        }
        self.store.remove_item(item);
        self.changes.record_delete(EntityKey::Item(item));
    }
}
