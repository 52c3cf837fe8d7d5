//! In-memory entity arena for one open learning path.
//!
//! # Invariants
//! - `column_order` lists every loaded column after the column that owns its
//!   parent item.
//! - The ordered child index (`item_order` / `section_order`) is the only
//!   source of sibling order; stored `order_index` values are derived from it.
//! - A column has an entry in `item_order` or `section_order` exactly when its
//!   children are present locally.

use crate::model::ids::{ColumnRef, ItemRef, SectionRef};
use crate::model::path::{Column, ColumnItem, ColumnKind, ContentSection, Path, SectionKind};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorColumn {
    pub id: ColumnRef,
    pub parent_item: Option<ItemRef>,
    pub kind: ColumnKind,
    pub title: String,
}

impl From<&Column> for EditorColumn {
    fn from(value: &Column) -> Self {
        Self {
            id: ColumnRef::Persisted(value.id),
            parent_item: value.parent_item_id.map(ItemRef::Persisted),
            kind: value.kind,
            title: value.title.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorItem {
    pub id: ItemRef,
    pub column: ColumnRef,
    pub title: String,
}

impl From<&ColumnItem> for EditorItem {
    fn from(value: &ColumnItem) -> Self {
        Self {
            id: ItemRef::Persisted(value.id),
            column: ColumnRef::Persisted(value.column_id),
            title: value.title.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditorSection {
    pub id: SectionRef,
    pub column: ColumnRef,
    pub kind: SectionKind,
    pub content: Value,
}

impl From<&ContentSection> for EditorSection {
    fn from(value: &ContentSection) -> Self {
        Self {
            id: SectionRef::Persisted(value.id),
            column: ColumnRef::Persisted(value.column_id),
            kind: value.kind,
            content: value.content.clone(),
        }
    }
}

/// Entity arena keyed by editor reference.
#[derive(Debug, Default)]
pub struct EntityStore {
    path: Option<Path>,
    columns: HashMap<ColumnRef, EditorColumn>,
    column_order: Vec<ColumnRef>,
    items: HashMap<ItemRef, EditorItem>,
    item_order: HashMap<ColumnRef, Vec<ItemRef>>,
    sections: HashMap<SectionRef, EditorSection>,
    section_order: HashMap<ColumnRef, Vec<SectionRef>>,
}

impl EntityStore {
    pub fn path(&self) -> Option<&Path> {
        self.path.as_ref()
    }

    /// Loaded columns, parents before children.
    pub fn columns(&self) -> impl Iterator<Item = &EditorColumn> {
        self.column_order
            .iter()
            .filter_map(|column| self.columns.get(column))
    }

    pub fn column_refs(&self) -> &[ColumnRef] {
        &self.column_order
    }

    pub fn column(&self, column: ColumnRef) -> Option<&EditorColumn> {
        self.columns.get(&column)
    }

    pub fn root_column(&self) -> Option<&EditorColumn> {
        self.columns().find(|column| column.parent_item.is_none())
    }

    /// First loaded column anchored on `item`.
    pub fn child_column_of(&self, item: ItemRef) -> Option<&EditorColumn> {
        self.columns()
            .find(|column| column.parent_item == Some(item))
    }

    /// Whether the column's items or sections are present locally.
    pub fn children_loaded(&self, column: ColumnRef) -> bool {
        self.item_order.contains_key(&column) || self.section_order.contains_key(&column)
    }

    /// Position of a column among loaded columns sharing its parent item.
    pub fn column_order_index(&self, column: ColumnRef) -> i64 {
        let Some(parent) = self.columns.get(&column).map(|entry| entry.parent_item) else {
            return 0;
        };
        self.columns()
            .filter(|entry| entry.parent_item == parent)
            .position(|entry| entry.id == column)
            .unwrap_or(0) as i64
    }

    pub fn item_refs(&self, column: ColumnRef) -> &[ItemRef] {
        self.item_order
            .get(&column)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn items(&self, column: ColumnRef) -> Vec<&EditorItem> {
        self.item_refs(column)
            .iter()
            .filter_map(|item| self.items.get(item))
            .collect()
    }

    pub fn item(&self, item: ItemRef) -> Option<&EditorItem> {
        self.items.get(&item)
    }

    pub fn position_of_item(&self, item: ItemRef) -> Option<usize> {
        let column = self.items.get(&item)?.column;
        self.item_refs(column).iter().position(|entry| *entry == item)
    }

    pub fn section_refs(&self, column: ColumnRef) -> &[SectionRef] {
        self.section_order
            .get(&column)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn sections(&self, column: ColumnRef) -> Vec<&EditorSection> {
        self.section_refs(column)
            .iter()
            .filter_map(|section| self.sections.get(section))
            .collect()
    }

    /// Every loaded section, grouped by column in column order.
    pub fn all_sections(&self) -> Vec<&EditorSection> {
        self.column_order
            .iter()
            .flat_map(|column| self.sections(*column))
            .collect()
    }

    pub fn section(&self, section: SectionRef) -> Option<&EditorSection> {
        self.sections.get(&section)
    }

    pub fn position_of_section(&self, section: SectionRef) -> Option<usize> {
        let column = self.sections.get(&section)?.column;
        self.section_refs(column)
            .iter()
            .position(|entry| *entry == section)
    }

    /// Whether any loaded entity still carries an unsaved reference.
    pub fn contains_unsaved(&self) -> bool {
        self.columns.keys().any(|column| !column.is_persisted())
            || self.items.keys().any(|item| !item.is_persisted())
            || self.sections.keys().any(|section| !section.is_persisted())
    }

    pub(crate) fn set_path(&mut self, path: Path) {
        self.path = Some(path);
    }

    pub(crate) fn path_mut(&mut self) -> Option<&mut Path> {
        self.path.as_mut()
    }

    pub(crate) fn push_column(&mut self, column: EditorColumn) {
        if !self.columns.contains_key(&column.id) {
            self.column_order.push(column.id);
        }
        self.columns.insert(column.id, column);
    }

    pub(crate) fn column_mut(&mut self, column: ColumnRef) -> Option<&mut EditorColumn> {
        self.columns.get_mut(&column)
    }

    /// Marks a column's children as present with no entries.
    pub(crate) fn init_children(&mut self, column: ColumnRef, kind: ColumnKind) {
        match kind {
            ColumnKind::Branch => {
                self.item_order.entry(column).or_default();
            }
            ColumnKind::Content => {
                self.section_order.entry(column).or_default();
            }
        }
    }

    /// Removes a column entry and its child index. Children themselves are
    /// removed by the caller.
    pub(crate) fn remove_column(&mut self, column: ColumnRef) -> Option<EditorColumn> {
        self.column_order.retain(|entry| *entry != column);
        self.item_order.remove(&column);
        self.section_order.remove(&column);
        self.columns.remove(&column)
    }

    pub(crate) fn set_items(&mut self, column: ColumnRef, items: Vec<EditorItem>) {
        let order = items.iter().map(|item| item.id).collect();
        for item in items {
            self.items.insert(item.id, item);
        }
        self.item_order.insert(column, order);
    }

    pub(crate) fn push_item(&mut self, item: EditorItem) {
        self.item_order.entry(item.column).or_default().push(item.id);
        self.items.insert(item.id, item);
    }

    pub(crate) fn item_mut(&mut self, item: ItemRef) -> Option<&mut EditorItem> {
        self.items.get_mut(&item)
    }

    pub(crate) fn remove_item(&mut self, item: ItemRef) -> Option<EditorItem> {
        let removed = self.items.remove(&item)?;
        if let Some(order) = self.item_order.get_mut(&removed.column) {
            order.retain(|entry| *entry != item);
        }
        Some(removed)
    }

    pub(crate) fn set_sections(&mut self, column: ColumnRef, sections: Vec<EditorSection>) {
        let order = sections.iter().map(|section| section.id).collect();
        for section in sections {
            self.sections.insert(section.id, section);
        }
        self.section_order.insert(column, order);
    }

    pub(crate) fn push_section(&mut self, section: EditorSection) {
        self.section_order
            .entry(section.column)
            .or_default()
            .push(section.id);
        self.sections.insert(section.id, section);
    }

    pub(crate) fn section_mut(&mut self, section: SectionRef) -> Option<&mut EditorSection> {
        self.sections.get_mut(&section)
    }

    pub(crate) fn remove_section(&mut self, section: SectionRef) -> Option<EditorSection> {
        let removed = self.sections.remove(&section)?;
        if let Some(order) = self.section_order.get_mut(&removed.column) {
            order.retain(|entry| *entry != section);
        }
        Some(removed)
    }

    pub(crate) fn set_section_order(&mut self, column: ColumnRef, order: Vec<SectionRef>) {
        self.section_order.insert(column, order);
    }

    /// Re-keys a column and every reference to it.
    pub(crate) fn rebind_column(&mut self, old: ColumnRef, new: ColumnRef) {
        let Some(mut column) = self.columns.remove(&old) else {
            return;
        };
        column.id = new;
        self.columns.insert(new, column);
        for entry in self.column_order.iter_mut().filter(|entry| **entry == old) {
            *entry = new;
        }
        if let Some(order) = self.item_order.remove(&old) {
            for item in &order {
                if let Some(entry) = self.items.get_mut(item) {
                    entry.column = new;
                }
            }
            self.item_order.insert(new, order);
        }
        if let Some(order) = self.section_order.remove(&old) {
            for section in &order {
                if let Some(entry) = self.sections.get_mut(section) {
                    entry.column = new;
                }
            }
            self.section_order.insert(new, order);
        }
    }

    /// Re-keys an item, its slot in the child index and columns anchored on it.
    pub(crate) fn rebind_item(&mut self, old: ItemRef, new: ItemRef) {
        let Some(mut item) = self.items.remove(&old) else {
            return;
        };
        item.id = new;
        if let Some(order) = self.item_order.get_mut(&item.column) {
            for entry in order.iter_mut().filter(|entry| **entry == old) {
                *entry = new;
            }
        }
        self.items.insert(new, item);
        for column in self.columns.values_mut() {
            if column.parent_item == Some(old) {
                column.parent_item = Some(new);
            }
        }
    }

    pub(crate) fn rebind_section(&mut self, old: SectionRef, new: SectionRef) {
        let Some(mut section) = self.sections.remove(&old) else {
            return;
        };
        section.id = new;
        if let Some(order) = self.section_order.get_mut(&section.column) {
            for entry in order.iter_mut().filter(|entry| **entry == old) {
                *entry = new;
            }
        }
        self.sections.insert(new, section);
    }
}

#[cfg(test)]
mod tests {
    use super::{EditorColumn, EditorItem, EditorSection, EntityStore};
    use crate::model::ids::{
        ColumnId, ColumnRef, ItemId, ItemRef, LocalIdAllocator, SectionId, SectionRef,
    };
    use crate::model::path::{ColumnKind, SectionKind};

    fn branch_root(store: &mut EntityStore) -> ColumnRef {
        let root = ColumnRef::Persisted(ColumnId::new_v4());
        store.push_column(EditorColumn {
            id: root,
            parent_item: None,
            kind: ColumnKind::Branch,
            title: "Main Column".to_string(),
        });
        store.init_children(root, ColumnKind::Branch);
        root
    }

    #[test]
    fn items_follow_child_index_order() {
        let mut ids = LocalIdAllocator::default();
        let mut store = EntityStore::default();
        let root = branch_root(&mut store);

        let first = ItemRef::Unsaved(ids.allocate());
        let second = ItemRef::Unsaved(ids.allocate());
        for (id, title) in [(first, "first"), (second, "second")] {
            store.push_item(EditorItem {
                id,
                column: root,
                title: title.to_string(),
            });
        }

        let titles: Vec<_> = store.items(root).iter().map(|item| item.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second"]);
        assert_eq!(store.position_of_item(second), Some(1));

        store.remove_item(first);
        assert_eq!(store.position_of_item(second), Some(0));
    }

    #[test]
    fn child_column_lookup_and_removal() {
        let mut ids = LocalIdAllocator::default();
        let mut store = EntityStore::default();
        let root = branch_root(&mut store);
        let item = ItemRef::Unsaved(ids.allocate());
        store.push_item(EditorItem {
            id: item,
            column: root,
            title: "Linear Equations".to_string(),
        });

        let child = ColumnRef::Unsaved(ids.allocate());
        store.push_column(EditorColumn {
            id: child,
            parent_item: Some(item),
            kind: ColumnKind::Content,
            title: "Linear Equations".to_string(),
        });
        store.init_children(child, ColumnKind::Content);
        store.push_section(EditorSection {
            id: SectionRef::Unsaved(ids.allocate()),
            column: child,
            kind: SectionKind::Paragraph,
            content: SectionKind::Paragraph.default_content(),
        });

        assert_eq!(store.child_column_of(item).map(|column| column.id), Some(child));
        assert_eq!(store.column_refs(), &[root, child]);
        assert_eq!(store.all_sections().len(), 1);
        assert!(store.contains_unsaved());

        store.remove_column(child);
        assert!(store.child_column_of(item).is_none());
        assert!(!store.children_loaded(child));
    }

    #[test]
    fn rebinding_moves_every_reference_to_stored_ids() {
        let mut ids = LocalIdAllocator::default();
        let mut store = EntityStore::default();
        let root = branch_root(&mut store);
        let item = ItemRef::Unsaved(ids.allocate());
        store.push_item(EditorItem {
            id: item,
            column: root,
            title: "Quadratic".to_string(),
        });
        let child = ColumnRef::Unsaved(ids.allocate());
        store.push_column(EditorColumn {
            id: child,
            parent_item: Some(item),
            kind: ColumnKind::Content,
            title: "Quadratic".to_string(),
        });
        store.init_children(child, ColumnKind::Content);
        let section = SectionRef::Unsaved(ids.allocate());
        store.push_section(EditorSection {
            id: section,
            column: child,
            kind: SectionKind::Heading,
            content: SectionKind::Heading.default_content(),
        });

        let stored_item = ItemRef::Persisted(ItemId::new_v4());
        let stored_child = ColumnRef::Persisted(ColumnId::new_v4());
        let stored_section = SectionRef::Persisted(SectionId::new_v4());
        store.rebind_item(item, stored_item);
        store.rebind_column(child, stored_child);
        store.rebind_section(section, stored_section);

        assert!(!store.contains_unsaved());
        assert_eq!(store.item_refs(root), &[stored_item]);
        assert_eq!(
            store.child_column_of(stored_item).map(|column| column.id),
            Some(stored_child)
        );
        assert_eq!(store.column_refs(), &[root, stored_child]);
        assert_eq!(store.section_refs(stored_child), &[stored_section]);
        assert_eq!(
            store.section(stored_section).map(|entry| entry.column),
            Some(stored_child)
        );
        assert!(store.item(item).is_none());
    }
}
