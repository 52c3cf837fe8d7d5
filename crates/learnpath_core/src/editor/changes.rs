//! Change tracking for unsaved editor state.
//!
//! # Responsibility
//! - Record local intent as an ordered log of tagged changes.
//! - Expose the new/deleted identity sets per entity kind.
//! - Compact the log into a `SavePlan` for the save reconciler.
//!
//! # Invariants
//! - Only persisted entities ever appear in `Update` or `Delete` entries.
//! - Deleting an unsaved entity erases every pending entry for it.
//! - `has_unsaved_changes` is cleared only by `clear()` after a successful
//!   save.

use crate::model::ids::{
    ColumnId, ColumnRef, ItemId, ItemRef, LocalId, SectionId, SectionRef,
};
use std::collections::{BTreeSet, HashSet};

/// Entity addressed by a change entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKey {
    Column(ColumnRef),
    Item(ItemRef),
    Section(SectionRef),
}

impl EntityKey {
    pub fn is_persisted(&self) -> bool {
        match self {
            Self::Column(column) => column.is_persisted(),
            Self::Item(item) => item.is_persisted(),
            Self::Section(section) => section.is_persisted(),
        }
    }
}

/// One recorded local change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// Path title/subtitle edited.
    PathHeader,
    Insert(EntityKey),
    Update(EntityKey),
    Delete(EntityKey),
}

impl Change {
    pub fn key(&self) -> Option<EntityKey> {
        match self {
            Self::PathHeader => None,
            Self::Insert(key) | Self::Update(key) | Self::Delete(key) => Some(*key),
        }
    }
}

/// Ordered change log plus the unsaved-changes flag.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    log: Vec<Change>,
    dirty: bool,
}

impl ChangeTracker {
    pub fn entries(&self) -> &[Change] {
        &self.log
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    pub fn new_columns(&self) -> BTreeSet<LocalId> {
        self.inserted(|key| match key {
            EntityKey::Column(column) => column.local(),
            _ => None,
        })
    }

    pub fn new_items(&self) -> BTreeSet<LocalId> {
        self.inserted(|key| match key {
            EntityKey::Item(item) => item.local(),
            _ => None,
        })
    }

    pub fn new_sections(&self) -> BTreeSet<LocalId> {
        self.inserted(|key| match key {
            EntityKey::Section(section) => section.local(),
            _ => None,
        })
    }

    pub fn deleted_columns(&self) -> BTreeSet<ColumnId> {
        self.deleted(|key| match key {
            EntityKey::Column(column) => column.persisted(),
            _ => None,
        })
    }

    pub fn deleted_items(&self) -> BTreeSet<ItemId> {
        self.deleted(|key| match key {
            EntityKey::Item(item) => item.persisted(),
            _ => None,
        })
    }

    pub fn deleted_sections(&self) -> BTreeSet<SectionId> {
        self.deleted(|key| match key {
            EntityKey::Section(section) => section.persisted(),
            _ => None,
        })
    }

    /// Whether a persisted entity is pending removal.
    pub fn is_deleted(&self, key: EntityKey) -> bool {
        self.log.contains(&Change::Delete(key))
    }

    /// Compacts the log into the work a save has to perform.
    pub fn plan(&self) -> SavePlan {
        let mut plan = SavePlan::default();
        let mut updated = Vec::new();

        for change in &self.log {
            match *change {
                Change::PathHeader => plan.path_header = true,
                Change::Insert(EntityKey::Column(ColumnRef::Unsaved(local))) => {
                    plan.new_columns.insert(local);
                }
                Change::Insert(EntityKey::Item(ItemRef::Unsaved(local))) => {
                    plan.new_items.insert(local);
                }
                Change::Insert(EntityKey::Section(SectionRef::Unsaved(local))) => {
                    plan.new_sections.insert(local);
                }
                Change::Insert(_) => {}
                Change::Update(key) => updated.push(key),
                Change::Delete(EntityKey::Column(ColumnRef::Persisted(id))) => {
                    plan.deleted_columns.push(id);
                }
                Change::Delete(EntityKey::Item(ItemRef::Persisted(id))) => {
                    plan.deleted_items.push(id);
                }
                Change::Delete(EntityKey::Section(SectionRef::Persisted(id))) => {
                    plan.deleted_sections.push(id);
                }
                Change::Delete(_) => {}
            }
        }

        for key in updated {
            if self.is_deleted(key) {
                continue;
            }
            match key {
                EntityKey::Column(ColumnRef::Persisted(id)) => {
                    plan.updated_columns.insert(id);
                }
                EntityKey::Item(ItemRef::Persisted(id)) => {
                    plan.updated_items.insert(id);
                }
                EntityKey::Section(SectionRef::Persisted(id)) => {
                    plan.updated_sections.insert(id);
                }
                _ => {}
            }
        }

        plan
    }

    pub(crate) fn record_path_header(&mut self) {
        self.dirty = true;
        if !self.log.contains(&Change::PathHeader) {
            self.log.push(Change::PathHeader);
        }
    }

    pub(crate) fn record_insert(&mut self, key: EntityKey) {
        self.dirty = true;
        self.log.push(Change::Insert(key));
    }

    /// Unsaved entities are skipped: their insert writes current state.
    pub(crate) fn record_update(&mut self, key: EntityKey) {
        self.dirty = true;
        if !key.is_persisted() || self.log.contains(&Change::Update(key)) {
            return;
        }
        self.log.push(Change::Update(key));
    }

    pub(crate) fn record_delete(&mut self, key: EntityKey) {
        self.dirty = true;
        if !key.is_persisted() {
            self.log.retain(|change| change.key() != Some(key));
            return;
        }
        if !self.is_deleted(key) {
            self.log.push(Change::Delete(key));
        }
    }

    pub(crate) fn clear(&mut self) {
        self.log.clear();
        self.dirty = false;
    }

    fn inserted(&self, select: impl Fn(EntityKey) -> Option<LocalId>) -> BTreeSet<LocalId> {
        self.log
            .iter()
            .filter_map(|change| match change {
                Change::Insert(key) => select(*key),
                _ => None,
            })
            .collect()
    }

    fn deleted<T: Ord>(&self, select: impl Fn(EntityKey) -> Option<T>) -> BTreeSet<T> {
        self.log
            .iter()
            .filter_map(|change| match change {
                Change::Delete(key) => select(*key),
                _ => None,
            })
            .collect()
    }
}

/// Save work derived from the change log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavePlan {
    pub path_header: bool,
    /// Deletes keep log order within each kind.
    pub deleted_columns: Vec<ColumnId>,
    pub deleted_sections: Vec<SectionId>,
    pub deleted_items: Vec<ItemId>,
    pub new_columns: HashSet<LocalId>,
    pub new_items: HashSet<LocalId>,
    pub new_sections: HashSet<LocalId>,
    pub updated_columns: HashSet<ColumnId>,
    pub updated_items: HashSet<ItemId>,
    pub updated_sections: HashSet<SectionId>,
}

impl SavePlan {
    pub fn is_empty(&self) -> bool {
        !self.path_header
            && self.deleted_columns.is_empty()
            && self.deleted_sections.is_empty()
            && self.deleted_items.is_empty()
            && self.new_columns.is_empty()
            && self.new_items.is_empty()
            && self.new_sections.is_empty()
            && self.updated_columns.is_empty()
            && self.updated_items.is_empty()
            && self.updated_sections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{Change, ChangeTracker, EntityKey};
    use crate::model::ids::{ColumnId, ColumnRef, ItemId, ItemRef, LocalIdAllocator};

    #[test]
    fn deleting_unsaved_entity_discards_its_entries() {
        let mut ids = LocalIdAllocator::default();
        let mut tracker = ChangeTracker::default();
        let item = EntityKey::Item(ItemRef::Unsaved(ids.allocate()));

        tracker.record_insert(item);
        tracker.record_update(item);
        tracker.record_delete(item);

        assert!(tracker.entries().is_empty());
        assert!(tracker.new_items().is_empty());
        assert!(tracker.deleted_items().is_empty());
        assert!(tracker.has_unsaved_changes());
        assert!(tracker.plan().is_empty());
    }

    #[test]
    fn updates_of_deleted_entities_are_dropped_from_plan() {
        let mut tracker = ChangeTracker::default();
        let kept = ItemId::new_v4();
        let removed = ItemId::new_v4();

        tracker.record_update(EntityKey::Item(ItemRef::Persisted(kept)));
        tracker.record_update(EntityKey::Item(ItemRef::Persisted(removed)));
        tracker.record_delete(EntityKey::Item(ItemRef::Persisted(removed)));

        let plan = tracker.plan();
        assert!(plan.updated_items.contains(&kept));
        assert!(!plan.updated_items.contains(&removed));
        assert_eq!(plan.deleted_items, vec![removed]);
    }

    #[test]
    fn identity_views_split_new_and_deleted() {
        let mut ids = LocalIdAllocator::default();
        let mut tracker = ChangeTracker::default();
        let local = ids.allocate();
        let persisted = ColumnId::new_v4();

        tracker.record_insert(EntityKey::Column(ColumnRef::Unsaved(local)));
        tracker.record_delete(EntityKey::Column(ColumnRef::Persisted(persisted)));
        tracker.record_delete(EntityKey::Column(ColumnRef::Persisted(persisted)));

        assert_eq!(tracker.new_columns().into_iter().collect::<Vec<_>>(), vec![local]);
        assert_eq!(
            tracker.deleted_columns().into_iter().collect::<Vec<_>>(),
            vec![persisted]
        );
        assert_eq!(tracker.entries().len(), 2);
    }

    #[test]
    fn clear_resets_flag_and_log() {
        let mut tracker = ChangeTracker::default();
        tracker.record_path_header();
        tracker.record_path_header();
        assert_eq!(tracker.entries(), &[Change::PathHeader]);

        tracker.clear();
        assert!(!tracker.has_unsaved_changes());
        assert!(tracker.entries().is_empty());
    }
}
