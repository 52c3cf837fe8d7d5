//! Typed identities.
//!
//! Persisted ids wrap store-assigned UUIDs. Editor references add an
//! `Unsaved(LocalId)` variant for entities created locally and not yet
//! written by a save.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

macro_rules! persisted_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a fresh random id. Only repositories call this.
            pub fn new_v4() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(value).map(Self)
            }
        }
    };
}

persisted_id!(
    /// Persisted learning path id.
    PathId
);
persisted_id!(
    /// Persisted column id.
    ColumnId
);
persisted_id!(
    /// Persisted column item id.
    ItemId
);
persisted_id!(
    /// Persisted content section id.
    SectionId
);

/// Editor-local identity for an entity that has never been saved.
///
/// Rendered as `tmp-<n>` so it never looks like a persisted UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalId(u64);

impl LocalId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl Display for LocalId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "tmp-{}", self.0)
    }
}

/// Monotonic allocator for `LocalId` values within one editor session.
#[derive(Debug, Default)]
pub struct LocalIdAllocator {
    next: u64,
}

impl LocalIdAllocator {
    pub fn allocate(&mut self) -> LocalId {
        self.next += 1;
        LocalId(self.next)
    }
}

macro_rules! entity_ref {
    ($(#[$meta:meta])* $name:ident => $id:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            /// Created in the editor; has no row in the store yet.
            Unsaved(LocalId),
            /// Backed by a stored row.
            Persisted($id),
        }

        impl $name {
            pub fn is_persisted(&self) -> bool {
                matches!(self, Self::Persisted(_))
            }

            pub fn persisted(&self) -> Option<$id> {
                match self {
                    Self::Persisted(id) => Some(*id),
                    Self::Unsaved(_) => None,
                }
            }

            pub fn local(&self) -> Option<LocalId> {
                match self {
                    Self::Unsaved(local) => Some(*local),
                    Self::Persisted(_) => None,
                }
            }
        }

        impl From<$id> for $name {
            fn from(value: $id) -> Self {
                Self::Persisted(value)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                match self {
                    Self::Unsaved(local) => write!(f, "{local}"),
                    Self::Persisted(id) => write!(f, "{id}"),
                }
            }
        }
    };
}

entity_ref!(
    /// Editor reference to a column.
    ColumnRef => ColumnId
);
entity_ref!(
    /// Editor reference to a column item.
    ItemRef => ItemId
);
entity_ref!(
    /// Editor reference to a content section.
    SectionRef => SectionId
);

#[cfg(test)]
mod tests {
    use super::{ColumnId, ColumnRef, ItemRef, LocalIdAllocator};

    #[test]
    fn unsaved_refs_render_with_tmp_prefix() {
        let mut ids = LocalIdAllocator::default();
        let unsaved = ItemRef::Unsaved(ids.allocate());
        assert_eq!(unsaved.to_string(), "tmp-1");
        assert!(!unsaved.is_persisted());
        assert!(unsaved.persisted().is_none());
    }

    #[test]
    fn persisted_refs_render_as_uuid() {
        let id = ColumnId::new_v4();
        let reference = ColumnRef::from(id);
        assert!(reference.is_persisted());
        assert_eq!(reference.to_string(), id.as_uuid().to_string());
        assert!(!reference.to_string().starts_with("tmp-"));
        assert_eq!(reference.to_string().parse::<ColumnId>().unwrap(), id);
    }

    #[test]
    fn allocator_never_repeats() {
        let mut ids = LocalIdAllocator::default();
        let first = ids.allocate();
        let second = ids.allocate();
        assert_ne!(first, second);
        assert!(second.value() > first.value());
    }
}
