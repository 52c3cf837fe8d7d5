//! Persisted learning path records.
//!
//! # Invariants
//! - Exactly one column per path has `parent_item_id = None` (the root).
//! - A `Branch` column owns items; a `Content` column owns sections.
//! - `order_index` orders siblings within one parent.

use crate::model::ids::{ColumnId, ItemId, PathId, SectionId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Root record of one learning path tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub id: PathId,
    pub title: String,
    pub subtitle: String,
    pub tags: Vec<String>,
    /// Listed publicly. Clones always start private.
    pub is_public: bool,
    /// Number of times this path has been cloned.
    pub clones: i64,
    /// Source path when this path was produced by a clone.
    pub cloned_from: Option<PathId>,
}

/// Insert payload for a path row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewPath {
    pub title: String,
    pub subtitle: String,
    pub tags: Vec<String>,
    pub is_public: bool,
    pub cloned_from: Option<PathId>,
}

/// Column kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Choice menu holding ordered items.
    Branch,
    /// Content page holding ordered sections.
    Content,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Branch => "branch",
            Self::Content => "content",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "branch" => Some(Self::Branch),
            "content" => Some(Self::Content),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,
    pub path_id: PathId,
    /// Anchoring item. `None` only for the root column.
    pub parent_item_id: Option<ItemId>,
    #[serde(rename = "type")]
    pub kind: ColumnKind,
    pub title: String,
    pub order_index: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewColumn {
    pub path_id: PathId,
    pub parent_item_id: Option<ItemId>,
    pub kind: ColumnKind,
    pub title: String,
    pub order_index: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnItem {
    pub id: ItemId,
    pub column_id: ColumnId,
    pub title: String,
    pub order_index: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewColumnItem {
    pub column_id: ColumnId,
    pub title: String,
    pub order_index: i64,
}

/// Content section kind. The section body itself is opaque JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Heading,
    Paragraph,
    List,
    Image,
    Code,
    Quiz,
}

impl SectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Heading => "heading",
            Self::Paragraph => "paragraph",
            Self::List => "list",
            Self::Image => "image",
            Self::Code => "code",
            Self::Quiz => "quiz",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "heading" => Some(Self::Heading),
            "paragraph" => Some(Self::Paragraph),
            "list" => Some(Self::List),
            "image" => Some(Self::Image),
            "code" => Some(Self::Code),
            "quiz" => Some(Self::Quiz),
            _ => None,
        }
    }

    /// Body used for a freshly added section of this kind.
    pub fn default_content(&self) -> Value {
        match self {
            Self::Heading => json!({ "text": "", "level": 2 }),
            Self::Paragraph => json!({ "text": "" }),
            Self::List => json!({ "ordered": false, "items": [] }),
            Self::Image => json!({ "url": "", "alt": "" }),
            Self::Code => json!({ "language": "", "source": "" }),
            Self::Quiz => json!({ "question": "", "options": [], "answer": null }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSection {
    pub id: SectionId,
    pub column_id: ColumnId,
    #[serde(rename = "type")]
    pub kind: SectionKind,
    pub content: Value,
    pub order_index: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewContentSection {
    pub column_id: ColumnId,
    pub kind: SectionKind,
    pub content: Value,
    pub order_index: i64,
}
