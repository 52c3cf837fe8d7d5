//! Learning path repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide persistence APIs over `learning_paths`, `columns`,
//!   `column_items` and `content_sections`.
//! - Keep SQL details and ordering behavior inside repository boundary.
//!
//! # Invariants
//! - Child listing is deterministic: `order_index ASC, id ASC`.
//! - Batch inserts return rows in submission order; callers rely on the
//!   i-th returned row matching the i-th submitted payload.
//! - Column/item/section deletes are idempotent; rows already removed by a
//!   cascade are not an error.
//! - Updates of missing rows report `*NotFound`.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::ids::{ColumnId, ItemId, PathId, SectionId};
use crate::model::path::{
    Column, ColumnItem, ColumnKind, ContentSection, NewColumn, NewColumnItem, NewContentSection,
    NewPath, Path, SectionKind,
};
use rusqlite::{params, Connection, Params, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const PATH_SELECT_SQL: &str = "SELECT
    id,
    title,
    subtitle,
    tags,
    is_public,
    clones,
    cloned_from
FROM learning_paths";

const COLUMN_SELECT_SQL: &str = "SELECT
    id,
    path_id,
    parent_item_id,
    type,
    title,
    order_index
FROM columns";

const ITEM_SELECT_SQL: &str = "SELECT
    id,
    column_id,
    title,
    order_index
FROM column_items";

const SECTION_SELECT_SQL: &str = "SELECT
    id,
    column_id,
    type,
    content,
    order_index
FROM content_sections";

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[
    (
        "learning_paths",
        &[
            "id",
            "title",
            "subtitle",
            "tags",
            "is_public",
            "clones",
            "cloned_from",
        ],
    ),
    (
        "columns",
        &["id", "path_id", "parent_item_id", "type", "title", "order_index"],
    ),
    ("column_items", &["id", "column_id", "title", "order_index"]),
    (
        "content_sections",
        &["id", "column_id", "type", "content", "order_index"],
    ),
];

/// Result type used by path repository operations.
pub type PathRepoResult<T> = Result<T, PathRepoError>;

/// Errors from path repository operations.
#[derive(Debug)]
pub enum PathRepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    PathNotFound(PathId),
    ColumnNotFound(ColumnId),
    ItemNotFound(ItemId),
    SectionNotFound(SectionId),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to a valid record.
    InvalidData(String),
}

impl Display for PathRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::PathNotFound(id) => write!(f, "learning path not found: {id}"),
            Self::ColumnNotFound(id) => write!(f, "column not found: {id}"),
            Self::ItemNotFound(id) => write!(f, "column item not found: {id}"),
            Self::SectionNotFound(id) => write!(f, "content section not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "path repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "path repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "path repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid path data: {message}"),
        }
    }
}

impl Error for PathRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for PathRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for PathRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Persistence collaborator for the path editor, cloner and service.
pub trait PathRepository {
    /// Creates one path row; the id is assigned by the store.
    fn create_path(&self, path: &NewPath) -> PathRepoResult<Path>;
    fn get_path(&self, path_id: PathId) -> PathRepoResult<Option<Path>>;
    /// Lists all paths, newest first.
    fn list_paths(&self) -> PathRepoResult<Vec<Path>>;
    fn update_path_header(&self, path_id: PathId, title: &str, subtitle: &str)
        -> PathRepoResult<()>;
    fn increment_clones(&self, path_id: PathId) -> PathRepoResult<()>;
    /// Deletes a path and, by cascade, its whole tree.
    fn delete_path(&self, path_id: PathId) -> PathRepoResult<()>;

    fn get_column(&self, column_id: ColumnId) -> PathRepoResult<Option<Column>>;
    /// Lists every column of a path.
    fn list_columns(&self, path_id: PathId) -> PathRepoResult<Vec<Column>>;
    /// Lists columns with no parent item.
    fn list_root_columns(&self, path_id: PathId) -> PathRepoResult<Vec<Column>>;
    /// Lists columns anchored on one item.
    fn list_child_columns(&self, item_id: ItemId) -> PathRepoResult<Vec<Column>>;
    fn insert_column(&self, column: &NewColumn) -> PathRepoResult<Column>;
    fn update_column_title(&self, column_id: ColumnId, title: &str) -> PathRepoResult<()>;
    fn delete_column(&self, column_id: ColumnId) -> PathRepoResult<()>;

    fn list_items(&self, column_id: ColumnId) -> PathRepoResult<Vec<ColumnItem>>;
    /// Inserts a batch of items and returns them in submission order.
    fn insert_items(&self, items: &[NewColumnItem]) -> PathRepoResult<Vec<ColumnItem>>;
    fn update_items(&self, items: &[ColumnItem]) -> PathRepoResult<()>;
    fn delete_item(&self, item_id: ItemId) -> PathRepoResult<()>;

    fn list_sections(&self, column_id: ColumnId) -> PathRepoResult<Vec<ContentSection>>;
    /// Inserts a batch of sections and returns them in submission order.
    fn insert_sections(
        &self,
        sections: &[NewContentSection],
    ) -> PathRepoResult<Vec<ContentSection>>;
    fn update_sections(&self, sections: &[ContentSection]) -> PathRepoResult<()>;
    fn delete_section(&self, section_id: SectionId) -> PathRepoResult<()>;
}

/// SQLite-backed path repository.
pub struct SqlitePathRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePathRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> PathRepoResult<Self> {
        ensure_path_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl PathRepository for SqlitePathRepository<'_> {
    fn create_path(&self, path: &NewPath) -> PathRepoResult<Path> {
        let id = PathId::new_v4();
        self.conn.execute(
            "INSERT INTO learning_paths (
                id,
                title,
                subtitle,
                tags,
                is_public,
                clones,
                cloned_from
            ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6);",
            params![
                id.to_string(),
                path.title.as_str(),
                path.subtitle.as_str(),
                encode_tags(&path.tags)?,
                bool_to_int(path.is_public),
                path.cloned_from.map(|value| value.to_string()),
            ],
        )?;
        first_row(
            self.conn,
            &format!("{PATH_SELECT_SQL} WHERE id = ?1;"),
            [id.to_string()],
            parse_path_row,
        )?
        .ok_or(PathRepoError::PathNotFound(id))
    }

    fn get_path(&self, path_id: PathId) -> PathRepoResult<Option<Path>> {
        first_row(
            self.conn,
            &format!("{PATH_SELECT_SQL} WHERE id = ?1;"),
            [path_id.to_string()],
            parse_path_row,
        )
    }

    fn list_paths(&self) -> PathRepoResult<Vec<Path>> {
        collect_rows(
            self.conn,
            &format!("{PATH_SELECT_SQL} ORDER BY created_at DESC, id ASC;"),
            [],
            parse_path_row,
        )
    }

    fn update_path_header(
        &self,
        path_id: PathId,
        title: &str,
        subtitle: &str,
    ) -> PathRepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE learning_paths
             SET title = ?2,
                 subtitle = ?3,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![path_id.to_string(), title, subtitle],
        )?;
        if changed == 0 {
            return Err(PathRepoError::PathNotFound(path_id));
        }
        Ok(())
    }

    fn increment_clones(&self, path_id: PathId) -> PathRepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE learning_paths
             SET clones = clones + 1
             WHERE id = ?1;",
            [path_id.to_string()],
        )?;
        if changed == 0 {
            return Err(PathRepoError::PathNotFound(path_id));
        }
        Ok(())
    }

    fn delete_path(&self, path_id: PathId) -> PathRepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM learning_paths WHERE id = ?1;",
            [path_id.to_string()],
        )?;
        if changed == 0 {
            return Err(PathRepoError::PathNotFound(path_id));
        }
        Ok(())
    }

    fn get_column(&self, column_id: ColumnId) -> PathRepoResult<Option<Column>> {
        first_row(
            self.conn,
            &format!("{COLUMN_SELECT_SQL} WHERE id = ?1;"),
            [column_id.to_string()],
            parse_column_row,
        )
    }

    fn list_columns(&self, path_id: PathId) -> PathRepoResult<Vec<Column>> {
        collect_rows(
            self.conn,
            &format!("{COLUMN_SELECT_SQL} WHERE path_id = ?1 ORDER BY order_index ASC, id ASC;"),
            [path_id.to_string()],
            parse_column_row,
        )
    }

    fn list_root_columns(&self, path_id: PathId) -> PathRepoResult<Vec<Column>> {
        collect_rows(
            self.conn,
            &format!(
                "{COLUMN_SELECT_SQL}
                 WHERE path_id = ?1
                   AND parent_item_id IS NULL
                 ORDER BY order_index ASC, id ASC;"
            ),
            [path_id.to_string()],
            parse_column_row,
        )
    }

    fn list_child_columns(&self, item_id: ItemId) -> PathRepoResult<Vec<Column>> {
        collect_rows(
            self.conn,
            &format!(
                "{COLUMN_SELECT_SQL}
                 WHERE parent_item_id = ?1
                 ORDER BY order_index ASC, id ASC;"
            ),
            [item_id.to_string()],
            parse_column_row,
        )
    }

    fn insert_column(&self, column: &NewColumn) -> PathRepoResult<Column> {
        let id = ColumnId::new_v4();
        self.conn.execute(
            "INSERT INTO columns (
                id,
                path_id,
                parent_item_id,
                type,
                title,
                order_index
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                id.to_string(),
                column.path_id.to_string(),
                column.parent_item_id.map(|value| value.to_string()),
                column.kind.as_str(),
                column.title.as_str(),
                column.order_index,
            ],
        )?;
        Ok(Column {
            id,
            path_id: column.path_id,
            parent_item_id: column.parent_item_id,
            kind: column.kind,
            title: column.title.clone(),
            order_index: column.order_index,
        })
    }

    fn update_column_title(&self, column_id: ColumnId, title: &str) -> PathRepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE columns
             SET title = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![column_id.to_string(), title],
        )?;
        if changed == 0 {
            return Err(PathRepoError::ColumnNotFound(column_id));
        }
        Ok(())
    }

    fn delete_column(&self, column_id: ColumnId) -> PathRepoResult<()> {
        self.conn.execute(
            "DELETE FROM columns WHERE id = ?1;",
            [column_id.to_string()],
        )?;
        Ok(())
    }

    fn list_items(&self, column_id: ColumnId) -> PathRepoResult<Vec<ColumnItem>> {
        collect_rows(
            self.conn,
            &format!("{ITEM_SELECT_SQL} WHERE column_id = ?1 ORDER BY order_index ASC, id ASC;"),
            [column_id.to_string()],
            parse_item_row,
        )
    }

    fn insert_items(&self, items: &[NewColumnItem]) -> PathRepoResult<Vec<ColumnItem>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut inserted = Vec::with_capacity(items.len());
        {
            let mut stmt = tx.prepare(
                "INSERT INTO column_items (
                    id,
                    column_id,
                    title,
                    order_index
                ) VALUES (?1, ?2, ?3, ?4);",
            )?;
            for item in items {
                let id = ItemId::new_v4();
                stmt.execute(params![
                    id.to_string(),
                    item.column_id.to_string(),
                    item.title.as_str(),
                    item.order_index,
                ])?;
                inserted.push(ColumnItem {
                    id,
                    column_id: item.column_id,
                    title: item.title.clone(),
                    order_index: item.order_index,
                });
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    fn update_items(&self, items: &[ColumnItem]) -> PathRepoResult<()> {
        if items.is_empty() {
            return Ok(());
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        {
            let mut stmt = tx.prepare(
                "UPDATE column_items
                 SET title = ?2,
                     order_index = ?3,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1;",
            )?;
            for item in items {
                let changed =
                    stmt.execute(params![item.id.to_string(), item.title.as_str(), item.order_index])?;
                if changed == 0 {
                    return Err(PathRepoError::ItemNotFound(item.id));
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_item(&self, item_id: ItemId) -> PathRepoResult<()> {
        self.conn.execute(
            "DELETE FROM column_items WHERE id = ?1;",
            [item_id.to_string()],
        )?;
        Ok(())
    }

    fn list_sections(&self, column_id: ColumnId) -> PathRepoResult<Vec<ContentSection>> {
        collect_rows(
            self.conn,
            &format!(
                "{SECTION_SELECT_SQL} WHERE column_id = ?1 ORDER BY order_index ASC, id ASC;"
            ),
            [column_id.to_string()],
            parse_section_row,
        )
    }

    fn insert_sections(
        &self,
        sections: &[NewContentSection],
    ) -> PathRepoResult<Vec<ContentSection>> {
        if sections.is_empty() {
            return Ok(Vec::new());
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut inserted = Vec::with_capacity(sections.len());
        {
            let mut stmt = tx.prepare(
                "INSERT INTO content_sections (
                    id,
                    column_id,
                    type,
                    content,
                    order_index
                ) VALUES (?1, ?2, ?3, ?4, ?5);",
            )?;
            for section in sections {
                let id = SectionId::new_v4();
                stmt.execute(params![
                    id.to_string(),
                    section.column_id.to_string(),
                    section.kind.as_str(),
                    encode_content(&section.content)?,
                    section.order_index,
                ])?;
                inserted.push(ContentSection {
                    id,
                    column_id: section.column_id,
                    kind: section.kind,
                    content: section.content.clone(),
                    order_index: section.order_index,
                });
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    fn update_sections(&self, sections: &[ContentSection]) -> PathRepoResult<()> {
        if sections.is_empty() {
            return Ok(());
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        {
            let mut stmt = tx.prepare(
                "UPDATE content_sections
                 SET type = ?2,
                     content = ?3,
                     order_index = ?4,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1;",
            )?;
            for section in sections {
                let changed = stmt.execute(params![
                    section.id.to_string(),
                    section.kind.as_str(),
                    encode_content(&section.content)?,
                    section.order_index,
                ])?;
                if changed == 0 {
                    return Err(PathRepoError::SectionNotFound(section.id));
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_section(&self, section_id: SectionId) -> PathRepoResult<()> {
        self.conn.execute(
            "DELETE FROM content_sections WHERE id = ?1;",
            [section_id.to_string()],
        )?;
        Ok(())
    }
}

fn collect_rows<T, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
    parse: fn(&Row<'_>) -> PathRepoResult<T>,
) -> PathRepoResult<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        result.push(parse(row)?);
    }
    Ok(result)
}

fn first_row<T, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
    parse: fn(&Row<'_>) -> PathRepoResult<T>,
) -> PathRepoResult<Option<T>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse(row)?));
    }
    Ok(None)
}

fn parse_path_row(row: &Row<'_>) -> PathRepoResult<Path> {
    let id_text: String = row.get("id")?;
    let tags_text: String = row.get("tags")?;
    let tags = serde_json::from_str::<Vec<String>>(&tags_text).map_err(|err| {
        PathRepoError::InvalidData(format!(
            "invalid tags `{tags_text}` in learning_paths.tags: {err}"
        ))
    })?;
    let is_public = match row.get::<_, i64>("is_public")? {
        0 => false,
        1 => true,
        other => {
            return Err(PathRepoError::InvalidData(format!(
                "invalid is_public value `{other}` in learning_paths.is_public"
            )));
        }
    };
    let cloned_from = row
        .get::<_, Option<String>>("cloned_from")?
        .map(|value| parse_id(&value, "learning_paths.cloned_from"))
        .transpose()?;

    Ok(Path {
        id: parse_id(&id_text, "learning_paths.id")?,
        title: row.get("title")?,
        subtitle: row.get("subtitle")?,
        tags,
        is_public,
        clones: row.get("clones")?,
        cloned_from,
    })
}

fn parse_column_row(row: &Row<'_>) -> PathRepoResult<Column> {
    let id_text: String = row.get("id")?;
    let path_id_text: String = row.get("path_id")?;
    let parent_item_id = row
        .get::<_, Option<String>>("parent_item_id")?
        .map(|value| parse_id(&value, "columns.parent_item_id"))
        .transpose()?;
    let kind_text: String = row.get("type")?;
    let kind = ColumnKind::parse(&kind_text).ok_or_else(|| {
        PathRepoError::InvalidData(format!("invalid column type `{kind_text}` in columns.type"))
    })?;

    Ok(Column {
        id: parse_id(&id_text, "columns.id")?,
        path_id: parse_id(&path_id_text, "columns.path_id")?,
        parent_item_id,
        kind,
        title: row.get("title")?,
        order_index: row.get("order_index")?,
    })
}

fn parse_item_row(row: &Row<'_>) -> PathRepoResult<ColumnItem> {
    let id_text: String = row.get("id")?;
    let column_id_text: String = row.get("column_id")?;
    Ok(ColumnItem {
        id: parse_id(&id_text, "column_items.id")?,
        column_id: parse_id(&column_id_text, "column_items.column_id")?,
        title: row.get("title")?,
        order_index: row.get("order_index")?,
    })
}

fn parse_section_row(row: &Row<'_>) -> PathRepoResult<ContentSection> {
    let id_text: String = row.get("id")?;
    let column_id_text: String = row.get("column_id")?;
    let kind_text: String = row.get("type")?;
    let kind = SectionKind::parse(&kind_text).ok_or_else(|| {
        PathRepoError::InvalidData(format!(
            "invalid section type `{kind_text}` in content_sections.type"
        ))
    })?;
    let content_text: String = row.get("content")?;
    let content = serde_json::from_str(&content_text).map_err(|err| {
        PathRepoError::InvalidData(format!("invalid json in content_sections.content: {err}"))
    })?;

    Ok(ContentSection {
        id: parse_id(&id_text, "content_sections.id")?,
        column_id: parse_id(&column_id_text, "content_sections.column_id")?,
        kind,
        content,
        order_index: row.get("order_index")?,
    })
}

fn parse_id<T: FromStr>(value: &str, column: &'static str) -> PathRepoResult<T> {
    value
        .parse::<T>()
        .map_err(|_| PathRepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn encode_tags(tags: &[String]) -> PathRepoResult<String> {
    serde_json::to_string(tags)
        .map_err(|err| PathRepoError::InvalidData(format!("tags are not serializable: {err}")))
}

fn encode_content(content: &serde_json::Value) -> PathRepoResult<String> {
    serde_json::to_string(content).map_err(|err| {
        PathRepoError::InvalidData(format!("section content is not serializable: {err}"))
    })
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn ensure_path_connection_ready(conn: &Connection) -> PathRepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(PathRepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &(table, columns) in REQUIRED_SCHEMA {
        if !table_exists(conn, table)? {
            return Err(PathRepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(PathRepoError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> PathRepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> PathRepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
