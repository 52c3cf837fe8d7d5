#![allow(dead_code)]

use learnpath_core::model::path::{
    Column, ColumnItem, ContentSection, NewColumn, NewColumnItem, NewContentSection, NewPath, Path,
};
use learnpath_core::{
    ColumnId, ItemId, PathId, PathRepoError, PathRepoResult, PathRepository, SectionId,
};
use std::cell::{Cell, RefCell};

/// Repository wrapper that records every call and can fail one method.
pub struct ProbeRepo<R> {
    inner: R,
    calls: RefCell<Vec<&'static str>>,
    fail_on: Cell<Option<&'static str>>,
}

impl<R: PathRepository> ProbeRepo<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            calls: RefCell::new(Vec::new()),
            fail_on: Cell::new(None),
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn count_of(&self, method: &str) -> usize {
        self.calls.borrow().iter().filter(|call| **call == method).count()
    }

    pub fn reset_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Makes every later call to `method` fail until cleared with `None`.
    pub fn fail_on(&self, method: Option<&'static str>) {
        self.fail_on.set(method);
    }

    fn record(&self, method: &'static str) -> PathRepoResult<()> {
        self.calls.borrow_mut().push(method);
        if self.fail_on.get() == Some(method) {
            return Err(PathRepoError::InvalidData(format!("injected failure in {method}")));
        }
        Ok(())
    }
}

impl<R: PathRepository> PathRepository for ProbeRepo<R> {
    fn create_path(&self, path: &NewPath) -> PathRepoResult<Path> {
        self.record("create_path")?;
        self.inner.create_path(path)
    }

    fn get_path(&self, path_id: PathId) -> PathRepoResult<Option<Path>> {
        self.record("get_path")?;
        self.inner.get_path(path_id)
    }

    fn list_paths(&self) -> PathRepoResult<Vec<Path>> {
        self.record("list_paths")?;
        self.inner.list_paths()
    }

    fn update_path_header(
        &self,
        path_id: PathId,
        title: &str,
        subtitle: &str,
    ) -> PathRepoResult<()> {
        self.record("update_path_header")?;
        self.inner.update_path_header(path_id, title, subtitle)
    }

    fn increment_clones(&self, path_id: PathId) -> PathRepoResult<()> {
        self.record("increment_clones")?;
        self.inner.increment_clones(path_id)
    }

    fn delete_path(&self, path_id: PathId) -> PathRepoResult<()> {
        self.record("delete_path")?;
        self.inner.delete_path(path_id)
    }

    fn get_column(&self, column_id: ColumnId) -> PathRepoResult<Option<Column>> {
        self.record("get_column")?;
        self.inner.get_column(column_id)
    }

    fn list_columns(&self, path_id: PathId) -> PathRepoResult<Vec<Column>> {
        self.record("list_columns")?;
        self.inner.list_columns(path_id)
    }

    fn list_root_columns(&self, path_id: PathId) -> PathRepoResult<Vec<Column>> {
        self.record("list_root_columns")?;
        self.inner.list_root_columns(path_id)
    }

    fn list_child_columns(&self, item_id: ItemId) -> PathRepoResult<Vec<Column>> {
        self.record("list_child_columns")?;
        self.inner.list_child_columns(item_id)
    }

    fn insert_column(&self, column: &NewColumn) -> PathRepoResult<Column> {
        self.record("insert_column")?;
        self.inner.insert_column(column)
    }

    fn update_column_title(&self, column_id: ColumnId, title: &str) -> PathRepoResult<()> {
        self.record("update_column_title")?;
        self.inner.update_column_title(column_id, title)
    }

    fn delete_column(&self, column_id: ColumnId) -> PathRepoResult<()> {
        self.record("delete_column")?;
        self.inner.delete_column(column_id)
    }

    fn list_items(&self, column_id: ColumnId) -> PathRepoResult<Vec<ColumnItem>> {
        self.record("list_items")?;
        self.inner.list_items(column_id)
    }

    fn insert_items(&self, items: &[NewColumnItem]) -> PathRepoResult<Vec<ColumnItem>> {
        self.record("insert_items")?;
        self.inner.insert_items(items)
    }

    fn update_items(&self, items: &[ColumnItem]) -> PathRepoResult<()> {
        self.record("update_items")?;
        self.inner.update_items(items)
    }

    fn delete_item(&self, item_id: ItemId) -> PathRepoResult<()> {
        self.record("delete_item")?;
        self.inner.delete_item(item_id)
    }

    fn list_sections(&self, column_id: ColumnId) -> PathRepoResult<Vec<ContentSection>> {
        self.record("list_sections")?;
        self.inner.list_sections(column_id)
    }

    fn insert_sections(
        &self,
        sections: &[NewContentSection],
    ) -> PathRepoResult<Vec<ContentSection>> {
        self.record("insert_sections")?;
        self.inner.insert_sections(sections)
    }

    fn update_sections(&self, sections: &[ContentSection]) -> PathRepoResult<()> {
        self.record("update_sections")?;
        self.inner.update_sections(sections)
    }

    fn delete_section(&self, section_id: SectionId) -> PathRepoResult<()> {
        self.record("delete_section")?;
        self.inner.delete_section(section_id)
    }
}
