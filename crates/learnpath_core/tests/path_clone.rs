mod common;

use common::ProbeRepo;
use learnpath_core::model::path::{NewColumn, NewColumnItem, NewContentSection, NewPath};
use learnpath_core::{
    open_db_in_memory, CloneError, CloneOptions, ColumnKind, ItemId, PathCloner, PathId,
    PathRepository, SectionKind, SqlitePathRepository,
};
use rusqlite::Connection;
use serde_json::json;
use std::collections::HashSet;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

/// Root branch with two items; the second anchors a content column with
/// three sections.
fn seed_source(repo: &SqlitePathRepository<'_>) -> PathId {
    let path = repo
        .create_path(&NewPath {
            title: "Algebra".to_string(),
            subtitle: "Basics".to_string(),
            tags: vec!["math".to_string()],
            is_public: true,
            cloned_from: None,
        })
        .unwrap();
    let root = repo
        .insert_column(&NewColumn {
            path_id: path.id,
            parent_item_id: None,
            kind: ColumnKind::Branch,
            title: "Main Column".to_string(),
            order_index: 0,
        })
        .unwrap();
    let items = repo
        .insert_items(&[
            NewColumnItem {
                column_id: root.id,
                title: "Linear".to_string(),
                order_index: 0,
            },
            NewColumnItem {
                column_id: root.id,
                title: "Quadratic".to_string(),
                order_index: 1,
            },
        ])
        .unwrap();
    let content = repo
        .insert_column(&NewColumn {
            path_id: path.id,
            parent_item_id: Some(items[1].id),
            kind: ColumnKind::Content,
            title: "Quadratic".to_string(),
            order_index: 0,
        })
        .unwrap();
    repo.insert_sections(&[
        NewContentSection {
            column_id: content.id,
            kind: SectionKind::Heading,
            content: json!({ "text": "Quadratics" }),
            order_index: 0,
        },
        NewContentSection {
            column_id: content.id,
            kind: SectionKind::Paragraph,
            content: json!({ "text": "ax^2 + bx + c" }),
            order_index: 1,
        },
        NewContentSection {
            column_id: content.id,
            kind: SectionKind::Quiz,
            content: json!({ "question": "Roots?", "options": [] }),
            order_index: 2,
        },
    ])
    .unwrap();
    path.id
}

fn tree_counts(repo: &SqlitePathRepository<'_>, path_id: PathId) -> (usize, usize, usize) {
    let columns = repo.list_columns(path_id).unwrap();
    let mut items = 0;
    let mut sections = 0;
    for column in &columns {
        items += repo.list_items(column.id).unwrap().len();
        sections += repo.list_sections(column.id).unwrap().len();
    }
    (columns.len(), items, sections)
}

#[test]
fn clone_copies_tree_and_bumps_source_counter() {
    let conn = setup();
    let repo = SqlitePathRepository::try_new(&conn).unwrap();
    let source = seed_source(&repo);

    let cloner = PathCloner::new(SqlitePathRepository::try_new(&conn).unwrap());
    let report = cloner.clone_path(source).unwrap();

    let copy = repo.get_path(report.path_id).unwrap().unwrap();
    assert_eq!(copy.title, "Algebra (Copy)");
    assert_eq!(copy.subtitle, "Basics");
    assert_eq!(copy.tags, vec!["math"]);
    assert!(!copy.is_public);
    assert_eq!(copy.clones, 0);
    assert_eq!(copy.cloned_from, Some(source));

    assert_eq!(repo.get_path(source).unwrap().unwrap().clones, 1);
    assert_eq!(tree_counts(&repo, report.path_id), tree_counts(&repo, source));
    assert_eq!(report.columns.len(), 2);
    assert_eq!(report.items.len(), 2);
    assert_eq!(report.sections.len(), 3);

    let roots = repo.list_root_columns(report.path_id).unwrap();
    assert_eq!(roots.len(), 1);
    let items = repo.list_items(roots[0].id).unwrap();
    let titles: Vec<&str> = items.iter().map(|item| item.title.as_str()).collect();
    assert_eq!(titles, vec!["Linear", "Quadratic"]);
    assert!(repo.list_child_columns(items[0].id).unwrap().is_empty());

    let children = repo.list_child_columns(items[1].id).unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].kind, ColumnKind::Content);
    let sections = repo.list_sections(children[0].id).unwrap();
    let kinds: Vec<SectionKind> = sections.iter().map(|section| section.kind).collect();
    assert_eq!(
        kinds,
        vec![SectionKind::Heading, SectionKind::Paragraph, SectionKind::Quiz]
    );
    assert_eq!(sections[1].content, json!({ "text": "ax^2 + bx + c" }));
}

#[test]
fn cloned_rows_only_reference_the_new_tree() {
    let conn = setup();
    let repo = SqlitePathRepository::try_new(&conn).unwrap();
    let source = seed_source(&repo);

    let report = PathCloner::new(SqlitePathRepository::try_new(&conn).unwrap())
        .clone_path(source)
        .unwrap();

    let columns = repo.list_columns(report.path_id).unwrap();
    let column_ids: HashSet<_> = columns.iter().map(|column| column.id).collect();
    let mut item_ids = HashSet::new();
    for column in &columns {
        for item in repo.list_items(column.id).unwrap() {
            assert!(column_ids.contains(&item.column_id));
            item_ids.insert(item.id);
        }
        for section in repo.list_sections(column.id).unwrap() {
            assert!(column_ids.contains(&section.column_id));
        }
    }
    for column in &columns {
        if let Some(parent) = column.parent_item_id {
            assert!(item_ids.contains(&parent));
        }
    }

    let source_columns: HashSet<_> = repo
        .list_columns(source)
        .unwrap()
        .into_iter()
        .map(|column| column.id)
        .collect();
    assert!(column_ids.is_disjoint(&source_columns));
    for (old, new) in &report.columns {
        assert!(source_columns.contains(old));
        assert!(column_ids.contains(new));
    }
}

#[test]
fn clone_uses_configured_suffix() {
    let conn = setup();
    let repo = SqlitePathRepository::try_new(&conn).unwrap();
    let source = seed_source(&repo);

    let cloner = PathCloner::with_options(
        SqlitePathRepository::try_new(&conn).unwrap(),
        CloneOptions {
            title_suffix: " - mine".to_string(),
        },
    );
    let report = cloner.clone_path(source).unwrap();
    assert_eq!(
        repo.get_path(report.path_id).unwrap().unwrap().title,
        "Algebra - mine"
    );
}

#[test]
fn clone_of_missing_source_fails_without_writes() {
    let conn = setup();
    let probe = ProbeRepo::new(SqlitePathRepository::try_new(&conn).unwrap());
    let cloner = PathCloner::new(probe);
    let missing = PathId::new_v4();

    let err = cloner.clone_path(missing).unwrap_err();
    assert!(matches!(err, CloneError::SourceNotFound(id) if id == missing));

    let repo = SqlitePathRepository::try_new(&conn).unwrap();
    assert!(repo.list_paths().unwrap().is_empty());
}

#[test]
fn failed_clone_leaves_source_counter_untouched() {
    let conn = setup();
    let repo = SqlitePathRepository::try_new(&conn).unwrap();
    let source = seed_source(&repo);

    let probe = ProbeRepo::new(SqlitePathRepository::try_new(&conn).unwrap());
    probe.fail_on(Some("insert_sections"));
    let cloner = PathCloner::new(probe);

    let err = cloner.clone_path(source).unwrap_err();
    assert!(matches!(err, CloneError::Repo(_)));
    assert_eq!(repo.get_path(source).unwrap().unwrap().clones, 0);
}

/// Builds a tree `depth` columns deep where every branch column holds
/// `branching` items, each anchoring the next level. The last level is
/// content columns with one section each.
fn seed_nested(
    repo: &SqlitePathRepository<'_>,
    path_id: PathId,
    parent: Option<ItemId>,
    depth: usize,
    branching: usize,
) {
    let kind = if depth == 1 {
        ColumnKind::Content
    } else {
        ColumnKind::Branch
    };
    let column = repo
        .insert_column(&NewColumn {
            path_id,
            parent_item_id: parent,
            kind,
            title: format!("Level {depth}"),
            order_index: 0,
        })
        .unwrap();
    if depth == 1 {
        repo.insert_sections(&[NewContentSection {
            column_id: column.id,
            kind: SectionKind::Paragraph,
            content: json!({ "text": format!("leaf under {}", column.id) }),
            order_index: 0,
        }])
        .unwrap();
        return;
    }
    let items: Vec<NewColumnItem> = (0..branching)
        .map(|index| NewColumnItem {
            column_id: column.id,
            title: format!("Topic {depth}.{index}"),
            order_index: index as i64,
        })
        .collect();
    for item in repo.insert_items(&items).unwrap() {
        seed_nested(repo, path_id, Some(item.id), depth - 1, branching);
    }
}

#[test]
fn clone_copies_branch_columns_nested_under_items() {
    let conn = setup();
    let repo = SqlitePathRepository::try_new(&conn).unwrap();
    let source = repo
        .create_path(&NewPath {
            title: "Calculus".to_string(),
            ..NewPath::default()
        })
        .unwrap()
        .id;
    seed_nested(&repo, source, None, 3, 2);
    assert_eq!(tree_counts(&repo, source), (7, 6, 4));

    let report = PathCloner::new(SqlitePathRepository::try_new(&conn).unwrap())
        .clone_path(source)
        .unwrap();
    assert_eq!(tree_counts(&repo, report.path_id), (7, 6, 4));
    assert_eq!(report.columns.len(), 7);
    assert_eq!(report.items.len(), 6);
    assert_eq!(report.sections.len(), 4);

    let roots = repo.list_root_columns(report.path_id).unwrap();
    assert_eq!(roots.len(), 1);
    let mut leaves = 0;
    for top in repo.list_items(roots[0].id).unwrap() {
        let middle = repo.list_child_columns(top.id).unwrap();
        assert_eq!(middle.len(), 1);
        assert_eq!(middle[0].kind, ColumnKind::Branch);
        assert_eq!(middle[0].path_id, report.path_id);
        for item in repo.list_items(middle[0].id).unwrap() {
            let leaf = repo.list_child_columns(item.id).unwrap();
            assert_eq!(leaf.len(), 1);
            assert_eq!(leaf[0].kind, ColumnKind::Content);
            assert_eq!(repo.list_sections(leaf[0].id).unwrap().len(), 1);
            leaves += 1;
        }
    }
    assert_eq!(leaves, 4);
}
