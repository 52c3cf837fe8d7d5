//! Command-line probe for the learning path core.
//!
//! Without a subcommand it prints the core version. Set `LEARNPATH_LOG_DIR`
//! (absolute) to write rolling logs.

use clap::{Parser, Subcommand};
use learnpath_core::{
    init_logging, open_db, ColumnRef, LogConfig, PathCloner, PathEditor, PathId, PathService,
    SqlitePathRepository,
};
use log::error;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

type CliResult = Result<(), Box<dyn Error>>;

/// Learning path store inspector
#[derive(Parser, Debug)]
#[command(name = "learnpath_cli")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List stored paths
    List {
        /// SQLite database file
        db: PathBuf,
    },

    /// Create a path with its root column
    Create {
        db: PathBuf,
        title: String,
        #[arg(default_value = "")]
        subtitle: String,
        /// Tag to attach; repeatable
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },

    /// Print a path tree
    Outline { db: PathBuf, path_id: PathId },

    /// Deep-copy a path into a new private path
    #[command(name = "clone")]
    ClonePath { db: PathBuf, path_id: PathId },
}

fn main() -> ExitCode {
    if let Ok(log_dir) = std::env::var("LEARNPATH_LOG_DIR") {
        if let Err(err) = init_logging(&LogConfig::new(log_dir)) {
            eprintln!("logging disabled: {err}");
        }
    }

    let cli = Cli::parse();
    let result = match cli.command {
        None => {
            println!("learnpath_core version={}", learnpath_core::core_version());
            Ok(())
        }
        Some(Command::List { db }) => list(&db),
        Some(Command::Create {
            db,
            title,
            subtitle,
            tags,
        }) => create(&db, &title, &subtitle, &tags),
        Some(Command::Outline { db, path_id }) => outline(&db, path_id),
        Some(Command::ClonePath { db, path_id }) => clone(&db, path_id),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_command module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn list(db: &Path) -> CliResult {
    let conn = open_db(db)?;
    let service = PathService::new(SqlitePathRepository::try_new(&conn)?);
    for path in service.list_paths()? {
        println!("{}\t{}\tclones={}", path.id, path.title, path.clones);
    }
    Ok(())
}

fn create(db: &Path, title: &str, subtitle: &str, tags: &[String]) -> CliResult {
    let conn = open_db(db)?;
    let service = PathService::new(SqlitePathRepository::try_new(&conn)?);
    let path = service.create_path(title, subtitle, tags)?;
    println!("{}", path.id);
    Ok(())
}

fn outline(db: &Path, path_id: PathId) -> CliResult {
    let conn = open_db(db)?;
    let mut editor = PathEditor::open(SqlitePathRepository::try_new(&conn)?, path_id)?;
    editor.reload()?;

    let store = editor.store();
    if let Some(path) = store.path() {
        println!("{} ({})", path.title, path.id);
    }
    if let Some(root) = store.root_column() {
        print_column(&editor, root.id, 1);
    }
    Ok(())
}

fn print_column(editor: &PathEditor<SqlitePathRepository<'_>>, column: ColumnRef, depth: usize) {
    let store = editor.store();
    let Some(entry) = store.column(column) else {
        return;
    };
    let indent = "  ".repeat(depth);
    println!("{indent}[{}] {}", entry.kind.as_str(), entry.title);
    for item in store.items(column) {
        println!("{indent}  - {}", item.title);
        if let Some(child) = store.child_column_of(item.id) {
            print_column(editor, child.id, depth + 2);
        }
    }
    for section in store.sections(column) {
        println!("{indent}  * {}", section.kind.as_str());
    }
}

fn clone(db: &Path, path_id: PathId) -> CliResult {
    let conn = open_db(db)?;
    let cloner = PathCloner::new(SqlitePathRepository::try_new(&conn)?);
    let report = cloner.clone_path(path_id)?;
    println!(
        "{}\tcolumns={} items={} sections={}",
        report.path_id,
        report.columns.len(),
        report.items.len(),
        report.sections.len()
    );
    Ok(())
}
