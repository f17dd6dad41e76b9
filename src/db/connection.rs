use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use directories::BaseDirs;
use rusqlite::Connection;

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".student-register";
/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "students.sqlite";

/// Ensure the database file exists, create the table on first run, and return
/// a live connection. The connection is held for the lifetime of the process;
/// every statement autocommits on its own.
pub fn ensure_schema() -> Result<Connection> {
    let db_path = db_path()?;

    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent).context("failed to create data directory")?;
    }

    let conn = Connection::open(&db_path).context("failed to open SQLite database")?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Open a throwaway in-memory database carrying the real schema. Used by the
/// persistence tests so they exercise the same statements without touching
/// the filesystem.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Create the single `students` table if it is missing. `id` is an alias for
/// the SQLite rowid, so the engine assigns it on insert.
fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS students (
            id INTEGER PRIMARY KEY,
            name TEXT,
            course TEXT,
            mobile TEXT
        )",
        [],
    )
    .context("failed to create students table")?;
    Ok(())
}

/// Resolve the absolute path to the SQLite database inside the user's home.
fn db_path() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME).join(DB_FILE_NAME))
}
