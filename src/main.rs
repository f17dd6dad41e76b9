//! Binary entry point that glues the SQLite-backed student table to the TUI:
//! bring up the database, hydrate the initial app state, and drive the
//! Ratatui event loop until the user exits.
use student_register::{ensure_schema, fetch_students, run_app, App};

/// Initialize persistence, load the student roster, and launch the Ratatui
/// event loop.
///
/// Returning a `Result` bubbles up fatal initialization problems (for example
/// the user removing the writable data directory) to the terminal instead of
/// crashing silently.
fn main() -> anyhow::Result<()> {
    let conn = ensure_schema()?;
    let students = fetch_students(&conn)?;

    let mut app = App::new(conn, students);
    run_app(&mut app)
}
