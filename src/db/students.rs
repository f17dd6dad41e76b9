use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::models::Student;

/// Retrieve every student with a full-table scan. No ORDER BY on purpose:
/// the table view shows rows in whatever order the engine returns them,
/// which for an append-only rowid table is insertion order.
pub fn fetch_students(conn: &Connection) -> Result<Vec<Student>> {
    let mut stmt = conn
        .prepare("SELECT id, name, course, mobile FROM students")
        .context("failed to prepare student query")?;

    let students = stmt
        .query_map([], |row| {
            Ok(Student {
                id: row.get(0)?,
                name: row.get(1)?,
                course: row.get(2)?,
                mobile: row.get(3)?,
            })
        })
        .context("failed to load students")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect students")?;

    Ok(students)
}

/// Insert a new student row, returning the hydrated struct so the caller can
/// push it straight into the in-memory list. The id comes from the engine.
pub fn create_student(conn: &Connection, name: &str, course: &str, mobile: &str) -> Result<Student> {
    conn.execute(
        "INSERT INTO students (name, course, mobile) VALUES (?1, ?2, ?3)",
        params![name, course, mobile],
    )
    .context("failed to insert student")?;

    let id = conn.last_insert_rowid();
    Ok(Student {
        id,
        name: name.to_string(),
        course: course.to_string(),
        mobile: mobile.to_string(),
    })
}

/// Overwrite all mutable fields for an existing student. Returns whether a
/// row matched: a stale id is an idempotent no-op at this layer, and the UI
/// decides how loudly to report it.
pub fn update_student(
    conn: &Connection,
    id: i64,
    name: &str,
    course: &str,
    mobile: &str,
) -> Result<bool> {
    let updated = conn
        .execute(
            "UPDATE students SET name = ?1, course = ?2, mobile = ?3 WHERE id = ?4",
            params![name, course, mobile, id],
        )
        .context("failed to update student")?;

    Ok(updated > 0)
}

/// Remove a student row. Like [`update_student`], a missing id reports
/// `false` instead of an error.
pub fn delete_student(conn: &Connection, id: i64) -> Result<bool> {
    let deleted = conn
        .execute("DELETE FROM students WHERE id = ?1", params![id])
        .context("failed to delete student")?;

    Ok(deleted > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    #[test]
    fn insert_then_fetch_preserves_fields() {
        let conn = open_in_memory().unwrap();

        let ada = create_student(&conn, "Ada", "Math", "555-0100").unwrap();

        let students = fetch_students(&conn).unwrap();
        assert_eq!(students, vec![ada.clone()]);
        assert_eq!(ada.name, "Ada");
        assert_eq!(ada.course, "Math");
        assert_eq!(ada.mobile, "555-0100");
    }

    #[test]
    fn inserted_ids_are_unique() {
        let conn = open_in_memory().unwrap();

        let first = create_student(&conn, "Ada", "Math", "555-0100").unwrap();
        let second = create_student(&conn, "Grace", "Physics", "555-0199").unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(fetch_students(&conn).unwrap().len(), 2);
    }

    #[test]
    fn update_rewrites_only_the_matching_row() {
        let conn = open_in_memory().unwrap();
        let ada = create_student(&conn, "Ada", "Math", "555-0100").unwrap();
        let grace = create_student(&conn, "Grace", "Physics", "555-0199").unwrap();

        let touched = update_student(&conn, ada.id, "Ada L.", "Physics", "555-0101").unwrap();
        assert!(touched);

        let students = fetch_students(&conn).unwrap();
        let updated = students.iter().find(|s| s.id == ada.id).unwrap();
        assert_eq!(updated.name, "Ada L.");
        assert_eq!(updated.course, "Physics");
        assert_eq!(updated.mobile, "555-0101");
        assert_eq!(students.iter().find(|s| s.id == grace.id), Some(&grace));
    }

    #[test]
    fn delete_removes_exactly_one_row() {
        let conn = open_in_memory().unwrap();
        let ada = create_student(&conn, "Ada", "Math", "555-0100").unwrap();
        let grace = create_student(&conn, "Grace", "Physics", "555-0199").unwrap();

        assert!(delete_student(&conn, ada.id).unwrap());

        let students = fetch_students(&conn).unwrap();
        assert_eq!(students, vec![grace]);
    }

    #[test]
    fn missing_ids_are_a_no_op() {
        let conn = open_in_memory().unwrap();
        let ada = create_student(&conn, "Ada", "Math", "555-0100").unwrap();

        assert!(!update_student(&conn, ada.id + 40, "Nobody", "Biology", "").unwrap());
        assert!(!delete_student(&conn, ada.id + 40).unwrap());

        assert_eq!(fetch_students(&conn).unwrap(), vec![ada]);
    }

    #[test]
    fn insert_update_delete_scenario() {
        let conn = open_in_memory().unwrap();

        let ada = create_student(&conn, "Ada", "Math", "555-0100").unwrap();
        assert_eq!(ada.id, 1);
        assert_eq!(fetch_students(&conn).unwrap().len(), 1);

        assert!(update_student(&conn, ada.id, "Ada L.", "Physics", "555-0101").unwrap());
        let students = fetch_students(&conn).unwrap();
        assert_eq!(
            students,
            vec![Student {
                id: ada.id,
                name: "Ada L.".to_string(),
                course: "Physics".to_string(),
                mobile: "555-0101".to_string(),
            }]
        );

        assert!(delete_student(&conn, ada.id).unwrap());
        assert!(fetch_students(&conn).unwrap().is_empty());
    }
}
