//! Domain models that mirror the SQLite schema and get passed throughout the
//! TUI. These types stay light-weight data holders so other layers can focus
//! on presentation and persistence logic.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
/// In-memory representation of one row of the `students` table.
pub struct Student {
    /// Primary key from the database. We keep this around even when the UI
    /// only needs display information because edit/delete flows bubble the id
    /// back to the persistence layer.
    pub id: i64,
    /// Student name shown in the table and matched by search.
    pub name: String,
    /// Course name as stored. The database accepts any text; only the form
    /// restricts input to the [`Course`] catalog.
    pub course: String,
    /// Mobile number kept as raw text, no format validation.
    pub mobile: String,
}

impl fmt::Display for Student {
    /// Write the student name to any formatter. Display is implemented so the
    /// type plays nicely with Ratatui widgets that consume strings implicitly.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// The fixed set of courses offered by the registration form. This is a
/// UI-side constraint only; rows written by other tools may carry any text in
/// the `course` column and still load fine.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Course {
    Biology,
    Math,
    Astronomy,
    Physics,
}

/// Raised when a course string does not belong to the catalog.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown course: {0}")]
pub struct UnknownCourse(pub String);

impl Course {
    /// Catalog in the order the form cycles through it.
    pub const ALL: [Course; 4] = [
        Course::Biology,
        Course::Math,
        Course::Astronomy,
        Course::Physics,
    ];

    /// Stable label used both for display and for the `course` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Course::Biology => "Biology",
            Course::Math => "Math",
            Course::Astronomy => "Astronomy",
            Course::Physics => "Physics",
        }
    }
}

impl fmt::Display for Course {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Course {
    type Err = UnknownCourse;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Course::ALL
            .into_iter()
            .find(|course| course.as_str() == s)
            .ok_or_else(|| UnknownCourse(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_labels_round_trip() {
        for course in Course::ALL {
            assert_eq!(course.as_str().parse::<Course>(), Ok(course));
        }
    }

    #[test]
    fn unknown_course_is_rejected() {
        let err = "Alchemy".parse::<Course>().unwrap_err();
        assert_eq!(err, UnknownCourse("Alchemy".to_string()));
        assert_eq!(err.to_string(), "unknown course: Alchemy");
    }
}
