use anyhow::{anyhow, Result};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::models::{Course, Student};

/// Internal representation of the student form used by both the add and the
/// edit flows. The course is tracked as an index into [`Course::ALL`] so the
/// field behaves like a combo box instead of free text.
#[derive(Default, Clone)]
pub(crate) struct StudentForm {
    pub(crate) name: String,
    pub(crate) course_index: usize,
    pub(crate) mobile: String,
    pub(crate) active: StudentField,
    pub(crate) error: Option<String>,
}

/// Fields available within the student form.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum StudentField {
    Name,
    Course,
    Mobile,
}

impl Default for StudentField {
    fn default() -> Self {
        StudentField::Name
    }
}

impl StudentForm {
    /// Populate the form from an existing student when entering edit mode.
    /// A stored course outside the catalog falls back to the first entry;
    /// the row keeps its old text until the user saves.
    pub(crate) fn from_student(student: &Student) -> Self {
        let course_index = student
            .course
            .parse::<Course>()
            .ok()
            .and_then(|course| Course::ALL.iter().position(|c| *c == course))
            .unwrap_or(0);

        Self {
            name: student.name.clone(),
            course_index,
            mobile: student.mobile.clone(),
            active: StudentField::Name,
            error: None,
        }
    }

    /// Cycle focus across the three fields (Name → Course → Mobile).
    pub(crate) fn toggle_field(&mut self) {
        self.active = match self.active {
            StudentField::Name => StudentField::Course,
            StudentField::Course => StudentField::Mobile,
            StudentField::Mobile => StudentField::Name,
        };
    }

    /// Append a character to the active field. The course field only reacts
    /// to [`cycle_course`](Self::cycle_course), so typed characters report
    /// `false` there and the caller keeps any error message on screen.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        match self.active {
            StudentField::Name => self.name.push(ch),
            StudentField::Course => return false,
            StudentField::Mobile => self.mobile.push(ch),
        }
        true
    }

    /// Remove the last character from the active text field.
    pub(crate) fn backspace(&mut self) {
        match self.active {
            StudentField::Name => {
                self.name.pop();
            }
            StudentField::Course => {}
            StudentField::Mobile => {
                self.mobile.pop();
            }
        }
    }

    /// Step the course selection through the catalog, wrapping at both ends.
    pub(crate) fn cycle_course(&mut self, delta: isize) {
        let len = Course::ALL.len() as isize;
        let next = (self.course_index as isize + delta).rem_euclid(len);
        self.course_index = next as usize;
    }

    /// Currently selected catalog entry.
    pub(crate) fn course(&self) -> Course {
        Course::ALL[self.course_index]
    }

    /// Validate and normalize form inputs before they are written to the
    /// database.
    pub(crate) fn parse_inputs(&self) -> Result<(String, Course, String)> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(anyhow!("Student name is required."));
        }
        Ok((
            name.to_string(),
            self.course(),
            self.mobile.trim().to_string(),
        ))
    }

    /// Render a styled line for the modal form. The course field shows angle
    /// markers while focused to hint that arrow keys change the selection.
    pub(crate) fn build_line(&self, field_name: &str, field: StudentField) -> Line<'static> {
        let is_active = self.active == field;

        if field == StudentField::Course {
            let value = self.course().as_str();
            let display = if is_active {
                format!("< {value} >")
            } else {
                value.to_string()
            };
            let style = if is_active {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            return Line::from(vec![
                Span::raw(format!("{field_name}: ")),
                Span::styled(display, style),
            ]);
        }

        let (value, placeholder) = match field {
            StudentField::Name => (&self.name, "<required>"),
            StudentField::Mobile => (&self.mobile, "<optional>"),
            StudentField::Course => unreachable!(),
        };

        let display = if value.is_empty() {
            placeholder.to_string()
        } else {
            value.clone()
        };

        let style = if is_active {
            Style::default().fg(Color::Yellow)
        } else if value.is_empty() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        Line::from(vec![
            Span::raw(format!("{field_name}: ")),
            Span::styled(display, style),
        ])
    }

    /// Return the character count for the requested field, used to position
    /// the terminal cursor inside the modal.
    pub(crate) fn value_len(&self, field: StudentField) -> usize {
        match field {
            StudentField::Name => self.name.chars().count(),
            StudentField::Course => self.course().as_str().chars().count(),
            StudentField::Mobile => self.mobile.chars().count(),
        }
    }
}

/// State for the delete confirmation dialog. Carries the record id explicitly
/// so the command never has to re-read selection state from a widget.
#[derive(Clone)]
pub(crate) struct ConfirmStudentDelete {
    pub(crate) id: i64,
    pub(crate) name: String,
    pub(crate) course: String,
}

impl ConfirmStudentDelete {
    /// Build the confirmation state from the student being considered.
    pub(crate) fn from(student: Student) -> Self {
        Self {
            id: student.id,
            name: student.name,
            course: student.course,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_student() -> Student {
        Student {
            id: 7,
            name: "Ada".to_string(),
            course: "Astronomy".to_string(),
            mobile: "555-0100".to_string(),
        }
    }

    #[test]
    fn focus_cycles_name_course_mobile() {
        let mut form = StudentForm::default();
        assert_eq!(form.active, StudentField::Name);
        form.toggle_field();
        assert_eq!(form.active, StudentField::Course);
        form.toggle_field();
        assert_eq!(form.active, StudentField::Mobile);
        form.toggle_field();
        assert_eq!(form.active, StudentField::Name);
    }

    #[test]
    fn course_cycling_stays_in_catalog() {
        let mut form = StudentForm::default();
        assert_eq!(form.course(), Course::Biology);
        form.cycle_course(-1);
        assert_eq!(form.course(), Course::Physics);
        for _ in 0..Course::ALL.len() {
            form.cycle_course(1);
        }
        assert_eq!(form.course(), Course::Physics);
    }

    #[test]
    fn empty_name_is_rejected() {
        let mut form = StudentForm::default();
        form.name = "   ".to_string();
        assert!(form.parse_inputs().is_err());

        form.name = " Ada ".to_string();
        let (name, course, mobile) = form.parse_inputs().unwrap();
        assert_eq!(name, "Ada");
        assert_eq!(course, Course::Biology);
        assert_eq!(mobile, "");
    }

    #[test]
    fn edit_form_picks_up_stored_course() {
        let form = StudentForm::from_student(&sample_student());
        assert_eq!(form.course(), Course::Astronomy);
        assert_eq!(form.name, "Ada");
        assert_eq!(form.mobile, "555-0100");
    }

    #[test]
    fn unknown_stored_course_falls_back_to_first_entry() {
        let mut student = sample_student();
        student.course = "Alchemy".to_string();
        let form = StudentForm::from_student(&student);
        assert_eq!(form.course(), Course::Biology);
    }

    #[test]
    fn typing_ignores_the_course_field() {
        let mut form = StudentForm::default();
        form.active = StudentField::Course;
        assert!(!form.push_char('x'));
        form.backspace();
        assert_eq!(form.course(), Course::Biology);
    }
}
