use std::collections::HashSet;
use std::mem;

use anyhow::Result;
use crossterm::event::KeyCode;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap};
use ratatui::Frame;
use rusqlite::Connection;

use crate::db::{create_student, delete_student, fetch_students, update_student};
use crate::models::Student;

use super::forms::{ConfirmStudentDelete, StudentField, StudentForm};
use super::helpers::{centered_rect, surface_error};

/// Footer space reserved for the status line and key hints.
const FOOTER_HEIGHT: u16 = 3;

/// Fine-grained modes layered over the single table screen. Keeping this
/// explicit makes it easy to reason about which rendering path runs and what
/// keyboard shortcuts should do.
enum Mode {
    Normal,
    AddingStudent(StudentForm),
    EditingStudent { id: i64, form: StudentForm },
    ConfirmDelete(ConfirmStudentDelete),
    Searching(SearchState),
    About,
}

/// State for an active name search.
struct SearchState {
    query: String,
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state shared across the TUI. The student list is a
/// wholesale mirror of the table: it is rebuilt from a full re-query after
/// every mutation instead of being patched incrementally.
pub struct App {
    conn: Connection,
    students: Vec<Student>,
    selected: usize,
    mode: Mode,
    status: Option<StatusMessage>,
    /// Ids highlighted by the latest search. Kept across redraws until the
    /// user clears them or runs another search.
    matches: HashSet<i64>,
}

impl App {
    pub fn new(conn: Connection, students: Vec<Student>) -> Self {
        Self {
            conn,
            students,
            selected: 0,
            mode: Mode::Normal,
            status: None,
            matches: HashSet::new(),
        }
    }

    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mut mode = mem::replace(&mut self.mode, Mode::Normal);

        mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit)?,
            Mode::AddingStudent(form) => self.handle_add_student(code, form)?,
            Mode::EditingStudent { id, form } => self.handle_edit_student(code, id, form)?,
            Mode::ConfirmDelete(confirm) => self.handle_confirm_delete(code, confirm)?,
            Mode::Searching(state) => self.handle_search(code, state),
            Mode::About => self.handle_about(code),
        };

        self.mode = mode;
        Ok(exit)
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        match code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                *exit = true;
            }
            KeyCode::Esc => {
                self.matches.clear();
                self.clear_status();
            }
            KeyCode::Up => self.move_selection(-1),
            KeyCode::Down => self.move_selection(1),
            KeyCode::PageUp => self.move_selection(-5),
            KeyCode::PageDown => self.move_selection(5),
            KeyCode::Home => self.select_first(),
            KeyCode::End => self.select_last(),
            KeyCode::Char('+') => {
                self.clear_status();
                return Ok(Mode::AddingStudent(StudentForm::default()));
            }
            KeyCode::Char('e') | KeyCode::Char('E') => {
                if let Some(student) = self.current_student().cloned() {
                    self.clear_status();
                    return Ok(Mode::EditingStudent {
                        id: student.id,
                        form: StudentForm::from_student(&student),
                    });
                } else {
                    self.set_status("No student selected.", StatusKind::Error);
                }
            }
            KeyCode::Char('-') => {
                if let Some(student) = self.current_student().cloned() {
                    self.clear_status();
                    return Ok(Mode::ConfirmDelete(ConfirmStudentDelete::from(student)));
                } else {
                    self.set_status("No student selected.", StatusKind::Error);
                }
            }
            KeyCode::Char('f') | KeyCode::Char('F') => {
                self.clear_status();
                return Ok(Mode::Searching(SearchState {
                    query: String::new(),
                }));
            }
            KeyCode::Char('a') | KeyCode::Char('A') => {
                self.clear_status();
                return Ok(Mode::About);
            }
            _ => {}
        }
        Ok(Mode::Normal)
    }

    fn handle_add_student(&mut self, code: KeyCode, mut form: StudentForm) -> Result<Mode> {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                self.set_status("Add student cancelled.", StatusKind::Info);
                keep_open = false;
            }
            KeyCode::Tab | KeyCode::BackTab => form.toggle_field(),
            KeyCode::Left | KeyCode::Up => {
                if form.active == StudentField::Course {
                    form.cycle_course(-1);
                }
            }
            KeyCode::Right | KeyCode::Down => {
                if form.active == StudentField::Course {
                    form.cycle_course(1);
                }
            }
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.save_new_student(&form) {
                Ok(_) => keep_open = false,
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        if keep_open {
            Ok(Mode::AddingStudent(form))
        } else {
            Ok(Mode::Normal)
        }
    }

    fn handle_edit_student(&mut self, code: KeyCode, id: i64, mut form: StudentForm) -> Result<Mode> {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                self.set_status("Edit cancelled.", StatusKind::Info);
                keep_open = false;
            }
            KeyCode::Tab | KeyCode::BackTab => form.toggle_field(),
            KeyCode::Left | KeyCode::Up => {
                if form.active == StudentField::Course {
                    form.cycle_course(-1);
                }
            }
            KeyCode::Right | KeyCode::Down => {
                if form.active == StudentField::Course {
                    form.cycle_course(1);
                }
            }
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.save_existing_student(id, &form) {
                Ok(_) => keep_open = false,
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        if keep_open {
            Ok(Mode::EditingStudent { id, form })
        } else {
            Ok(Mode::Normal)
        }
    }

    fn handle_confirm_delete(
        &mut self,
        code: KeyCode,
        confirm: ConfirmStudentDelete,
    ) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match self.perform_delete(&confirm) {
                    Ok(_) => Ok(Mode::Normal),
                    Err(err) => {
                        let message = surface_error(&err);
                        self.set_status(message, StatusKind::Error);
                        Ok(Mode::ConfirmDelete(confirm))
                    }
                }
            }
            _ => Ok(Mode::ConfirmDelete(confirm)),
        }
    }

    fn handle_search(&mut self, code: KeyCode, mut state: SearchState) -> Mode {
        match code {
            KeyCode::Esc => {
                self.set_status("Search cancelled.", StatusKind::Info);
                return Mode::Normal;
            }
            KeyCode::Enter => {
                let query = state.query.clone();
                if query.trim().is_empty() {
                    self.matches.clear();
                    self.set_status("Search cleared.", StatusKind::Info);
                    return Mode::Normal;
                }

                self.matches = exact_name_matches(&self.students, &query);
                let count = self.matches.len();
                match count {
                    0 => self.set_status(
                        format!("No students match '{query}'."),
                        StatusKind::Error,
                    ),
                    1 => self.set_status(
                        format!("1 student matches '{query}'."),
                        StatusKind::Info,
                    ),
                    _ => self.set_status(
                        format!("{count} students match '{query}'."),
                        StatusKind::Info,
                    ),
                }
                return Mode::Normal;
            }
            KeyCode::Backspace => {
                state.query.pop();
            }
            KeyCode::Char(ch) => {
                if !ch.is_control() {
                    state.query.push(ch);
                }
            }
            _ => {}
        }
        Mode::Searching(state)
    }

    fn handle_about(&mut self, _code: KeyCode) -> Mode {
        Mode::Normal
    }

    fn save_new_student(&mut self, form: &StudentForm) -> Result<()> {
        let (name, course, mobile) = form.parse_inputs()?;
        let student = create_student(&self.conn, &name, course.as_str(), &mobile)?;
        self.reload()?;
        self.select_id(student.id);
        self.set_status("Student added.", StatusKind::Info);
        Ok(())
    }

    fn save_existing_student(&mut self, id: i64, form: &StudentForm) -> Result<()> {
        let (name, course, mobile) = form.parse_inputs()?;
        let touched = update_student(&self.conn, id, &name, course.as_str(), &mobile)?;
        self.reload()?;
        if touched {
            self.select_id(id);
            self.set_status("Student updated.", StatusKind::Info);
        } else {
            self.set_status("Student no longer exists.", StatusKind::Error);
        }
        Ok(())
    }

    fn perform_delete(&mut self, confirm: &ConfirmStudentDelete) -> Result<()> {
        let touched = delete_student(&self.conn, confirm.id)?;
        self.matches.remove(&confirm.id);
        self.reload()?;
        if touched {
            self.set_status("The record was deleted successfully.", StatusKind::Info);
        } else {
            self.set_status("Student no longer exists.", StatusKind::Error);
        }
        Ok(())
    }

    /// Rebuild the in-memory mirror with a full re-query, then clamp the
    /// selection and drop highlights pointing at rows that disappeared.
    fn reload(&mut self) -> Result<()> {
        self.students = fetch_students(&self.conn)?;
        if self.students.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.students.len() {
            self.selected = self.students.len() - 1;
        }
        let live_ids: HashSet<i64> = self.students.iter().map(|s| s.id).collect();
        self.matches.retain(|id| live_ids.contains(id));
        Ok(())
    }

    fn current_student(&self) -> Option<&Student> {
        self.students.get(self.selected)
    }

    fn move_selection(&mut self, offset: isize) {
        if self.students.is_empty() {
            return;
        }
        let len = self.students.len() as isize;
        let mut new = self.selected as isize + offset;
        if new < 0 {
            new = 0;
        }
        if new >= len {
            new = len - 1;
        }
        self.selected = new as usize;
    }

    fn select_first(&mut self) {
        if !self.students.is_empty() {
            self.selected = 0;
        }
    }

    fn select_last(&mut self) {
        if !self.students.is_empty() {
            self.selected = self.students.len() - 1;
        }
    }

    fn select_id(&mut self, id: i64) {
        if let Some(position) = self.students.iter().position(|s| s.id == id) {
            self.selected = position;
        }
    }

    fn set_status(&mut self, text: impl Into<String>, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let footer_height = FOOTER_HEIGHT.min(area.height);

        let (content_area, footer_area) = if area.height > footer_height {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(footer_height)])
                .split(area);
            (chunks[0], chunks[1])
        } else {
            (area, area)
        };

        self.draw_student_table(frame, content_area);

        if area.height >= footer_height {
            self.draw_footer(frame, footer_area);
        }

        match &self.mode {
            Mode::Normal => {}
            Mode::AddingStudent(form) => self.draw_student_form(frame, area, "Add Student", form),
            Mode::EditingStudent { form, .. } => {
                self.draw_student_form(frame, area, "Update Student", form)
            }
            Mode::ConfirmDelete(confirm) => self.draw_confirm_delete(frame, area, confirm),
            Mode::Searching(state) => self.draw_search(frame, area, state),
            Mode::About => self.draw_about(frame, area),
        }
    }

    fn draw_student_table(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().title("Students").borders(Borders::ALL);

        if self.students.is_empty() {
            let paragraph = Paragraph::new(Line::from(Span::styled(
                "No students registered. Press + to add one.",
                Style::default().fg(Color::DarkGray),
            )))
            .block(block)
            .alignment(Alignment::Center);
            frame.render_widget(paragraph, area);
            return;
        }

        let header = Row::new(["Id", "Name", "Course", "Mobile"].map(|title| {
            Cell::from(Span::styled(
                title,
                Style::default().add_modifier(Modifier::BOLD),
            ))
        }));

        let rows = self.students.iter().enumerate().map(|(index, student)| {
            let mut style = Style::default();
            if self.matches.contains(&student.id) {
                style = style.fg(Color::Cyan).add_modifier(Modifier::BOLD);
            }
            if index == self.selected {
                style = style.add_modifier(Modifier::REVERSED);
            }
            Row::new([
                Cell::from(student.id.to_string()),
                Cell::from(student.name.clone()),
                Cell::from(student.course.clone()),
                Cell::from(student.mobile.clone()),
            ])
            .style(style)
        });

        let table = Table::new(
            rows,
            [
                Constraint::Length(6),
                Constraint::Min(16),
                Constraint::Length(12),
                Constraint::Length(16),
            ],
        )
        .header(header)
        .column_spacing(2)
        .block(block);

        frame.render_widget(table, area);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let instructions = self.footer_instructions();

        let paragraph = Paragraph::new(vec![status_line, instructions]).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let key_style = Style::default().fg(Color::Yellow);
        Line::from(vec![
            Span::styled("[↑↓]", key_style),
            Span::raw(" Select   "),
            Span::styled("[+]", key_style),
            Span::raw(" Add   "),
            Span::styled("[e]", key_style),
            Span::raw(" Edit   "),
            Span::styled("[-]", key_style),
            Span::raw(" Delete   "),
            Span::styled("[f]", key_style),
            Span::raw(" Search   "),
            Span::styled("[Esc]", key_style),
            Span::raw(" Clear   "),
            Span::styled("[a]", key_style),
            Span::raw(" About   "),
            Span::styled("[q]", key_style),
            Span::raw(" Quit"),
        ])
    }

    fn draw_student_form(&self, frame: &mut Frame, area: Rect, title: &str, form: &StudentForm) {
        let popup_area = centered_rect(60, 40, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(title).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let name_line = form.build_line("Name", StudentField::Name);
        let course_line = form.build_line("Course", StudentField::Course);
        let mobile_line = form.build_line("Mobile", StudentField::Mobile);

        let mut lines = vec![name_line, course_line, mobile_line, Line::from("")];

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to save • Tab to switch • ←/→ to change course • Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);

        match form.active {
            StudentField::Name => {
                let prefix = "Name: ".len() as u16;
                frame.set_cursor_position((
                    inner.x + prefix + form.value_len(StudentField::Name) as u16,
                    inner.y,
                ));
            }
            StudentField::Mobile => {
                let prefix = "Mobile: ".len() as u16;
                frame.set_cursor_position((
                    inner.x + prefix + form.value_len(StudentField::Mobile) as u16,
                    inner.y + 2,
                ));
            }
            StudentField::Course => {}
        }
    }

    fn draw_confirm_delete(&self, frame: &mut Frame, area: Rect, confirm: &ConfirmStudentDelete) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Confirm Deletion")
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            Line::from("Are you sure you want to delete?"),
            Line::from(format!(
                "This will permanently remove {} ({}).",
                confirm.name, confirm.course
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y to confirm or N / Esc to cancel.",
                Style::default().fg(Color::Gray),
            )),
        ];

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn draw_search(&self, frame: &mut Frame, area: Rect, state: &SearchState) {
        let popup_area = centered_rect(50, 25, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title("Search Student").borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let query_display = if state.query.is_empty() {
            Span::styled("<name>", Style::default().fg(Color::DarkGray))
        } else {
            Span::raw(state.query.clone())
        };

        let lines = vec![
            Line::from(vec![Span::raw("Name: "), query_display]),
            Line::from(""),
            Line::from(Span::styled(
                "Enter to highlight exact matches • Esc to cancel",
                Style::default().fg(Color::Gray),
            )),
        ];

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);

        let prefix = "Name: ".len() as u16;
        frame.set_cursor_position((
            inner.x + prefix + state.query.chars().count() as u16,
            inner.y,
        ));
    }

    fn draw_about(&self, frame: &mut Frame, area: Rect) {
        let popup_area = centered_rect(60, 35, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title("About").borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            Line::from(Span::styled(
                format!("Student Register {}", env!("CARGO_PKG_VERSION")),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("A small SQLite-backed roster tool. Add, edit, search,"),
            Line::from("and delete student records from the table view."),
            Line::from(""),
            Line::from(Span::styled(
                "Press any key to close.",
                Style::default().fg(Color::Gray),
            )),
        ];

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }
}

/// Collect the ids of every student whose name equals the query, ignoring
/// case but never matching substrings. The search runs against the in-memory
/// mirror so the storage layer keeps its four fixed statements.
fn exact_name_matches(students: &[Student], query: &str) -> HashSet<i64> {
    let wanted = query.to_lowercase();
    students
        .iter()
        .filter(|student| student.name.to_lowercase() == wanted)
        .map(|student| student.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    fn student(id: i64, name: &str) -> Student {
        Student {
            id,
            name: name.to_string(),
            course: "Math".to_string(),
            mobile: String::new(),
        }
    }

    #[test]
    fn search_matches_whole_names_only() {
        let roster = vec![student(1, "Ada"), student(2, "Adam"), student(3, "ada")];

        let matches = exact_name_matches(&roster, "Ada");
        assert_eq!(matches, HashSet::from([1, 3]));

        assert!(exact_name_matches(&roster, "Ad").is_empty());
        assert!(exact_name_matches(&roster, "Nobody").is_empty());
    }

    #[test]
    fn selection_clamps_to_roster_bounds() {
        let conn = open_in_memory().unwrap();
        let mut app = App::new(conn, vec![student(1, "Ada"), student(2, "Grace")]);

        app.move_selection(10);
        assert_eq!(app.selected, 1);
        app.move_selection(-10);
        assert_eq!(app.selected, 0);
    }

    #[test]
    fn reload_drops_highlights_for_deleted_rows() {
        let conn = open_in_memory().unwrap();
        let ada = crate::db::create_student(&conn, "Ada", "Math", "555-0100").unwrap();
        let grace = crate::db::create_student(&conn, "Grace", "Physics", "555-0199").unwrap();

        let students = crate::db::fetch_students(&conn).unwrap();
        let mut app = App::new(conn, students);
        app.matches = HashSet::from([ada.id, grace.id]);

        crate::db::delete_student(&app.conn, ada.id).unwrap();
        app.reload().unwrap();

        assert_eq!(app.matches, HashSet::from([grace.id]));
        assert_eq!(app.students.len(), 1);
    }

    #[test]
    fn edit_with_empty_roster_reports_an_error() {
        let conn = open_in_memory().unwrap();
        let mut app = App::new(conn, Vec::new());

        let exited = app.handle_key(KeyCode::Char('e')).unwrap();
        assert!(!exited);
        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(
            app.status.as_ref().map(|s| s.text.as_str()),
            Some("No student selected.")
        );
    }
}
