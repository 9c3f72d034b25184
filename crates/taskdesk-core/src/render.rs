use std::io::{self, IsTerminal, Write};

use chrono::{DateTime, Utc};
use unicode_width::UnicodeWidthStr;
use uuid::Uuid;

use crate::datetime::format_date;
use crate::task::{Priority, is_overdue};
use crate::user::User;
use crate::view::{MessageLevel, TaskEntry};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(color: bool) -> Self {
        Self {
            color: color && io::stdout().is_terminal(),
        }
    }

    /// Writes rows numbered from 1; the numbers are what the console
    /// commands accept as task references.
    #[tracing::instrument(skip(self, out, entries, directory, now))]
    pub fn write_task_table<W: Write>(
        &self,
        out: W,
        entries: &[&TaskEntry],
        directory: &[User],
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let headers = vec![
            "#".to_string(),
            "Done".to_string(),
            "Pri".to_string(),
            "Due".to_string(),
            "Category".to_string(),
            "Assignee".to_string(),
            "Title".to_string(),
        ];

        let mut rows = Vec::with_capacity(entries.len());
        for (idx, entry) in entries.iter().enumerate() {
            let number = self.paint(&(idx + 1).to_string(), "33");
            let done = if entry.completed { "x" } else { "" }.to_string();

            let priority = match entry.priority {
                Priority::High => self.paint(entry.priority.as_str(), "1"),
                _ => entry.priority.as_str().to_string(),
            };

            let due = entry.due.map(format_date).unwrap_or_default();
            let due = if is_overdue(entry.due, entry.completed, now) {
                self.paint(&due, "31")
            } else {
                due
            };

            rows.push(vec![
                number,
                done,
                priority,
                due,
                entry.category.clone(),
                assignee_label(entry.assignee_id, directory),
                entry.title.clone(),
            ]);
        }

        write_table(out, headers, rows)
    }

    pub fn print_task_table(
        &self,
        entries: &[&TaskEntry],
        directory: &[User],
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        if entries.is_empty() {
            println!("No tasks.");
            return Ok(());
        }
        self.write_task_table(io::stdout().lock(), entries, directory, now)
    }

    pub fn format_message(&self, text: &str, level: MessageLevel) -> String {
        let code = match level {
            MessageLevel::Info => "36",
            MessageLevel::Success => "32",
            MessageLevel::Warning => "33",
            MessageLevel::Error => "31",
        };
        format!("{} {text}", self.paint(&format!("[{level}]"), code))
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn assignee_label(assignee: Option<Uuid>, directory: &[User]) -> String {
    let Some(id) = assignee else {
        return String::new();
    };
    directory
        .iter()
        .find(|u| u.id == id)
        .map(|u| u.username.clone())
        .unwrap_or_else(|| id.to_string()[..8].to_string())
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
