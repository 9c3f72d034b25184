//! Terminal bindings for the view and shell contracts.

use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::export::ExportArtifact;
use crate::filter::{CategoryFilter, StatusFilter};
use crate::render::Renderer;
use crate::shell::{AssigneeOption, Control, FilterGroup, Panel, Shell};
use crate::task::Task;
use crate::view::{FilteringView, MessageLevel, TaskEntry, TaskListView, TaskView};

/// Prints messages as they arrive; rows stay in memory until listed.
pub struct ConsoleView {
    list: TaskListView,
    renderer: Renderer,
}

impl ConsoleView {
    pub fn new(renderer: Renderer) -> Self {
        Self {
            list: TaskListView::new(),
            renderer,
        }
    }
}

impl TaskView for ConsoleView {
    fn refresh(&mut self, tasks: &[Task]) {
        self.list.refresh(tasks);
    }

    fn show_message(&mut self, text: &str, level: MessageLevel) {
        let line = self.renderer.format_message(text, level);
        match level {
            MessageLevel::Error => eprintln!("{line}"),
            _ => println!("{line}"),
        }
        self.list.show_message(text, level);
    }

    fn entries(&self) -> &[TaskEntry] {
        self.list.entries()
    }

    fn visible_ids(&self) -> BTreeSet<Uuid> {
        self.list.visible_ids()
    }

    fn set_visible(&mut self, ids: &BTreeSet<Uuid>) {
        self.list.set_visible(ids);
    }
}

impl FilteringView for ConsoleView {
    fn filter_by_category(&mut self, category: &CategoryFilter) {
        self.list.filter_by_category(category);
    }

    fn filter_tasks(&mut self, status: StatusFilter) {
        self.list.filter_tasks(status);
    }

    fn filter_overdue(&mut self, now: DateTime<Utc>) {
        self.list.filter_overdue(now);
    }

    fn filter_due_soon(&mut self, now: DateTime<Utc>, days: i64) {
        self.list.filter_due_soon(now, days);
    }
}

pub struct ConsoleShell {
    export_dir: PathBuf,
    assignees: Vec<AssigneeOption>,
}

impl ConsoleShell {
    pub fn new(export_dir: PathBuf) -> Self {
        Self {
            export_dir,
            assignees: vec![],
        }
    }
}

impl Shell for ConsoleShell {
    fn set_panel_visible(&mut self, panel: Panel, visible: bool) {
        debug!(?panel, visible, "panel visibility");
        if panel == Panel::Registration && visible {
            println!("New account: register <username> <email> [full name]  (cancel to close)");
        }
    }

    fn set_loading(&mut self, control: Control, loading: bool) {
        debug!(%control, loading, "loading state");
    }

    fn set_welcome(&mut self, text: &str) {
        println!("{text}");
    }

    fn set_username_input(&mut self, value: &str) {
        if !value.is_empty() {
            println!("Log in with: login {value}");
        }
    }

    fn reset_registration_form(&mut self) {
        debug!("registration form reset");
    }

    fn set_assignee_options(&mut self, options: &[AssigneeOption]) {
        self.assignees = options.to_vec();
        debug!(count = self.assignees.len(), "assignee options updated");
    }

    fn mark_active(&mut self, group: FilterGroup, key: &str) {
        debug!(?group, key, "filter button active");
    }

    fn offer_download(&mut self, artifact: &ExportArtifact) -> anyhow::Result<()> {
        fs::create_dir_all(&self.export_dir)
            .with_context(|| format!("failed to create {}", self.export_dir.display()))?;
        let path = self.export_dir.join(&artifact.file_name);
        fs::write(&path, &artifact.body)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), mime = artifact.mime, "export written");
        println!("Saved {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::NaiveDate;
    use serde_json::json;
    use tempfile::tempdir;

    use super::ConsoleShell;
    use crate::export::ExportArtifact;
    use crate::shell::Shell;

    #[test]
    fn download_lands_in_export_dir() {
        let temp = tempdir().expect("tempdir");
        let mut shell = ConsoleShell::new(temp.path().join("out"));
        let date = NaiveDate::from_ymd_opt(2026, 1, 2).expect("date");
        let artifact =
            ExportArtifact::from_snapshot(&json!({"app": "taskdesk"}), date).expect("artifact");

        shell.offer_download(&artifact).expect("download");

        let written = fs::read_to_string(
            temp.path()
                .join("out")
                .join("task-app-backup-2026-01-02.json"),
        )
        .expect("read export");
        assert_eq!(written, artifact.body);
    }
}
