//! Task view contracts.
//!
//! A view is bound once at startup as either a [`FilteringView`] (it owns
//! its filtering) or a plain [`TaskView`] (the coordinator computes the
//! visible set and pushes it in). [`TaskListView`] is the in-memory model
//! both variants are built on.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::filter::{CategoryFilter, FilterState, QuickFilter, StatusFilter};
use crate::task::{Priority, Task};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl MessageLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for MessageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    pub level: MessageLevel,
}

/// The attributes a rendered row records about its task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEntry {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub priority: Priority,
    pub completed: bool,
    pub due: Option<DateTime<Utc>>,
    pub assignee_id: Option<Uuid>,
}

impl From<&Task> for TaskEntry {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            category: task.category.clone(),
            priority: task.priority,
            completed: task.completed,
            due: task.due,
            assignee_id: task.assignee_id,
        }
    }
}

pub trait TaskView {
    /// Replaces the rendered rows.
    fn refresh(&mut self, tasks: &[Task]);

    fn show_message(&mut self, text: &str, level: MessageLevel);

    fn entries(&self) -> &[TaskEntry];

    fn visible_ids(&self) -> BTreeSet<Uuid>;

    /// Shows exactly the rows in `ids`.
    fn set_visible(&mut self, ids: &BTreeSet<Uuid>);
}

pub trait FilteringView: TaskView {
    fn filter_by_category(&mut self, category: &CategoryFilter);

    fn filter_tasks(&mut self, status: StatusFilter);

    fn filter_overdue(&mut self, now: DateTime<Utc>);

    fn filter_due_soon(&mut self, now: DateTime<Utc>, days: i64);
}

pub enum ViewBinding {
    Full(Box<dyn FilteringView>),
    Basic(Box<dyn TaskView>),
}

impl ViewBinding {
    pub fn full(view: impl FilteringView + 'static) -> Self {
        Self::Full(Box::new(view))
    }

    pub fn basic(view: impl TaskView + 'static) -> Self {
        Self::Basic(Box::new(view))
    }

    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full(_))
    }

    pub fn view(&self) -> &dyn TaskView {
        match self {
            Self::Full(view) => view.as_ref(),
            Self::Basic(view) => view.as_ref(),
        }
    }

    pub fn view_mut(&mut self) -> &mut dyn TaskView {
        match self {
            Self::Full(view) => view.as_mut(),
            Self::Basic(view) => view.as_mut(),
        }
    }

    pub fn filtering(&mut self) -> Option<&mut dyn FilteringView> {
        match self {
            Self::Full(view) => Some(view.as_mut()),
            Self::Basic(_) => None,
        }
    }
}

/// Rows, their visibility and the messages shown so far.
#[derive(Debug, Default, Clone)]
pub struct TaskListView {
    entries: Vec<TaskEntry>,
    visible: BTreeSet<Uuid>,
    filters: FilterState,
    quick: Option<QuickFilter>,
    messages: Vec<Message>,
}

impl TaskListView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn quick_filter(&self) -> Option<QuickFilter> {
        self.quick
    }

    /// Visible rows in render order.
    pub fn visible_entries(&self) -> impl Iterator<Item = &TaskEntry> {
        self.entries.iter().filter(|e| self.visible.contains(&e.id))
    }

    fn recompute(&mut self) {
        let quick = self.quick;
        self.visible = self
            .entries
            .iter()
            .filter(|e| self.filters.matches(e))
            .filter(|e| quick.map(|q| q.matches(e)).unwrap_or(true))
            .map(|e| e.id)
            .collect();
        debug!(
            total = self.entries.len(),
            visible = self.visible.len(),
            "task list visibility recomputed"
        );
    }
}

impl TaskView for TaskListView {
    fn refresh(&mut self, tasks: &[Task]) {
        self.entries = tasks.iter().map(TaskEntry::from).collect();
        self.quick = None;
        self.recompute();
    }

    fn show_message(&mut self, text: &str, level: MessageLevel) {
        self.messages.push(Message {
            text: text.to_string(),
            level,
        });
    }

    fn entries(&self) -> &[TaskEntry] {
        &self.entries
    }

    fn visible_ids(&self) -> BTreeSet<Uuid> {
        self.visible.clone()
    }

    fn set_visible(&mut self, ids: &BTreeSet<Uuid>) {
        self.visible = self
            .entries
            .iter()
            .filter(|e| ids.contains(&e.id))
            .map(|e| e.id)
            .collect();
    }
}

impl FilteringView for TaskListView {
    fn filter_by_category(&mut self, category: &CategoryFilter) {
        self.filters.category = category.clone();
        self.quick = None;
        self.recompute();
    }

    fn filter_tasks(&mut self, status: StatusFilter) {
        self.filters.status = status;
        self.quick = None;
        self.recompute();
    }

    fn filter_overdue(&mut self, now: DateTime<Utc>) {
        self.quick = Some(QuickFilter::Overdue { now });
        self.recompute();
    }

    fn filter_due_soon(&mut self, now: DateTime<Utc>, days: i64) {
        self.quick = Some(QuickFilter::DueSoon { now, days });
        self.recompute();
    }
}
