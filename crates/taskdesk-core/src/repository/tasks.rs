use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::storage::{Storage, load_collection, save_collection};
use crate::task::{NewTask, Priority, Task};

pub const TASKS_KEY: &str = "tasks";

/// Partial update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub due: Option<Option<DateTime<Utc>>>,
    pub completed: Option<bool>,
    pub assignee_id: Option<Option<Uuid>>,
}

pub struct TaskRepository {
    storage: Arc<dyn Storage>,
}

impl TaskRepository {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    #[tracing::instrument(skip(self))]
    pub fn find_all(&self) -> AppResult<Vec<Task>> {
        load_collection(self.storage.as_ref(), TASKS_KEY).map_err(|err| AppError::storage(&err))
    }

    pub fn find_by_id(&self, id: Uuid) -> AppResult<Option<Task>> {
        Ok(self.find_all()?.into_iter().find(|t| t.id == id))
    }

    /// Tasks owned by or assigned to `user_id`, oldest first.
    #[tracing::instrument(skip(self))]
    pub fn find_for_user(&self, user_id: Uuid) -> AppResult<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .find_all()?
            .into_iter()
            .filter(|t| t.is_visible_to(user_id))
            .collect();
        tasks.sort_by_key(|t| t.created_at);
        debug!(count = tasks.len(), "loaded user tasks");
        Ok(tasks)
    }

    #[tracing::instrument(skip(self, fields, now), fields(title_len = fields.title.len()))]
    pub fn create(&self, owner_id: Uuid, fields: NewTask, now: DateTime<Utc>) -> AppResult<Task> {
        if fields.title.trim().is_empty() {
            return Err(AppError::validation("title required"));
        }

        let task = Task::new(owner_id, fields, now);
        let mut tasks = self.find_all()?;
        tasks.push(task.clone());
        self.save_all(&tasks)?;

        info!(id = %task.id, owner = %owner_id, "task created");
        Ok(task)
    }

    #[tracing::instrument(skip(self, patch, now))]
    pub fn update(&self, id: Uuid, patch: TaskPatch, now: DateTime<Utc>) -> AppResult<Task> {
        let mut tasks = self.find_all()?;
        let updated = {
            let task = tasks
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| AppError::domain(format!("task {id} not found")))?;
            apply_patch(task, patch, now)?;
            task.clone()
        };
        self.save_all(&tasks)?;
        Ok(updated)
    }

    #[tracing::instrument(skip(self))]
    pub fn delete(&self, id: Uuid) -> AppResult<Task> {
        let mut tasks = self.find_all()?;
        let idx = tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| AppError::domain(format!("task {id} not found")))?;
        let removed = tasks.remove(idx);
        self.save_all(&tasks)?;
        info!(id = %id, remaining = tasks.len(), "task deleted");
        Ok(removed)
    }

    fn save_all(&self, tasks: &[Task]) -> AppResult<()> {
        save_collection(self.storage.as_ref(), TASKS_KEY, tasks)
            .map_err(|err| AppError::storage(&err))
    }
}

fn apply_patch(task: &mut Task, patch: TaskPatch, now: DateTime<Utc>) -> AppResult<()> {
    if let Some(title) = patch.title {
        let title = title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::validation("title required"));
        }
        task.title = title;
    }
    if let Some(description) = patch.description {
        task.description = description.trim().to_string();
    }
    if let Some(category) = patch.category {
        task.category = category.trim().to_string();
    }
    if let Some(priority) = patch.priority {
        task.priority = priority;
    }
    if let Some(due) = patch.due {
        task.due = due.map(|d| d.trunc_subsecs(0));
    }
    if let Some(assignee) = patch.assignee_id {
        task.assignee_id = assignee;
    }
    if let Some(completed) = patch.completed {
        task.set_completed(completed, now);
    }

    task.updated_at = now.trunc_subsecs(0);
    debug!(id = %task.id, "task patch applied");
    Ok(())
}
