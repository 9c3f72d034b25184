use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::{Reply, TaskBatch, TaskService};
use crate::error::{AppError, AppResult};
use crate::repository::{TaskPatch, TaskRepository, UserRepository};
use crate::task::{NewTask, Task};

pub struct TaskController {
    tasks: Arc<TaskRepository>,
    users: Arc<UserRepository>,
    current: Mutex<Option<Uuid>>,
}

impl TaskController {
    pub fn new(tasks: Arc<TaskRepository>, users: Arc<UserRepository>) -> Self {
        Self {
            tasks,
            users,
            current: Mutex::new(None),
        }
    }

    fn require_user(&self) -> AppResult<Uuid> {
        let current = *self.current.lock();
        current.ok_or_else(AppError::no_session)
    }

    /// Loads a task and checks the current user may touch it.
    fn accessible_task(&self, user_id: Uuid, id: Uuid) -> AppResult<Task> {
        let task = self
            .tasks
            .find_by_id(id)?
            .ok_or_else(|| AppError::domain(format!("task {id} not found")))?;
        if !task.is_visible_to(user_id) {
            return Err(AppError::domain(format!("task {id} not found")));
        }
        Ok(task)
    }

    fn scoped<F>(&self, keep: F) -> AppResult<Vec<Task>>
    where
        F: Fn(&Task) -> bool,
    {
        let user_id = self.require_user()?;
        Ok(self
            .tasks
            .find_for_user(user_id)?
            .into_iter()
            .filter(|t| keep(t))
            .collect())
    }
}

#[async_trait]
impl TaskService for TaskController {
    fn set_current_user(&self, user_id: Option<Uuid>) {
        debug!(user = ?user_id, "task scope changed");
        *self.current.lock() = user_id;
    }

    #[instrument(skip(self))]
    async fn list_tasks(&self) -> AppResult<Reply<Vec<Task>>> {
        let tasks = self.scoped(|_| true)?;
        let message = format!("{} task(s)", tasks.len());
        Ok(Reply::new(tasks, message))
    }

    #[instrument(skip(self, fields, now), fields(title_len = fields.title.len()))]
    async fn create_task(&self, fields: NewTask, now: DateTime<Utc>) -> AppResult<Reply<Task>> {
        let owner = self.require_user()?;
        if let Some(assignee) = fields.assignee_id
            && self.users.find_by_id(assignee)?.is_none()
        {
            return Err(AppError::domain(format!("assignee {assignee} does not exist")));
        }

        let task = self.tasks.create(owner, fields, now)?;
        let message = format!("Task '{}' created", task.title);
        Ok(Reply::new(task, message))
    }

    #[instrument(skip(self, now))]
    async fn toggle_task(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<Reply<Task>> {
        let user_id = self.require_user()?;
        let task = self.accessible_task(user_id, id)?;
        let patch = TaskPatch {
            completed: Some(!task.completed),
            ..TaskPatch::default()
        };
        let task = self.tasks.update(id, patch, now)?;
        let message = if task.completed {
            format!("Task '{}' completed", task.title)
        } else {
            format!("Task '{}' reopened", task.title)
        };
        Ok(Reply::new(task, message))
    }

    #[instrument(skip(self))]
    async fn delete_task(&self, id: Uuid) -> AppResult<Reply<()>> {
        let user_id = self.require_user()?;
        let task = self.accessible_task(user_id, id)?;
        if task.owner_id != user_id {
            return Err(AppError::domain("only the owner can delete a task"));
        }
        let removed = self.tasks.delete(id)?;
        Ok(Reply::new((), format!("Task '{}' deleted", removed.title)))
    }

    #[instrument(skip(self, now))]
    async fn get_overdue_tasks(&self, now: DateTime<Utc>) -> AppResult<TaskBatch> {
        let batch = TaskBatch::from_tasks(self.scoped(|t| t.is_overdue(now))?);
        info!(count = batch.count, "overdue query");
        Ok(batch)
    }

    #[instrument(skip(self, now))]
    async fn get_tasks_due_soon(&self, now: DateTime<Utc>, days: i64) -> AppResult<TaskBatch> {
        let batch = TaskBatch::from_tasks(self.scoped(|t| t.is_due_within(now, days))?);
        info!(count = batch.count, days, "due-soon query");
        Ok(batch)
    }
}
