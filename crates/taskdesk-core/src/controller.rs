//! Request/response layer between the coordinator and the repositories.
//!
//! The coordinator talks to these traits only, so tests can substitute
//! recording doubles and the shipped controllers stay plain structs.

mod tasks;
mod users;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppResult;
use crate::task::{NewTask, Task};
use crate::user::{NewUser, User};

pub use tasks::TaskController;
pub use users::UserController;

/// A successful controller response with its user-facing text.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply<T> {
    pub data: T,
    pub message: String,
}

impl<T> Reply<T> {
    pub fn new(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: message.into(),
        }
    }
}

/// Result of a counted task query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskBatch {
    pub tasks: Vec<Task>,
    pub count: usize,
}

impl TaskBatch {
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        let count = tasks.len();
        Self { tasks, count }
    }
}

#[async_trait]
pub trait UserService: Send + Sync {
    async fn login(&self, username: &str) -> AppResult<Reply<User>>;

    async fn register(&self, fields: NewUser) -> AppResult<Reply<User>>;

    async fn logout(&self) -> AppResult<Reply<()>>;

    async fn get_all_users(&self) -> AppResult<Reply<Vec<User>>>;
}

#[async_trait]
pub trait TaskService: Send + Sync {
    /// Scopes every later call to `user_id`; `None` clears the scope.
    fn set_current_user(&self, user_id: Option<Uuid>);

    async fn list_tasks(&self) -> AppResult<Reply<Vec<Task>>>;

    async fn create_task(&self, fields: NewTask, now: DateTime<Utc>) -> AppResult<Reply<Task>>;

    async fn toggle_task(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<Reply<Task>>;

    async fn delete_task(&self, id: Uuid) -> AppResult<Reply<()>>;

    async fn get_overdue_tasks(&self, now: DateTime<Utc>) -> AppResult<TaskBatch>;

    async fn get_tasks_due_soon(&self, now: DateTime<Utc>, days: i64) -> AppResult<TaskBatch>;
}
