use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{Reply, UserService};
use crate::error::{AppError, AppResult};
use crate::repository::UserRepository;
use crate::user::{NewUser, User};

pub struct UserController {
    repository: Arc<UserRepository>,
    current: Mutex<Option<Uuid>>,
}

impl UserController {
    pub fn new(repository: Arc<UserRepository>) -> Self {
        Self {
            repository,
            current: Mutex::new(None),
        }
    }

    pub fn current_user_id(&self) -> Option<Uuid> {
        *self.current.lock()
    }
}

#[async_trait]
impl UserService for UserController {
    #[instrument(skip(self))]
    async fn login(&self, username: &str) -> AppResult<Reply<User>> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::validation("username required"));
        }

        let Some(user) = self.repository.find_by_username(username)? else {
            warn!(username, "login rejected: unknown user");
            return Err(AppError::domain(format!("user '{username}' not found")));
        };

        *self.current.lock() = Some(user.id);
        info!(id = %user.id, "user logged in");
        let message = format!("Welcome back, {}!", user.display_name());
        Ok(Reply::new(user, message))
    }

    #[instrument(skip(self, fields), fields(username = %fields.username))]
    async fn register(&self, fields: NewUser) -> AppResult<Reply<User>> {
        let user = self.repository.create(fields, Utc::now())?;
        let message = format!("Account '{}' created, you can log in now", user.username);
        Ok(Reply::new(user, message))
    }

    #[instrument(skip(self))]
    async fn logout(&self) -> AppResult<Reply<()>> {
        let previous = self.current.lock().take();
        info!(had_session = previous.is_some(), "user logged out");
        Ok(Reply::new((), "You have been logged out"))
    }

    #[instrument(skip(self))]
    async fn get_all_users(&self) -> AppResult<Reply<Vec<User>>> {
        let users = self.repository.find_all()?;
        let message = format!("{} user(s)", users.len());
        Ok(Reply::new(users, message))
    }
}
