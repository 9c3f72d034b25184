use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::storage::{Storage, load_collection, save_collection};
use crate::user::{NewUser, User};

pub const USERS_KEY: &str = "users";

const MIN_USERNAME_LEN: usize = 3;

pub struct UserRepository {
    storage: Arc<dyn Storage>,
}

impl UserRepository {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    #[tracing::instrument(skip(self))]
    pub fn find_all(&self) -> AppResult<Vec<User>> {
        load_collection(self.storage.as_ref(), USERS_KEY).map_err(|err| AppError::storage(&err))
    }

    pub fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.find_all()?.into_iter().find(|u| u.id == id))
    }

    pub fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let wanted = username.trim();
        Ok(self
            .find_all()?
            .into_iter()
            .find(|u| u.username.eq_ignore_ascii_case(wanted)))
    }

    /// Validates and stores a new user. Fields are trimmed here; the caller
    /// may pass empty strings through.
    #[tracing::instrument(skip(self, fields, now), fields(username = %fields.username))]
    pub fn create(&self, fields: NewUser, now: DateTime<Utc>) -> AppResult<User> {
        let fields = fields.trimmed();
        validate(&fields)?;

        let mut users = self.find_all()?;
        if users
            .iter()
            .any(|u| u.username.eq_ignore_ascii_case(&fields.username))
        {
            return Err(AppError::validation(format!(
                "username '{}' is already taken",
                fields.username
            )));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: fields.username,
            email: fields.email,
            full_name: fields.full_name,
            created_at: now.trunc_subsecs(0),
        };
        users.push(user.clone());
        save_collection(self.storage.as_ref(), USERS_KEY, &users)
            .map_err(|err| AppError::storage(&err))?;

        info!(id = %user.id, total = users.len(), "user created");
        Ok(user)
    }
}

fn validate(fields: &NewUser) -> AppResult<()> {
    if fields.username.is_empty() {
        return Err(AppError::validation("username required"));
    }
    if fields.username.chars().count() < MIN_USERNAME_LEN {
        return Err(AppError::validation(format!(
            "username must be at least {MIN_USERNAME_LEN} characters"
        )));
    }
    if fields.username.chars().any(char::is_whitespace) {
        return Err(AppError::validation("username cannot contain spaces"));
    }
    if fields.email.is_empty() {
        return Err(AppError::validation("email required"));
    }
    if !looks_like_email(&fields.email) {
        return Err(AppError::validation(format!(
            "invalid email address: {}",
            fields.email
        )));
    }
    debug!("registration fields valid");
    Ok(())
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}
