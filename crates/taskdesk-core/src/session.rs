use tracing::info;
use uuid::Uuid;

use crate::user::User;

/// Which top-level region the shell shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Main,
}

/// The authenticated user, if any. The screen is derived from it, so the
/// main region is visible exactly when someone is logged in.
#[derive(Debug, Default, Clone)]
pub struct Session {
    current_user: Option<User>,
}

impl Session {
    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    pub fn current_user_id(&self) -> Option<Uuid> {
        self.current_user.as_ref().map(|u| u.id)
    }

    pub fn is_active(&self) -> bool {
        self.current_user.is_some()
    }

    pub fn screen(&self) -> Screen {
        if self.is_active() {
            Screen::Main
        } else {
            Screen::Login
        }
    }

    pub fn begin(&mut self, user: User) {
        info!(id = %user.id, username = %user.username, "session started");
        self.current_user = Some(user);
    }

    /// Returns the user that was logged in, if any.
    pub fn end(&mut self) -> Option<User> {
        let previous = self.current_user.take();
        if let Some(user) = previous.as_ref() {
            info!(id = %user.id, "session ended");
        }
        previous
    }
}
