//! Record lookup and mutation over [`Storage`](crate::storage::Storage).
//!
//! Each repository loads its whole collection, applies one change and saves
//! it back. Storage failures become [`AppError::Domain`](crate::error::AppError)
//! carrying the context chain.

mod tasks;
mod users;

pub use tasks::{TASKS_KEY, TaskPatch, TaskRepository};
pub use users::{USERS_KEY, UserRepository};
